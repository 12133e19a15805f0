//! Insert mode.
//!
//! Printable ASCII lands at the cursor; `<cr>` splits the line (carrying
//! indent when auto-indent is on, plus one extra shift after `{`); `<bs>`
//! deletes backward and joins lines at column 0. Everything typed between
//! entering insert mode and `<esc>` coalesces into the undo group opened at
//! entry, so the session reverts as a single step.

use core_buffer::text;
use tracing::trace;

use crate::{Engine, Key, Mode, repeat};

pub(crate) fn handle(engine: &mut Engine, key: Key) {
    match key {
        Key::Enter => newline(engine),
        Key::Backspace => backspace(engine),
        _ => {
            if let Some(c) = key.printable() {
                insert_char(engine, c);
            }
        }
    }
}

fn insert_char(engine: &mut Engine, c: char) {
    let cursor = engine.cursor();
    let line = engine.line(cursor.row);
    let col = cursor.col.min(text::char_len(&line));
    let mut new_line = String::with_capacity(line.len() + c.len_utf8());
    new_line.push_str(text::slice(&line, 0, col));
    new_line.push(c);
    new_line.push_str(text::slice(&line, col, text::char_len(&line)));
    engine
        .buf_mut()
        .set_lines(cursor.row - 1..cursor.row, vec![new_line]);
    engine.buf_mut().cursor.col = col + 1;
}

fn newline(engine: &mut Engine) {
    let cursor = engine.cursor();
    let line = engine.line(cursor.row);
    let len = text::char_len(&line);
    let col = cursor.col.min(len);
    let left = text::slice(&line, 0, col).to_string();
    let right = text::slice(&line, col, len).to_string();
    let indent = if engine.config().auto_indent {
        let mut indent = text::leading_whitespace(&line).to_string();
        if col > 0 && text::char_at(&line, col - 1) == Some('{') {
            indent.push_str(&engine.config().indent_unit());
        }
        indent
    } else {
        String::new()
    };
    let indent_len = text::char_len(&indent);
    engine.buf_mut().set_lines(
        cursor.row - 1..cursor.row,
        vec![left, format!("{indent}{right}")],
    );
    let buf = engine.buf_mut();
    buf.cursor.row = cursor.row + 1;
    buf.cursor.col = indent_len;
}

fn backspace(engine: &mut Engine) {
    let cursor = engine.cursor();
    if cursor.col > 0 {
        let line = engine.line(cursor.row);
        let len = text::char_len(&line);
        let col = cursor.col.min(len);
        let mut new_line = String::with_capacity(line.len());
        new_line.push_str(text::slice(&line, 0, col - 1));
        new_line.push_str(text::slice(&line, col, len));
        engine
            .buf_mut()
            .set_lines(cursor.row - 1..cursor.row, vec![new_line]);
        engine.buf_mut().cursor.col = col - 1;
    } else if cursor.row > 1 {
        let prev = engine.line(cursor.row - 1);
        let junction = text::char_len(&prev);
        let joined = format!("{prev}{}", engine.line(cursor.row));
        engine
            .buf_mut()
            .set_lines(cursor.row - 2..cursor.row, vec![joined]);
        let buf = engine.buf_mut();
        buf.cursor.row = cursor.row - 1;
        buf.cursor.col = junction;
    }
}

/// `<esc>` out of insert mode: seal the undo group, capture the session's
/// text for dot-repeat, clamp, and step the cursor back one column (the
/// classic vim step-back). Capture runs before the step-back, while the
/// cursor still sits one past the last typed char.
pub(crate) fn leave(engine: &mut Engine) {
    let dirty = engine.buf().insert_group_dirty();
    engine.buf_mut().end_insert_group();
    let cursor = engine.cursor();
    let len = engine.buf().line_char_len(cursor.row);
    let col = cursor.col.min(len);
    engine.buf_mut().cursor.col = col;
    if dirty {
        repeat::capture_session(engine);
    }
    let stepped = if len > 0 && col == len {
        len - 1
    } else if col > 0 {
        col - 1
    } else {
        col
    };
    engine.buf_mut().cursor.col = stepped;
    engine.set_mode(Mode::Normal);
    engine.insert_origin = None;
    trace!(target: "engine.input", "insert_leave");
}
