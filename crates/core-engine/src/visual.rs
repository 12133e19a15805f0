//! Visual mode.
//!
//! Entering anchors the selection at the cursor; motions float the head.
//! Operations work on the normalized selection: anchor/head ordered,
//! line-wise selections widened to whole lines, char-wise end columns
//! extended one past the head char for inclusivity. Every operation lands
//! as a single splice and drops back to Normal mode.

use core_buffer::{Cursor, EditTag, text};
use tracing::trace;

use crate::repeat::{InsertKind, InsertOrigin, LastEdit};
use crate::{Engine, Key, Mode, Motion, Register, RegisterKind, VisualKind, motion, normal};

#[derive(Debug, Clone, Copy)]
pub(crate) struct VisualState {
    pub(crate) kind: VisualKind,
    pub(crate) anchor: Cursor,
    pub(crate) head: Cursor,
}

pub(crate) fn enter(engine: &mut Engine, kind: VisualKind) {
    let cursor = engine.cursor();
    engine.visual = Some(VisualState {
        kind,
        anchor: cursor,
        head: cursor,
    });
    engine.set_mode(Mode::Visual);
    trace!(target: "engine.visual", ?kind, row = cursor.row, col = cursor.col, "enter");
}

pub(crate) fn handle(engine: &mut Engine, key: Key) {
    let Key::Char(c) = key else {
        return;
    };
    if c.is_ascii_digit() && (engine.counting || c != '0') {
        engine.push_count_digit(c);
        return;
    }
    match c {
        'y' => yank(engine),
        'd' | 'x' => delete(engine),
        'c' => change(engine),
        '~' => toggle_case(engine),
        '>' => indent(engine, true),
        '<' => indent(engine, false),
        _ => {
            if let Some(m) = Motion::from_char(c) {
                let count = engine.take_count();
                motion::apply(engine, m, count);
                sync_head(engine);
            } else {
                engine.take_count();
            }
        }
    }
}

/// Pulls the selection head along after any cursor motion.
pub(crate) fn sync_head(engine: &mut Engine) {
    let cursor = engine.cursor();
    if let Some(v) = engine.visual.as_mut() {
        v.head = cursor;
    }
}

/// Ordered, inclusive-adjusted selection bounds. Line-wise selections span
/// column 0 of the first row through end-of-line of the last; char-wise
/// ends extend one column past the head char (half-open), capped at the
/// line end.
pub(crate) fn normalized(engine: &Engine) -> Option<(Cursor, Cursor, VisualKind)> {
    let v = engine.visual.as_ref()?;
    let (mut start, mut end) = if v.head < v.anchor {
        (v.head, v.anchor)
    } else {
        (v.anchor, v.head)
    };
    let end_len = engine.buf().line_char_len(end.row);
    match v.kind {
        VisualKind::Line => {
            start.col = 0;
            end.col = end_len;
        }
        VisualKind::Char | VisualKind::Block => {
            end.col = (end.col + 1).min(end_len);
        }
    }
    Some((start, end, v.kind))
}

fn leave_to_normal(engine: &mut Engine) {
    engine.visual = None;
    engine.set_mode(Mode::Normal);
}

/// `<esc>`: back to Normal with the cursor on the anchor (line-wise: its
/// first non-blank).
pub(crate) fn leave(engine: &mut Engine) {
    if let Some(v) = engine.visual.take() {
        let col = match v.kind {
            VisualKind::Line => engine.buf().first_non_blank(v.anchor.row),
            _ => v.anchor.col,
        };
        engine.buf_mut().cursor = Cursor::new(v.anchor.row, col);
        engine.buf_mut().clamp_cursor(false);
    }
    engine.set_mode(Mode::Normal);
}

fn yank(engine: &mut Engine) {
    let Some((start, end, kind)) = normalized(engine) else {
        leave_to_normal(engine);
        return;
    };
    engine.register = match kind {
        VisualKind::Line => Register {
            text: engine.buf().lines()[start.row - 1..end.row].join("\n"),
            kind: RegisterKind::Linewise,
        },
        _ => Register {
            text: normal::span_text(engine, start, end),
            kind: RegisterKind::Charwise,
        },
    };
    engine.buf_mut().cursor = start;
    engine.buf_mut().clamp_cursor(false);
    leave_to_normal(engine);
}

fn delete(engine: &mut Engine) {
    let Some((start, end, kind)) = normalized(engine) else {
        leave_to_normal(engine);
        return;
    };
    match kind {
        VisualKind::Line => {
            engine.register = Register {
                text: engine.buf().lines()[start.row - 1..end.row].join("\n"),
                kind: RegisterKind::Linewise,
            };
            engine
                .buf_mut()
                .set_lines(start.row - 1..end.row, Vec::new());
            let row = start.row.min(engine.buf().line_count());
            let col = engine.buf().first_non_blank(row);
            engine.buf_mut().cursor = Cursor::new(row, col);
        }
        _ => {
            engine.register = Register {
                text: normal::span_text(engine, start, end),
                kind: RegisterKind::Charwise,
            };
            splice_out(engine, start, end);
            engine.buf_mut().cursor = start;
        }
    }
    engine.buf_mut().clamp_cursor(false);
    leave_to_normal(engine);
}

fn change(engine: &mut Engine) {
    let Some((start, end, kind)) = normalized(engine) else {
        leave_to_normal(engine);
        return;
    };
    engine.buf_mut().cursor = start;
    engine.buf_mut().begin_insert_group(EditTag::ChangeRun);
    match kind {
        VisualKind::Line => {
            engine.register = Register {
                text: engine.buf().lines()[start.row - 1..end.row].join("\n"),
                kind: RegisterKind::Linewise,
            };
            engine
                .buf_mut()
                .set_lines(start.row - 1..end.row, vec![String::new()]);
            engine.buf_mut().cursor = Cursor::new(start.row, 0);
        }
        _ => {
            engine.register = Register {
                text: normal::span_text(engine, start, end),
                kind: RegisterKind::Charwise,
            };
            splice_out(engine, start, end);
            engine.buf_mut().cursor = start;
        }
    }
    engine.insert_origin = Some(InsertOrigin {
        kind: InsertKind::Untracked,
        start,
        count: 1,
    });
    engine.visual = None;
    engine.set_mode(Mode::Insert);
}

/// Removes the char-wise span `[start, end)`, joining lines when it spans
/// more than one row.
fn splice_out(engine: &mut Engine, start: Cursor, end: Cursor) {
    if start.row == end.row {
        let line = engine.line(start.row);
        let len = text::char_len(&line);
        let new_line = format!(
            "{}{}",
            text::slice(&line, 0, start.col),
            text::slice(&line, end.col, len)
        );
        engine
            .buf_mut()
            .set_lines(start.row - 1..start.row, vec![new_line]);
    } else {
        let first = engine.line(start.row);
        let last = engine.line(end.row);
        let last_len = text::char_len(&last);
        let joined = format!(
            "{}{}",
            text::slice(&first, 0, start.col),
            text::slice(&last, end.col, last_len)
        );
        engine
            .buf_mut()
            .set_lines(start.row - 1..end.row, vec![joined]);
    }
}

/// `~` over the selection: one splice across the covered rows.
fn toggle_case(engine: &mut Engine) {
    let Some((start, end, _)) = normalized(engine) else {
        leave_to_normal(engine);
        return;
    };
    let new_lines: Vec<String> = (start.row..=end.row)
        .map(|row| {
            let line = engine.line(row);
            let len = text::char_len(&line);
            let from = if row == start.row { start.col } else { 0 };
            let to = if row == end.row { end.col } else { len };
            line.chars()
                .enumerate()
                .map(|(i, ch)| if i >= from && i < to { flip(ch) } else { ch })
                .collect()
        })
        .collect();
    engine
        .buf_mut()
        .set_lines(start.row - 1..end.row, new_lines);
    engine.buf_mut().cursor = start;
    engine.buf_mut().clamp_cursor(false);
    leave_to_normal(engine);
}

fn flip(c: char) -> char {
    if c.is_ascii_uppercase() {
        c.to_ascii_lowercase()
    } else if c.is_ascii_lowercase() {
        c.to_ascii_uppercase()
    } else {
        c
    }
}

fn indent(engine: &mut Engine, indent: bool) {
    let Some((start, end, _)) = normalized(engine) else {
        leave_to_normal(engine);
        return;
    };
    let rows = end.row - start.row + 1;
    normal::indent_rows(engine, start.row, rows, indent);
    engine.last_edit = Some(if indent {
        LastEdit::IndentLines(rows)
    } else {
        LastEdit::DedentLines(rows)
    });
    leave_to_normal(engine);
}
