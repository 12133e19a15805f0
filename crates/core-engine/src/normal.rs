//! Normal-mode dispatch.
//!
//! Keys run through an ordered rule chain: pending replace, count digits,
//! the `g` prefix, a pending operator, then the single-key commands and
//! bare motions. Operators resolve through dedicated word/line handlers
//! (including the `cw`-behaves-as-`ce` quirk) or fall back to the generic
//! operator-motion composition.

use core_buffer::{Cursor, EditTag, text};
use tracing::trace;

use crate::repeat::{InsertKind, InsertOrigin, LastEdit, OpMotion};
use crate::search::{self, Direction};
use crate::{Engine, Key, Mode, Motion, Operator, Register, RegisterKind, VisualKind, motion, repeat, visual};

pub(crate) fn handle(engine: &mut Engine, key: Key) {
    match key {
        Key::CtrlR => {
            engine.pending_replace = false;
            engine.pending_g = false;
            let count = engine.take_count();
            for _ in 0..count {
                if !engine.buf_mut().redo() {
                    break;
                }
            }
        }
        Key::Char(c) => handle_char(engine, c),
        _ => {
            engine.pending_replace = false;
            engine.pending_g = false;
        }
    }
}

fn handle_char(engine: &mut Engine, c: char) {
    if engine.pending_replace {
        engine.pending_replace = false;
        replace_chars(engine, c);
        return;
    }
    // A leading `0` is the line-start motion; any other digit (or `0` with a
    // count already building) accumulates.
    if c.is_ascii_digit() && (engine.counting || c != '0') {
        engine.push_count_digit(c);
        return;
    }
    if engine.pending_g {
        engine.pending_g = false;
        if c == 'g' {
            let count = engine.take_count();
            motion::apply(engine, Motion::FirstLine, count);
            return;
        }
        // Prefix cancelled; the key is processed normally below.
    }
    if let Some(op) = engine.pending_op.take() {
        resolve_operator(engine, op, c);
        return;
    }
    match c {
        ':' => engine.set_mode(Mode::Command),
        '/' => search::start(engine, Direction::Forward),
        '?' => search::start(engine, Direction::Backward),
        'i' => enter_insert(engine, InsertKind::Insert),
        'a' => {
            let cursor = engine.cursor();
            let len = engine.buf().line_char_len(cursor.row);
            if len > 0 && cursor.col < len {
                engine.buf_mut().cursor.col += 1;
            }
            enter_insert(engine, InsertKind::Untracked);
        }
        'A' => {
            let row = engine.cursor().row;
            engine.buf_mut().cursor.col = engine.buf().line_char_len(row);
            enter_insert(engine, InsertKind::Untracked);
        }
        'g' => engine.pending_g = true,
        'x' => {
            let count = engine.take_count();
            delete_chars(engine, count);
        }
        '~' => {
            let count = engine.take_count();
            toggle_case(engine, count);
        }
        's' => {
            let count = engine.take_count();
            substitute(engine, count);
        }
        'r' => engine.pending_replace = true,
        'd' => engine.pending_op = Some(Operator::Delete),
        'y' => engine.pending_op = Some(Operator::Yank),
        'c' => engine.pending_op = Some(Operator::Change),
        '>' => engine.pending_op = Some(Operator::Indent),
        '<' => engine.pending_op = Some(Operator::Dedent),
        'p' => paste(engine),
        'o' => open_line(engine, true),
        'O' => open_line(engine, false),
        'u' => {
            let count = engine.take_count();
            for _ in 0..count {
                if !engine.buf_mut().undo() {
                    break;
                }
            }
        }
        'v' => visual::enter(engine, VisualKind::Char),
        'V' => visual::enter(engine, VisualKind::Line),
        'n' => search::advance(engine, false),
        'N' => search::advance(engine, true),
        '.' => repeat::replay(engine),
        _ => {
            if let Some(m) = Motion::from_char(c) {
                let count = engine.take_count();
                motion::apply(engine, m, count);
            } else {
                trace!(target: "engine.normal", key = %c, "unbound");
                engine.take_count();
            }
        }
    }
}

fn resolve_operator(engine: &mut Engine, op: Operator, c: char) {
    let count = engine.take_count();
    trace!(target: "engine.normal", ?op, key = %c, count, "operator");
    let op_motion = OpMotion::from_char(c);
    match (op, c) {
        (Operator::Delete, 'd') => {
            delete_lines(engine, count);
            engine.last_edit = Some(LastEdit::DeleteLines(count));
        }
        (Operator::Yank, 'y') => yank_lines(engine, count),
        (Operator::Change, 'c') => change_lines(engine, count),
        (Operator::Indent, '>') => {
            let row = engine.cursor().row;
            indent_rows(engine, row, count, true);
            engine.last_edit = Some(LastEdit::IndentLines(count));
        }
        (Operator::Dedent, '<') => {
            let row = engine.cursor().row;
            indent_rows(engine, row, count, false);
            engine.last_edit = Some(LastEdit::DedentLines(count));
        }
        (Operator::Indent | Operator::Dedent, _) => {}
        (Operator::Delete, _) if op_motion.is_some() => {
            let m = op_motion.unwrap_or(OpMotion::Word);
            delete_motion(engine, m);
            engine.last_edit = Some(LastEdit::DeleteMotion(m));
        }
        (Operator::Change, _) if op_motion.is_some() => {
            let m = op_motion.unwrap_or(OpMotion::Word);
            change_motion(engine, m, count);
        }
        (Operator::Yank, _) if op_motion.is_some() => {
            yank_motion(engine, op_motion.unwrap_or(OpMotion::Word));
        }
        _ => {
            if let Some(m) = Motion::from_char(c) {
                compose(engine, op, m);
            }
            // Anything else cancels the operator.
        }
    }
}

// --- single-key edits ---------------------------------------------------

/// `x`: delete `count` chars under and after the cursor.
pub(crate) fn delete_chars(engine: &mut Engine, count: usize) {
    let cursor = engine.cursor();
    let line = engine.line(cursor.row);
    let len = text::char_len(&line);
    if len == 0 || cursor.col >= len {
        return;
    }
    let end = (cursor.col + count).min(len);
    let deleted = text::slice(&line, cursor.col, end).to_string();
    let new_line = format!(
        "{}{}",
        text::slice(&line, 0, cursor.col),
        text::slice(&line, end, len)
    );
    engine.register = Register {
        text: deleted,
        kind: RegisterKind::Charwise,
    };
    engine
        .buf_mut()
        .set_lines(cursor.row - 1..cursor.row, vec![new_line]);
    engine.buf_mut().clamp_cursor(false);
    engine.last_edit = Some(LastEdit::DeleteChars(count));
}

/// `~`: toggle case of `count` chars, advancing the cursor past them.
pub(crate) fn toggle_case(engine: &mut Engine, count: usize) {
    let cursor = engine.cursor();
    let line = engine.line(cursor.row);
    let len = text::char_len(&line);
    if len == 0 || cursor.col >= len {
        return;
    }
    let end = (cursor.col + count).min(len);
    let new_line: String = line
        .chars()
        .enumerate()
        .map(|(i, ch)| {
            if i >= cursor.col && i < end {
                flip_case(ch)
            } else {
                ch
            }
        })
        .collect();
    engine
        .buf_mut()
        .set_lines(cursor.row - 1..cursor.row, vec![new_line]);
    engine.buf_mut().cursor.col = end.min(len - 1);
    engine.last_edit = Some(LastEdit::ToggleCase(count));
}

fn flip_case(c: char) -> char {
    if c.is_ascii_uppercase() {
        c.to_ascii_lowercase()
    } else if c.is_ascii_lowercase() {
        c.to_ascii_uppercase()
    } else {
        c
    }
}

/// `r<char>`: replace `count` chars in place. Fails quietly when the line
/// is too short, as the original does.
pub(crate) fn replace_chars(engine: &mut Engine, c: char) {
    let count = engine.take_count();
    if !(' '..='~').contains(&c) {
        return;
    }
    let cursor = engine.cursor();
    let line = engine.line(cursor.row);
    let len = text::char_len(&line);
    if cursor.col + count > len {
        return;
    }
    let replacement: String = std::iter::repeat_n(c, count).collect();
    let new_line = format!(
        "{}{replacement}{}",
        text::slice(&line, 0, cursor.col),
        text::slice(&line, cursor.col + count, len)
    );
    engine
        .buf_mut()
        .set_lines(cursor.row - 1..cursor.row, vec![new_line]);
    engine.buf_mut().cursor.col = cursor.col + count - 1;
    engine.last_edit = Some(LastEdit::ReplaceChars { count, ch: c });
}

/// `s`: delete `count` chars and enter insert, one coalesced undo step.
pub(crate) fn substitute(engine: &mut Engine, count: usize) {
    let cursor = engine.cursor();
    engine.buf_mut().begin_insert_group(EditTag::ChangeRun);
    let line = engine.line(cursor.row);
    let len = text::char_len(&line);
    if cursor.col < len {
        let end = (cursor.col + count).min(len);
        let new_line = format!(
            "{}{}",
            text::slice(&line, 0, cursor.col),
            text::slice(&line, end, len)
        );
        engine
            .buf_mut()
            .set_lines(cursor.row - 1..cursor.row, vec![new_line]);
    }
    engine.insert_origin = Some(InsertOrigin {
        kind: InsertKind::Substitute,
        start: cursor,
        count,
    });
    engine.set_mode(Mode::Insert);
}

pub(crate) fn enter_insert(engine: &mut Engine, kind: InsertKind) {
    engine.buf_mut().begin_insert_group(EditTag::InsertRun);
    engine.insert_origin = Some(InsertOrigin {
        kind,
        start: engine.cursor(),
        count: 1,
    });
    engine.set_mode(Mode::Insert);
}

/// `o`/`O`: open a line below/above and insert into it. The undo group
/// opens before the splice so undoing the whole command removes the line.
pub(crate) fn open_line(engine: &mut Engine, below: bool) {
    let cursor = engine.cursor();
    let (tag, kind, insert_at, new_row) = if below {
        (
            EditTag::OpenBelow,
            InsertKind::OpenBelow,
            cursor.row,
            cursor.row + 1,
        )
    } else {
        (
            EditTag::OpenAbove,
            InsertKind::OpenAbove,
            cursor.row - 1,
            cursor.row,
        )
    };
    engine.buf_mut().begin_insert_group(tag);
    engine
        .buf_mut()
        .set_lines(insert_at..insert_at, vec![String::new()]);
    engine.buf_mut().cursor = Cursor::new(new_row, 0);
    engine.insert_origin = Some(InsertOrigin {
        kind,
        start: cursor,
        count: 1,
    });
    engine.set_mode(Mode::Insert);
}

/// `p`: paste the unnamed register. Line-wise text goes below the current
/// line; char-wise text lands after the cursor column.
pub(crate) fn paste(engine: &mut Engine) {
    let Register { text: reg, kind } = engine.register.clone();
    if reg.is_empty() {
        return;
    }
    let cursor = engine.cursor();
    if kind == RegisterKind::Linewise || reg.contains('\n') {
        let lines: Vec<String> = reg.split('\n').map(str::to_string).collect();
        engine.buf_mut().set_lines(cursor.row..cursor.row, lines);
        let target = cursor.row + 1;
        let col = engine.buf().first_non_blank(target);
        engine.buf_mut().cursor = Cursor::new(target, col);
        engine.buf_mut().clamp_cursor(false);
    } else {
        let line = engine.line(cursor.row);
        let len = text::char_len(&line);
        let at = if len == 0 { 0 } else { (cursor.col + 1).min(len) };
        let new_line = format!(
            "{}{reg}{}",
            text::slice(&line, 0, at),
            text::slice(&line, at, len)
        );
        engine
            .buf_mut()
            .set_lines(cursor.row - 1..cursor.row, vec![new_line]);
        engine.buf_mut().cursor.col = cursor.col + text::char_len(&reg);
        engine.buf_mut().clamp_cursor(false);
    }
}

// --- line-wise operators ------------------------------------------------

fn line_span(engine: &Engine, count: usize) -> (usize, usize) {
    let row = engine.cursor().row;
    let end_row = (row + count - 1).min(engine.buf().line_count());
    (row, end_row)
}

/// `dd`: delete `count` whole lines into the register (line-wise).
pub(crate) fn delete_lines(engine: &mut Engine, count: usize) {
    let (row, end_row) = line_span(engine, count);
    let removed: Vec<String> = engine.buf().lines()[row - 1..end_row].to_vec();
    engine.register = Register {
        text: removed.join("\n"),
        kind: RegisterKind::Linewise,
    };
    engine.buf_mut().set_lines(row - 1..end_row, Vec::new());
    let new_row = row.min(engine.buf().line_count());
    let col = engine.buf().first_non_blank(new_row);
    engine.buf_mut().cursor = Cursor::new(new_row, col);
    engine.buf_mut().clamp_cursor(false);
}

/// `yy`: yank `count` whole lines without touching the buffer.
fn yank_lines(engine: &mut Engine, count: usize) {
    let (row, end_row) = line_span(engine, count);
    let lines: Vec<String> = engine.buf().lines()[row - 1..end_row].to_vec();
    engine.register = Register {
        text: lines.join("\n"),
        kind: RegisterKind::Linewise,
    };
}

/// `cc`: blank `count` lines down to one and insert.
fn change_lines(engine: &mut Engine, count: usize) {
    let (row, end_row) = line_span(engine, count);
    let removed: Vec<String> = engine.buf().lines()[row - 1..end_row].to_vec();
    engine.register = Register {
        text: removed.join("\n"),
        kind: RegisterKind::Linewise,
    };
    engine.buf_mut().begin_insert_group(EditTag::ChangeRun);
    engine
        .buf_mut()
        .set_lines(row - 1..end_row, vec![String::new()]);
    engine.buf_mut().cursor = Cursor::new(row, 0);
    engine.insert_origin = Some(InsertOrigin {
        kind: InsertKind::ChangeLine,
        start: Cursor::new(row, 0),
        count,
    });
    engine.set_mode(Mode::Insert);
}

/// `>>`/`<<` and the visual `>`/`<`: shift whole lines by one indent unit.
pub(crate) fn indent_rows(engine: &mut Engine, start_row: usize, count: usize, indent: bool) {
    let end_row = (start_row + count - 1).min(engine.buf().line_count());
    let unit = engine.config().indent_unit();
    let width = engine.config().shift_width;
    let new_lines: Vec<String> = (start_row..=end_row)
        .map(|row| {
            let line = engine.line(row);
            if indent {
                if line.is_empty() {
                    line
                } else {
                    format!("{unit}{line}")
                }
            } else {
                dedent_line(&line, width)
            }
        })
        .collect();
    engine.buf_mut().set_lines(start_row - 1..end_row, new_lines);
    let col = engine.buf().first_non_blank(start_row);
    engine.buf_mut().cursor = Cursor::new(start_row, col);
    engine.buf_mut().clamp_cursor(false);
}

fn dedent_line(line: &str, width: usize) -> String {
    if let Some(rest) = line.strip_prefix('\t') {
        return rest.to_string();
    }
    let strip = line
        .chars()
        .take(width)
        .take_while(|&c| c == ' ')
        .count();
    text::slice(line, strip, text::char_len(line)).to_string()
}

// --- operator + word/eol/bol handlers -----------------------------------

/// Deletion driven by one of the dedicated operator motions, at the
/// current cursor; used by `d` resolution and dot-repeat.
pub(crate) fn delete_motion(engine: &mut Engine, m: OpMotion) {
    let start = engine.cursor();
    let line = engine.line(start.row);
    let len = text::char_len(&line);
    let range = match m {
        OpMotion::Word => {
            motion::apply(engine, Motion::WordForward, 1);
            let end = engine.cursor();
            if end.row == start.row && end.col > start.col {
                Some((start.col, end.col))
            } else if start.col < len {
                Some((start.col, len))
            } else {
                None
            }
        }
        OpMotion::ToWordEnd => {
            motion::apply(engine, Motion::WordEnd, 1);
            let end = engine.cursor();
            if end.row == start.row && end.col >= start.col {
                Some((start.col, (end.col + 1).min(len)))
            } else if start.col < len {
                Some((start.col, len))
            } else {
                None
            }
        }
        OpMotion::WordBack => {
            motion::apply(engine, Motion::WordBackward, 1);
            let end = engine.cursor();
            if end.row == start.row && end.col < start.col {
                Some((end.col, start.col))
            } else {
                None
            }
        }
        OpMotion::ToEol => {
            if start.col < len {
                Some((start.col, len))
            } else {
                None
            }
        }
        OpMotion::ToBol => {
            if start.col > 0 {
                Some((0, start.col))
            } else {
                None
            }
        }
    };
    let Some((del_start, del_end)) = range else {
        engine.buf_mut().cursor = start;
        engine.buf_mut().clamp_cursor(false);
        return;
    };
    let deleted = text::slice(&line, del_start, del_end).to_string();
    let new_line = format!(
        "{}{}",
        text::slice(&line, 0, del_start),
        text::slice(&line, del_end, len)
    );
    engine.register = Register {
        text: deleted,
        kind: RegisterKind::Charwise,
    };
    engine.buf_mut().cursor = Cursor::new(start.row, del_start);
    engine
        .buf_mut()
        .set_lines(start.row - 1..start.row, vec![new_line]);
    engine.buf_mut().clamp_cursor(false);
}

/// Half-open char range a change operator removes before inserting.
/// `cw` behaves like `ce`: only the current word run goes (or the
/// punctuation run up to the next word when not on a word char), never
/// the trailing whitespace. Vim's historical quirk, kept on purpose.
pub(crate) fn change_range(
    engine: &mut Engine,
    m: OpMotion,
    start: Cursor,
    len: usize,
) -> (usize, usize) {
    match m {
        OpMotion::Word => {
            let line = engine.line(start.row);
            if start.col >= len {
                return (start.col, start.col);
            }
            let mut end = start.col;
            while end < len && text::char_at(&line, end).is_some_and(text::is_word_char) {
                end += 1;
            }
            if end == start.col {
                while end < len && !text::char_at(&line, end).is_some_and(text::is_word_char) {
                    end += 1;
                }
            }
            (start.col, end)
        }
        OpMotion::ToWordEnd => {
            motion::apply(engine, Motion::WordEnd, 1);
            let end = engine.cursor();
            engine.buf_mut().cursor = start;
            if end.row == start.row && end.col >= start.col {
                (start.col, (end.col + 1).min(len))
            } else {
                (start.col, len)
            }
        }
        OpMotion::WordBack => {
            motion::apply(engine, Motion::WordBackward, 1);
            let end = engine.cursor();
            engine.buf_mut().cursor = start;
            if end.row == start.row && end.col < start.col {
                (end.col, start.col)
            } else {
                (start.col, start.col)
            }
        }
        OpMotion::ToEol => (start.col, len),
        OpMotion::ToBol => (0, start.col),
    }
}

/// `c` + dedicated motion: delete the range and insert, coalesced.
pub(crate) fn change_motion(engine: &mut Engine, m: OpMotion, count: usize) {
    let start = engine.cursor();
    let line = engine.line(start.row);
    let len = text::char_len(&line);
    let (del_start, del_end) = change_range(engine, m, start, len);
    engine.buf_mut().cursor = Cursor::new(start.row, del_start);
    engine.buf_mut().begin_insert_group(EditTag::ChangeRun);
    if del_end > del_start {
        let deleted = text::slice(&line, del_start, del_end).to_string();
        engine.register = Register {
            text: deleted,
            kind: RegisterKind::Charwise,
        };
        let new_line = format!(
            "{}{}",
            text::slice(&line, 0, del_start),
            text::slice(&line, del_end, len)
        );
        engine
            .buf_mut()
            .set_lines(start.row - 1..start.row, vec![new_line]);
    }
    engine.insert_origin = Some(InsertOrigin {
        kind: InsertKind::ChangeMotion(m),
        start: Cursor::new(start.row, del_start),
        count,
    });
    engine.set_mode(Mode::Insert);
}

/// `y` + dedicated motion: fill the register, restore the cursor.
fn yank_motion(engine: &mut Engine, m: OpMotion) {
    let start = engine.cursor();
    let line = engine.line(start.row);
    let len = text::char_len(&line);
    let range = match m {
        OpMotion::Word => {
            motion::apply(engine, Motion::WordForward, 1);
            let end = engine.cursor();
            if end.row == start.row && end.col > start.col {
                (start.col, end.col)
            } else {
                (start.col, len)
            }
        }
        OpMotion::ToWordEnd => {
            motion::apply(engine, Motion::WordEnd, 1);
            let end = engine.cursor();
            if end.row == start.row && end.col >= start.col {
                (start.col, (end.col + 1).min(len))
            } else {
                (start.col, len)
            }
        }
        OpMotion::WordBack => {
            motion::apply(engine, Motion::WordBackward, 1);
            let end = engine.cursor();
            if end.row == start.row && end.col < start.col {
                (end.col, start.col)
            } else {
                (start.col, start.col)
            }
        }
        OpMotion::ToEol => (start.col, len),
        OpMotion::ToBol => (0, start.col),
    };
    let (from, to) = range;
    if to > from {
        engine.register = Register {
            text: text::slice(&line, from, to).to_string(),
            kind: RegisterKind::Charwise,
        };
    }
    engine.buf_mut().cursor = start;
}

// --- generic operator-motion composition --------------------------------

/// Text covered by the ordered span `[s, en)` (end-exclusive columns).
pub(crate) fn span_text(engine: &Engine, s: Cursor, en: Cursor) -> String {
    if s.row == en.row {
        let line = engine.buf().line(s.row);
        return text::slice(line, s.col, en.col).to_string();
    }
    let mut parts = Vec::with_capacity(en.row - s.row + 1);
    let first = engine.buf().line(s.row);
    parts.push(text::slice(first, s.col, text::char_len(first)).to_string());
    for row in s.row + 1..en.row {
        parts.push(engine.buf().line(row).to_string());
    }
    let last = engine.buf().line(en.row);
    parts.push(text::slice(last, 0, en.col).to_string());
    parts.join("\n")
}

/// Operator + any remaining motion: run the motion once, order the two
/// positions, and operate on the covered span. Same-line spans are the
/// half-open column range; multi-line spans join the first line's prefix
/// with the last line's suffix.
fn compose(engine: &mut Engine, op: Operator, m: Motion) {
    let origin = engine.cursor();
    motion::apply(engine, m, 1);
    let moved = engine.cursor();
    let (s, en) = if moved < origin {
        (moved, origin)
    } else {
        (origin, moved)
    };
    match op {
        Operator::Yank => {
            let yanked = span_text(engine, s, en);
            if !yanked.is_empty() {
                engine.register = Register {
                    text: yanked,
                    kind: RegisterKind::Charwise,
                };
            }
            engine.buf_mut().cursor = origin;
        }
        Operator::Delete | Operator::Change => {
            if s == en {
                return;
            }
            let covered = span_text(engine, s, en);
            engine.register = Register {
                text: covered,
                kind: RegisterKind::Charwise,
            };
            engine.buf_mut().cursor = s;
            if op == Operator::Change {
                engine.buf_mut().begin_insert_group(EditTag::ChangeRun);
            }
            if s.row == en.row {
                let line = engine.line(s.row);
                let len = text::char_len(&line);
                let new_line = format!(
                    "{}{}",
                    text::slice(&line, 0, s.col),
                    text::slice(&line, en.col, len)
                );
                engine
                    .buf_mut()
                    .set_lines(s.row - 1..s.row, vec![new_line]);
            } else {
                let first = engine.line(s.row);
                let last = engine.line(en.row);
                let last_len = text::char_len(&last);
                let joined = format!(
                    "{}{}",
                    text::slice(&first, 0, s.col),
                    text::slice(&last, en.col, last_len)
                );
                engine.buf_mut().set_lines(s.row - 1..en.row, vec![joined]);
            }
            if op == Operator::Change {
                engine.insert_origin = Some(InsertOrigin {
                    kind: InsertKind::Untracked,
                    start: s,
                    count: 1,
                });
                engine.set_mode(Mode::Insert);
            } else {
                engine.buf_mut().clamp_cursor(false);
            }
        }
        Operator::Indent | Operator::Dedent => {}
    }
}
