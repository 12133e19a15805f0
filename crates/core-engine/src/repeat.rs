//! Dot-repeat.
//!
//! Every repeatable edit leaves a `LastEdit` behind; `.` replays it at the
//! current cursor. Insert sessions are captured when they end: the origin
//! recorded on entry says which command opened the session, and the text
//! typed is lifted from the buffer rather than tracked keystroke by
//! keystroke. Sessions that spread across lines are not captured.

use core_buffer::{Cursor, text};
use tracing::trace;

use crate::{Engine, normal};

/// Motions that operators resolve through dedicated handlers, so a repeat
/// can re-run them without re-parsing keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpMotion {
    Word,
    WordBack,
    ToWordEnd,
    ToEol,
    ToBol,
}

impl OpMotion {
    pub(crate) fn from_char(c: char) -> Option<Self> {
        match c {
            'w' => Some(Self::Word),
            'b' => Some(Self::WordBack),
            'e' => Some(Self::ToWordEnd),
            '$' => Some(Self::ToEol),
            '0' => Some(Self::ToBol),
            _ => None,
        }
    }
}

/// Which command opened the current insert session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InsertKind {
    Insert,
    OpenBelow,
    OpenAbove,
    Substitute,
    ChangeMotion(OpMotion),
    ChangeLine,
    /// Session entered a way `.` does not replay (append, visual change…).
    Untracked,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct InsertOrigin {
    pub(crate) kind: InsertKind,
    pub(crate) start: Cursor,
    pub(crate) count: usize,
}

/// The most recent repeatable edit.
#[derive(Debug, Clone)]
pub(crate) enum LastEdit {
    DeleteChars(usize),
    ToggleCase(usize),
    ReplaceChars { count: usize, ch: char },
    DeleteLines(usize),
    DeleteMotion(OpMotion),
    IndentLines(usize),
    DedentLines(usize),
    InsertText(String),
    OpenBelow(String),
    OpenAbove(String),
    Substitute { count: usize, text: String },
    ChangeMotion { motion: OpMotion, text: String },
    ChangeLine(String),
}

/// Called as insert mode ends; turns the finished session into a
/// `LastEdit` according to its origin.
pub(crate) fn capture_session(engine: &mut Engine) {
    let Some(origin) = engine.insert_origin else {
        return;
    };
    let cursor = engine.cursor();
    match origin.kind {
        InsertKind::Untracked => {}
        InsertKind::OpenBelow => {
            engine.last_edit = Some(LastEdit::OpenBelow(engine.line(cursor.row)));
        }
        InsertKind::OpenAbove => {
            engine.last_edit = Some(LastEdit::OpenAbove(engine.line(cursor.row)));
        }
        InsertKind::ChangeLine => {
            if cursor.row == origin.start.row {
                engine.last_edit = Some(LastEdit::ChangeLine(engine.line(cursor.row)));
            }
        }
        InsertKind::Insert | InsertKind::Substitute | InsertKind::ChangeMotion(_) => {
            if cursor.row != origin.start.row || cursor.col < origin.start.col {
                return;
            }
            let line = engine.line(cursor.row);
            let typed = text::slice(&line, origin.start.col, cursor.col).to_string();
            match origin.kind {
                InsertKind::Insert => {
                    if !typed.is_empty() {
                        engine.last_edit = Some(LastEdit::InsertText(typed));
                    }
                }
                InsertKind::Substitute => {
                    engine.last_edit = Some(LastEdit::Substitute {
                        count: origin.count,
                        text: typed,
                    });
                }
                InsertKind::ChangeMotion(motion) => {
                    engine.last_edit = Some(LastEdit::ChangeMotion {
                        motion,
                        text: typed,
                    });
                }
                _ => {}
            }
        }
    }
    trace!(target: "engine.repeat", edit = ?engine.last_edit, "captured");
}

/// `.` — replay the last edit at the current cursor. Replays splice the
/// buffer directly, so each lands as a single undo step.
pub(crate) fn replay(engine: &mut Engine) {
    let Some(edit) = engine.last_edit.clone() else {
        return;
    };
    trace!(target: "engine.repeat", edit = ?edit, "replay");
    match edit {
        LastEdit::DeleteChars(count) => normal::delete_chars(engine, count),
        LastEdit::ToggleCase(count) => normal::toggle_case(engine, count),
        LastEdit::ReplaceChars { count, ch } => {
            engine.count = count;
            engine.counting = true;
            normal::replace_chars(engine, ch);
        }
        LastEdit::DeleteLines(count) => {
            normal::delete_lines(engine, count);
        }
        LastEdit::DeleteMotion(motion) => normal::delete_motion(engine, motion),
        LastEdit::IndentLines(count) => {
            let row = engine.cursor().row;
            normal::indent_rows(engine, row, count, true);
        }
        LastEdit::DedentLines(count) => {
            let row = engine.cursor().row;
            normal::indent_rows(engine, row, count, false);
        }
        LastEdit::InsertText(typed) => {
            let cursor = engine.cursor();
            let line = engine.line(cursor.row);
            let len = text::char_len(&line);
            let at = cursor.col.min(len);
            let new_line = format!(
                "{}{typed}{}",
                text::slice(&line, 0, at),
                text::slice(&line, at, len)
            );
            engine
                .buf_mut()
                .set_lines(cursor.row - 1..cursor.row, vec![new_line]);
            engine.buf_mut().cursor.col = at + text::char_len(&typed) - 1;
        }
        LastEdit::OpenBelow(typed) => {
            let row = engine.cursor().row;
            engine.buf_mut().set_lines(row..row, vec![typed.clone()]);
            engine.buf_mut().cursor =
                Cursor::new(row + 1, text::char_len(&typed).saturating_sub(1));
        }
        LastEdit::OpenAbove(typed) => {
            let row = engine.cursor().row;
            engine
                .buf_mut()
                .set_lines(row - 1..row - 1, vec![typed.clone()]);
            engine.buf_mut().cursor = Cursor::new(row, text::char_len(&typed).saturating_sub(1));
        }
        LastEdit::Substitute { count, text: typed } => {
            let cursor = engine.cursor();
            let line = engine.line(cursor.row);
            let len = text::char_len(&line);
            let at = cursor.col.min(len);
            let end = (at + count).min(len);
            let new_line = format!(
                "{}{typed}{}",
                text::slice(&line, 0, at),
                text::slice(&line, end, len)
            );
            engine
                .buf_mut()
                .set_lines(cursor.row - 1..cursor.row, vec![new_line]);
            engine.buf_mut().cursor.col = at + text::char_len(&typed).saturating_sub(1);
            engine.buf_mut().clamp_cursor(false);
        }
        LastEdit::ChangeMotion { motion, text: typed } => {
            let start = engine.cursor();
            let line = engine.line(start.row);
            let len = text::char_len(&line);
            let (from, to) = normal::change_range(engine, motion, start, len);
            let new_line = format!(
                "{}{typed}{}",
                text::slice(&line, 0, from),
                text::slice(&line, to, len)
            );
            engine
                .buf_mut()
                .set_lines(start.row - 1..start.row, vec![new_line]);
            engine.buf_mut().cursor =
                Cursor::new(start.row, from + text::char_len(&typed).saturating_sub(1));
            engine.buf_mut().clamp_cursor(false);
        }
        LastEdit::ChangeLine(typed) => {
            let row = engine.cursor().row;
            engine
                .buf_mut()
                .set_lines(row - 1..row, vec![typed.clone()]);
            engine.buf_mut().cursor =
                Cursor::new(row, text::char_len(&typed).saturating_sub(1));
            engine.buf_mut().clamp_cursor(false);
        }
    }
}
