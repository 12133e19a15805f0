//! Cursor motions.
//!
//! A closed enum of motion kinds replaces the original string-keyed handler
//! table: dispatch is a match, unknown keys fall out at parse time, and
//! operators compose against the same enum. Word motions use classic vi
//! ASCII classes (see `core_buffer::text`). All column arithmetic is
//! char-indexed.

use core_buffer::text;
use tracing::trace;

use crate::{Engine, Mode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    Left,
    Down,
    Up,
    Right,
    LineStart,
    LineEnd,
    FirstNonBlank,
    WordForward,
    WordBackward,
    WordEnd,
    FirstLine,
    LastLine,
    MatchingBracket,
}

impl Motion {
    pub(crate) fn from_char(c: char) -> Option<Self> {
        Some(match c {
            'h' => Self::Left,
            'j' => Self::Down,
            'k' => Self::Up,
            'l' => Self::Right,
            '0' => Self::LineStart,
            '$' => Self::LineEnd,
            '^' => Self::FirstNonBlank,
            'w' => Self::WordForward,
            'b' => Self::WordBackward,
            'e' => Self::WordEnd,
            'G' => Self::LastLine,
            'g' => Self::FirstLine,
            '%' => Self::MatchingBracket,
            _ => return None,
        })
    }
}

/// Applies `motion` `count` times (where the motion honors a count).
/// Returns whether the cursor moved. Visual head tracking is the caller's
/// concern.
pub(crate) fn apply(engine: &mut Engine, motion: Motion, count: usize) -> bool {
    let count = count.max(1);
    trace!(target: "engine.motion", ?motion, count, "apply");
    match motion {
        Motion::Left => left(engine, count),
        Motion::Right => right(engine, count),
        Motion::Down => down(engine, count),
        Motion::Up => up(engine, count),
        Motion::LineStart => line_start(engine),
        Motion::LineEnd => line_end(engine),
        Motion::FirstNonBlank => first_non_blank(engine),
        Motion::WordForward => repeat(engine, count, word_forward_once),
        Motion::WordBackward => repeat(engine, count, word_backward_once),
        Motion::WordEnd => repeat(engine, count, word_end_once),
        Motion::FirstLine => first_line(engine, count),
        Motion::LastLine => last_line(engine),
        Motion::MatchingBracket => matching_bracket_motion(engine),
    }
}

fn repeat(engine: &mut Engine, count: usize, step: fn(&mut Engine) -> bool) -> bool {
    let mut moved = false;
    for _ in 0..count {
        if !step(engine) {
            break;
        }
        moved = true;
    }
    moved
}

fn left(engine: &mut Engine, count: usize) -> bool {
    let mut moved = false;
    for _ in 0..count {
        let cursor = engine.cursor();
        if cursor.col > 0 {
            engine.buf_mut().cursor.col -= 1;
            moved = true;
        } else if cursor.row > 1 && engine.mode() == Mode::Insert {
            // Insert mode wraps to the end of the previous line.
            let prev_len = engine.buf().line_char_len(cursor.row - 1);
            let buf = engine.buf_mut();
            buf.cursor.row -= 1;
            buf.cursor.col = prev_len;
            moved = true;
            break;
        } else {
            break;
        }
    }
    moved
}

fn right(engine: &mut Engine, count: usize) -> bool {
    let cursor = engine.cursor();
    let len = engine.buf().line_char_len(cursor.row);
    let limit = if engine.mode() == Mode::Insert {
        len
    } else {
        len.saturating_sub(1)
    };
    let target = (cursor.col + count).min(limit);
    if len > 0 && target > cursor.col {
        engine.buf_mut().cursor.col = target;
        true
    } else {
        false
    }
}

fn vertical(engine: &mut Engine, delta_down: bool, count: usize) -> bool {
    let cursor = engine.cursor();
    let line_count = engine.buf().line_count();
    let target = if delta_down {
        (cursor.row + count).min(line_count)
    } else {
        cursor.row.saturating_sub(count).max(1)
    };
    if target == cursor.row {
        return false;
    }
    let desired = cursor.col;
    let len = engine.buf().line_char_len(target);
    let col = if engine.mode() == Mode::Insert {
        desired.min(len)
    } else if len == 0 {
        0
    } else {
        desired.min(len - 1)
    };
    let buf = engine.buf_mut();
    buf.cursor.row = target;
    buf.cursor.col = col;
    true
}

fn down(engine: &mut Engine, count: usize) -> bool {
    vertical(engine, true, count)
}

fn up(engine: &mut Engine, count: usize) -> bool {
    vertical(engine, false, count)
}

fn line_start(engine: &mut Engine) -> bool {
    if engine.cursor().col != 0 {
        engine.buf_mut().cursor.col = 0;
        true
    } else {
        false
    }
}

fn line_end(engine: &mut Engine) -> bool {
    let cursor = engine.cursor();
    let len = engine.buf().line_char_len(cursor.row);
    if len > 0 && cursor.col != len - 1 {
        engine.buf_mut().cursor.col = len - 1;
        true
    } else {
        false
    }
}

fn first_non_blank(engine: &mut Engine) -> bool {
    let cursor = engine.cursor();
    let target = engine.buf().first_non_blank(cursor.row);
    // An all-blank line still pulls the cursor to column 0.
    let len = engine.buf().line_char_len(cursor.row);
    let target = target.min(len.saturating_sub(1));
    if cursor.col != target {
        engine.buf_mut().cursor.col = target;
        true
    } else {
        false
    }
}

/// `gg`; a count greater than one targets that line number.
fn first_line(engine: &mut Engine, count: usize) -> bool {
    let line_count = engine.buf().line_count();
    let target = if count > 1 { count.min(line_count) } else { 1 };
    if engine.cursor().row == target {
        return false;
    }
    let col = engine.buf().first_non_blank(target);
    let len = engine.buf().line_char_len(target);
    let buf = engine.buf_mut();
    buf.cursor.row = target;
    buf.cursor.col = col.min(len.saturating_sub(1));
    true
}

fn last_line(engine: &mut Engine) -> bool {
    let line_count = engine.buf().line_count();
    if engine.cursor().row == line_count {
        return false;
    }
    let len = engine.buf().line_char_len(line_count);
    let buf = engine.buf_mut();
    buf.cursor.row = line_count;
    buf.cursor.col = buf.cursor.col.min(len);
    true
}

fn word_forward_once(engine: &mut Engine) -> bool {
    let cursor = engine.cursor();
    let line = engine.line(cursor.row);
    let chars: Vec<char> = line.chars().collect();
    if cursor.col + 1 >= chars.len() {
        if cursor.row < engine.buf().line_count() {
            let buf = engine.buf_mut();
            buf.cursor.row += 1;
            buf.cursor.col = 0;
            return true;
        }
        return false;
    }
    let in_word = text::is_word_char(chars[cursor.col]);
    let mut pos = cursor.col + 1;
    // Skip the rest of the current run, then any whitespace.
    while pos < chars.len() && text::is_word_char(chars[pos]) == in_word {
        pos += 1;
    }
    while pos < chars.len() && text::is_blank(chars[pos]) {
        pos += 1;
    }
    if pos < chars.len() {
        engine.buf_mut().cursor.col = pos;
        true
    } else if cursor.row < engine.buf().line_count() {
        let buf = engine.buf_mut();
        buf.cursor.row += 1;
        buf.cursor.col = 0;
        true
    } else {
        false
    }
}

fn word_backward_once(engine: &mut Engine) -> bool {
    let cursor = engine.cursor();
    if cursor.col == 0 {
        if cursor.row > 1 {
            let prev_len = engine.buf().line_char_len(cursor.row - 1);
            let buf = engine.buf_mut();
            buf.cursor.row -= 1;
            buf.cursor.col = prev_len.saturating_sub(1);
            return true;
        }
        return false;
    }
    let line = engine.line(cursor.row);
    let chars: Vec<char> = line.chars().collect();
    let mut pos = cursor.col - 1;
    while pos > 0 && text::is_blank(chars[pos]) {
        pos -= 1;
    }
    if pos > 0 && text::is_word_char(chars[pos]) && text::is_word_char(chars[pos - 1]) {
        // Mid-word: back to its start.
        while pos > 0 && text::is_word_char(chars[pos - 1]) {
            pos -= 1;
        }
    } else if pos > 0 {
        if !text::is_word_char(chars[pos]) {
            while pos > 0 && !text::is_word_char(chars[pos - 1]) {
                pos -= 1;
            }
        }
        if pos > 0 && text::is_word_char(chars[pos - 1]) {
            while pos > 0 && text::is_word_char(chars[pos - 1]) {
                pos -= 1;
            }
        }
    }
    if cursor.col != pos {
        engine.buf_mut().cursor.col = pos;
        true
    } else {
        false
    }
}

fn word_end_once(engine: &mut Engine) -> bool {
    loop {
        let cursor = engine.cursor();
        let line = engine.line(cursor.row);
        let chars: Vec<char> = line.chars().collect();
        if cursor.col + 1 >= chars.len() {
            if cursor.row < engine.buf().line_count() {
                let buf = engine.buf_mut();
                buf.cursor.row += 1;
                buf.cursor.col = 0;
                // Retry on the next line.
                continue;
            }
            return false;
        }
        let mut pos = cursor.col;
        if text::is_word_char(chars[pos]) {
            while pos + 1 < chars.len() && text::is_word_char(chars[pos + 1]) {
                pos += 1;
            }
            if pos == cursor.col && pos + 1 < chars.len() {
                // Already on a word end: advance to the next word's end.
                pos += 1;
                while pos + 1 < chars.len() && !text::is_word_char(chars[pos]) {
                    pos += 1;
                }
                while pos + 1 < chars.len() && text::is_word_char(chars[pos + 1]) {
                    pos += 1;
                }
            }
        } else {
            pos += 1;
            while pos < chars.len() && !text::is_word_char(chars[pos]) {
                pos += 1;
            }
            if pos < chars.len() {
                while pos + 1 < chars.len() && text::is_word_char(chars[pos + 1]) {
                    pos += 1;
                }
            }
        }
        if pos < chars.len() && pos != cursor.col {
            engine.buf_mut().cursor.col = pos;
            return true;
        }
        if pos >= chars.len() && cursor.col != chars.len() - 1 {
            engine.buf_mut().cursor.col = chars.len() - 1;
            return true;
        }
        return false;
    }
}

// --- bracket matching ---------------------------------------------------

fn is_bracket(c: char) -> bool {
    matches!(c, '(' | ')' | '[' | ']' | '{' | '}')
}

/// Matching column for the bracket at `col`, scanning the current line only
/// with a nesting count. `None` when `col` is not on a bracket or the match
/// is absent (or on another line — a known limitation, kept as designed).
pub(crate) fn bracket_match(line: &str, col: usize) -> Option<usize> {
    let chars: Vec<char> = line.chars().collect();
    let &ch = chars.get(col)?;
    let (open, close, forward) = match ch {
        '(' => ('(', ')', true),
        ')' => ('(', ')', false),
        '[' => ('[', ']', true),
        ']' => ('[', ']', false),
        '{' => ('{', '}', true),
        '}' => ('{', '}', false),
        _ => return None,
    };
    let mut depth = 0usize;
    if forward {
        for (idx, &c) in chars.iter().enumerate().skip(col) {
            if c == open {
                depth += 1;
            } else if c == close {
                depth -= 1;
                if depth == 0 {
                    return Some(idx);
                }
            }
        }
    } else {
        for idx in (0..=col).rev() {
            let c = chars[idx];
            if c == close {
                depth += 1;
            } else if c == open {
                depth -= 1;
                if depth == 0 {
                    return Some(idx);
                }
            }
        }
    }
    None
}

/// `%`: jump to the matching bracket. When the cursor is not on a bracket,
/// hunt right then left on the line for one first (moving the cursor onto
/// it, as the original does).
fn matching_bracket_motion(engine: &mut Engine) -> bool {
    let cursor = engine.cursor();
    let line = engine.line(cursor.row);
    let chars: Vec<char> = line.chars().collect();
    if chars.is_empty() {
        return false;
    }
    let mut col = cursor.col;
    if !chars.get(col).copied().is_some_and(is_bracket) {
        let right = (col..chars.len()).find(|&i| is_bracket(chars[i]));
        let candidate = right.or_else(|| (0..col).rev().find(|&i| is_bracket(chars[i])));
        let Some(found) = candidate else {
            return false;
        };
        col = found;
        engine.buf_mut().cursor.col = col;
    }
    if let Some(target) = bracket_match(&line, col) {
        engine.buf_mut().cursor.col = target;
        true
    } else {
        false
    }
}
