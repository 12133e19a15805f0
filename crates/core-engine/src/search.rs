//! Literal search sessions.
//!
//! `/` and `?` collect a pattern char by char; completing with `<cr>`
//! computes every match in the buffer up front as an ordered `(row, col)`
//! list, jumps to the nearest match in the search direction, and `n`/`N`
//! walk the list with wraparound. Matching is plain substring comparison —
//! no regex by design — and overlapping occurrences all count.

use core_buffer::{Cursor, text};
use tracing::{debug, trace};

use crate::{Engine, Key, Mode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

#[derive(Debug, Default)]
pub(crate) struct SearchState {
    pub(crate) pattern: String,
    pub(crate) input: String,
    pub(crate) direction: Direction,
    pub(crate) results: Vec<Cursor>,
    pub(crate) current: Option<usize>,
}

impl Default for Direction {
    fn default() -> Self {
        Self::Forward
    }
}

impl SearchState {
    /// Drops the whole session: pattern, results, and pending input.
    pub(crate) fn reset(&mut self) {
        self.pattern.clear();
        self.input.clear();
        self.results.clear();
        self.current = None;
    }
}

pub(crate) fn start(engine: &mut Engine, direction: Direction) {
    engine.search.direction = direction;
    engine.search.input.clear();
    engine.set_mode(Mode::Search);
    trace!(target: "engine.search", ?direction, "start");
}

pub(crate) fn handle(engine: &mut Engine, key: Key) {
    match key {
        Key::Enter => complete(engine),
        Key::Backspace => {
            if engine.search.input.pop().is_none() {
                engine.set_mode(Mode::Normal);
            }
        }
        _ => {
            if let Some(c) = key.printable() {
                engine.search.input.push(c);
            }
        }
    }
}

fn complete(engine: &mut Engine) {
    engine.set_mode(Mode::Normal);
    if !engine.search.input.is_empty() {
        engine.search.pattern = std::mem::take(&mut engine.search.input);
    }
    if engine.search.pattern.is_empty() {
        return;
    }
    let pattern = engine.search.pattern.clone();
    engine.search.results = scan(engine, &pattern);
    debug!(
        target: "engine.search",
        pattern = %pattern,
        matches = engine.search.results.len(),
        "complete"
    );
    if engine.search.results.is_empty() {
        engine.search.current = None;
        return;
    }
    let cursor = engine.cursor();
    let idx = match engine.search.direction {
        Direction::Forward => engine
            .search
            .results
            .iter()
            .position(|&m| m > cursor)
            .unwrap_or(0),
        Direction::Backward => engine
            .search
            .results
            .iter()
            .rposition(|&m| m < cursor)
            .unwrap_or(engine.search.results.len() - 1),
    };
    jump_to(engine, idx);
}

/// All matches in buffer order, as char-column cursors.
fn scan(engine: &Engine, pattern: &str) -> Vec<Cursor> {
    let pat_len = text::char_len(pattern);
    let mut results = Vec::new();
    for row in 1..=engine.buf().line_count() {
        let line = engine.buf().line(row);
        let line_len = text::char_len(line);
        if pat_len == 0 || pat_len > line_len {
            continue;
        }
        for col in 0..=line_len - pat_len {
            if text::slice(line, col, col + pat_len) == pattern {
                results.push(Cursor::new(row, col));
            }
        }
    }
    results
}

/// `n` (and `N` with `reverse`) — step through the match list in the search
/// direction, wrapping at either end. Quiet no-op without results.
pub(crate) fn advance(engine: &mut Engine, reverse: bool) {
    let len = engine.search.results.len();
    if len == 0 {
        return;
    }
    let step: isize = match (engine.search.direction, reverse) {
        (Direction::Forward, false) | (Direction::Backward, true) => 1,
        _ => -1,
    };
    let current = engine.search.current.unwrap_or(0) as isize;
    let idx = (current + step).rem_euclid(len as isize) as usize;
    jump_to(engine, idx);
}

fn jump_to(engine: &mut Engine, idx: usize) {
    engine.search.current = Some(idx);
    let target = engine.search.results[idx];
    let buf = engine.buf_mut();
    buf.cursor = target;
    buf.clamp_cursor(false);
    trace!(target: "engine.search", row = target.row, col = target.col, "jump");
}
