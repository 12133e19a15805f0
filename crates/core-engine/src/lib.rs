//! Headless modal editing engine.
//!
//! `Engine` is the central state machine: it routes keystrokes by mode,
//! accumulates counts and pending operator state, composes operator+motion
//! pairs, tracks visual selections, and owns the single unnamed yank
//! register. It renders nothing — a host application feeds it keys through
//! [`ModalEngine::input`] and reads buffer contents back out.
//!
//! A current buffer always exists: construction seeds an empty scratch
//! buffer, so "no current buffer" is unrepresentable.

pub mod config;
mod insert;
mod key;
mod motion;
mod normal;
mod repeat;
mod search;
mod visual;

pub use config::EngineConfig;
pub use core_buffer::{Buffer, BufferId, Cursor, EditTag, LoadError, SpliceOutcome};
pub use key::Key;
pub use motion::Motion;
pub use repeat::OpMotion;
pub use search::Direction;

use std::path::Path;

use core_buffer::BufferSet;
use thiserror::Error;
use tracing::{debug, trace};

use repeat::{InsertKind, InsertOrigin, LastEdit};
use search::SearchState;
use visual::VisualState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Insert,
    Visual,
    Command,
    Search,
}

impl Mode {
    /// Single-letter mode code, as reported by `evaluate("mode()")`.
    pub fn code(self) -> &'static str {
        match self {
            Mode::Normal => "n",
            Mode::Insert => "i",
            Mode::Visual => "v",
            Mode::Command => "c",
            Mode::Search => "s",
        }
    }
}

/// Pending operator awaiting its motion (or doubled letter).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Delete,
    Yank,
    Change,
    Indent,
    Dedent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterKind {
    Charwise,
    Linewise,
}

/// The single unnamed yank register.
#[derive(Debug, Clone)]
pub struct Register {
    pub text: String,
    pub kind: RegisterKind,
}

impl Default for Register {
    fn default() -> Self {
        Self {
            text: String::new(),
            kind: RegisterKind::Charwise,
        }
    }
}

/// Block is part of the public type but no key binds it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualKind {
    Char,
    Line,
    Block,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown buffer {0}")]
    UnknownBuffer(BufferId),
}

/// A failed `open_buffer`. The buffer was still created (one empty line)
/// and carries the returned id, so the host can keep or discard it.
#[derive(Debug, Error)]
#[error("failed to open buffer {buffer}")]
pub struct OpenError {
    pub buffer: BufferId,
    #[source]
    pub source: LoadError,
}

pub struct Engine {
    buffers: BufferSet,
    current: BufferId,
    mode: Mode,
    config: EngineConfig,
    pub(crate) count: usize,
    pub(crate) counting: bool,
    pub(crate) pending_op: Option<Operator>,
    pub(crate) pending_g: bool,
    pub(crate) pending_replace: bool,
    pub(crate) register: Register,
    pub(crate) search: SearchState,
    pub(crate) visual: Option<VisualState>,
    pub(crate) last_edit: Option<LastEdit>,
    pub(crate) insert_origin: Option<InsertOrigin>,
}

impl Engine {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let mut buffers = BufferSet::new();
        let scratch = buffers.allocate_id();
        buffers.insert(Buffer::new(scratch));
        Self {
            buffers,
            current: scratch,
            mode: Mode::Normal,
            config,
            count: 0,
            counting: false,
            pending_op: None,
            pending_g: false,
            pending_replace: false,
            register: Register::default(),
            search: SearchState::default(),
            visual: None,
            last_edit: None,
            insert_origin: None,
        }
    }

    // Buffers are created but never removed, so the current id always
    // resolves.
    pub(crate) fn buf(&self) -> &Buffer {
        self.buffers
            .get(self.current)
            .expect("current buffer present")
    }

    pub(crate) fn buf_mut(&mut self) -> &mut Buffer {
        self.buffers
            .get_mut(self.current)
            .expect("current buffer present")
    }

    pub(crate) fn line(&self, lnum: usize) -> String {
        self.buf().line(lnum).to_string()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub(crate) fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn register(&self) -> &Register {
        &self.register
    }

    /// Folds a digit key into the pending count, capped so absurd counts
    /// can neither overflow nor drive range arithmetic past `usize`.
    pub(crate) fn push_count_digit(&mut self, c: char) {
        const COUNT_MAX: usize = 999_999_999;
        self.count = self
            .count
            .saturating_mul(10)
            .saturating_add(c as usize - '0' as usize)
            .min(COUNT_MAX);
        self.counting = true;
    }

    /// Consumes the pending count; 1 when none was built.
    pub(crate) fn take_count(&mut self) -> usize {
        let count = if self.count == 0 { 1 } else { self.count };
        self.count = 0;
        self.counting = false;
        count
    }

    // --- buffer lifecycle -----------------------------------------------

    pub fn current_buffer(&self) -> BufferId {
        self.current
    }

    pub fn buffer(&self, id: BufferId) -> Option<&Buffer> {
        self.buffers.get(id)
    }

    pub fn buffer_mut(&mut self, id: BufferId) -> Option<&mut Buffer> {
        self.buffers.get_mut(id)
    }

    /// Creates an empty buffer without making it current.
    pub fn new_buffer(&mut self) -> BufferId {
        let id = self.buffers.allocate_id();
        self.buffers.insert(Buffer::new(id));
        debug!(target: "engine.input", buffer = %id, "new_buffer");
        id
    }

    /// Opens `path` into a fresh buffer, makes it current, and places the
    /// cursor at `lnum` (clamped, column 0). On a read failure the buffer
    /// still exists and is current, but holds a single empty line; the
    /// error carries its id.
    pub fn open_buffer(&mut self, path: &Path, lnum: usize) -> Result<BufferId, OpenError> {
        let id = self.buffers.allocate_id();
        match Buffer::from_file(id, path) {
            Ok(mut buffer) => {
                let row = lnum.max(1).min(buffer.line_count());
                buffer.cursor = Cursor::new(row, 0);
                self.buffers.insert(buffer);
                self.switch_to(id);
                Ok(id)
            }
            Err(source) => {
                self.buffers.insert(Buffer::new(id));
                self.switch_to(id);
                Err(OpenError { buffer: id, source })
            }
        }
    }

    /// Unknown ids are an error; on success all transient state resets and
    /// the target's own cursor becomes the active one.
    pub fn set_current_buffer(&mut self, id: BufferId) -> Result<(), EngineError> {
        if !self.buffers.contains(id) {
            return Err(EngineError::UnknownBuffer(id));
        }
        self.switch_to(id);
        Ok(())
    }

    fn switch_to(&mut self, id: BufferId) {
        // Seal any insert session still open on the outgoing buffer, so
        // edits after the switch start their own undo records.
        self.buf_mut().end_insert_group();
        self.current = id;
        self.reset_transient();
        self.buf_mut().clamp_cursor(false);
        debug!(target: "engine.input", buffer = %id, "switch");
    }

    /// Everything except the last-edit record, which survives switches.
    fn reset_transient(&mut self) {
        self.mode = Mode::Normal;
        self.count = 0;
        self.counting = false;
        self.pending_op = None;
        self.pending_g = false;
        self.pending_replace = false;
        self.visual = None;
        self.search.reset();
        self.insert_origin = None;
    }

    // --- cursor ---------------------------------------------------------

    pub fn cursor(&self) -> Cursor {
        self.buf().cursor
    }

    pub fn set_cursor(&mut self, row: usize, col: usize) {
        let buf = self.buf_mut();
        buf.cursor = Cursor::new(row.max(1), col);
        buf.clamp_cursor(false);
    }

    // --- input ----------------------------------------------------------

    /// Feeds one key, given as a single printable char or a named key such
    /// as `<esc>` or `<cr>`. Unknown keys are logged and ignored.
    pub fn input(&mut self, key: &str) {
        match Key::parse(key) {
            Some(parsed) => self.press(parsed),
            None => trace!(target: "engine.input", key, "unknown_key"),
        }
    }

    fn press(&mut self, key: Key) {
        trace!(target: "engine.input", ?key, mode = self.mode.code(), "key");
        match key {
            Key::Esc => self.escape(),
            Key::Left | Key::Right | Key::Up | Key::Down => {
                self.pending_replace = false;
                self.pending_g = false;
                let m = match key {
                    Key::Left => Motion::Left,
                    Key::Right => Motion::Right,
                    Key::Up => Motion::Up,
                    _ => Motion::Down,
                };
                motion::apply(self, m, 1);
                if self.mode == Mode::Visual {
                    visual::sync_head(self);
                }
            }
            _ => match self.mode {
                Mode::Normal => normal::handle(self, key),
                Mode::Insert => insert::handle(self, key),
                Mode::Visual => visual::handle(self, key),
                Mode::Search => search::handle(self, key),
                // The host owns the ex line; keys in command mode are not
                // the engine's business.
                Mode::Command => {}
            },
        }
    }

    /// Global escape: clears every piece of pending input, then leaves the
    /// current mode the mode-appropriate way.
    fn escape(&mut self) {
        self.count = 0;
        self.counting = false;
        self.pending_op = None;
        self.pending_g = false;
        self.pending_replace = false;
        self.search.input.clear();
        match self.mode {
            Mode::Insert => insert::leave(self),
            Mode::Visual => visual::leave(self),
            _ => {
                self.mode = Mode::Normal;
                self.buf_mut().clamp_cursor(false);
            }
        }
    }

    // --- command surface --------------------------------------------------

    /// Minimal ex surface: `w`/`write` marks the buffer saved; the mode
    /// words force a mode. Anything else is logged and ignored.
    pub fn execute(&mut self, command: &str) {
        match command {
            "w" | "write" => self.buf_mut().mark_saved(),
            "normal" => self.escape(),
            "insert" => normal::enter_insert(self, InsertKind::Untracked),
            "visual" => visual::enter(self, VisualKind::Char),
            other => debug!(target: "engine.input", command = other, "unknown_command"),
        }
    }

    pub fn evaluate(&self, expr: &str) -> String {
        match expr {
            "mode()" => self.mode.code().to_string(),
            _ => String::new(),
        }
    }

    /// Match for the bracket under the cursor, current line only.
    pub fn matching_pair(&self) -> Option<(usize, usize)> {
        let cursor = self.cursor();
        motion::bracket_match(self.buf().line(cursor.row), cursor.col)
            .map(|col| (cursor.row, col))
    }

    /// Positions of the current pattern's matches, in buffer order.
    pub fn search_matches(&self) -> &[Cursor] {
        &self.search.results
    }

    /// Raw (un-normalized) selection anchor and head.
    pub fn visual_range(&self) -> Option<(Cursor, Cursor)> {
        self.visual.as_ref().map(|v| (v.anchor, v.head))
    }

    pub fn visual_kind(&self) -> Option<VisualKind> {
        self.visual.as_ref().map(|v| v.kind)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

/// The embedding contract: everything a host needs to drive an engine,
/// object-safe so an alternate implementation is substitutable.
pub trait ModalEngine {
    fn open_buffer(&mut self, path: &Path, lnum: usize) -> Result<BufferId, OpenError>;
    fn new_buffer(&mut self) -> BufferId;
    fn current_buffer(&self) -> BufferId;
    fn set_current_buffer(&mut self, id: BufferId) -> Result<(), EngineError>;
    fn line(&self, id: BufferId, lnum: usize) -> Result<String, EngineError>;
    fn line_count(&self, id: BufferId) -> Result<usize, EngineError>;
    /// Replaces `[start, end)` (0-indexed; `None` end means "through the
    /// last line") with `lines`.
    fn set_lines(
        &mut self,
        id: BufferId,
        start: usize,
        end: Option<usize>,
        lines: Vec<String>,
    ) -> Result<SpliceOutcome, EngineError>;
    fn cursor(&self) -> Cursor;
    fn set_cursor(&mut self, row: usize, col: usize);
    fn input(&mut self, key: &str);
    fn execute(&mut self, command: &str);
    fn mode(&self) -> Mode;
    fn visual_range(&self) -> Option<(Cursor, Cursor)>;
    fn visual_kind(&self) -> Option<VisualKind>;
    fn evaluate(&self, expr: &str) -> String;
    fn matching_pair(&self) -> Option<(usize, usize)>;
}

impl ModalEngine for Engine {
    fn open_buffer(&mut self, path: &Path, lnum: usize) -> Result<BufferId, OpenError> {
        Engine::open_buffer(self, path, lnum)
    }

    fn new_buffer(&mut self) -> BufferId {
        Engine::new_buffer(self)
    }

    fn current_buffer(&self) -> BufferId {
        Engine::current_buffer(self)
    }

    fn set_current_buffer(&mut self, id: BufferId) -> Result<(), EngineError> {
        Engine::set_current_buffer(self, id)
    }

    fn line(&self, id: BufferId, lnum: usize) -> Result<String, EngineError> {
        let buffer = self.buffers.get(id).ok_or(EngineError::UnknownBuffer(id))?;
        Ok(buffer.line(lnum).to_string())
    }

    fn line_count(&self, id: BufferId) -> Result<usize, EngineError> {
        let buffer = self.buffers.get(id).ok_or(EngineError::UnknownBuffer(id))?;
        Ok(buffer.line_count())
    }

    fn set_lines(
        &mut self,
        id: BufferId,
        start: usize,
        end: Option<usize>,
        lines: Vec<String>,
    ) -> Result<SpliceOutcome, EngineError> {
        let buffer = self
            .buffers
            .get_mut(id)
            .ok_or(EngineError::UnknownBuffer(id))?;
        let outcome = match end {
            Some(end) => buffer.set_lines(start..end, lines),
            None => buffer.set_lines(start.., lines),
        };
        Ok(outcome)
    }

    fn cursor(&self) -> Cursor {
        Engine::cursor(self)
    }

    fn set_cursor(&mut self, row: usize, col: usize) {
        Engine::set_cursor(self, row, col);
    }

    fn input(&mut self, key: &str) {
        Engine::input(self, key);
    }

    fn execute(&mut self, command: &str) {
        Engine::execute(self, command);
    }

    fn mode(&self) -> Mode {
        Engine::mode(self)
    }

    fn visual_range(&self) -> Option<(Cursor, Cursor)> {
        Engine::visual_range(self)
    }

    fn visual_kind(&self) -> Option<VisualKind> {
        Engine::visual_kind(self)
    }

    fn evaluate(&self, expr: &str) -> String {
        Engine::evaluate(self, expr)
    }

    fn matching_pair(&self) -> Option<(usize, usize)> {
        Engine::matching_pair(self)
    }
}
