//! Line-oriented text storage.
//!
//! A `Buffer` is an owned vector of lines plus the bookkeeping the editing
//! engine needs: a modified flag, a monotonically increasing change tick, a
//! buffer-local cursor, and per-buffer undo/redo stacks. Line reads are
//! 1-indexed and total (out-of-range reads yield an empty string); line
//! writes go through a single clamped splice, `set_lines`, which is also the
//! undo capture point. A buffer always holds at least one line.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::ops::{Bound, RangeBounds};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, trace};

pub mod text;
mod undo;

pub use undo::{EditTag, UNDO_HISTORY_MAX};
use undo::{UndoLog, UndoOp, UndoRecord};

/// Opaque buffer handle issued by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(u32);

impl BufferId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Cursor position: 1-indexed row, 0-indexed char column. Ordering is
/// buffer order (row first, then column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Cursor {
    pub row: usize,
    pub col: usize,
}

impl Cursor {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl Default for Cursor {
    fn default() -> Self {
        Self { row: 1, col: 0 }
    }
}

/// Result of a `set_lines` splice. Bounds are validated up front; a request
/// reaching past the buffer is clamped, a reversed range is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpliceOutcome {
    Applied,
    Clamped,
    Rejected,
}

impl SpliceOutcome {
    pub fn applied(self) -> bool {
        !matches!(self, Self::Rejected)
    }
}

#[derive(Debug, Error)]
#[error("failed to read {}", path.display())]
pub struct LoadError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

pub struct Buffer {
    id: BufferId,
    path: Option<PathBuf>,
    lines: Vec<String>,
    modified: bool,
    change_tick: u64,
    /// Buffer-local cursor; becomes the active cursor when this buffer is
    /// current. Clamped lazily, so stale positions are tolerated.
    pub cursor: Cursor,
    undo: UndoLog,
}

impl Buffer {
    /// Empty buffer: one empty line, unmodified.
    pub fn new(id: BufferId) -> Self {
        Self {
            id,
            path: None,
            lines: vec![String::new()],
            modified: false,
            change_tick: 0,
            cursor: Cursor::default(),
            undo: UndoLog::new(),
        }
    }

    /// Buffer seeded with `lines`; an empty vector still yields one empty
    /// line.
    pub fn from_lines(id: BufferId, mut lines: Vec<String>) -> Self {
        if lines.is_empty() {
            lines.push(String::new());
        }
        let mut buffer = Self::new(id);
        buffer.lines = lines;
        buffer
    }

    /// Reads `path`, splitting on `\n` after normalizing `\r\n`. The caller
    /// owns the fallback when the read fails; see `Engine::open_buffer`.
    pub fn from_file(id: BufferId, path: &Path) -> Result<Self, LoadError> {
        let content = fs::read_to_string(path).map_err(|source| LoadError {
            path: path.to_path_buf(),
            source,
        })?;
        let normalized = content.replace("\r\n", "\n");
        let lines: Vec<String> = normalized.split('\n').map(str::to_string).collect();
        debug!(target: "buffer", %id, lines = lines.len(), "loaded");
        let mut buffer = Self::from_lines(id, lines);
        buffer.path = Some(path.to_path_buf());
        Ok(buffer)
    }

    pub fn id(&self) -> BufferId {
        self.id
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn set_path(&mut self, path: PathBuf) {
        self.path = Some(path);
    }

    /// 1-indexed line read; any out-of-range request yields `""`.
    pub fn line(&self, lnum: usize) -> &str {
        lnum.checked_sub(1)
            .and_then(|idx| self.lines.get(idx))
            .map_or("", String::as_str)
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Char length of a 1-indexed line (0 when out of range).
    pub fn line_char_len(&self, lnum: usize) -> usize {
        text::char_len(self.line(lnum))
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn change_tick(&self) -> u64 {
        self.change_tick
    }

    /// Replaces the 0-indexed half-open line `range` with `new_lines`.
    /// Out-of-range bounds clamp to the buffer length; a reversed range is
    /// rejected without touching the buffer. A splice that would empty the
    /// buffer substitutes a single empty line instead. Applied splices bump
    /// the change tick, set the modified flag, and capture an undo record
    /// unless capture is suspended or an insert group is open.
    pub fn set_lines<R: RangeBounds<usize>>(
        &mut self,
        range: R,
        mut new_lines: Vec<String>,
    ) -> SpliceOutcome {
        let len = self.lines.len();
        let raw_start = match range.start_bound() {
            Bound::Included(&s) => s,
            Bound::Excluded(&s) => s + 1,
            Bound::Unbounded => 0,
        };
        let raw_end = match range.end_bound() {
            Bound::Included(&e) => e + 1,
            Bound::Excluded(&e) => e,
            Bound::Unbounded => len,
        };
        let start = raw_start.min(len);
        let end = raw_end.min(len);
        if start > end {
            debug!(target: "buffer", id = %self.id, start, end, "splice_rejected");
            return SpliceOutcome::Rejected;
        }
        if start == 0 && end == len && new_lines.is_empty() {
            new_lines.push(String::new());
        }
        self.undo
            .observe_splice(&self.lines, start, end, new_lines.len(), self.cursor);
        let removed = end - start;
        let inserted = new_lines.len();
        self.lines.splice(start..end, new_lines);
        self.change_tick += 1;
        self.modified = true;
        trace!(
            target: "buffer",
            id = %self.id,
            start,
            removed,
            inserted,
            tick = self.change_tick,
            "splice"
        );
        if raw_start > len || raw_end > len {
            SpliceOutcome::Clamped
        } else {
            SpliceOutcome::Applied
        }
    }

    /// Clears the modified flag and pins the saved watermark to the current
    /// undo depth, so undoing back to this point reads as unmodified again.
    pub fn mark_saved(&mut self) {
        self.modified = false;
        self.undo.mark_saved();
        debug!(target: "buffer", id = %self.id, "saved");
    }

    /// First non-blank column of a 1-indexed line.
    pub fn first_non_blank(&self, lnum: usize) -> usize {
        text::first_non_blank(self.line(lnum))
    }

    /// Clamps the cursor into the buffer. `past_end` permits resting one
    /// past the last char (insert mode); otherwise the last char is the
    /// limit.
    pub fn clamp_cursor(&mut self, past_end: bool) {
        self.cursor.row = self.cursor.row.clamp(1, self.lines.len());
        let len = self.line_char_len(self.cursor.row);
        let max = if past_end { len } else { len.saturating_sub(1) };
        self.cursor.col = self.cursor.col.min(max);
    }

    // --- undo/redo -------------------------------------------------------

    /// Opens a coalescing undo group for an insert session. Mutations while
    /// the group is open fold into one record.
    pub fn begin_insert_group(&mut self, tag: EditTag) {
        self.undo.begin_group(tag, &self.lines, self.cursor);
    }

    /// Seals the open insert group, if any.
    pub fn end_insert_group(&mut self) {
        self.undo.end_group();
    }

    pub fn insert_group_open(&self) -> bool {
        self.undo.group_open()
    }

    /// True when the open insert group has absorbed at least one mutation.
    pub fn insert_group_dirty(&self) -> bool {
        self.undo.group_dirty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.depth()
    }

    pub fn redo_depth(&self) -> usize {
        self.undo.redo_depth()
    }

    /// Reverts the most recent record. Returns `false` when there is
    /// nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(rec) = self.undo.pop_undo() else {
            trace!(target: "buffer.undo", id = %self.id, "undo_empty");
            return false;
        };
        let inverse = self.apply_record(&rec);
        self.undo.push_redo(inverse);
        self.finish_restore(rec.cursor);
        true
    }

    /// Re-applies the most recently undone record. Returns `false` when the
    /// redo stack is empty.
    pub fn redo(&mut self) -> bool {
        let Some(rec) = self.undo.pop_redo() else {
            trace!(target: "buffer.undo", id = %self.id, "redo_empty");
            return false;
        };
        let inverse = self.apply_record(&rec);
        self.undo.push_undo_inverse(inverse);
        self.finish_restore(rec.cursor);
        true
    }

    /// Applies `rec` to the buffer with capture suspended and returns its
    /// inverse, built from the content being overwritten.
    fn apply_record(&mut self, rec: &UndoRecord) -> UndoRecord {
        let at = self.cursor;
        self.undo.suspend();
        let inverse_op = match &rec.op {
            UndoOp::Lines(changes) => {
                let mut current = std::collections::BTreeMap::new();
                for &lnum in changes.keys() {
                    current.insert(lnum, self.line(lnum).to_string());
                }
                for (&lnum, prior) in changes {
                    if lnum >= 1 && lnum <= self.lines.len() {
                        let _ = self.set_lines(lnum - 1..lnum, vec![prior.clone()]);
                    }
                }
                UndoOp::Lines(current)
            }
            UndoOp::Splice {
                start,
                old,
                replaced,
            } => {
                let s = (*start).min(self.lines.len());
                let e = (s + replaced).min(self.lines.len());
                let current = self.lines[s..e].to_vec();
                let _ = self.set_lines(s..e, old.clone());
                UndoOp::Splice {
                    start: s,
                    old: current,
                    replaced: old.len(),
                }
            }
        };
        self.undo.resume();
        UndoRecord {
            op: inverse_op,
            cursor: at,
            tag: rec.tag,
        }
    }

    fn finish_restore(&mut self, cursor: Cursor) {
        self.cursor = cursor;
        self.clamp_cursor(false);
        self.modified = !self.undo.at_saved_depth();
        trace!(
            target: "buffer.undo",
            id = %self.id,
            depth = self.undo.depth(),
            modified = self.modified,
            "restored"
        );
    }

    /// Drops all undo history. Used when content is replaced wholesale
    /// outside any editing command.
    pub fn clear_history(&mut self) {
        self.undo.clear();
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("id", &self.id)
            .field("lines", &self.lines.len())
            .field("modified", &self.modified)
            .field("tick", &self.change_tick)
            .field("cursor", &self.cursor)
            .finish()
    }
}

/// Engine-side buffer table: id allocation plus lookup.
#[derive(Default)]
pub struct BufferSet {
    buffers: HashMap<BufferId, Buffer>,
    next_id: u32,
}

impl BufferSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate_id(&mut self) -> BufferId {
        self.next_id += 1;
        BufferId::new(self.next_id)
    }

    pub fn insert(&mut self, buffer: Buffer) -> BufferId {
        let id = buffer.id();
        self.buffers.insert(id, buffer);
        id
    }

    pub fn contains(&self, id: BufferId) -> bool {
        self.buffers.contains_key(&id)
    }

    pub fn get(&self, id: BufferId) -> Option<&Buffer> {
        self.buffers.get(&id)
    }

    pub fn get_mut(&mut self, id: BufferId) -> Option<&mut Buffer> {
        self.buffers.get_mut(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn buffer(lines: &[&str]) -> Buffer {
        Buffer::from_lines(
            BufferId::new(1),
            lines.iter().map(|l| l.to_string()).collect(),
        )
    }

    #[test]
    fn line_reads_are_one_indexed_and_total() {
        let buf = buffer(&["alpha", "beta"]);
        assert_eq!(buf.line(1), "alpha");
        assert_eq!(buf.line(2), "beta");
        assert_eq!(buf.line(0), "");
        assert_eq!(buf.line(3), "");
    }

    #[test]
    fn set_lines_round_trips_and_bumps_tick() {
        let mut buf = buffer(&["one", "two", "three"]);
        let tick = buf.change_tick();
        let outcome = buf.set_lines(1..2, vec!["TWO".into(), "extra".into()]);
        assert_eq!(outcome, SpliceOutcome::Applied);
        assert_eq!(buf.lines(), &["one", "TWO", "extra", "three"]);
        assert!(buf.change_tick() > tick);
        assert!(buf.is_modified());
    }

    #[test]
    fn set_lines_clamps_and_rejects() {
        let mut buf = buffer(&["a", "b"]);
        assert_eq!(buf.set_lines(1..9, vec!["x".into()]), SpliceOutcome::Clamped);
        assert_eq!(buf.lines(), &["a", "x"]);
        assert_eq!(buf.set_lines(2..1, vec!["y".into()]), SpliceOutcome::Rejected);
        assert_eq!(buf.lines(), &["a", "x"]);
    }

    #[test]
    fn buffer_never_becomes_empty() {
        let mut buf = buffer(&["a", "b", "c"]);
        buf.set_lines(.., Vec::new());
        assert_eq!(buf.line_count(), 1);
        assert_eq!(buf.line(1), "");
    }

    #[test]
    fn unbounded_end_means_through_last_line() {
        let mut buf = buffer(&["a", "b", "c", "d"]);
        buf.set_lines(2.., vec!["tail".into()]);
        assert_eq!(buf.lines(), &["a", "b", "tail"]);
    }

    #[test]
    fn from_file_splits_crlf_and_lf() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"one\r\ntwo\nthree").unwrap();
        let buf = Buffer::from_file(BufferId::new(1), tmp.path()).unwrap();
        assert_eq!(buf.lines(), &["one", "two", "three"]);
        assert!(!buf.is_modified());
    }

    #[test]
    fn from_file_missing_surfaces_error() {
        let err = Buffer::from_file(
            BufferId::new(1),
            Path::new("__definitely_missing__.txt"),
        )
        .unwrap_err();
        assert!(err.path.ends_with("__definitely_missing__.txt"));
    }

    #[test]
    fn undo_restores_in_place_edit_and_cursor() {
        let mut buf = buffer(&["hello world"]);
        buf.cursor = Cursor::new(1, 6);
        buf.set_lines(0..1, vec!["hello there".into()]);
        assert!(buf.undo());
        assert_eq!(buf.line(1), "hello world");
        assert_eq!(buf.cursor, Cursor::new(1, 6));
        assert!(buf.redo());
        assert_eq!(buf.line(1), "hello there");
    }

    #[test]
    fn undo_redo_round_trip_over_line_operations() {
        let mut buf = buffer(&["one", "two", "three", "four"]);
        buf.set_lines(1..2, Vec::new()); // delete "two"
        buf.set_lines(0..1, vec!["ONE".into()]);
        buf.set_lines(2..2, vec!["inserted".into()]);
        let after = buf.lines().to_vec();
        while buf.undo() {}
        assert_eq!(buf.lines(), &["one", "two", "three", "four"]);
        while buf.redo() {}
        assert_eq!(buf.lines(), after);
    }

    #[test]
    fn new_edit_clears_redo() {
        let mut buf = buffer(&["a"]);
        buf.set_lines(0..1, vec!["b".into()]);
        buf.undo();
        assert_eq!(buf.redo_depth(), 1);
        buf.set_lines(0..1, vec!["c".into()]);
        assert_eq!(buf.redo_depth(), 0);
        assert!(!buf.redo());
    }

    #[test]
    fn insert_group_coalesces_session_into_one_record() {
        let mut buf = buffer(&["abc"]);
        buf.cursor = Cursor::new(1, 1);
        buf.begin_insert_group(EditTag::InsertRun);
        buf.set_lines(0..1, vec!["aXbc".into()]);
        buf.set_lines(0..1, vec!["aXYbc".into()]);
        // newline typed mid-session
        buf.set_lines(0..1, vec!["aXY".into(), "bc".into()]);
        buf.end_insert_group();
        assert_eq!(buf.undo_depth(), 1);
        assert!(buf.undo());
        assert_eq!(buf.lines(), &["abc"]);
        assert!(buf.redo());
        assert_eq!(buf.lines(), &["aXY", "bc"]);
    }

    #[test]
    fn empty_insert_group_records_nothing() {
        let mut buf = buffer(&["abc"]);
        buf.begin_insert_group(EditTag::InsertRun);
        buf.end_insert_group();
        assert_eq!(buf.undo_depth(), 0);
    }

    #[test]
    fn open_line_group_undoes_to_line_removal() {
        let mut buf = buffer(&["first", "second"]);
        buf.cursor = Cursor::new(1, 2);
        buf.begin_insert_group(EditTag::OpenBelow);
        buf.set_lines(1..1, vec![String::new()]);
        buf.set_lines(1..2, vec!["typed".into()]);
        buf.end_insert_group();
        assert_eq!(buf.lines(), &["first", "typed", "second"]);
        assert!(buf.undo());
        assert_eq!(buf.lines(), &["first", "second"]);
        assert!(buf.redo());
        assert_eq!(buf.lines(), &["first", "typed", "second"]);
    }

    #[test]
    fn splices_log_the_buffer_id_under_the_buffer_target() {
        use std::sync::{Arc, Mutex, MutexGuard};
        use tracing::Level;
        use tracing::subscriber::with_default;
        use tracing_subscriber::fmt::MakeWriter;

        #[derive(Clone)]
        struct BufferWriter {
            inner: Arc<Mutex<Vec<u8>>>,
        }

        struct LockedWriter<'a> {
            guard: MutexGuard<'a, Vec<u8>>,
        }

        impl Write for LockedWriter<'_> {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.guard.extend_from_slice(buf);
                Ok(buf.len())
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        impl<'a> MakeWriter<'a> for BufferWriter {
            type Writer = LockedWriter<'a>;

            fn make_writer(&'a self) -> Self::Writer {
                LockedWriter {
                    guard: self.inner.lock().expect("log buffer poisoned"),
                }
            }
        }

        let sink = Arc::new(Mutex::new(Vec::new()));
        let writer = BufferWriter {
            inner: sink.clone(),
        };
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::TRACE)
            .with_target(true)
            .with_ansi(false)
            .without_time()
            .with_writer(writer)
            .finish();

        with_default(subscriber, || {
            let mut buf = buffer(&["a"]);
            buf.set_lines(0..1, vec!["b".into()]);
        });

        let log_output = String::from_utf8(sink.lock().unwrap().clone()).unwrap();
        assert!(log_output.contains("buffer: "));
        assert!(log_output.contains("id=#1"));
        assert!(log_output.contains("splice"));
    }

    #[test]
    fn modified_tracks_saved_watermark_through_undo() {
        let mut buf = buffer(&["a"]);
        buf.set_lines(0..1, vec!["b".into()]);
        buf.mark_saved();
        assert!(!buf.is_modified());
        buf.set_lines(0..1, vec!["c".into()]);
        assert!(buf.is_modified());
        buf.undo();
        assert!(!buf.is_modified());
        buf.redo();
        assert!(buf.is_modified());
    }
}
