//! Undo/redo log.
//!
//! Every buffer mutation funnels through `Buffer::set_lines`, which reports
//! the splice here before applying it. In-place edits (line count unchanged)
//! capture a sparse map of the prior line contents; anything that inserts or
//! removes lines captures the full prior range as a splice record. An open
//! insert group coalesces a whole insert-mode session into a single splice
//! record by widening its span as the session touches more lines, so one
//! undo reverts the entire session. The `o`/`O` commands open their group
//! before the new line exists, which makes their record a splice with an
//! empty prior range: undoing it removes exactly the inserted line.
//!
//! Undo and redo are symmetric. Applying a record first builds its inverse
//! from the current buffer content and pushes that onto the opposite stack,
//! so undo-all followed by redo-all reproduces identical content.

use std::collections::BTreeMap;

use tracing::trace;

use crate::Cursor;

/// Maximum retained undo records per buffer; oldest are dropped beyond this.
pub const UNDO_HISTORY_MAX: usize = 200;

/// Sentinel saved-depth once the watermark has been trimmed out of history.
const SAVED_UNREACHABLE: usize = usize::MAX;

/// What kind of command produced a record. Informational: restoration logic
/// is uniform over the op shape, but the tag keeps trace output and tests
/// honest about grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditTag {
    /// A single normal-mode mutation.
    Edit,
    /// A coalesced `i`/`a`/`A` session.
    InsertRun,
    /// A coalesced `c`/`s` session.
    ChangeRun,
    /// `o`: line opened below the cursor, then typed into.
    OpenBelow,
    /// `O`: line opened above the cursor, then typed into.
    OpenAbove,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum UndoOp {
    /// Prior content of individual lines, keyed by 1-indexed line number.
    /// Only valid when the mutation left the line count unchanged.
    Lines(BTreeMap<usize, String>),
    /// Prior content `old` of the 0-indexed range that now holds `replaced`
    /// lines. Restoring swaps the current range back for `old`.
    Splice {
        start: usize,
        old: Vec<String>,
        replaced: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct UndoRecord {
    pub(crate) op: UndoOp,
    pub(crate) cursor: Cursor,
    pub(crate) tag: EditTag,
}

impl UndoRecord {
    pub(crate) fn line_operation(&self) -> bool {
        match &self.op {
            UndoOp::Lines(_) => false,
            UndoOp::Splice { old, replaced, .. } => old.len() != *replaced,
        }
    }
}

struct InsertGroup {
    rec: UndoRecord,
    dirty: bool,
}

pub(crate) struct UndoLog {
    undo_stack: Vec<UndoRecord>,
    redo_stack: Vec<UndoRecord>,
    group: Option<InsertGroup>,
    suspended: bool,
    saved_depth: usize,
}

impl UndoLog {
    pub(crate) fn new() -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            group: None,
            suspended: false,
            saved_depth: 0,
        }
    }

    pub(crate) fn depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub(crate) fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    pub(crate) fn at_saved_depth(&self) -> bool {
        self.undo_stack.len() == self.saved_depth
    }

    pub(crate) fn mark_saved(&mut self) {
        self.saved_depth = self.undo_stack.len();
    }

    pub(crate) fn suspend(&mut self) {
        self.suspended = true;
    }

    pub(crate) fn resume(&mut self) {
        self.suspended = false;
    }

    pub(crate) fn group_open(&self) -> bool {
        self.group.is_some()
    }

    pub(crate) fn group_dirty(&self) -> bool {
        self.group.as_ref().is_some_and(|g| g.dirty)
    }

    /// Called by `Buffer::set_lines` before the splice is applied. `lines`
    /// is the pre-mutation content, `[start, end)` the resolved 0-indexed
    /// range, `new_len` the replacement length.
    pub(crate) fn observe_splice(
        &mut self,
        lines: &[String],
        start: usize,
        end: usize,
        new_len: usize,
        cursor: Cursor,
    ) {
        if self.suspended {
            return;
        }
        if self.group.is_some() {
            self.widen_group(lines, start, end, new_len);
            return;
        }
        if start == end && new_len == 0 {
            return; // no-op splice
        }
        let op = if end - start == new_len {
            let mut changes = BTreeMap::new();
            for (offset, line) in lines[start..end].iter().enumerate() {
                changes.insert(start + offset + 1, line.clone());
            }
            UndoOp::Lines(changes)
        } else {
            UndoOp::Splice {
                start,
                old: lines[start..end].to_vec(),
                replaced: new_len,
            }
        };
        self.push_captured(UndoRecord {
            op,
            cursor,
            tag: EditTag::Edit,
        });
    }

    /// Opens a coalescing record for an insert session. For `o`/`O` the
    /// covered span is empty and sits at the insertion point; for everything
    /// else it is the line under the cursor.
    pub(crate) fn begin_group(&mut self, tag: EditTag, lines: &[String], cursor: Cursor) {
        let (start, old) = match tag {
            EditTag::OpenBelow => (cursor.row.min(lines.len()), Vec::new()),
            EditTag::OpenAbove => (cursor.row.saturating_sub(1), Vec::new()),
            _ => {
                let start = cursor.row.saturating_sub(1).min(lines.len() - 1);
                (start, vec![lines[start].clone()])
            }
        };
        let replaced = old.len();
        trace!(target: "buffer.undo", ?tag, start, "insert_group_open");
        self.group = Some(InsertGroup {
            rec: UndoRecord {
                op: UndoOp::Splice {
                    start,
                    old,
                    replaced,
                },
                cursor,
                tag,
            },
            dirty: false,
        });
    }

    /// Seals the open group, pushing its record if the session mutated
    /// anything. Quiet no-op when no group is open.
    pub(crate) fn end_group(&mut self) {
        if let Some(group) = self.group.take() {
            trace!(
                target: "buffer.undo",
                dirty = group.dirty,
                line_op = group.rec.line_operation(),
                "insert_group_close"
            );
            if group.dirty {
                self.push_captured(group.rec);
            }
        }
    }

    /// Grows the open group record so its splice covers this mutation too.
    /// Lines outside the previous span have not been touched by the session
    /// yet, so their current content is still the session-start content.
    fn widen_group(&mut self, lines: &[String], start: usize, end: usize, new_len: usize) {
        let Some(group) = self.group.as_mut() else {
            return;
        };
        let UndoOp::Splice {
            start: ref mut g_start,
            ref mut old,
            ref mut replaced,
        } = group.rec.op
        else {
            return;
        };
        if start < *g_start {
            old.splice(0..0, lines[start..*g_start].iter().cloned());
            *replaced += *g_start - start;
            *g_start = start;
        }
        let covered_end = *g_start + *replaced;
        if end > covered_end {
            old.extend(lines[covered_end..end].iter().cloned());
            *replaced += end - covered_end;
        }
        *replaced = *replaced + new_len - (end - start);
        group.dirty = true;
        trace!(
            target: "buffer.undo",
            start = *g_start,
            replaced = *replaced,
            "insert_group_widen"
        );
    }

    fn push_captured(&mut self, rec: UndoRecord) {
        trace!(
            target: "buffer.undo",
            tag = ?rec.tag,
            line_op = rec.line_operation(),
            depth = self.undo_stack.len() + 1,
            "record_push"
        );
        self.redo_stack.clear();
        self.undo_stack.push(rec);
        self.trim();
    }

    /// Push the inverse built while redoing; does not clear the redo stack.
    pub(crate) fn push_undo_inverse(&mut self, rec: UndoRecord) {
        self.undo_stack.push(rec);
        self.trim();
    }

    pub(crate) fn push_redo(&mut self, rec: UndoRecord) {
        self.redo_stack.push(rec);
    }

    pub(crate) fn pop_undo(&mut self) -> Option<UndoRecord> {
        self.undo_stack.pop()
    }

    pub(crate) fn pop_redo(&mut self) -> Option<UndoRecord> {
        self.redo_stack.pop()
    }

    fn trim(&mut self) {
        while self.undo_stack.len() > UNDO_HISTORY_MAX {
            self.undo_stack.remove(0);
            self.saved_depth = match self.saved_depth {
                0 => SAVED_UNREACHABLE,
                SAVED_UNREACHABLE => SAVED_UNREACHABLE,
                n => n - 1,
            };
            trace!(target: "buffer.undo", "history_trim");
        }
    }

    /// Drops all history. Used when a buffer is reloaded wholesale.
    pub(crate) fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.group = None;
        self.saved_depth = 0;
    }
}
