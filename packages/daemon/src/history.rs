//! # History Buffer
//!
//! Bounded undo/redo over canonical snapshots.
//!
//! ## Design
//!
//! - Each successful flush pushes the new canonical HTML plus caret state
//! - The cursor points at the entry the document currently matches
//! - Undo/redo move the cursor and hand back the entry to restore
//! - Pushing after an undo discards the redo tail
//! - The oldest entry is evicted once `max_entries` is exceeded
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut history = HistoryBuffer::with_max_entries(50);
//! history.push(HistoryEntry::new("<p>a</p>", None));
//! history.push(HistoryEntry::new("<p>ab</p>", None));
//!
//! let previous = history.undo().unwrap();
//! assert_eq!(previous.html, "<p>a</p>");
//! ```

use crate::selection::SelectionStatus;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Canonical HTML after the flush
    pub html: String,

    /// Selection right after the flush, if there was one
    #[serde(default)]
    pub caret: Option<SelectionStatus>,
}

impl HistoryEntry {
    pub fn new(html: impl Into<String>, caret: Option<SelectionStatus>) -> Self {
        Self {
            html: html.into(),
            caret,
        }
    }
}

#[derive(Debug)]
pub struct HistoryBuffer {
    entries: VecDeque<HistoryEntry>,

    /// Index of the entry the document currently matches
    cursor: usize,

    /// Maximum number of entries kept (0 = unlimited)
    max_entries: usize,
}

impl HistoryBuffer {
    /// Create a buffer holding 100 entries
    pub fn new() -> Self {
        Self::with_max_entries(100)
    }

    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            cursor: 0,
            max_entries,
        }
    }

    /// Records a new state. Returns `false` when it matches the current one.
    pub fn push(&mut self, entry: HistoryEntry) -> bool {
        if let Some(current) = self.current() {
            if current.html == entry.html {
                return false;
            }
            // A new state invalidates the redo tail
            self.entries.truncate(self.cursor + 1);
        }

        self.entries.push_back(entry);
        if self.max_entries > 0 && self.entries.len() > self.max_entries {
            self.entries.pop_front();
        }
        self.cursor = self.entries.len() - 1;
        true
    }

    /// Steps back and returns the entry to restore
    pub fn undo(&mut self) -> Option<&HistoryEntry> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        self.entries.get(self.cursor)
    }

    /// Steps forward again after an undo
    pub fn redo(&mut self) -> Option<&HistoryEntry> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        self.entries.get(self.cursor)
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    pub fn current(&self) -> Option<&HistoryEntry> {
        self.entries.get(self.cursor)
    }

    pub fn undo_levels(&self) -> usize {
        self.cursor
    }

    pub fn redo_levels(&self) -> usize {
        self.entries.len().saturating_sub(self.cursor + 1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
    }
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new()
    }
}
