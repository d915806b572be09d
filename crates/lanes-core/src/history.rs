//! Bounded command log backing time-boxed undo.
//!
//! Each optimistic change records a reversible [`Command`] rather than a
//! snapshot of the whole collection. Undo pops the newest entry (LIFO) and
//! reverts exactly the field it touched:
//!
//! | Command | Revert |
//! |---|---|
//! | `status_change` | restore the recorded previous status |
//!
//! The log is bounded; pushing past the limit evicts the oldest entry and
//! hands it back so the caller can cancel its expiry timer.

use crate::model::{Issue, Status};
use crate::schedule::TimerId;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;

/// Stable identity of a history entry, used by expiry timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(u64);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "h{}", self.0)
    }
}

/// A reversible change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    StatusChange {
        issue_id: String,
        previous: Status,
        applied: Status,
    },
}

impl Command {
    /// Action kind label, as shown in logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::StatusChange { .. } => "status_change",
        }
    }

    #[must_use]
    pub fn issue_id(&self) -> &str {
        match self {
            Self::StatusChange { issue_id, .. } => issue_id,
        }
    }

    /// Undo this command against `issues`.
    ///
    /// Returns the reverted issue, or `None` if it no longer exists.
    pub fn revert<'a>(&self, issues: &'a mut BTreeMap<String, Issue>) -> Option<&'a Issue> {
        match self {
            Self::StatusChange {
                issue_id, previous, ..
            } => {
                let issue = issues.get_mut(issue_id)?;
                issue.status = *previous;
                Some(issue)
            }
        }
    }
}

/// One undoable action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub id: EntryId,
    pub recorded_at: DateTime<Utc>,
    pub command: Command,
    /// Pending auto-removal, cancelled when the entry is undone or evicted.
    pub expiry: Option<TimerId>,
}

/// LIFO stack of history entries with a fixed capacity.
#[derive(Debug, Clone)]
pub struct UndoLog {
    entries: Vec<HistoryEntry>,
    limit: usize,
    next_id: u64,
}

impl UndoLog {
    /// Create a log holding at most `limit` entries (minimum 1).
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            entries: Vec::new(),
            limit: limit.max(1),
            next_id: 0,
        }
    }

    /// Record a new entry on top of the stack.
    ///
    /// Returns its id plus any entry evicted to stay within the limit.
    pub fn push(
        &mut self,
        recorded_at: DateTime<Utc>,
        command: Command,
    ) -> (EntryId, Option<HistoryEntry>) {
        let id = EntryId(self.next_id);
        self.next_id += 1;

        let evicted = if self.entries.len() >= self.limit {
            Some(self.entries.remove(0))
        } else {
            None
        };

        self.entries.push(HistoryEntry {
            id,
            recorded_at,
            command,
            expiry: None,
        });
        (id, evicted)
    }

    /// Attach the expiry timer scheduled for `id`.
    pub fn set_expiry(&mut self, id: EntryId, timer: TimerId) {
        if let Some(entry) = self.entries.iter_mut().find(|entry| entry.id == id) {
            entry.expiry = Some(timer);
        }
    }

    /// Pop the newest entry.
    pub fn pop(&mut self) -> Option<HistoryEntry> {
        self.entries.pop()
    }

    /// Remove a specific entry (used on expiry). `None` if already gone.
    pub fn remove(&mut self, id: EntryId) -> Option<HistoryEntry> {
        let index = self.entries.iter().position(|entry| entry.id == id)?;
        Some(self.entries.remove(index))
    }

    /// Remove every entry touching `issue_id`, oldest first.
    pub fn remove_for_issue(&mut self, issue_id: &str) -> Vec<HistoryEntry> {
        let (removed, kept) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|entry| entry.command.issue_id() == issue_id);
        self.entries = kept;
        removed
    }

    /// Newest entry without removing it.
    #[must_use]
    pub fn peek(&self) -> Option<&HistoryEntry> {
        self.entries.last()
    }

    /// Drop every entry, returning them oldest first.
    pub fn drain(&mut self) -> Vec<HistoryEntry> {
        std::mem::take(&mut self.entries)
    }

    /// Entries oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub const fn limit(&self) -> usize {
        self.limit
    }
}
