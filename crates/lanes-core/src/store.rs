//! The issue workflow store.
//!
//! [`IssueStore`] owns the canonical issue collection. Every mutation goes
//! through it and takes `&mut self`, so between calls the collection, the
//! undo log and the timer queue are always mutually consistent.
//!
//! Status moves are optimistic: they apply locally, push a reversible
//! [`Command`] onto the [`UndoLog`], and arm an expiry timer. Edits are not:
//! the record changes only after the gateway confirms.
//!
//! Remote calls have a split form (`begin_*` / `complete_*`) so a driver can
//! interleave other intents while a request is in flight. The one-shot
//! wrappers [`IssueStore::fetch_all`] and [`IssueStore::request_edit`] call
//! the gateway synchronously in between.
//!
//! Timers never fire on their own. The owner calls
//! [`IssueStore::run_due_timers`] and every timer due at the clock's current
//! reading fires in due order.

use crate::clock::Clock;
use crate::error::{FetchError, UpdateError};
use crate::gateway::IssueGateway;
use crate::history::{Command, EntryId, HistoryEntry, UndoLog};
use crate::model::{InvalidTransition, Issue, IssueUpdate, Status};
use crate::notify::{Event, Level, Notification, Outbox};
use crate::schedule::{Scheduler, TimerId};
use crate::sync::{PollInterval, SyncMetadata};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How long an optimistic status change stays reversible.
pub const DEFAULT_UNDO_WINDOW: Duration = Duration::from_secs(5);

/// Entries kept on the undo stack before the oldest is evicted.
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Tunables fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub undo_window: Duration,
    pub history_limit: usize,
    pub notification_duration: Duration,
    pub polling_enabled: bool,
    pub poll_interval: PollInterval,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            undo_window: DEFAULT_UNDO_WINDOW,
            history_limit: DEFAULT_HISTORY_LIMIT,
            notification_duration: crate::notify::DEFAULT_DISPLAY,
            polling_enabled: false,
            poll_interval: PollInterval::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerTask {
    ExpireUndo(EntryId),
    Poll,
}

/// Why an intent was dropped without touching the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    PolicyDenied,
    UnknownIssue,
    InvalidTransition(InvalidTransition),
}

/// Result of [`IssueStore::request_status_change`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusChange {
    Applied {
        issue_id: String,
        from: Status,
        to: Status,
        entry: EntryId,
    },
    Ignored(IgnoreReason),
}

impl StatusChange {
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// A reverted status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoneChange {
    pub entry: EntryId,
    pub issue_id: String,
    /// Status the issue was put back to.
    pub restored: Status,
    /// Status that was undone.
    pub reverted: Status,
}

/// Result of an edit request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    /// The remote confirmed; this is the record now held by the store.
    Updated(Issue),
    /// The remote refused or was unreachable; nothing changed locally.
    Failed(UpdateError),
    Ignored(IgnoreReason),
}

/// A fetch the store is waiting on.
#[derive(Debug)]
#[must_use = "a pending fetch keeps the store loading until completed"]
pub struct PendingFetch {
    started_millis: i64,
}

/// An edit the store is waiting on.
#[derive(Debug)]
#[must_use = "a pending edit keeps the store loading until completed"]
pub struct PendingEdit {
    issue_id: String,
    fields: IssueUpdate,
}

impl PendingEdit {
    #[must_use]
    pub fn issue_id(&self) -> &str {
        &self.issue_id
    }

    /// Full field set to send to the remote.
    #[must_use]
    pub const fn fields(&self) -> &IssueUpdate {
        &self.fields
    }
}

/// Stateful owner of the canonical issue collection.
#[derive(Debug)]
pub struct IssueStore<G, C> {
    gateway: G,
    clock: C,
    config: StoreConfig,
    issues: BTreeMap<String, Issue>,
    in_flight: usize,
    last_error: Option<String>,
    history: UndoLog,
    timers: Scheduler<TimerTask>,
    sync: SyncMetadata,
    poll_timer: Option<TimerId>,
    outbox: Outbox,
}

impl<G: IssueGateway, C: Clock> IssueStore<G, C> {
    /// Build an empty store. If polling is enabled in `config`, the first
    /// poll is scheduled one interval from now.
    #[must_use]
    pub fn new(config: StoreConfig, gateway: G, clock: C) -> Self {
        let mut store = Self {
            gateway,
            clock,
            history: UndoLog::new(config.history_limit),
            outbox: Outbox::new(config.notification_duration),
            sync: SyncMetadata {
                last_synced_at: None,
                polling_enabled: config.polling_enabled,
                interval: config.poll_interval,
            },
            config,
            issues: BTreeMap::new(),
            in_flight: 0,
            last_error: None,
            timers: Scheduler::new(),
            poll_timer: None,
        };
        if store.sync.polling_enabled {
            store.arm_poll();
        }
        store
    }

    // Reads

    /// Issues ordered by id.
    pub fn issues(&self) -> impl Iterator<Item = &Issue> + '_ {
        self.issues.values()
    }

    #[must_use]
    pub fn issue(&self, id: &str) -> Option<&Issue> {
        self.issues.get(id)
    }

    /// Owned copy of the collection for presentation code.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Issue> {
        self.issues.values().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.issues.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// True while any fetch or edit is in flight.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.in_flight > 0
    }

    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    #[must_use]
    pub const fn sync_metadata(&self) -> SyncMetadata {
        self.sync
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    #[must_use]
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Undo entries, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &HistoryEntry> + '_ {
        self.history.iter()
    }

    /// Earliest pending timer, in epoch milliseconds.
    #[must_use]
    pub fn next_timer_due_millis(&self) -> Option<i64> {
        self.timers.next_due_millis()
    }

    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Take queued notifications, oldest first.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        self.outbox.drain()
    }

    #[must_use]
    pub const fn config(&self) -> &StoreConfig {
        &self.config
    }

    #[must_use]
    pub const fn clock(&self) -> &C {
        &self.clock
    }

    #[must_use]
    pub const fn gateway(&self) -> &G {
        &self.gateway
    }

    pub const fn gateway_mut(&mut self) -> &mut G {
        &mut self.gateway
    }

    // Fetch

    /// Fetch the full issue set and reconcile.
    pub fn fetch_all(&mut self) {
        let pending = self.begin_fetch();
        let result = self.gateway.fetch_all();
        self.complete_fetch(pending, result);
    }

    /// Mark a fetch as in flight.
    pub fn begin_fetch(&mut self) -> PendingFetch {
        self.in_flight += 1;
        debug!(in_flight = self.in_flight, "fetch started");
        PendingFetch {
            started_millis: self.clock.now_millis(),
        }
    }

    /// Apply the outcome of a fetch started with [`Self::begin_fetch`].
    ///
    /// Success replaces the collection wholesale and discards the undo log,
    /// since its entries describe records that no longer exist locally.
    /// Failure keeps everything and records the error.
    pub fn complete_fetch(&mut self, pending: PendingFetch, result: Result<Vec<Issue>, FetchError>) {
        self.in_flight = self.in_flight.saturating_sub(1);
        let elapsed_ms = self.clock.now_millis() - pending.started_millis;

        match result {
            Ok(issues) => {
                self.issues = issues
                    .into_iter()
                    .map(|issue| (issue.id.clone(), issue))
                    .collect();
                let dropped = self.clear_history();
                self.sync.last_synced_at = Some(self.clock.now());
                self.last_error = None;
                info!(
                    count = self.issues.len(),
                    dropped_undo = dropped,
                    elapsed_ms,
                    "issues synced"
                );
            }
            Err(err) => {
                warn!(code = %err.code(), error = %err, elapsed_ms, "fetch failed");
                self.last_error = Some(err.to_string());
            }
        }
    }

    // Status moves

    /// Optimistically move an issue to `target`.
    ///
    /// Denied, unknown and invalid requests change nothing and are reported
    /// only through the returned value.
    pub fn request_status_change(
        &mut self,
        issue_id: &str,
        target: Status,
        actor_can_move: bool,
    ) -> StatusChange {
        if !actor_can_move {
            debug!(issue_id, %target, "status change ignored: policy denied");
            return StatusChange::Ignored(IgnoreReason::PolicyDenied);
        }
        let Some(issue) = self.issues.get_mut(issue_id) else {
            debug!(issue_id, %target, "status change ignored: unknown issue");
            return StatusChange::Ignored(IgnoreReason::UnknownIssue);
        };
        let from = issue.status;
        if let Err(invalid) = from.can_transition_to(target) {
            debug!(issue_id, %invalid, "status change ignored");
            return StatusChange::Ignored(IgnoreReason::InvalidTransition(invalid));
        }

        issue.status = target;
        let now = self.clock.now();
        let (entry, evicted) = self.history.push(
            now,
            Command::StatusChange {
                issue_id: issue_id.to_string(),
                previous: from,
                applied: target,
            },
        );
        if let Some(evicted) = evicted {
            debug!(entry = %evicted.id, "undo entry evicted");
            self.cancel_expiry(&evicted);
        }
        let timer = self.timers.schedule_once(
            now.timestamp_millis(),
            millis(self.config.undo_window),
            TimerTask::ExpireUndo(entry),
        );
        self.history.set_expiry(entry, timer);

        info!(issue_id, %from, to = %target, %entry, "status changed");
        self.outbox.emit(
            Event::StatusChanged,
            Level::Success,
            format!("{issue_id} moved to {target}"),
        );
        StatusChange::Applied {
            issue_id: issue_id.to_string(),
            from,
            to: target,
            entry,
        }
    }

    /// Revert the newest status change still inside its undo window.
    pub fn undo_last_action(&mut self) -> Option<UndoneChange> {
        let entry = self.history.pop()?;
        self.cancel_expiry(&entry);

        let Command::StatusChange {
            issue_id,
            previous,
            applied,
        } = &entry.command;
        if entry.command.revert(&mut self.issues).is_none() {
            warn!(issue_id = %issue_id, entry = %entry.id, "undo target no longer exists");
        }

        info!(issue_id = %issue_id, restored = %previous, entry = %entry.id, "action undone");
        self.outbox
            .emit(Event::ActionUndone, Level::Info, "Action undone");
        Some(UndoneChange {
            entry: entry.id,
            issue_id: issue_id.clone(),
            restored: *previous,
            reverted: *applied,
        })
    }

    // Edits

    /// Send an edit to the remote and commit the confirmed record.
    pub fn request_edit(
        &mut self,
        issue_id: &str,
        update: &IssueUpdate,
        actor_can_edit: bool,
    ) -> EditOutcome {
        match self.begin_edit(issue_id, update, actor_can_edit) {
            Ok(pending) => {
                let result = self.gateway.update_issue(&pending.issue_id, &pending.fields);
                self.complete_edit(pending, result)
            }
            Err(reason) => EditOutcome::Ignored(reason),
        }
    }

    /// Validate an edit and mark it in flight.
    ///
    /// The returned [`PendingEdit`] carries the full field set (current
    /// record merged with `update`) to send to the remote.
    ///
    /// # Errors
    ///
    /// [`IgnoreReason`] when the actor may not edit, the issue is unknown,
    /// or the edit would make an invalid status transition.
    pub fn begin_edit(
        &mut self,
        issue_id: &str,
        update: &IssueUpdate,
        actor_can_edit: bool,
    ) -> Result<PendingEdit, IgnoreReason> {
        if !actor_can_edit {
            debug!(issue_id, "edit ignored: policy denied");
            return Err(IgnoreReason::PolicyDenied);
        }
        let current = self.issues.get(issue_id).ok_or_else(|| {
            debug!(issue_id, "edit ignored: unknown issue");
            IgnoreReason::UnknownIssue
        })?;
        if let Some(target) = update.status.filter(|target| *target != current.status) {
            current.status.can_transition_to(target).map_err(|invalid| {
                debug!(issue_id, %invalid, "edit ignored");
                IgnoreReason::InvalidTransition(invalid)
            })?;
        }

        let merged = update.apply_to(current);
        self.in_flight += 1;
        debug!(issue_id, in_flight = self.in_flight, "edit started");
        Ok(PendingEdit {
            issue_id: issue_id.to_string(),
            fields: IssueUpdate::from(&merged),
        })
    }

    /// Apply the remote's answer to an edit started with [`Self::begin_edit`].
    ///
    /// The confirmed record replaces whatever the store holds for that id,
    /// including a newer copy from a fetch that completed in between.
    pub fn complete_edit(
        &mut self,
        pending: PendingEdit,
        result: Result<Issue, UpdateError>,
    ) -> EditOutcome {
        self.in_flight = self.in_flight.saturating_sub(1);
        match result {
            Ok(mut confirmed) => {
                confirmed.id.clone_from(&pending.issue_id);
                self.issues
                    .insert(pending.issue_id.clone(), confirmed.clone());
                // the remote now holds this record; older local moves on it can't be undone
                let superseded = self.history.remove_for_issue(&pending.issue_id);
                for entry in &superseded {
                    self.cancel_expiry(entry);
                }
                if !superseded.is_empty() {
                    debug!(
                        issue_id = %pending.issue_id,
                        dropped = superseded.len(),
                        "undo history superseded by edit"
                    );
                }
                self.last_error = None;
                info!(issue_id = %pending.issue_id, "issue updated");
                self.outbox.emit(
                    Event::EditSucceeded,
                    Level::Success,
                    "Issue updated successfully!",
                );
                EditOutcome::Updated(confirmed)
            }
            Err(err) => {
                warn!(issue_id = %pending.issue_id, code = %err.code(), error = %err, "edit failed");
                self.last_error = Some(err.to_string());
                self.outbox
                    .emit(Event::EditFailed, Level::Error, "Failed to update issue");
                EditOutcome::Failed(err)
            }
        }
    }

    // Polling

    /// Start or stop the recurring fetch. Repeating the current state is a
    /// no-op.
    pub fn set_polling_enabled(&mut self, enabled: bool) {
        if self.sync.polling_enabled == enabled {
            return;
        }
        self.sync.polling_enabled = enabled;
        if enabled {
            self.arm_poll();
        } else {
            self.disarm_poll();
        }
        info!(enabled, interval = %self.sync.interval, "polling toggled");
    }

    /// Change the polling cadence. While polling, the pending timer is
    /// replaced by exactly one timer on the new cadence.
    pub fn set_polling_interval(&mut self, interval: PollInterval) {
        if self.sync.interval == interval {
            return;
        }
        self.sync.interval = interval;
        if self.sync.polling_enabled {
            self.disarm_poll();
            self.arm_poll();
        }
        info!(%interval, "polling interval changed");
    }

    // Driver

    /// Fire every timer due at the clock's current time. Returns how many
    /// fired.
    pub fn run_due_timers(&mut self) -> usize {
        let now = self.clock.now_millis();
        let mut fired = 0;
        while let Some(timer) = self.timers.pop_due(now) {
            fired += 1;
            match timer.task {
                TimerTask::ExpireUndo(entry) => self.expire(entry),
                TimerTask::Poll => {
                    debug!(due_ms = timer.due_millis, "poll timer fired");
                    self.fetch_all();
                }
            }
        }
        fired
    }

    /// Cancel every timer and drop the undo log. The collection stays
    /// readable.
    pub fn shutdown(&mut self) {
        self.timers.clear();
        self.poll_timer = None;
        self.sync.polling_enabled = false;
        let dropped = self.history.drain().len();
        info!(dropped_undo = dropped, "store shut down");
    }

    fn expire(&mut self, entry: EntryId) {
        if self.history.remove(entry).is_some() {
            debug!(%entry, "undo window expired");
            self.outbox
                .emit(Event::UndoExpired, Level::Info, "Undo window expired");
        }
    }

    fn cancel_expiry(&mut self, entry: &HistoryEntry) {
        if let Some(timer) = entry.expiry {
            self.timers.cancel(timer);
        }
    }

    fn clear_history(&mut self) -> usize {
        let entries = self.history.drain();
        for entry in &entries {
            self.cancel_expiry(entry);
        }
        entries.len()
    }

    fn arm_poll(&mut self) {
        let interval = i64::try_from(self.sync.interval.as_millis()).unwrap_or(i64::MAX);
        let id = self
            .timers
            .schedule_every(self.clock.now_millis(), interval, TimerTask::Poll);
        self.poll_timer = Some(id);
    }

    fn disarm_poll(&mut self) {
        if let Some(id) = self.poll_timer.take() {
            self.timers.cancel(id);
        }
    }
}

fn millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}
