//! Workflow rules for moving issues between board columns.
//!
//! | From \ To     | Backlog | In Progress | Done |
//! |---|---|---|---|
//! | Backlog       | -       | yes         | no   |
//! | In Progress   | yes     | -           | yes  |
//! | Done          | no      | yes         | -    |
//!
//! Every state is reachable and none is absorbing, but an issue never jumps
//! directly between Backlog and Done. Store, edit path, and CLI all consult
//! [`is_valid_transition`]; nothing re-derives the table.

use crate::model::Status;

/// Whether an issue in `current` may be moved to `target`.
///
/// Total over all nine pairs. Self-transitions are denied.
#[must_use]
pub const fn is_valid_transition(current: Status, target: Status) -> bool {
    matches!(
        (current, target),
        (Status::Backlog, Status::InProgress)
            | (Status::InProgress, Status::Backlog)
            | (Status::InProgress, Status::Done)
            | (Status::Done, Status::InProgress)
    )
}

/// Statuses reachable in one step from `current`, in board order.
#[must_use]
pub fn allowed_targets(current: Status) -> Vec<Status> {
    Status::ALL
        .into_iter()
        .filter(|target| is_valid_transition(current, *target))
        .collect()
}
