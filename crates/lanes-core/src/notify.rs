//! Transient, fire-and-forget user notifications (toasts).

use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

/// Display duration used when nothing else is configured.
pub const DEFAULT_DISPLAY: Duration = Duration::from_millis(3_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Info,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Success => "success",
            Self::Info => "info",
            Self::Error => "error",
        })
    }
}

/// What happened, for consumers that key off the event rather than the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Event {
    StatusChanged,
    UndoExpired,
    ActionUndone,
    EditSucceeded,
    EditFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub event: Event,
    pub level: Level,
    pub message: String,
    #[serde(with = "duration_millis")]
    pub duration: Duration,
}

/// Queue of notifications waiting for the UI to pick them up.
///
/// Nothing is ever retried or acknowledged; draining empties the queue.
#[derive(Debug, Clone)]
pub struct Outbox {
    queue: VecDeque<Notification>,
    display: Duration,
}

impl Default for Outbox {
    fn default() -> Self {
        Self::new(DEFAULT_DISPLAY)
    }
}

impl Outbox {
    #[must_use]
    pub const fn new(display: Duration) -> Self {
        Self {
            queue: VecDeque::new(),
            display,
        }
    }

    pub fn emit(&mut self, event: Event, level: Level, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(?event, %level, %message, "notification");
        self.queue.push_back(Notification {
            event,
            level,
            message,
            duration: self.display,
        });
    }

    /// Take every pending notification, oldest first.
    pub fn drain(&mut self) -> Vec<Notification> {
        self.queue.drain(..).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

mod duration_millis {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }
}
