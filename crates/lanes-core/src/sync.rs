//! Polling presets and sync bookkeeping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Allowed polling cadences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub enum PollInterval {
    FiveSeconds,
    TenSeconds,
    #[default]
    ThirtySeconds,
    OneMinute,
    FiveMinutes,
}

impl PollInterval {
    pub const ALL: [Self; 5] = [
        Self::FiveSeconds,
        Self::TenSeconds,
        Self::ThirtySeconds,
        Self::OneMinute,
        Self::FiveMinutes,
    ];

    #[must_use]
    pub const fn as_millis(self) -> u64 {
        match self {
            Self::FiveSeconds => 5_000,
            Self::TenSeconds => 10_000,
            Self::ThirtySeconds => 30_000,
            Self::OneMinute => 60_000,
            Self::FiveMinutes => 300_000,
        }
    }

    #[must_use]
    pub const fn as_duration(self) -> Duration {
        Duration::from_millis(self.as_millis())
    }
}

impl TryFrom<u64> for PollInterval {
    type Error = UnsupportedInterval;

    fn try_from(millis: u64) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|preset| preset.as_millis() == millis)
            .ok_or(UnsupportedInterval(millis))
    }
}

impl From<PollInterval> for u64 {
    fn from(value: PollInterval) -> Self {
        value.as_millis()
    }
}

impl fmt::Display for PollInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::FiveSeconds => "5 seconds",
            Self::TenSeconds => "10 seconds",
            Self::ThirtySeconds => "30 seconds",
            Self::OneMinute => "1 minute",
            Self::FiveMinutes => "5 minutes",
        })
    }
}

/// A millisecond value that is not one of the presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unsupported polling interval {0}ms (expected 5000, 10000, 30000, 60000 or 300000)")]
pub struct UnsupportedInterval(pub u64);

/// Sync state surfaced to a status indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SyncMetadata {
    pub last_synced_at: Option<DateTime<Utc>>,
    pub polling_enabled: bool,
    pub interval: PollInterval,
}
