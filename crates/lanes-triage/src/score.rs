use chrono::{DateTime, Utc};
use lanes_core::model::{Issue, Priority};
use serde::{Deserialize, Serialize};

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1_000;

/// Weights for the priority score:
///
/// `score = severity * severity_weight + rank(priority) - age_days * age_penalty`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityWeights {
    pub severity: i64,
    pub high: i64,
    pub medium: i64,
    pub low: i64,
    /// Points lost per whole day since creation.
    pub age_penalty: i64,
}

impl Default for PriorityWeights {
    fn default() -> Self {
        Self {
            severity: 10,
            high: 100,
            medium: 50,
            low: 0,
            age_penalty: 1,
        }
    }
}

impl PriorityWeights {
    #[must_use]
    pub const fn rank(&self, priority: Priority) -> i64 {
        match priority {
            Priority::High => self.high,
            Priority::Medium => self.medium,
            Priority::Low => self.low,
        }
    }
}

/// Whole days between `created_at` and `now`, rounded down.
///
/// Negative when `created_at` lies in the future.
#[must_use]
pub fn age_days(created_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - created_at)
        .num_milliseconds()
        .div_euclid(MILLIS_PER_DAY)
}

/// Priority score with the default weights. Higher is more urgent.
#[must_use]
pub fn priority_score(issue: &Issue, now: DateTime<Utc>) -> i64 {
    priority_score_with(issue, now, &PriorityWeights::default())
}

#[must_use]
pub fn priority_score_with(issue: &Issue, now: DateTime<Utc>, weights: &PriorityWeights) -> i64 {
    i64::from(issue.severity.get()) * weights.severity + weights.rank(issue.priority)
        - age_days(issue.created_at, now) * weights.age_penalty
}
