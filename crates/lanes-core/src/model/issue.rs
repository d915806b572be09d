use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// The three board columns an issue moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Status {
    Backlog,
    #[serde(rename = "In Progress", alias = "in-progress")]
    InProgress,
    Done,
}

impl Status {
    /// All statuses in board (workflow) order.
    pub const ALL: [Self; 3] = [Self::Backlog, Self::InProgress, Self::Done];

    const fn as_str(self) -> &'static str {
        match self {
            Self::Backlog => "Backlog",
            Self::InProgress => "In Progress",
            Self::Done => "Done",
        }
    }

    /// Validate whether a transition from self to `target` is allowed.
    ///
    /// Delegates to [`crate::workflow::is_valid_transition`] so the rule
    /// table lives in exactly one place.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTransition`] for self-transitions and for any pair
    /// the workflow does not allow (notably `Backlog <-> Done`).
    pub fn can_transition_to(self, target: Self) -> Result<(), InvalidTransition> {
        if self == target {
            return Err(InvalidTransition {
                from: self,
                to: target,
                reason: "no-op transition is not allowed",
            });
        }

        if crate::workflow::is_valid_transition(self, target) {
            Ok(())
        } else {
            Err(InvalidTransition {
                from: self,
                to: target,
                reason: "issues must pass through In Progress",
            })
        }
    }
}

/// Declared priority, set by whoever files the issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Default for Priority {
    fn default() -> Self {
        Self::Medium
    }
}

impl Priority {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Severity on a 1..=10 scale. Out-of-range values cannot be constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Severity(u8);

impl Severity {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 10;

    /// Build a severity, rejecting values outside `1..=10`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidSeverity`] when `value` is out of range.
    pub const fn new(value: u8) -> Result<Self, InvalidSeverity> {
        if value >= Self::MIN && value <= Self::MAX {
            Ok(Self(value))
        } else {
            Err(InvalidSeverity(value))
        }
    }

    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Severity {
    type Error = InvalidSeverity;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Severity> for u8 {
    fn from(value: Severity) -> Self {
        value.0
    }
}

/// Error returned when a severity falls outside `1..=10`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("severity {0} is outside 1..=10")]
pub struct InvalidSeverity(pub u8);

/// A single card on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub id: String,
    pub title: String,
    pub status: Status,
    pub priority: Priority,
    pub severity: Severity,
    pub created_at: DateTime<Utc>,
    /// User identifier; empty means unassigned.
    #[serde(default)]
    pub assignee: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Issue {
    /// Whether nobody is assigned.
    #[must_use]
    pub fn is_unassigned(&self) -> bool {
        self.assignee.is_empty()
    }
}

/// Partial field set for an edit. `None` leaves the field as it is.
///
/// `id` and `created_at` are not editable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IssueUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl IssueUpdate {
    /// Returns true if no field is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.severity.is_none()
            && self.assignee.is_none()
            && self.tags.is_none()
    }

    /// Produce a copy of `issue` with every set field overwritten.
    #[must_use]
    pub fn apply_to(&self, issue: &Issue) -> Issue {
        let mut merged = issue.clone();
        if let Some(title) = &self.title {
            merged.title.clone_from(title);
        }
        if let Some(status) = self.status {
            merged.status = status;
        }
        if let Some(priority) = self.priority {
            merged.priority = priority;
        }
        if let Some(severity) = self.severity {
            merged.severity = severity;
        }
        if let Some(assignee) = &self.assignee {
            merged.assignee.clone_from(assignee);
        }
        if let Some(tags) = &self.tags {
            merged.tags.clone_from(tags);
        }
        merged
    }
}

impl From<&Issue> for IssueUpdate {
    /// The full editable field set of `issue`.
    fn from(issue: &Issue) -> Self {
        Self {
            title: Some(issue.title.clone()),
            status: Some(issue.status),
            priority: Some(issue.priority),
            severity: Some(issue.severity),
            assignee: Some(issue.assignee.clone()),
            tags: Some(issue.tags.clone()),
        }
    }
}

/// Error returned when a status transition is invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTransition {
    pub from: Status,
    pub to: Status,
    pub reason: &'static str,
}

impl fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot move {} -> {}: {}", self.from, self.to, self.reason)
    }
}

impl std::error::Error for InvalidTransition {}

/// Error returned when parsing an enum value from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    pub expected: &'static str,
    pub got: String,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: '{}'", self.expected, self.got)
    }
}

impl std::error::Error for ParseEnumError {}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/10", self.0)
    }
}

fn normalize(input: &str) -> String {
    input.trim().to_ascii_lowercase()
}

impl FromStr for Status {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize(s);
        match normalized.as_str() {
            "backlog" => Ok(Self::Backlog),
            "in progress" | "in-progress" | "in_progress" | "inprogress" => Ok(Self::InProgress),
            "done" => Ok(Self::Done),
            _ => Err(ParseEnumError {
                expected: "status",
                got: s.to_string(),
            }),
        }
    }
}

impl FromStr for Priority {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize(s);
        match normalized.as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(ParseEnumError {
                expected: "priority",
                got: s.to_string(),
            }),
        }
    }
}
