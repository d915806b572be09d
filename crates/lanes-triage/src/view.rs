//! Filter, sort and column layout for a read-only issue snapshot.
//!
//! Every ordering ends with an ascending id comparison, so output is a total
//! order no matter how many issues share the primary key.

use crate::score::{PriorityWeights, priority_score_with};
use chrono::{DateTime, Utc};
use lanes_core::clock::Clock;
use lanes_core::gateway::IssueGateway;
use lanes_core::model::{Issue, ParseEnumError, Priority, Severity, Status};
use lanes_core::store::IssueStore;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Active predicates, ANDed together. `None` means "any".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    /// Exact match; `Some("")` selects unassigned issues.
    pub assignee: Option<String>,
    pub severity: Option<Severity>,
    /// Case-insensitive substring of title, any tag, or id.
    pub search: Option<String>,
}

impl FilterCriteria {
    /// True when no predicate is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.priority.is_none()
            && self.assignee.is_none()
            && self.severity.is_none()
            && self.search.as_deref().is_none_or(|s| s.trim().is_empty())
    }

    #[must_use]
    pub fn matches(&self, issue: &Issue) -> bool {
        self.status.is_none_or(|status| issue.status == status)
            && self.priority.is_none_or(|priority| issue.priority == priority)
            && self
                .assignee
                .as_deref()
                .is_none_or(|assignee| issue.assignee == assignee)
            && self.severity.is_none_or(|severity| issue.severity == severity)
            && self
                .search
                .as_deref()
                .is_none_or(|needle| matches_text(issue, needle))
    }
}

fn matches_text(issue: &Issue, needle: &str) -> bool {
    let needle = needle.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    issue.title.to_lowercase().contains(&needle)
        || issue.id.to_lowercase().contains(&needle)
        || issue
            .tags
            .iter()
            .any(|tag| tag.to_lowercase().contains(&needle))
}

/// Presentation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    /// Highest priority score first.
    #[default]
    PriorityScore,
    /// Newest first.
    Created,
    /// Most severe first.
    Severity,
    /// Declared priority, high first.
    Priority,
    Title,
    /// Unassigned sorts first, as the empty string.
    Assignee,
}

impl SortKey {
    pub const ALL: [Self; 6] = [
        Self::PriorityScore,
        Self::Created,
        Self::Severity,
        Self::Priority,
        Self::Title,
        Self::Assignee,
    ];

    const fn as_str(self) -> &'static str {
        match self {
            Self::PriorityScore => "priority-score",
            Self::Created => "created",
            Self::Severity => "severity",
            Self::Priority => "priority",
            Self::Title => "title",
            Self::Assignee => "assignee",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "priority-score" | "score" => Ok(Self::PriorityScore),
            "created" | "created-at" | "createdat" => Ok(Self::Created),
            "severity" => Ok(Self::Severity),
            "priority" => Ok(Self::Priority),
            "title" => Ok(Self::Title),
            "assignee" => Ok(Self::Assignee),
            _ => Err(ParseEnumError {
                expected: "sort key",
                got: s.to_string(),
            }),
        }
    }
}

/// Filter `issues` and order the survivors. The input is left untouched.
#[must_use]
pub fn apply(
    issues: &[Issue],
    criteria: &FilterCriteria,
    sort: SortKey,
    now: DateTime<Utc>,
) -> Vec<Issue> {
    apply_with(issues, criteria, sort, now, &PriorityWeights::default())
}

#[must_use]
pub fn apply_with(
    issues: &[Issue],
    criteria: &FilterCriteria,
    sort: SortKey,
    now: DateTime<Utc>,
    weights: &PriorityWeights,
) -> Vec<Issue> {
    let mut selected: Vec<(i64, &Issue)> = issues
        .iter()
        .filter(|issue| criteria.matches(issue))
        .map(|issue| {
            let score = match sort {
                SortKey::PriorityScore => priority_score_with(issue, now, weights),
                _ => 0,
            };
            (score, issue)
        })
        .collect();

    selected.sort_by(|(score_a, a), (score_b, b)| {
        primary(sort, (*score_a, *a), (*score_b, *b)).then_with(|| a.id.cmp(&b.id))
    });
    tracing::trace!(
        total = issues.len(),
        kept = selected.len(),
        %sort,
        "applied view"
    );
    selected.into_iter().map(|(_, issue)| issue.clone()).collect()
}

fn primary(sort: SortKey, (score_a, a): (i64, &Issue), (score_b, b): (i64, &Issue)) -> Ordering {
    match sort {
        SortKey::PriorityScore => score_b.cmp(&score_a),
        SortKey::Created => b.created_at.cmp(&a.created_at),
        SortKey::Severity => b.severity.cmp(&a.severity),
        SortKey::Priority => b.priority.cmp(&a.priority),
        SortKey::Title => a.title.cmp(&b.title),
        SortKey::Assignee => a.assignee.cmp(&b.assignee),
    }
}

/// One status column of the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub status: Status,
    pub issues: Vec<Issue>,
}

/// The three columns, in workflow order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Board {
    pub columns: Vec<Column>,
}

impl Board {
    #[must_use]
    pub fn column(&self, status: Status) -> Option<&Column> {
        self.columns.iter().find(|column| column.status == status)
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.columns.iter().map(|column| column.issues.len()).sum()
    }
}

/// Apply the view, then split it into status columns.
///
/// A status criterion still yields all three columns; the others are empty.
#[must_use]
pub fn board(
    issues: &[Issue],
    criteria: &FilterCriteria,
    sort: SortKey,
    now: DateTime<Utc>,
) -> Board {
    let ordered = apply(issues, criteria, sort, now);
    let columns = Status::ALL
        .into_iter()
        .map(|status| Column {
            status,
            issues: ordered
                .iter()
                .filter(|issue| issue.status == status)
                .cloned()
                .collect(),
        })
        .collect();
    Board { columns }
}

/// Views over a live store, evaluated at the store clock's current time.
pub trait StoreView {
    fn view(&self, criteria: &FilterCriteria, sort: SortKey) -> Vec<Issue>;
    fn board(&self, criteria: &FilterCriteria, sort: SortKey) -> Board;
}

impl<G: IssueGateway, C: Clock> StoreView for IssueStore<G, C> {
    fn view(&self, criteria: &FilterCriteria, sort: SortKey) -> Vec<Issue> {
        apply(&self.snapshot(), criteria, sort, self.clock().now())
    }

    fn board(&self, criteria: &FilterCriteria, sort: SortKey) -> Board {
        board(&self.snapshot(), criteria, sort, self.clock().now())
    }
}
