use std::fmt;

/// Machine-readable error codes for UI and script-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    IssueNotFound,
    InvalidStateTransition,
    PermissionDenied,
    InvalidEnumValue,
    InvalidSeverity,
    FetchFailed,
    UpdateFailed,
    MalformedResponse,
    StorageWriteFailed,
    LockContention,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1002",
            Self::IssueNotFound => "E2001",
            Self::InvalidStateTransition => "E2002",
            Self::PermissionDenied => "E2003",
            Self::InvalidEnumValue => "E2005",
            Self::InvalidSeverity => "E2006",
            Self::FetchFailed => "E4001",
            Self::UpdateFailed => "E4002",
            Self::MalformedResponse => "E4003",
            Self::StorageWriteFailed => "E5001",
            Self::LockContention => "E5002",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::IssueNotFound => "Issue not found",
            Self::InvalidStateTransition => "Invalid status transition",
            Self::PermissionDenied => "Actor lacks permission",
            Self::InvalidEnumValue => "Invalid status/priority/role value",
            Self::InvalidSeverity => "Severity out of range",
            Self::FetchFailed => "Failed to fetch issues",
            Self::UpdateFailed => "Failed to update issue",
            Self::MalformedResponse => "Malformed remote response",
            Self::StorageWriteFailed => "Local storage write failed",
            Self::LockContention => "Lock contention",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in .lanes/config.toml and retry."),
            Self::IssueNotFound => None,
            Self::InvalidStateTransition => Some(
                "Follow valid transitions: Backlog <-> In Progress <-> Done (no direct Backlog <-> Done).",
            ),
            Self::PermissionDenied => Some("Switch to an admin role to move or edit issues."),
            Self::InvalidEnumValue => Some("Use one of the documented status/priority/role values."),
            Self::InvalidSeverity => Some("Severity must be an integer between 1 and 10."),
            Self::FetchFailed => Some("Check the remote source and retry the sync."),
            Self::UpdateFailed => Some("Retry the edit; the local record was left unchanged."),
            Self::MalformedResponse => Some("Check that the issues file holds a JSON array of issues."),
            Self::StorageWriteFailed => Some("Check disk space and write permissions."),
            Self::LockContention => Some("Retry after the other `lanes` process releases its lock."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Remote list retrieval failed.
///
/// Always recovered locally: the store keeps its previous collection and
/// surfaces the description as its last error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("remote unavailable: {0}")]
    Unavailable(String),
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl FetchError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Unavailable(_) => ErrorCode::FetchFailed,
            Self::Malformed(_) => ErrorCode::MalformedResponse,
        }
    }
}

/// Remote single-issue update failed. No partial merge is ever applied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpdateError {
    #[error("remote unavailable: {0}")]
    Unavailable(String),
    #[error("issue {0} not found on remote")]
    NotFound(String),
    #[error("update rejected: {0}")]
    Rejected(String),
}

impl UpdateError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Unavailable(_) | Self::Rejected(_) => ErrorCode::UpdateFailed,
            Self::NotFound(_) => ErrorCode::IssueNotFound,
        }
    }
}
