pub mod issue;

pub use issue::{
    InvalidSeverity, InvalidTransition, Issue, IssueUpdate, ParseEnumError, Priority, Severity,
    Status,
};
