//! Who may move and edit issues.

use crate::model::ParseEnumError;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Resolves whether the active actor may mutate issues.
///
/// Implementations must be pure and synchronous; the store consults them
/// before every mutation.
pub trait AccessPolicy {
    fn can_move_issues(&self) -> bool;
    fn can_edit_issues(&self) -> bool;
}

/// Role of the active actor. Contributors are read-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Admin,
    Contributor,
}

impl Role {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Contributor => "contributor",
        }
    }
}

impl AccessPolicy for Role {
    fn can_move_issues(&self) -> bool {
        matches!(self, Self::Admin)
    }

    fn can_edit_issues(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "contributor" => Ok(Self::Contributor),
            _ => Err(ParseEnumError {
                expected: "role",
                got: s.to_string(),
            }),
        }
    }
}

/// The person driving the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub name: String,
    pub role: Role,
}

impl Actor {
    #[must_use]
    pub fn new(name: impl Into<String>, role: Role) -> Self {
        Self {
            name: name.into(),
            role,
        }
    }
}

impl AccessPolicy for Actor {
    fn can_move_issues(&self) -> bool {
        self.role.can_move_issues()
    }

    fn can_edit_issues(&self) -> bool {
        self.role.can_edit_issues()
    }
}
