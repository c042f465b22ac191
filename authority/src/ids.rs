//! Canonical identifiers.
//!
//! Every comparison of users or roles goes through these types. Raw strings
//! are canonicalised once, at construction, so `"Supervisor "` and
//! `"supervisor"` are the same role everywhere.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Errors raised when parsing an identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// Identifier was empty after trimming
    #[error("Identifier is empty")]
    Empty,

    /// Identifier contains whitespace or control characters
    #[error("Identifier contains invalid character {found:?}: {raw}")]
    InvalidCharacter { raw: String, found: char },
}

fn canonicalize(raw: &str) -> Result<String, IdError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(IdError::Empty);
    }
    if let Some(found) = trimmed
        .chars()
        .find(|c| c.is_whitespace() || c.is_control())
    {
        return Err(IdError::InvalidCharacter {
            raw: raw.to_string(),
            found,
        });
    }
    Ok(trimmed.to_ascii_lowercase())
}

/// Identifier of a user (worker, supervisor, HR staff, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Parse and canonicalise a user identifier.
    pub fn parse(raw: &str) -> Result<Self, IdError> {
        canonicalize(raw).map(Self)
    }

    /// Canonical string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UserId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a role. Immutable once referenced by grants; only the
/// display name of a [`crate::Role`] may change.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoleId(String);

impl RoleId {
    /// Parse and canonicalise a role identifier.
    pub fn parse(raw: &str) -> Result<Self, IdError> {
        canonicalize(raw).map(Self)
    }

    /// Canonical string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RoleId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RoleId> for String {
    fn from(id: RoleId) -> Self {
        id.0
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
