//! Core types for role authority.
//!
//! With the `typescript` feature enabled, the action and capability types
//! can be exported to TypeScript for the presentation layer.

use serde::{Deserialize, Serialize};

#[cfg(feature = "typescript")]
use ts_rs::TS;

use crate::ids::RoleId;

/// Something one user may attempt on another user's submissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Read submissions, summaries and ledgers
    View,
    /// Award points on a submission
    Score,
    /// Sign off a scored submission
    Approve,
}

impl Action {
    /// Get string representation for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Score => "score",
            Self::Approve => "approve",
        }
    }

    /// Whether this action changes a submission.
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Self::View)
    }

    /// All actions.
    pub fn all() -> [Self; 3] {
        [Self::View, Self::Score, Self::Approve]
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A role definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Stable identifier referenced by grants
    pub id: RoleId,
    /// Human-readable name; may be renamed freely
    pub display_name: String,
}

/// A rule stating what holders of `source_role` may do to holders of
/// `target_role`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorityGrant {
    /// Role of the acting user
    pub source_role: RoleId,
    /// Role of the user whose submissions are acted on
    pub target_role: RoleId,
    #[serde(default)]
    pub can_view: bool,
    #[serde(default)]
    pub can_score: bool,
    #[serde(default)]
    pub can_approve: bool,
}

impl AuthorityGrant {
    /// Whether this grant permits the action.
    pub fn permits(&self, action: Action) -> bool {
        match action {
            Action::View => self.can_view,
            Action::Score => self.can_score,
            Action::Approve => self.can_approve,
        }
    }

    /// Capabilities carried by this grant.
    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            view: self.can_view,
            score: self.can_score,
            approve: self.can_approve,
        }
    }
}

/// Resolved capabilities for one (acting, target) pair.
///
/// Used by callers that need to hide or show affordances, e.g. a score button.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct Capabilities {
    pub view: bool,
    pub score: bool,
    pub approve: bool,
}

impl Capabilities {
    /// Everything permitted.
    pub fn all() -> Self {
        Self {
            view: true,
            score: true,
            approve: true,
        }
    }

    /// Whether the action is permitted.
    pub fn allows(&self, action: Action) -> bool {
        match action {
            Action::View => self.view,
            Action::Score => self.score,
            Action::Approve => self.approve,
        }
    }

    /// Union of two capability sets.
    pub fn union(self, other: Self) -> Self {
        Self {
            view: self.view || other.view,
            score: self.score || other.score,
            approve: self.approve || other.approve,
        }
    }
}
