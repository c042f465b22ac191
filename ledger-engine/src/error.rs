//! Engine error types.

use authority::{Action, AuthorityError, IdError, UserId};
use serde::{Deserialize, Serialize};

use crate::source::SourceError;

/// Why an authorization check refused a request.
///
/// "Not permitted" and "not found" are kept apart so callers can choose
/// what to reveal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Denied {
    /// The caller holds no role that permits the action on the target
    #[error("Not permitted to {action}")]
    NotPermitted { action: Action },

    /// The target user does not exist
    #[error("Target user '{target}' not found")]
    TargetNotFound { target: UserId },
}

/// Error types for engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Authorization refused the request
    #[error("Access denied: {0}")]
    Denied(#[from] Denied),

    /// Roles could not be resolved; neither a grant nor a denial
    #[error("Role resolution failed: {0}")]
    RoleResolution(SourceError),

    /// A caller-supplied identifier is malformed
    #[error("Invalid identifier: {0}")]
    InvalidId(#[from] IdError),

    /// A grant table was rejected
    #[error("Authority configuration error: {0}")]
    Authority(#[from] AuthorityError),
}

impl EngineError {
    /// The denial, if this error is one.
    pub fn denied(&self) -> Option<&Denied> {
        match self {
            Self::Denied(denied) => Some(denied),
            _ => None,
        }
    }
}
