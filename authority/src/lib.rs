//! Role authority for the shop-floor performance ledger.
//!
//! Decides, per ordered pair of roles, whether holders of one role may
//! view, score or approve the submissions of holders of another.
//!
//! - **Default deny**: a missing grant means no capability at all
//! - **Bypass roles**: an explicitly configured set that passes every check
//! - **Fail closed**: malformed or unknown roles never grant anything
//!
//! # Key Components
//!
//! - [`UserId`] / [`RoleId`]: canonical identifiers with value equality
//! - [`GrantTable`]: versioned grant configuration as loaded from YAML
//! - [`RoleAuthorityMatrix`]: validated, read-only lookup built from a table
//!
//! # Example
//!
//! ```ignore
//! use authority::{Action, GrantTable, RoleAuthorityMatrix, RoleId};
//!
//! let table = GrantTable::from_yaml(&std::fs::read_to_string("grants.yaml")?)?;
//! let (matrix, report) = RoleAuthorityMatrix::from_table(&table);
//!
//! let supervisor = RoleId::parse("supervisor")?;
//! let operator = RoleId::parse("operator")?;
//! assert!(matrix.can(&supervisor, &operator, Action::Score));
//! ```

pub mod ids;
pub mod matrix;
pub mod table;
pub mod types;

pub use ids::{IdError, RoleId, UserId};
pub use matrix::{AuthorityError, LoadReport, RoleAuthorityMatrix};
pub use table::{GrantIssue, GrantTable};
pub use types::*;
