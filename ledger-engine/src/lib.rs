//! Authorized performance queries for the shop-floor ledger.
//!
//! Ties role authority and score aggregation to the external stores that
//! hold raw evaluation records:
//!
//! - **AuthorizationGate**: resolves users to roles and asks the matrix;
//!   self-view always passes, grants are a union over roles
//! - **PerformanceEngine**: summary, ledger and report queries computed
//!   fresh per request from concurrently fetched sources
//! - **Partial results**: a failed or slow source is left out and the
//!   result is flagged, never silently under-reported
//! - **Access audit**: every decision is logged with the fingerprint of
//!   the grant table that made it
//!
//! # Example
//!
//! ```ignore
//! use ledger_engine::{EngineConfig, InMemoryStore, PerformanceEngine};
//!
//! let store = Arc::new(InMemoryStore::new());
//! let engine = PerformanceEngine::new(store.clone(), store, matrix)
//!     .with_config(EngineConfig::from_yaml(&yaml)?)?;
//!
//! let summary = engine.summary_for(&supervisor, &operator, &period).await?;
//! ```

pub mod audit;
pub mod config;
pub mod engine;
pub mod error;
pub mod gate;
pub mod source;

pub use audit::{AccessAuditEntry, AccessAuditLog, AccessAuditStats, AccessOutcome};
pub use config::{AuditConfig, ConfigError, EngineConfig, ScoringConfig, SourceConfig};
pub use engine::{PerformanceEngine, PerformanceReport};
pub use error::{Denied, EngineError};
pub use gate::{AccessBasis, AuthorizationGate};
pub use source::{AttendanceAdjustments, InMemoryStore, RecordSource, RoleDirectory, SourceError};

// Re-export the building blocks callers need alongside the engine
pub use authority;
pub use scoring;
