//! External record sources.
//!
//! The engine owns none of the raw records; it reads them through these
//! traits. `InMemoryStore` implements both for tests and local tooling.

pub mod memory;
pub mod traits;

pub use memory::InMemoryStore;
pub use traits::{AttendanceAdjustments, RecordSource, RoleDirectory, SourceError};
