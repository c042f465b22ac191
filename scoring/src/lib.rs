//! Performance scoring for the shop-floor ledger.
//!
//! Turns structurally different evaluation records into one canonical
//! per-user, per-period ledger and summary:
//!
//! - Per-source normalizers registered against a record kind
//! - Dual-actor buddy evaluations split into one entry per participant
//! - Order-independent aggregation with exact decimal arithmetic
//! - Itemized ledger views built from the same entries as the summary
//!
//! # Architecture
//!
//! ```text
//!  RawRecord ──► NormalizerRegistry ──► ScoreEntry[] ──┬──► AggregationEngine ──► CompositeSummary
//!                  │ checklist                          │
//!                  │ buddy (BuddyScoringResolver)       └──► ActivityLedgerView ──► ActivityLedger
//!                  │ hr_template / control
//!                  │ overtime / absence
//!                  └ bonus
//! ```

pub mod aggregate;
pub mod ledger;
pub mod normalize;
pub mod period;
pub mod records;
pub mod types;

pub use aggregate::AggregationEngine;
pub use ledger::{ActivityLedger, ActivityLedgerView};
pub use normalize::buddy::BuddyScoringResolver;
pub use normalize::{
    AttendanceRates, MalformedRecord, NormalizeContext, NormalizedBatch, NormalizerRegistry,
    ScoreNormalizer, SkippedRecord,
};
pub use period::{Granularity, PeriodKey, PeriodKeyError, PeriodRange};
pub use records::*;
pub use rust_decimal::Decimal;
pub use types::*;
