//! Score normalizers.
//!
//! One normalizer per raw record shape, registered against its
//! [`RecordKind`]. Adding a new score source means adding one normalizer:
//!
//! - **checklist**: completed items' awarded points over all items' maximum
//! - **buddy**: one entry per participant (see [`buddy::BuddyScoringResolver`])
//! - **hr_template** / **control**: stored totals
//! - **overtime** / **absence**: signed attendance adjustments
//! - **bonus**: discretionary adjustment, sign as stored

pub mod attendance;
pub mod bonus;
pub mod buddy;
pub mod checklist;
pub mod evaluation;

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::period::Granularity;
use crate::records::{RawRecord, RecordKind};
use crate::types::ScoreEntry;

/// Why a raw record could not be normalized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedRecord {
    /// A required field is absent
    #[error("{kind} record {record_id}: missing {field}")]
    MissingField {
        kind: RecordKind,
        record_id: String,
        field: &'static str,
    },

    /// A field that must not be negative is negative
    #[error("{kind} record {record_id}: {field} is negative")]
    NegativeValue {
        kind: RecordKind,
        record_id: String,
        field: &'static str,
    },

    /// Arithmetic on the record's quantities leaves the decimal range
    #[error("{kind} record {record_id}: {field} is out of range")]
    Overflow {
        kind: RecordKind,
        record_id: String,
        field: &'static str,
    },

    /// Actor references contradict each other
    #[error("{kind} record {record_id}: {reason}")]
    InconsistentActors {
        kind: RecordKind,
        record_id: String,
        reason: String,
    },

    /// Record handed to a normalizer for another shape
    #[error("normalizer '{normalizer}' cannot handle {kind} record {record_id}")]
    KindMismatch {
        normalizer: String,
        kind: RecordKind,
        record_id: String,
    },

    /// No normalizer registered for the shape
    #[error("no normalizer registered for {kind} record {record_id}")]
    Unregistered { kind: RecordKind, record_id: String },
}

impl MalformedRecord {
    /// Build the mismatch error for a normalizer handed the wrong shape.
    pub fn kind_mismatch(normalizer: &dyn ScoreNormalizer, record: &RawRecord) -> Self {
        Self::KindMismatch {
            normalizer: normalizer.name().to_string(),
            kind: record.kind(),
            record_id: record.id().to_string(),
        }
    }
}

/// Require an optional field to be present.
pub(crate) fn require<T>(
    value: Option<T>,
    kind: RecordKind,
    record_id: &str,
    field: &'static str,
) -> Result<T, MalformedRecord> {
    value.ok_or_else(|| MalformedRecord::MissingField {
        kind,
        record_id: record_id.to_string(),
        field,
    })
}

/// Require a quantity to be zero or more.
pub(crate) fn non_negative(
    value: Decimal,
    kind: RecordKind,
    record_id: &str,
    field: &'static str,
) -> Result<Decimal, MalformedRecord> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(MalformedRecord::NegativeValue {
            kind,
            record_id: record_id.to_string(),
            field,
        });
    }
    Ok(value)
}

/// Require a checked computation to have stayed in range.
pub(crate) fn in_range(
    value: Option<Decimal>,
    kind: RecordKind,
    record_id: &str,
    field: &'static str,
) -> Result<Decimal, MalformedRecord> {
    value.ok_or_else(|| MalformedRecord::Overflow {
        kind,
        record_id: record_id.to_string(),
        field,
    })
}

/// Conversion rates for attendance adjustments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRates {
    /// Points credited per overtime hour
    pub overtime_points_per_hour: Decimal,
    /// Points deducted per whole day absent
    pub absence_points_per_day: Decimal,
    /// Points deducted per hour absent
    pub absence_points_per_hour: Decimal,
}

impl Default for AttendanceRates {
    fn default() -> Self {
        Self {
            overtime_points_per_hour: Decimal::ONE,
            absence_points_per_day: Decimal::from(5),
            absence_points_per_hour: Decimal::ONE,
        }
    }
}

/// Settings every normalizer sees.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizeContext {
    /// Bucket size entries are stamped with
    #[serde(default)]
    pub granularity: Granularity,
    /// Attendance conversion rates
    #[serde(default)]
    pub rates: AttendanceRates,
}

impl NormalizeContext {
    /// Builder: set granularity.
    pub fn with_granularity(mut self, granularity: Granularity) -> Self {
        self.granularity = granularity;
        self
    }

    /// Builder: set attendance rates.
    pub fn with_rates(mut self, rates: AttendanceRates) -> Self {
        self.rates = rates;
        self
    }
}

/// Converts one raw record shape into canonical entries.
pub trait ScoreNormalizer: Send + Sync {
    /// Name of the normalizer, for diagnostics.
    fn name(&self) -> &str;

    /// Record shape this normalizer handles.
    fn kind(&self) -> RecordKind;

    /// Produce zero or more entries, or reject the record.
    fn normalize(
        &self,
        record: &RawRecord,
        ctx: &NormalizeContext,
    ) -> Result<Vec<ScoreEntry>, MalformedRecord>;
}

/// A record left out of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRecord {
    pub kind: RecordKind,
    pub record_id: String,
    pub reason: String,
}

/// Result of normalizing a set of records.
#[derive(Debug, Clone, Default)]
pub struct NormalizedBatch {
    /// Canonical entries, in record order
    pub entries: Vec<ScoreEntry>,
    /// Records that could not be normalized
    pub skipped: Vec<SkippedRecord>,
}

impl NormalizedBatch {
    /// Number of skipped records.
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }
}

/// Registry of normalizers, keyed by record shape.
pub struct NormalizerRegistry {
    normalizers: HashMap<RecordKind, Arc<dyn ScoreNormalizer>>,
}

impl NormalizerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            normalizers: HashMap::new(),
        }
    }

    /// Registry with a normalizer for every built-in record shape.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(checklist::ChecklistNormalizer));
        registry.register(Arc::new(buddy::BuddyNormalizer));
        registry.register(Arc::new(evaluation::HrTemplateNormalizer));
        registry.register(Arc::new(evaluation::ControlNormalizer));
        registry.register(Arc::new(attendance::OvertimeNormalizer));
        registry.register(Arc::new(attendance::AbsenceNormalizer));
        registry.register(Arc::new(bonus::BonusNormalizer));
        registry
    }

    /// Register a normalizer, returning the one it replaces.
    pub fn register(
        &mut self,
        normalizer: Arc<dyn ScoreNormalizer>,
    ) -> Option<Arc<dyn ScoreNormalizer>> {
        self.normalizers.insert(normalizer.kind(), normalizer)
    }

    /// Whether a shape has a normalizer.
    pub fn handles(&self, kind: RecordKind) -> bool {
        self.normalizers.contains_key(&kind)
    }

    /// Normalize one record.
    pub fn normalize(
        &self,
        record: &RawRecord,
        ctx: &NormalizeContext,
    ) -> Result<Vec<ScoreEntry>, MalformedRecord> {
        let normalizer =
            self.normalizers
                .get(&record.kind())
                .ok_or_else(|| MalformedRecord::Unregistered {
                    kind: record.kind(),
                    record_id: record.id().to_string(),
                })?;
        normalizer.normalize(record, ctx)
    }

    /// Normalize a set of records, skipping the malformed ones.
    pub fn normalize_all<'a>(
        &self,
        records: impl IntoIterator<Item = &'a RawRecord>,
        ctx: &NormalizeContext,
    ) -> NormalizedBatch {
        let mut batch = NormalizedBatch::default();

        for record in records {
            match self.normalize(record, ctx) {
                Ok(entries) => {
                    debug!(
                        kind = %record.kind(),
                        record_id = %record.id(),
                        entries = entries.len(),
                        "Normalized record"
                    );
                    batch.entries.extend(entries);
                }
                Err(err) => {
                    warn!(
                        kind = %record.kind(),
                        record_id = %record.id(),
                        reason = %err,
                        "Skipping malformed record"
                    );
                    batch.skipped.push(SkippedRecord {
                        kind: record.kind(),
                        record_id: record.id().to_string(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        batch
    }
}

impl Default for NormalizerRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{BonusRecord, ChecklistSubmission};
    use authority::UserId;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_defaults_cover_every_shape() {
        let registry = NormalizerRegistry::with_defaults();
        for kind in [
            RecordKind::Checklist,
            RecordKind::Buddy,
            RecordKind::HrTemplate,
            RecordKind::Overtime,
            RecordKind::Absence,
            RecordKind::Bonus,
            RecordKind::Control,
        ] {
            assert!(registry.handles(kind), "no normalizer for {kind}");
        }
    }

    #[test]
    fn test_unregistered_kind_is_skipped() {
        let registry = NormalizerRegistry::new();
        let record = RawRecord::Bonus(BonusRecord {
            id: "b-1".to_string(),
            ..Default::default()
        });

        let batch = registry.normalize_all([&record], &NormalizeContext::default());
        assert!(batch.entries.is_empty());
        assert_eq!(batch.skipped_count(), 1);
        assert!(batch.skipped[0].reason.contains("no normalizer"));
    }

    #[test]
    fn test_batch_keeps_good_records() {
        let registry = NormalizerRegistry::with_defaults();
        let at = Utc.with_ymd_and_hms(2024, 5, 2, 6, 0, 0).unwrap();
        let records = vec![
            RawRecord::Checklist(ChecklistSubmission {
                id: "broken".to_string(),
                user_id: Some(UserId::parse("u1").unwrap()),
                items: None,
                submitted_at: Some(at),
                ..Default::default()
            }),
            RawRecord::Bonus(BonusRecord {
                id: "b-1".to_string(),
                user_id: Some(UserId::parse("u1").unwrap()),
                points: Some(Decimal::from(2)),
                granted_at: Some(at),
                ..Default::default()
            }),
        ];

        let batch = registry.normalize_all(&records, &NormalizeContext::default());
        assert_eq!(batch.entries.len(), 1);
        assert_eq!(batch.skipped.len(), 1);
        assert_eq!(batch.skipped[0].record_id, "broken");
        assert_eq!(batch.skipped[0].kind, RecordKind::Checklist);
    }

    #[test]
    fn test_non_negative() {
        assert!(non_negative(Decimal::ZERO, RecordKind::Overtime, "o", "hours_worked").is_ok());
        assert!(non_negative(Decimal::from(-1), RecordKind::Overtime, "o", "hours_worked").is_err());
    }
}
