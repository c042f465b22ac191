//! Routine checklist submissions.

use rust_decimal::Decimal;

use super::{in_range, non_negative, require, MalformedRecord, NormalizeContext, ScoreNormalizer};
use crate::records::{RawRecord, RecordKind};
use crate::types::{ScoreEntry, SourceType};

/// One entry per submission: awarded points of completed items over the
/// maximum of all items.
pub struct ChecklistNormalizer;

impl ScoreNormalizer for ChecklistNormalizer {
    fn name(&self) -> &str {
        "checklist"
    }

    fn kind(&self) -> RecordKind {
        RecordKind::Checklist
    }

    fn normalize(
        &self,
        record: &RawRecord,
        ctx: &NormalizeContext,
    ) -> Result<Vec<ScoreEntry>, MalformedRecord> {
        let RawRecord::Checklist(submission) = record else {
            return Err(MalformedRecord::kind_mismatch(self, record));
        };
        let kind = RecordKind::Checklist;
        let id = submission.id.as_str();

        let user_id = require(submission.user_id.clone(), kind, id, "user_id")?;
        let items = require(submission.items.as_ref(), kind, id, "items")?;
        let submitted_at = require(submission.submitted_at, kind, id, "submitted_at")?;

        let mut points = Decimal::ZERO;
        let mut max_points = Decimal::ZERO;
        for item in items {
            let max = require(item.max_points, kind, id, "items.max_points")?;
            let max = non_negative(max, kind, id, "items.max_points")?;
            let awarded = require(item.awarded_points, kind, id, "items.awarded_points")?;
            let awarded = non_negative(awarded, kind, id, "items.awarded_points")?;

            max_points = in_range(max_points.checked_add(max), kind, id, "items.max_points")?;
            if item.completed {
                points = in_range(points.checked_add(awarded), kind, id, "items.awarded_points")?;
            }
        }

        let entry = ScoreEntry::new(SourceType::Checklist, id, user_id, points, submitted_at, ctx)
            .with_max_points(max_points)
            .with_evaluator(submission.evaluator_id.clone());

        Ok(vec![entry])
    }
}
