//! Evaluations that arrive with stored totals: HR templates and
//! quality-control inspections.

use super::{non_negative, require, MalformedRecord, NormalizeContext, ScoreNormalizer};
use crate::records::{RawRecord, RecordKind};
use crate::types::{ScoreEntry, SourceType};

/// One entry per HR template evaluation, totals as stored.
pub struct HrTemplateNormalizer;

impl ScoreNormalizer for HrTemplateNormalizer {
    fn name(&self) -> &str {
        "hr_template"
    }

    fn kind(&self) -> RecordKind {
        RecordKind::HrTemplate
    }

    fn normalize(
        &self,
        record: &RawRecord,
        ctx: &NormalizeContext,
    ) -> Result<Vec<ScoreEntry>, MalformedRecord> {
        let RawRecord::HrTemplate(evaluation) = record else {
            return Err(MalformedRecord::kind_mismatch(self, record));
        };
        let kind = RecordKind::HrTemplate;
        let id = evaluation.id.as_str();

        let user_id = require(evaluation.user_id.clone(), kind, id, "user_id")?;
        let points = require(evaluation.total_points, kind, id, "total_points")?;
        let max_points = require(evaluation.max_points, kind, id, "max_points")?;
        let max_points = non_negative(max_points, kind, id, "max_points")?;
        let evaluated_at = require(evaluation.evaluated_at, kind, id, "evaluated_at")?;

        Ok(vec![ScoreEntry::new(
            SourceType::HrTemplate,
            id,
            user_id,
            points,
            evaluated_at,
            ctx,
        )
        .with_max_points(max_points)
        .with_evaluator(evaluation.evaluator_id.clone())])
    }
}

/// One entry per quality-control inspection.
pub struct ControlNormalizer;

impl ScoreNormalizer for ControlNormalizer {
    fn name(&self) -> &str {
        "control"
    }

    fn kind(&self) -> RecordKind {
        RecordKind::Control
    }

    fn normalize(
        &self,
        record: &RawRecord,
        ctx: &NormalizeContext,
    ) -> Result<Vec<ScoreEntry>, MalformedRecord> {
        let RawRecord::Control(inspection) = record else {
            return Err(MalformedRecord::kind_mismatch(self, record));
        };
        let kind = RecordKind::Control;
        let id = inspection.id.as_str();

        let user_id = require(inspection.user_id.clone(), kind, id, "user_id")?;
        let points = require(inspection.points, kind, id, "points")?;
        let max_points = require(inspection.max_points, kind, id, "max_points")?;
        let max_points = non_negative(max_points, kind, id, "max_points")?;
        let inspected_at = require(inspection.inspected_at, kind, id, "inspected_at")?;

        Ok(vec![ScoreEntry::new(
            SourceType::Control,
            id,
            user_id,
            points,
            inspected_at,
            ctx,
        )
        .with_max_points(max_points)
        .with_evaluator(inspection.inspector_id.clone())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{ControlEvaluation, HrTemplateEvaluation};
    use crate::types::Category;
    use authority::UserId;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    #[test]
    fn test_hr_template_totals() {
        let record = RawRecord::HrTemplate(HrTemplateEvaluation {
            id: "hr-1".to_string(),
            user_id: Some(UserId::parse("u1").unwrap()),
            template_id: Some("quarterly".to_string()),
            total_points: Some(Decimal::new(175, 1)),
            max_points: Some(Decimal::from(20)),
            evaluator_id: Some(UserId::parse("hr-staff").unwrap()),
            evaluated_at: Some(Utc.with_ymd_and_hms(2024, 5, 20, 9, 0, 0).unwrap()),
        });

        let entries = HrTemplateNormalizer
            .normalize(&record, &NormalizeContext::default())
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].category, Category::HrTemplate);
        assert_eq!(entries[0].points, Decimal::new(175, 1));
        assert_eq!(entries[0].max_points, Decimal::from(20));
    }

    #[test]
    fn test_hr_template_missing_totals() {
        let record = RawRecord::HrTemplate(HrTemplateEvaluation {
            id: "hr-2".to_string(),
            user_id: Some(UserId::parse("u1").unwrap()),
            max_points: Some(Decimal::from(20)),
            evaluated_at: Some(Utc.with_ymd_and_hms(2024, 5, 20, 9, 0, 0).unwrap()),
            ..Default::default()
        });

        let err = HrTemplateNormalizer
            .normalize(&record, &NormalizeContext::default())
            .unwrap_err();
        assert_eq!(err.to_string(), "hr_template record hr-2: missing total_points");
    }

    #[test]
    fn test_control_inspection() {
        let record = RawRecord::Control(ControlEvaluation {
            id: "qc-1".to_string(),
            user_id: Some(UserId::parse("u1").unwrap()),
            points: Some(Decimal::from(9)),
            max_points: Some(Decimal::from(10)),
            inspector_id: Some(UserId::parse("qc").unwrap()),
            inspected_at: Some(Utc.with_ymd_and_hms(2024, 5, 21, 11, 0, 0).unwrap()),
        });

        let entries = ControlNormalizer
            .normalize(&record, &NormalizeContext::default())
            .unwrap();
        assert_eq!(entries[0].source_type, SourceType::Control);
        assert_eq!(entries[0].category, Category::Control);
        assert_eq!(entries[0].evaluator_id, Some(UserId::parse("qc").unwrap()));
    }
}
