//! Discretionary bonuses and penalties.

use super::{require, MalformedRecord, NormalizeContext, ScoreNormalizer};
use crate::records::{RawRecord, RecordKind};
use crate::types::{ScoreEntry, SourceType};

/// One unbounded entry per bonus record, points as stored (sign included).
pub struct BonusNormalizer;

impl ScoreNormalizer for BonusNormalizer {
    fn name(&self) -> &str {
        "bonus"
    }

    fn kind(&self) -> RecordKind {
        RecordKind::Bonus
    }

    fn normalize(
        &self,
        record: &RawRecord,
        ctx: &NormalizeContext,
    ) -> Result<Vec<ScoreEntry>, MalformedRecord> {
        let RawRecord::Bonus(bonus) = record else {
            return Err(MalformedRecord::kind_mismatch(self, record));
        };
        let kind = RecordKind::Bonus;
        let id = bonus.id.as_str();

        let user_id = require(bonus.user_id.clone(), kind, id, "user_id")?;
        let points = require(bonus.points, kind, id, "points")?;
        let granted_at = require(bonus.granted_at, kind, id, "granted_at")?;

        Ok(vec![ScoreEntry::new(SourceType::Bonus, id, user_id, points, granted_at, ctx)
            .with_evaluator(bonus.granted_by.clone())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::BonusRecord;
    use authority::UserId;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    #[test]
    fn test_penalty_keeps_sign() {
        let record = RawRecord::Bonus(BonusRecord {
            id: "bn-1".to_string(),
            user_id: Some(UserId::parse("u1").unwrap()),
            points: Some(Decimal::from(-3)),
            reason: Some("Left station unattended".to_string()),
            granted_by: Some(UserId::parse("sup").unwrap()),
            granted_at: Some(Utc.with_ymd_and_hms(2024, 5, 9, 12, 0, 0).unwrap()),
        });

        let entries = BonusNormalizer
            .normalize(&record, &NormalizeContext::default())
            .unwrap();
        assert_eq!(entries[0].points, Decimal::from(-3));
        assert_eq!(entries[0].max_points, Decimal::ZERO);
    }

    #[test]
    fn test_missing_points_is_not_zero() {
        let record = RawRecord::Bonus(BonusRecord {
            id: "bn-2".to_string(),
            user_id: Some(UserId::parse("u1").unwrap()),
            granted_at: Some(Utc.with_ymd_and_hms(2024, 5, 9, 12, 0, 0).unwrap()),
            ..Default::default()
        });
        assert!(matches!(
            BonusNormalizer.normalize(&record, &NormalizeContext::default()),
            Err(MalformedRecord::MissingField { field: "points", .. })
        ));
    }
}
