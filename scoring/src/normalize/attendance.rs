//! Attendance adjustments: overtime credits and absence deductions.
//!
//! Both fold into the `attendance` category with `max_points = 0`.

use rust_decimal::Decimal;

use super::{in_range, non_negative, require, MalformedRecord, NormalizeContext, ScoreNormalizer};
use crate::records::{RawRecord, RecordKind};
use crate::types::{ScoreEntry, SourceType};

/// `points = hours_worked * overtime_points_per_hour`.
pub struct OvertimeNormalizer;

impl ScoreNormalizer for OvertimeNormalizer {
    fn name(&self) -> &str {
        "overtime"
    }

    fn kind(&self) -> RecordKind {
        RecordKind::Overtime
    }

    fn normalize(
        &self,
        record: &RawRecord,
        ctx: &NormalizeContext,
    ) -> Result<Vec<ScoreEntry>, MalformedRecord> {
        let RawRecord::Overtime(overtime) = record else {
            return Err(MalformedRecord::kind_mismatch(self, record));
        };
        let kind = RecordKind::Overtime;
        let id = overtime.id.as_str();

        let user_id = require(overtime.user_id.clone(), kind, id, "user_id")?;
        let hours = require(overtime.hours_worked, kind, id, "hours_worked")?;
        let hours = non_negative(hours, kind, id, "hours_worked")?;
        let worked_at = require(overtime.worked_at, kind, id, "worked_at")?;

        let points = in_range(
            hours.checked_mul(ctx.rates.overtime_points_per_hour),
            kind,
            id,
            "hours_worked",
        )?;

        Ok(vec![ScoreEntry::new(SourceType::Overtime, id, user_id, points, worked_at, ctx)
            .with_evaluator(overtime.approved_by.clone())])
    }
}

/// `points = -(days * absence_points_per_day + hours * absence_points_per_hour)`.
///
/// A record needs at least one of days or hours; the other counts as zero.
pub struct AbsenceNormalizer;

impl ScoreNormalizer for AbsenceNormalizer {
    fn name(&self) -> &str {
        "absence"
    }

    fn kind(&self) -> RecordKind {
        RecordKind::Absence
    }

    fn normalize(
        &self,
        record: &RawRecord,
        ctx: &NormalizeContext,
    ) -> Result<Vec<ScoreEntry>, MalformedRecord> {
        let RawRecord::Absence(absence) = record else {
            return Err(MalformedRecord::kind_mismatch(self, record));
        };
        let kind = RecordKind::Absence;
        let id = absence.id.as_str();

        let user_id = require(absence.user_id.clone(), kind, id, "user_id")?;
        if absence.days_absent.is_none() && absence.hours_absent.is_none() {
            return Err(MalformedRecord::MissingField {
                kind,
                record_id: id.to_string(),
                field: "days_absent or hours_absent",
            });
        }
        let days = non_negative(absence.days_absent.unwrap_or_default(), kind, id, "days_absent")?;
        let hours = non_negative(
            absence.hours_absent.unwrap_or_default(),
            kind,
            id,
            "hours_absent",
        )?;
        let absent_on = require(absence.absent_on, kind, id, "absent_on")?;

        let day_points = in_range(
            days.checked_mul(ctx.rates.absence_points_per_day),
            kind,
            id,
            "days_absent",
        )?;
        let hour_points = in_range(
            hours.checked_mul(ctx.rates.absence_points_per_hour),
            kind,
            id,
            "hours_absent",
        )?;
        let deduction = in_range(
            day_points.checked_add(hour_points),
            kind,
            id,
            "days_absent or hours_absent",
        )?;
        let points = in_range(
            Decimal::ZERO.checked_sub(deduction),
            kind,
            id,
            "days_absent or hours_absent",
        )?;

        Ok(vec![ScoreEntry::new(SourceType::Absence, id, user_id, points, absent_on, ctx)
            .with_evaluator(absence.recorded_by.clone())])
    }
}
