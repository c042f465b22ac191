//! Core traits for record sources and the role directory.

use async_trait::async_trait;
use authority::{RoleId, UserId};
use scoring::{
    AbsenceRecord, BonusRecord, BuddyEvaluation, ChecklistSubmission, ControlEvaluation,
    HrTemplateEvaluation, OvertimeRecord, PeriodRange,
};

/// Error types for source reads.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    /// Store is not reachable
    #[error("Source unavailable: {0}")]
    Unavailable(String),

    /// Query reached the store but failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Read did not finish within the fetch timeout
    #[error("Timed out after {0}ms")]
    Timeout(u64),
}

/// Overtime and absence records, fetched together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttendanceAdjustments {
    pub overtime: Vec<OvertimeRecord>,
    pub absence: Vec<AbsenceRecord>,
}

/// Read access to the stores holding raw performance records.
///
/// Every query is scoped to one user and a half-open date range.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Routine checklist submissions by the user.
    async fn get_checklist_submissions(
        &self,
        user_id: &UserId,
        range: &PeriodRange,
    ) -> Result<Vec<ChecklistSubmission>, SourceError>;

    /// Buddy evaluations where the user is the main actor or the partner.
    async fn get_buddy_evaluations(
        &self,
        user_id: &UserId,
        range: &PeriodRange,
    ) -> Result<Vec<BuddyEvaluation>, SourceError>;

    /// HR template evaluations of the user.
    async fn get_hr_template_evaluations(
        &self,
        user_id: &UserId,
        range: &PeriodRange,
    ) -> Result<Vec<HrTemplateEvaluation>, SourceError>;

    /// Overtime and absence records of the user.
    async fn get_attendance_adjustments(
        &self,
        user_id: &UserId,
        range: &PeriodRange,
    ) -> Result<AttendanceAdjustments, SourceError>;

    /// Bonus and penalty records of the user.
    async fn get_bonus_records(
        &self,
        user_id: &UserId,
        range: &PeriodRange,
    ) -> Result<Vec<BonusRecord>, SourceError>;

    /// Quality-control inspections of the user's work.
    async fn get_control_evaluations(
        &self,
        user_id: &UserId,
        range: &PeriodRange,
    ) -> Result<Vec<ControlEvaluation>, SourceError>;
}

/// Resolves the roles a user holds.
#[async_trait]
pub trait RoleDirectory: Send + Sync {
    /// Roles held by the user, or `None` when the user does not exist.
    ///
    /// An existing user may hold no roles at all.
    async fn roles_of(&self, user_id: &UserId) -> Result<Option<Vec<RoleId>>, SourceError>;
}
