//! Raw record shapes as delivered by the external stores.
//!
//! Every field a record may be missing in practice is optional here, so a
//! half-written record still deserializes and can be rejected with a reason
//! by its normalizer instead of failing the whole fetch.

use std::fmt;

use authority::UserId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Shape of a raw record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Checklist,
    Buddy,
    HrTemplate,
    Overtime,
    Absence,
    Bonus,
    Control,
}

impl RecordKind {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Checklist => "checklist",
            Self::Buddy => "buddy",
            Self::HrTemplate => "hr_template",
            Self::Overtime => "overtime",
            Self::Absence => "absence",
            Self::Bonus => "bonus",
            Self::Control => "control",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One item on a checklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub awarded_points: Option<Decimal>,
    #[serde(default)]
    pub max_points: Option<Decimal>,
}

/// A routine checklist submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistSubmission {
    pub id: String,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub evaluator_id: Option<UserId>,
    /// `None` means no item data, which is not the same as an empty checklist
    #[serde(default)]
    pub items: Option<Vec<ChecklistItem>>,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
}

/// A dual-actor mold-change evaluation. Immutable once created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuddyEvaluation {
    pub id: String,
    #[serde(default)]
    pub main_actor_id: Option<UserId>,
    /// Absent when the task was performed solo
    #[serde(default)]
    pub partner_actor_id: Option<UserId>,
    #[serde(default)]
    pub main_actor_points: Option<Decimal>,
    #[serde(default)]
    pub main_actor_max_points: Option<Decimal>,
    #[serde(default)]
    pub partner_points: Option<Decimal>,
    #[serde(default)]
    pub partner_max_points: Option<Decimal>,
    #[serde(default)]
    pub evaluator_id: Option<UserId>,
    #[serde(default)]
    pub evaluated_at: Option<DateTime<Utc>>,
}

impl BuddyEvaluation {
    /// Whether the user took part, as main worker or partner.
    pub fn involves(&self, user: &UserId) -> bool {
        self.main_actor_id.as_ref() == Some(user) || self.partner_actor_id.as_ref() == Some(user)
    }
}

/// An evaluation filled in against an HR template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HrTemplateEvaluation {
    pub id: String,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub template_id: Option<String>,
    #[serde(default)]
    pub total_points: Option<Decimal>,
    #[serde(default)]
    pub max_points: Option<Decimal>,
    #[serde(default)]
    pub evaluator_id: Option<UserId>,
    #[serde(default)]
    pub evaluated_at: Option<DateTime<Utc>>,
}

/// Hours worked beyond the shift.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OvertimeRecord {
    pub id: String,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub hours_worked: Option<Decimal>,
    #[serde(default)]
    pub approved_by: Option<UserId>,
    #[serde(default)]
    pub worked_at: Option<DateTime<Utc>>,
}

/// Recorded absence, in whole days and/or hours.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbsenceRecord {
    pub id: String,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub days_absent: Option<Decimal>,
    #[serde(default)]
    pub hours_absent: Option<Decimal>,
    #[serde(default)]
    pub recorded_by: Option<UserId>,
    #[serde(default)]
    pub absent_on: Option<DateTime<Utc>>,
}

/// Discretionary bonus; negative points are a penalty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BonusRecord {
    pub id: String,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub points: Option<Decimal>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub granted_by: Option<UserId>,
    #[serde(default)]
    pub granted_at: Option<DateTime<Utc>>,
}

/// Quality-control inspection of a user's work.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlEvaluation {
    pub id: String,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub points: Option<Decimal>,
    #[serde(default)]
    pub max_points: Option<Decimal>,
    #[serde(default)]
    pub inspector_id: Option<UserId>,
    #[serde(default)]
    pub inspected_at: Option<DateTime<Utc>>,
}

/// Any raw record, tagged by shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RawRecord {
    Checklist(ChecklistSubmission),
    Buddy(BuddyEvaluation),
    HrTemplate(HrTemplateEvaluation),
    Overtime(OvertimeRecord),
    Absence(AbsenceRecord),
    Bonus(BonusRecord),
    Control(ControlEvaluation),
}

impl RawRecord {
    /// Shape of this record.
    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Checklist(_) => RecordKind::Checklist,
            Self::Buddy(_) => RecordKind::Buddy,
            Self::HrTemplate(_) => RecordKind::HrTemplate,
            Self::Overtime(_) => RecordKind::Overtime,
            Self::Absence(_) => RecordKind::Absence,
            Self::Bonus(_) => RecordKind::Bonus,
            Self::Control(_) => RecordKind::Control,
        }
    }

    /// Store identifier of the record.
    pub fn id(&self) -> &str {
        match self {
            Self::Checklist(r) => &r.id,
            Self::Buddy(r) => &r.id,
            Self::HrTemplate(r) => &r.id,
            Self::Overtime(r) => &r.id,
            Self::Absence(r) => &r.id,
            Self::Bonus(r) => &r.id,
            Self::Control(r) => &r.id,
        }
    }

    /// Whether the record is attributed to the user.
    ///
    /// Buddy evaluations belong to both participants.
    pub fn involves(&self, user_id: &UserId) -> bool {
        let owner = match self {
            Self::Buddy(r) => return r.involves(user_id),
            Self::Checklist(r) => r.user_id.as_ref(),
            Self::HrTemplate(r) => r.user_id.as_ref(),
            Self::Overtime(r) => r.user_id.as_ref(),
            Self::Absence(r) => r.user_id.as_ref(),
            Self::Bonus(r) => r.user_id.as_ref(),
            Self::Control(r) => r.user_id.as_ref(),
        };
        owner == Some(user_id)
    }

    /// When the recorded activity happened, if known.
    pub fn occurred_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Checklist(r) => r.submitted_at,
            Self::Buddy(r) => r.evaluated_at,
            Self::HrTemplate(r) => r.evaluated_at,
            Self::Overtime(r) => r.worked_at,
            Self::Absence(r) => r.absent_on,
            Self::Bonus(r) => r.granted_at,
            Self::Control(r) => r.inspected_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_deserialization() {
        let json = r#"{
            "kind": "checklist",
            "id": "cl-1",
            "user_id": "U1",
            "items": [{"completed": true, "awarded_points": 2, "max_points": 2}],
            "submitted_at": "2024-05-03T07:00:00Z"
        }"#;
        let record: RawRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.kind(), RecordKind::Checklist);
        assert_eq!(record.id(), "cl-1");

        let RawRecord::Checklist(submission) = record else {
            panic!("expected checklist");
        };
        assert_eq!(submission.user_id, Some(UserId::parse("u1").unwrap()));
        assert_eq!(submission.items.unwrap()[0].awarded_points, Some(Decimal::from(2)));
    }

    #[test]
    fn test_missing_items_is_not_empty_items() {
        let missing: ChecklistSubmission = serde_json::from_str(r#"{"id": "a"}"#).unwrap();
        let empty: ChecklistSubmission = serde_json::from_str(r#"{"id": "b", "items": []}"#).unwrap();
        assert!(missing.items.is_none());
        assert_eq!(empty.items, Some(vec![]));
    }

    #[test]
    fn test_item_without_points_stays_unscored() {
        let item: ChecklistItem = serde_json::from_str(r#"{"completed": true}"#).unwrap();
        assert!(item.completed);
        assert_eq!(item.awarded_points, None);
        assert_eq!(item.max_points, None);
    }

    #[test]
    fn test_record_attribution() {
        let user = UserId::parse("u1").unwrap();
        let bonus = RawRecord::Bonus(BonusRecord {
            id: "bn-1".to_string(),
            user_id: Some(user.clone()),
            ..Default::default()
        });
        assert!(bonus.involves(&user));
        assert!(!bonus.involves(&UserId::parse("u2").unwrap()));
        assert!(bonus.occurred_at().is_none());

        let orphan = RawRecord::Bonus(BonusRecord {
            id: "bn-2".to_string(),
            ..Default::default()
        });
        assert!(!orphan.involves(&user));
    }

    #[test]
    fn test_buddy_involves() {
        let main = UserId::parse("main").unwrap();
        let partner = UserId::parse("partner").unwrap();
        let record = BuddyEvaluation {
            id: "b-1".to_string(),
            main_actor_id: Some(main.clone()),
            partner_actor_id: Some(partner.clone()),
            ..Default::default()
        };
        assert!(record.involves(&main));
        assert!(record.involves(&partner));
        assert!(!record.involves(&UserId::parse("other").unwrap()));
    }
}
