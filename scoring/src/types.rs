//! Canonical score types.
//!
//! `ScoreEntry` values are produced only by normalizers; summaries and
//! ledgers are always derived from them and never persisted.
//!
//! The JSON shape of these types is a contract with the presentation layer:
//! snake_case field names, points signed (absence is negative), and
//! `max_points` zero for unbounded adjustments. With the `typescript`
//! feature enabled they can be exported via ts-rs.

use std::collections::BTreeMap;
use std::fmt;

use authority::UserId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[cfg(feature = "typescript")]
use ts_rs::TS;

use crate::normalize::NormalizeContext;
use crate::period::PeriodKey;

/// Where a canonical entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// Routine checklist submission
    Checklist,
    /// Main worker of a buddy (mold change) evaluation
    BuddyMain,
    /// Partner of a buddy evaluation
    BuddyPartner,
    /// HR template evaluation
    HrTemplate,
    /// Overtime credit
    Overtime,
    /// Absence deduction
    Absence,
    /// Discretionary bonus or penalty
    Bonus,
    /// Quality-control inspection
    Control,
}

impl SourceType {
    /// The category bucket this source folds into.
    pub fn category(&self) -> Category {
        match self {
            Self::Checklist => Category::Checklist,
            Self::BuddyMain | Self::BuddyPartner => Category::Buddy,
            Self::HrTemplate => Category::HrTemplate,
            Self::Overtime | Self::Absence => Category::Attendance,
            Self::Bonus => Category::Bonus,
            Self::Control => Category::Control,
        }
    }

    /// Whether entries of this type are signed adjustments rather than
    /// scored items. Adjustments always carry `max_points == 0`.
    pub fn is_adjustment(&self) -> bool {
        matches!(self, Self::Overtime | Self::Absence | Self::Bonus)
    }

    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Checklist => "checklist",
            Self::BuddyMain => "buddy_main",
            Self::BuddyPartner => "buddy_partner",
            Self::HrTemplate => "hr_template",
            Self::Overtime => "overtime",
            Self::Absence => "absence",
            Self::Bonus => "bonus",
            Self::Control => "control",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Checklist,
    Buddy,
    HrTemplate,
    Attendance,
    Bonus,
    Control,
}

impl Category {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Checklist => "checklist",
            Self::Buddy => "buddy",
            Self::HrTemplate => "hr_template",
            Self::Attendance => "attendance",
            Self::Bonus => "bonus",
            Self::Control => "control",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// External source a batch of records was fetched from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Checklist,
    Buddy,
    HrTemplate,
    Attendance,
    Bonus,
    Control,
}

impl SourceKind {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Checklist => "checklist",
            Self::Buddy => "buddy",
            Self::HrTemplate => "hr_template",
            Self::Attendance => "attendance",
            Self::Bonus => "bonus",
            Self::Control => "control",
        }
    }

    /// All sources, in fetch order.
    pub fn all() -> [Self; 6] {
        [
            Self::Checklist,
            Self::Buddy,
            Self::HrTemplate,
            Self::Attendance,
            Self::Bonus,
            Self::Control,
        ]
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of scored or adjusted performance, attributed to one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct ScoreEntry {
    /// `<record id>:<source type>`, stable across recomputation
    pub id: String,
    #[cfg_attr(feature = "typescript", ts(type = "string"))]
    pub user_id: UserId,
    pub source_type: SourceType,
    pub category: Category,
    /// Signed; negative for deductions
    #[cfg_attr(feature = "typescript", ts(type = "number"))]
    pub points: Decimal,
    /// Zero for adjustments
    #[cfg_attr(feature = "typescript", ts(type = "number"))]
    pub max_points: Decimal,
    #[cfg_attr(feature = "typescript", ts(type = "string | null"))]
    pub evaluator_id: Option<UserId>,
    #[cfg_attr(feature = "typescript", ts(type = "string"))]
    pub period_key: PeriodKey,
    #[cfg_attr(feature = "typescript", ts(type = "string"))]
    pub occurred_at: DateTime<Utc>,
}

impl ScoreEntry {
    /// Create an entry for a record; category and period are derived.
    pub fn new(
        source_type: SourceType,
        record_id: &str,
        user_id: UserId,
        points: Decimal,
        occurred_at: DateTime<Utc>,
        ctx: &NormalizeContext,
    ) -> Self {
        Self {
            id: format!("{}:{}", record_id, source_type.as_str()),
            user_id,
            source_type,
            category: source_type.category(),
            points,
            max_points: Decimal::ZERO,
            evaluator_id: None,
            period_key: PeriodKey::of(occurred_at, ctx.granularity),
            occurred_at,
        }
    }

    /// Set the maximum. Ignored for adjustment types, which stay unbounded.
    pub fn with_max_points(mut self, max_points: Decimal) -> Self {
        if !self.source_type.is_adjustment() {
            self.max_points = max_points;
        }
        self
    }

    /// Set the evaluator.
    pub fn with_evaluator(mut self, evaluator_id: Option<UserId>) -> Self {
        self.evaluator_id = evaluator_id;
        self
    }
}

/// Totals for one category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct CategoryTotals {
    #[cfg_attr(feature = "typescript", ts(type = "number"))]
    pub points: Decimal,
    #[cfg_attr(feature = "typescript", ts(type = "number"))]
    pub max_points: Decimal,
    /// `points / max_points * 100`; null when `max_points` is zero
    #[cfg_attr(feature = "typescript", ts(type = "number | null"))]
    pub percentage: Option<Decimal>,
    pub entry_count: usize,
}

/// Per-user, per-period performance summary.
///
/// Derived on every query; never the source of truth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct CompositeSummary {
    #[cfg_attr(feature = "typescript", ts(type = "string"))]
    pub user_id: UserId,
    #[cfg_attr(feature = "typescript", ts(type = "string"))]
    pub period_key: PeriodKey,
    pub per_category: BTreeMap<Category, CategoryTotals>,
    /// Sum of every category's points, adjustments included
    #[cfg_attr(feature = "typescript", ts(type = "number"))]
    pub grand_total_points: Decimal,
    #[cfg_attr(feature = "typescript", ts(type = "number"))]
    pub grand_max_points: Decimal,
    pub entry_count: usize,
    /// Set when one or more sources could not be read
    pub partial: bool,
    pub unavailable_sources: Vec<SourceKind>,
    /// Raw records skipped as malformed
    pub skipped_count: usize,
}

impl CompositeSummary {
    /// Totals for one category, if it has entries.
    pub fn category(&self, category: Category) -> Option<&CategoryTotals> {
        self.per_category.get(&category)
    }
}
