//! Itemized drill-down for one user and period.

use authority::UserId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[cfg(feature = "typescript")]
use ts_rs::TS;

use crate::aggregate::tally;
use crate::period::PeriodKey;
use crate::types::{ScoreEntry, SourceKind};

/// Ordered entries behind a summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct ActivityLedger {
    #[cfg_attr(feature = "typescript", ts(type = "string"))]
    pub user_id: UserId,
    #[cfg_attr(feature = "typescript", ts(type = "string"))]
    pub period_key: PeriodKey,
    /// Ordered by `occurred_at`, then `id`
    pub entries: Vec<ScoreEntry>,
    /// Equals the matching summary's `grand_total_points`
    #[cfg_attr(feature = "typescript", ts(type = "number"))]
    pub total_points: Decimal,
    pub partial: bool,
    pub unavailable_sources: Vec<SourceKind>,
    pub skipped_count: usize,
}

/// Builds ledgers with the same filter the aggregation uses.
pub struct ActivityLedgerView;

impl ActivityLedgerView {
    /// Select and order the entries for `user_id` within `period_key`.
    ///
    /// Entries the summary would leave out as out of range are left out here
    /// too and counted in `skipped_count`.
    pub fn build(entries: &[ScoreEntry], user_id: &UserId, period_key: &PeriodKey) -> ActivityLedger {
        let tally = tally(entries, user_id, period_key);

        ActivityLedger {
            user_id: user_id.clone(),
            period_key: *period_key,
            entries: tally.admitted.into_iter().cloned().collect(),
            total_points: tally.points,
            partial: false,
            unavailable_sources: Vec::new(),
            skipped_count: tally.skipped,
        }
    }
}
