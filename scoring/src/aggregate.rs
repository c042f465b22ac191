//! Composite summary aggregation.
//!
//! Entries are accumulated into a map keyed by category with exact decimal
//! arithmetic, so the same entry set yields the same summary in any order.

use std::collections::BTreeMap;

use authority::UserId;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::period::PeriodKey;
use crate::types::{Category, CategoryTotals, CompositeSummary, ScoreEntry};

const DEFAULT_PERCENTAGE_DP: u32 = 2;

/// Groups canonical entries into a per-category summary.
#[derive(Debug, Clone)]
pub struct AggregationEngine {
    percentage_dp: u32,
}

impl AggregationEngine {
    /// Create an engine that rounds percentages to two decimal places.
    pub fn new() -> Self {
        Self {
            percentage_dp: DEFAULT_PERCENTAGE_DP,
        }
    }

    /// Builder: set percentage rounding.
    pub fn with_percentage_dp(mut self, dp: u32) -> Self {
        self.percentage_dp = dp;
        self
    }

    /// Summarize the entries belonging to `user_id` within `period_key`.
    ///
    /// Entries for other users or outside the period are ignored. An entry
    /// whose points would push a total out of the decimal range is left out
    /// and counted in `skipped_count`. The returned summary is never partial;
    /// the caller marks it if sources were missing.
    pub fn aggregate(
        &self,
        entries: &[ScoreEntry],
        user_id: &UserId,
        period_key: &PeriodKey,
    ) -> CompositeSummary {
        let Tally {
            admitted,
            mut per_category,
            points,
            max_points,
            skipped,
        } = tally(entries, user_id, period_key);

        for totals in per_category.values_mut() {
            totals.percentage = self.percentage(totals.points, totals.max_points);
        }

        debug!(
            user_id = %user_id,
            period = %period_key,
            entries = admitted.len(),
            skipped,
            categories = per_category.len(),
            "Aggregated summary"
        );

        CompositeSummary {
            user_id: user_id.clone(),
            period_key: *period_key,
            per_category,
            grand_total_points: points,
            grand_max_points: max_points,
            entry_count: admitted.len(),
            partial: false,
            unavailable_sources: Vec::new(),
            skipped_count: skipped,
        }
    }

    fn percentage(&self, points: Decimal, max_points: Decimal) -> Option<Decimal> {
        if max_points <= Decimal::ZERO {
            return None;
        }
        let ratio = points.checked_div(max_points)?;
        let pct = ratio.checked_mul(Decimal::ONE_HUNDRED)?;
        Some(pct.round_dp(self.percentage_dp).normalize())
    }
}

impl Default for AggregationEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Entries selected for one user and period, with their running totals.
pub(crate) struct Tally<'a> {
    /// Ordered by `occurred_at`, then `id`
    pub admitted: Vec<&'a ScoreEntry>,
    pub per_category: BTreeMap<Category, CategoryTotals>,
    pub points: Decimal,
    pub max_points: Decimal,
    pub skipped: usize,
}

/// Select, order and total the entries for `user_id` within `period_key`.
///
/// Entries are added in ledger order, so the entry left out on overflow is
/// the same whatever order the input arrived in.
pub(crate) fn tally<'a>(
    entries: &'a [ScoreEntry],
    user_id: &UserId,
    period_key: &PeriodKey,
) -> Tally<'a> {
    let mut selected: Vec<&ScoreEntry> = entries
        .iter()
        .filter(|e| &e.user_id == user_id && period_key.covers(&e.period_key))
        .collect();
    selected.sort_by(|a, b| {
        a.occurred_at
            .cmp(&b.occurred_at)
            .then_with(|| a.id.cmp(&b.id))
            .then_with(|| a.points.cmp(&b.points))
    });

    let mut tally = Tally {
        admitted: Vec::with_capacity(selected.len()),
        per_category: BTreeMap::new(),
        points: Decimal::ZERO,
        max_points: Decimal::ZERO,
        skipped: 0,
    };

    for entry in selected {
        let (category_points, category_max) = tally
            .per_category
            .get(&entry.category)
            .map_or((Decimal::ZERO, Decimal::ZERO), |t| (t.points, t.max_points));

        let sums = (
            category_points.checked_add(entry.points),
            category_max.checked_add(entry.max_points),
            tally.points.checked_add(entry.points),
            tally.max_points.checked_add(entry.max_points),
        );
        let (Some(category_points), Some(category_max), Some(points), Some(max_points)) = sums
        else {
            warn!(
                entry_id = %entry.id,
                user_id = %user_id,
                category = %entry.category,
                "Entry skipped: totals out of range"
            );
            tally.skipped += 1;
            continue;
        };

        let totals = tally.per_category.entry(entry.category).or_default();
        totals.points = category_points;
        totals.max_points = category_max;
        totals.entry_count += 1;
        tally.points = points;
        tally.max_points = max_points;
        tally.admitted.push(entry);
    }

    tally
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{NormalizeContext, NormalizerRegistry};
    use crate::records::*;
    use crate::types::SourceType;
    use chrono::{TimeZone, Utc};

    fn user(id: &str) -> UserId {
        UserId::parse(id).unwrap()
    }

    fn entry(source: SourceType, id: &str, who: &str, points: i64, max: i64, day: u32) -> ScoreEntry {
        let at = Utc.with_ymd_and_hms(2024, 5, day, 8, 0, 0).unwrap();
        ScoreEntry::new(source, id, user(who), Decimal::from(points), at, &NormalizeContext::default())
            .with_max_points(Decimal::from(max))
    }

    fn may() -> PeriodKey {
        PeriodKey::month(2024, 5).unwrap()
    }

    #[test]
    fn test_mixed_month_for_one_user() {
        let at = |day| Some(Utc.with_ymd_and_hms(2024, 5, day, 9, 0, 0).unwrap());
        let item = |awarded, max| ChecklistItem {
            completed: true,
            awarded_points: Some(Decimal::from(awarded)),
            max_points: Some(Decimal::from(max)),
        };
        let records = vec![
            RawRecord::Checklist(ChecklistSubmission {
                id: "cl-1".to_string(),
                user_id: Some(user("u")),
                evaluator_id: Some(user("sup")),
                items: Some(vec![item(2, 2), item(1, 2), item(1, 1)]),
                submitted_at: at(6),
            }),
            RawRecord::Absence(AbsenceRecord {
                id: "ab-1".to_string(),
                user_id: Some(user("u")),
                days_absent: Some(Decimal::ONE),
                absent_on: at(8),
                ..Default::default()
            }),
            RawRecord::Buddy(BuddyEvaluation {
                id: "bd-1".to_string(),
                main_actor_id: Some(user("m")),
                partner_actor_id: Some(user("u")),
                main_actor_points: Some(Decimal::from(8)),
                main_actor_max_points: Some(Decimal::from(10)),
                partner_points: Some(Decimal::from(6)),
                partner_max_points: Some(Decimal::from(10)),
                evaluator_id: Some(user("sup")),
                evaluated_at: at(15),
            }),
        ];

        let batch =
            NormalizerRegistry::with_defaults().normalize_all(&records, &NormalizeContext::default());
        assert_eq!(batch.skipped_count(), 0);

        let summary = AggregationEngine::new().aggregate(&batch.entries, &user("u"), &may());

        let checklist = summary.category(Category::Checklist).unwrap();
        assert_eq!(checklist.points, Decimal::from(4));
        assert_eq!(checklist.max_points, Decimal::from(5));
        assert_eq!(checklist.percentage, Some(Decimal::from(80)));

        let attendance = summary.category(Category::Attendance).unwrap();
        assert_eq!(attendance.points, Decimal::from(-5));
        assert_eq!(attendance.max_points, Decimal::ZERO);
        assert_eq!(attendance.percentage, None);

        let buddy = summary.category(Category::Buddy).unwrap();
        assert_eq!(buddy.points, Decimal::from(6));
        assert_eq!(buddy.max_points, Decimal::from(10));
        assert_eq!(buddy.percentage, Some(Decimal::from(60)));

        assert_eq!(summary.grand_total_points, Decimal::from(5));
        assert_eq!(summary.grand_max_points, Decimal::from(15));
        assert_eq!(summary.entry_count, 3);
        assert!(!summary.partial);
    }

    #[test]
    fn test_adjustment_only_category_has_no_percentage() {
        let entries = vec![
            entry(SourceType::Overtime, "ot-1", "u", 3, 0, 2),
            entry(SourceType::Absence, "ab-1", "u", -5, 0, 3),
        ];
        let summary = AggregationEngine::new().aggregate(&entries, &user("u"), &may());
        let attendance = summary.category(Category::Attendance).unwrap();
        assert_eq!(attendance.points, Decimal::from(-2));
        assert_eq!(attendance.percentage, None);

        let json = serde_json::to_value(&summary).unwrap();
        assert!(json["per_category"]["attendance"]["percentage"].is_null());
    }

    #[test]
    fn test_filters_user_and_period() {
        let june = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let entries = vec![
            entry(SourceType::Checklist, "c-1", "u", 4, 5, 6),
            entry(SourceType::Checklist, "c-2", "other", 5, 5, 6),
            ScoreEntry::new(
                SourceType::Checklist,
                "c-3",
                user("u"),
                Decimal::from(5),
                june,
                &NormalizeContext::default(),
            )
            .with_max_points(Decimal::from(5)),
        ];

        let summary = AggregationEngine::new().aggregate(&entries, &user("u"), &may());
        assert_eq!(summary.entry_count, 1);
        assert_eq!(summary.grand_total_points, Decimal::from(4));
    }

    #[test]
    fn test_month_summary_includes_day_keyed_entries() {
        let ctx = NormalizeContext::default().with_granularity(crate::period::Granularity::Day);
        let at = Utc.with_ymd_and_hms(2024, 5, 20, 8, 0, 0).unwrap();
        let entries = vec![ScoreEntry::new(
            SourceType::Bonus,
            "bn-1",
            user("u"),
            Decimal::from(2),
            at,
            &ctx,
        )];

        let summary = AggregationEngine::new().aggregate(&entries, &user("u"), &may());
        assert_eq!(summary.grand_total_points, Decimal::from(2));
    }

    #[test]
    fn test_percentage_rounding() {
        let entries = vec![entry(SourceType::Control, "qc-1", "u", 2, 3, 4)];
        let summary = AggregationEngine::new().aggregate(&entries, &user("u"), &may());
        assert_eq!(
            summary.category(Category::Control).unwrap().percentage,
            Some(Decimal::new(6667, 2))
        );
    }

    #[test]
    fn test_out_of_range_entry_is_skipped() {
        let at = Utc.with_ymd_and_hms(2024, 5, 7, 8, 0, 0).unwrap();
        let huge = |id: &str| {
            ScoreEntry::new(
                SourceType::Bonus,
                id,
                user("u"),
                Decimal::MAX,
                at,
                &NormalizeContext::default(),
            )
        };
        let entries = vec![huge("bn-2"), huge("bn-1")];

        let summary = AggregationEngine::new().aggregate(&entries, &user("u"), &may());
        assert_eq!(summary.grand_total_points, Decimal::MAX);
        assert_eq!(summary.entry_count, 1);
        assert_eq!(summary.skipped_count, 1);
        assert_eq!(summary.category(Category::Bonus).unwrap().entry_count, 1);

        let reversed: Vec<_> = entries.into_iter().rev().collect();
        assert_eq!(AggregationEngine::new().aggregate(&reversed, &user("u"), &may()), summary);
    }

    #[test]
    fn test_empty_input() {
        let summary = AggregationEngine::new().aggregate(&[], &user("u"), &may());
        assert!(summary.per_category.is_empty());
        assert_eq!(summary.grand_total_points, Decimal::ZERO);
        assert_eq!(summary.entry_count, 0);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn arb_entry() -> impl Strategy<Value = ScoreEntry> {
            let sources = prop::sample::select(vec![
                SourceType::Checklist,
                SourceType::BuddyMain,
                SourceType::BuddyPartner,
                SourceType::HrTemplate,
                SourceType::Overtime,
                SourceType::Absence,
                SourceType::Bonus,
                SourceType::Control,
            ]);
            (
                sources,
                0u32..10_000,
                prop::sample::select(vec!["u", "v"]),
                -500i64..500,
                0i64..500,
                1u32..=28,
            )
                .prop_map(|(source, n, who, cents, max, day)| {
                    let at = Utc.with_ymd_and_hms(2024, 5, day, 12, 0, 0).unwrap();
                    ScoreEntry::new(
                        source,
                        &format!("r-{n}"),
                        UserId::parse(who).unwrap(),
                        Decimal::new(cents, 2),
                        at,
                        &NormalizeContext::default(),
                    )
                    .with_max_points(Decimal::from(max))
                })
        }

        proptest! {
            #[test]
            fn aggregate_ignores_input_order(
                entries in prop::collection::vec(arb_entry(), 0..40)
                    .prop_flat_map(|v| (Just(v.clone()), Just(v).prop_shuffle()))
            ) {
                let (original, shuffled) = entries;
                let engine = AggregationEngine::new();
                let u = UserId::parse("u").unwrap();
                let period = PeriodKey::month(2024, 5).unwrap();

                let a = engine.aggregate(&original, &u, &period);
                let b = engine.aggregate(&shuffled, &u, &period);
                prop_assert_eq!(
                    serde_json::to_string(&a).unwrap(),
                    serde_json::to_string(&b).unwrap()
                );
            }

            #[test]
            fn grand_total_conserves_points(
                entries in prop::collection::vec(arb_entry(), 0..40)
            ) {
                let u = UserId::parse("u").unwrap();
                let summary = AggregationEngine::new().aggregate(
                    &entries,
                    &u,
                    &PeriodKey::month(2024, 5).unwrap(),
                );

                let by_category: Decimal = summary.per_category.values().map(|t| t.points).sum();
                let by_entry: Decimal = entries
                    .iter()
                    .filter(|e| e.user_id == u)
                    .map(|e| e.points)
                    .sum();
                let counted: usize = summary.per_category.values().map(|t| t.entry_count).sum();

                prop_assert_eq!(summary.grand_total_points, by_category);
                prop_assert_eq!(summary.grand_total_points, by_entry);
                prop_assert_eq!(counted, summary.entry_count);
            }
        }
    }
}
