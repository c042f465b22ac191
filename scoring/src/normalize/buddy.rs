//! Dual-actor (buddy) evaluations.
//!
//! A mold-change task is evaluated once but scores two people. The record
//! is split into one entry per participant, each attributed only to its
//! own actor, so that no user's total ever includes the other's points.

use super::{non_negative, require, MalformedRecord, NormalizeContext, ScoreNormalizer};
use crate::records::{BuddyEvaluation, RawRecord, RecordKind};
use crate::types::{ScoreEntry, SourceType};

/// Splits a buddy evaluation into per-participant entries.
pub struct BuddyScoringResolver;

impl BuddyScoringResolver {
    /// Resolve one evaluation.
    ///
    /// Yields a `buddy_main` entry for the main worker and, when a partner
    /// took part, a `buddy_partner` entry for them. A solo task yields
    /// only the main entry.
    pub fn resolve(
        evaluation: &BuddyEvaluation,
        ctx: &NormalizeContext,
    ) -> Result<Vec<ScoreEntry>, MalformedRecord> {
        let kind = RecordKind::Buddy;
        let id = evaluation.id.as_str();

        let main_actor = require(evaluation.main_actor_id.clone(), kind, id, "main_actor_id")?;
        let main_points = require(evaluation.main_actor_points, kind, id, "main_actor_points")?;
        let main_max = require(
            evaluation.main_actor_max_points,
            kind,
            id,
            "main_actor_max_points",
        )?;
        let main_max = non_negative(main_max, kind, id, "main_actor_max_points")?;
        let evaluated_at = require(evaluation.evaluated_at, kind, id, "evaluated_at")?;

        let mut entries = Vec::with_capacity(2);

        // Validate the partner half before emitting anything; a record with
        // a broken partner half is skipped whole.
        let partner = match &evaluation.partner_actor_id {
            Some(partner) if *partner == main_actor => {
                return Err(MalformedRecord::InconsistentActors {
                    kind,
                    record_id: id.to_string(),
                    reason: format!("'{}' is both main actor and partner", partner),
                });
            }
            Some(partner) => {
                let points = require(evaluation.partner_points, kind, id, "partner_points")?;
                let max = require(evaluation.partner_max_points, kind, id, "partner_max_points")?;
                let max = non_negative(max, kind, id, "partner_max_points")?;
                Some((partner.clone(), points, max))
            }
            None => None,
        };

        entries.push(
            ScoreEntry::new(SourceType::BuddyMain, id, main_actor, main_points, evaluated_at, ctx)
                .with_max_points(main_max)
                .with_evaluator(evaluation.evaluator_id.clone()),
        );

        if let Some((partner, points, max)) = partner {
            entries.push(
                ScoreEntry::new(SourceType::BuddyPartner, id, partner, points, evaluated_at, ctx)
                    .with_max_points(max)
                    .with_evaluator(evaluation.evaluator_id.clone()),
            );
        }

        Ok(entries)
    }
}

/// Registry adapter for [`BuddyScoringResolver`].
pub struct BuddyNormalizer;

impl ScoreNormalizer for BuddyNormalizer {
    fn name(&self) -> &str {
        "buddy"
    }

    fn kind(&self) -> RecordKind {
        RecordKind::Buddy
    }

    fn normalize(
        &self,
        record: &RawRecord,
        ctx: &NormalizeContext,
    ) -> Result<Vec<ScoreEntry>, MalformedRecord> {
        match record {
            RawRecord::Buddy(evaluation) => BuddyScoringResolver::resolve(evaluation, ctx),
            other => Err(MalformedRecord::kind_mismatch(self, other)),
        }
    }
}
