//! Access audit trail.
//!
//! Records every authorization decision with the fingerprint of the grant
//! table that made it.

use authority::{Action, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Maximum entries in the audit log before pruning.
const MAX_AUDIT_ENTRIES: usize = 10_000;

/// How an authorization check ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessOutcome {
    Granted,
    NotPermitted,
    TargetNotFound,
    /// Roles could not be resolved
    Error,
}

/// An entry in the access audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessAuditEntry {
    /// Unique entry ID
    pub entry_id: String,
    /// Who asked
    pub acting_user: UserId,
    /// Whose records
    pub target_user: UserId,
    /// What was asked for
    pub action: Action,
    pub outcome: AccessOutcome,
    /// Fingerprint of the grant table in force
    pub grant_fingerprint: String,
    /// When the decision was made
    pub decided_at: DateTime<Utc>,
}

impl AccessAuditEntry {
    /// Create an entry stamped now.
    pub fn new(
        acting_user: &UserId,
        target_user: &UserId,
        action: Action,
        outcome: AccessOutcome,
        grant_fingerprint: impl Into<String>,
    ) -> Self {
        Self {
            entry_id: uuid::Uuid::new_v4().to_string(),
            acting_user: acting_user.clone(),
            target_user: target_user.clone(),
            action,
            outcome,
            grant_fingerprint: grant_fingerprint.into(),
            decided_at: Utc::now(),
        }
    }
}

/// Bounded log of authorization decisions.
pub struct AccessAuditLog {
    /// Log entries (newest first)
    entries: Arc<RwLock<VecDeque<AccessAuditEntry>>>,
    /// Maximum entries to retain
    max_entries: usize,
}

impl AccessAuditLog {
    /// Create a new audit log.
    pub fn new() -> Self {
        Self::with_max_entries(MAX_AUDIT_ENTRIES)
    }

    /// Create with custom max entries.
    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(VecDeque::new())),
            max_entries,
        }
    }

    /// Append an entry, returning its ID.
    pub async fn record(&self, entry: AccessAuditEntry) -> String {
        let entry_id = entry.entry_id.clone();

        let mut entries = self.entries.write().await;
        entries.push_front(entry);

        // Prune if over limit
        while entries.len() > self.max_entries {
            entries.pop_back();
        }

        entry_id
    }

    /// Get recent entries.
    pub async fn recent(&self, limit: usize) -> Vec<AccessAuditEntry> {
        let entries = self.entries.read().await;
        entries.iter().take(limit).cloned().collect()
    }

    /// Get entries where the user asked.
    pub async fn get_by_actor(&self, user_id: &UserId, limit: usize) -> Vec<AccessAuditEntry> {
        let entries = self.entries.read().await;
        entries
            .iter()
            .filter(|e| &e.acting_user == user_id)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Get entries where the user's records were asked for.
    pub async fn get_by_target(&self, user_id: &UserId, limit: usize) -> Vec<AccessAuditEntry> {
        let entries = self.entries.read().await;
        entries
            .iter()
            .filter(|e| &e.target_user == user_id)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Get statistics.
    pub async fn stats(&self) -> AccessAuditStats {
        let entries = self.entries.read().await;
        let count = |outcome: AccessOutcome| entries.iter().filter(|e| e.outcome == outcome).count();

        AccessAuditStats {
            total: entries.len(),
            granted: count(AccessOutcome::Granted),
            not_permitted: count(AccessOutcome::NotPermitted),
            target_not_found: count(AccessOutcome::TargetNotFound),
            errors: count(AccessOutcome::Error),
        }
    }

    /// Clear the log.
    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        entries.clear();
    }

    /// Get count.
    pub async fn count(&self) -> usize {
        let entries = self.entries.read().await;
        entries.len()
    }
}

impl Default for AccessAuditLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics from the access audit log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessAuditStats {
    pub total: usize,
    pub granted: usize,
    pub not_permitted: usize,
    pub target_not_found: usize,
    pub errors: usize,
}
