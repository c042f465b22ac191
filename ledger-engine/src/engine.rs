//! PerformanceEngine - main entry point for summary and ledger queries.
//!
//! Each query is computed fresh: authorize, fetch every source
//! concurrently, normalize, then aggregate. Nothing is cached between
//! requests except the active authority matrix.

use std::future::Future;
use std::sync::Arc;

use authority::{Action, Capabilities, GrantTable, RoleAuthorityMatrix, RoleId, UserId};
use chrono::Utc;
use scoring::{
    ActivityLedger, ActivityLedgerView, AggregationEngine, CompositeSummary, NormalizedBatch,
    NormalizerRegistry, PeriodKey, RawRecord, SkippedRecord, SourceKind,
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::audit::{AccessAuditEntry, AccessAuditLog, AccessOutcome};
use crate::config::{ConfigError, EngineConfig};
use crate::error::{Denied, EngineError};
use crate::gate::{AccessBasis, AuthorizationGate};
use crate::source::{RecordSource, RoleDirectory, SourceError};

/// Summary and ledger computed from the same normalized batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub summary: CompositeSummary,
    pub ledger: ActivityLedger,
}

/// Everything read for one user and period.
struct Collected {
    batch: NormalizedBatch,
    unavailable: Vec<SourceKind>,
}

impl Collected {
    fn is_partial(&self) -> bool {
        !self.unavailable.is_empty()
    }
}

/// Authorized, per-request performance queries.
pub struct PerformanceEngine {
    /// Configuration
    config: EngineConfig,
    /// Raw record stores
    source: Arc<dyn RecordSource>,
    /// Role resolution and matrix checks
    gate: AuthorizationGate,
    /// Active matrix snapshot, swapped on reload
    matrix: Arc<RwLock<Arc<RoleAuthorityMatrix>>>,
    /// Normalizers by record kind
    registry: NormalizerRegistry,
    aggregator: AggregationEngine,
    /// Access audit log
    audit: Arc<AccessAuditLog>,
}

impl PerformanceEngine {
    /// Create an engine over a record source, a role directory and a matrix.
    pub fn new(
        source: Arc<dyn RecordSource>,
        directory: Arc<dyn RoleDirectory>,
        matrix: RoleAuthorityMatrix,
    ) -> Self {
        let config = EngineConfig::default();
        Self {
            audit: Arc::new(AccessAuditLog::with_max_entries(config.audit.max_entries)),
            config,
            source,
            gate: AuthorizationGate::new(directory),
            matrix: Arc::new(RwLock::new(Arc::new(matrix))),
            registry: NormalizerRegistry::with_defaults(),
            aggregator: AggregationEngine::new(),
        }
    }

    /// Create with configuration.
    ///
    /// The configuration is validated first; the audit log is recreated
    /// with its capacity.
    pub fn with_config(mut self, config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        self.audit = Arc::new(AccessAuditLog::with_max_entries(config.audit.max_entries));
        self.config = config;
        Ok(self)
    }

    /// Replace the normalizer registry.
    pub fn with_registry(mut self, registry: NormalizerRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Get the configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Get the access audit log.
    pub fn audit(&self) -> &AccessAuditLog {
        &self.audit
    }

    /// The period containing now, at the configured granularity.
    pub fn current_period(&self) -> PeriodKey {
        PeriodKey::of(Utc::now(), self.config.scoring.granularity)
    }

    /// Composite summary of `target`'s performance in `period`.
    pub async fn summary_for(
        &self,
        acting: &UserId,
        target: &UserId,
        period: &PeriodKey,
    ) -> Result<CompositeSummary, EngineError> {
        self.authorize(acting, target, Action::View).await?;

        let collected = self.collect(target, period).await;
        let summary = self.summarize(&collected, target, period);

        info!(
            acting = %acting,
            user_id = %target,
            period = %period,
            total = %summary.grand_total_points,
            partial = summary.partial,
            skipped = summary.skipped_count,
            "Computed summary"
        );

        Ok(summary)
    }

    /// Itemized ledger behind `target`'s summary in `period`.
    pub async fn ledger_for(
        &self,
        acting: &UserId,
        target: &UserId,
        period: &PeriodKey,
    ) -> Result<ActivityLedger, EngineError> {
        self.authorize(acting, target, Action::View).await?;

        let collected = self.collect(target, period).await;
        let ledger = self.itemize(&collected, target, period);

        info!(
            acting = %acting,
            user_id = %target,
            period = %period,
            entries = ledger.entries.len(),
            partial = ledger.partial,
            "Computed ledger"
        );

        Ok(ledger)
    }

    /// Summary and ledger from a single fetch, guaranteed consistent.
    pub async fn report_for(
        &self,
        acting: &UserId,
        target: &UserId,
        period: &PeriodKey,
    ) -> Result<PerformanceReport, EngineError> {
        self.authorize(acting, target, Action::View).await?;

        let collected = self.collect(target, period).await;
        let report = PerformanceReport {
            summary: self.summarize(&collected, target, period),
            ledger: self.itemize(&collected, target, period),
        };

        info!(
            acting = %acting,
            user_id = %target,
            period = %period,
            entries = report.ledger.entries.len(),
            partial = report.summary.partial,
            "Computed report"
        );

        Ok(report)
    }

    /// Whether holders of one role may act on holders of another.
    ///
    /// Malformed role identifiers are never permitted.
    pub async fn can(&self, acting_role: &str, target_role: &str, action: Action) -> bool {
        let (Ok(acting), Ok(target)) = (RoleId::parse(acting_role), RoleId::parse(target_role))
        else {
            debug!(acting_role, target_role, "Malformed role identifier");
            return false;
        };
        self.snapshot().await.can(&acting, &target, action)
    }

    /// All capabilities for a role pair; nothing for malformed identifiers.
    pub async fn capabilities(&self, acting_role: &str, target_role: &str) -> Capabilities {
        match (RoleId::parse(acting_role), RoleId::parse(target_role)) {
            (Ok(acting), Ok(target)) => self.snapshot().await.capabilities(&acting, &target),
            _ => Capabilities::default(),
        }
    }

    /// Permission check the mutation path must pass before scoring or
    /// approving another user's submission.
    pub async fn authorize_action(
        &self,
        acting: &UserId,
        target: &UserId,
        action: Action,
    ) -> Result<AccessBasis, EngineError> {
        self.authorize(acting, target, action).await
    }

    /// Replace the active grant table.
    ///
    /// The table must validate cleanly; on rejection the current matrix
    /// stays in force. Returns the new fingerprint.
    pub async fn reload_grants(&self, table: &GrantTable) -> Result<String, EngineError> {
        let matrix = RoleAuthorityMatrix::from_table_strict(table).map_err(|err| {
            warn!(version = %table.version, error = %err, "Rejected grant table");
            err
        })?;
        let fingerprint = matrix.fingerprint().to_string();

        let previous = {
            let mut active = self.matrix.write().await;
            std::mem::replace(&mut *active, Arc::new(matrix))
        };

        info!(
            version = %table.version,
            previous = %previous.fingerprint(),
            fingerprint = %fingerprint,
            "Reloaded grant table"
        );

        Ok(fingerprint)
    }

    /// Fingerprint of the active grant table.
    pub async fn grant_fingerprint(&self) -> String {
        self.snapshot().await.fingerprint().to_string()
    }

    /// The active matrix. Hold on to it for the rest of a request.
    pub async fn snapshot(&self) -> Arc<RoleAuthorityMatrix> {
        self.matrix.read().await.clone()
    }

    async fn authorize(
        &self,
        acting: &UserId,
        target: &UserId,
        action: Action,
    ) -> Result<AccessBasis, EngineError> {
        let matrix = self.snapshot().await;
        let result = self.gate.authorize(&matrix, acting, target, action).await;

        let outcome = match &result {
            Ok(basis) => {
                debug!(acting = %acting, target = %target, action = %action, basis = ?basis, "Access granted");
                AccessOutcome::Granted
            }
            Err(EngineError::Denied(denied)) => {
                info!(acting = %acting, target = %target, action = %action, reason = %denied, "Access denied");
                match denied {
                    Denied::NotPermitted { .. } => AccessOutcome::NotPermitted,
                    Denied::TargetNotFound { .. } => AccessOutcome::TargetNotFound,
                }
            }
            Err(err) => {
                warn!(acting = %acting, target = %target, action = %action, error = %err, "Authorization failed");
                AccessOutcome::Error
            }
        };

        if self.config.audit.enabled {
            self.audit
                .record(AccessAuditEntry::new(
                    acting,
                    target,
                    action,
                    outcome,
                    matrix.fingerprint(),
                ))
                .await;
        }

        result
    }

    async fn collect(&self, target: &UserId, period: &PeriodKey) -> Collected {
        let range = period.range();
        let source = self.source.as_ref();

        // All reads finish before anything is normalized.
        let (checklist, buddy, hr_template, attendance, bonus, control) = tokio::join!(
            self.fetch(SourceKind::Checklist, target, source.get_checklist_submissions(target, &range)),
            self.fetch(SourceKind::Buddy, target, source.get_buddy_evaluations(target, &range)),
            self.fetch(SourceKind::HrTemplate, target, source.get_hr_template_evaluations(target, &range)),
            self.fetch(SourceKind::Attendance, target, source.get_attendance_adjustments(target, &range)),
            self.fetch(SourceKind::Bonus, target, source.get_bonus_records(target, &range)),
            self.fetch(SourceKind::Control, target, source.get_control_evaluations(target, &range)),
        );

        let mut records = Vec::new();
        let mut unavailable = Vec::new();

        absorb(SourceKind::Checklist, checklist, RawRecord::Checklist, &mut records, &mut unavailable);
        absorb(SourceKind::Buddy, buddy, RawRecord::Buddy, &mut records, &mut unavailable);
        absorb(SourceKind::HrTemplate, hr_template, RawRecord::HrTemplate, &mut records, &mut unavailable);
        match attendance {
            Ok(adjustments) => {
                records.extend(adjustments.overtime.into_iter().map(RawRecord::Overtime));
                records.extend(adjustments.absence.into_iter().map(RawRecord::Absence));
            }
            Err(_) => unavailable.push(SourceKind::Attendance),
        }
        absorb(SourceKind::Bonus, bonus, RawRecord::Bonus, &mut records, &mut unavailable);
        absorb(SourceKind::Control, control, RawRecord::Control, &mut records, &mut unavailable);

        // Stamp entries at the requested bucket size so they always fall
        // inside the requested period.
        let ctx = self
            .config
            .normalize_context()
            .with_granularity(period.granularity());
        let (records, foreign): (Vec<RawRecord>, Vec<RawRecord>) =
            records.into_iter().partition(|record| record.involves(target));
        let mut batch = self.registry.normalize_all(&records, &ctx);
        for record in &foreign {
            warn!(
                kind = %record.kind(),
                record_id = record.id(),
                user_id = %target,
                "Record skipped: not attributed to requested user"
            );
            batch.skipped.push(SkippedRecord {
                kind: record.kind(),
                record_id: record.id().to_string(),
                reason: format!("not attributed to {}", target),
            });
        }

        debug!(
            user_id = %target,
            period = %period,
            records = records.len(),
            entries = batch.entries.len(),
            skipped = batch.skipped_count(),
            unavailable = unavailable.len(),
            "Collected records"
        );

        Collected { batch, unavailable }
    }

    async fn fetch<T>(
        &self,
        kind: SourceKind,
        target: &UserId,
        read: impl Future<Output = Result<T, SourceError>>,
    ) -> Result<T, SourceError> {
        let result = match tokio::time::timeout(self.config.fetch_timeout(), read).await {
            Ok(result) => result,
            Err(_) => Err(SourceError::Timeout(self.config.sources.fetch_timeout_ms)),
        };

        if let Err(err) = &result {
            warn!(source = %kind, user_id = %target, error = %err, "Source unavailable, result will be partial");
        }

        result
    }

    fn summarize(&self, collected: &Collected, target: &UserId, period: &PeriodKey) -> CompositeSummary {
        let mut summary = self.aggregator.aggregate(&collected.batch.entries, target, period);
        summary.partial = collected.is_partial();
        summary.unavailable_sources = collected.unavailable.clone();
        summary.skipped_count += collected.batch.skipped_count();
        summary
    }

    fn itemize(&self, collected: &Collected, target: &UserId, period: &PeriodKey) -> ActivityLedger {
        let mut ledger = ActivityLedgerView::build(&collected.batch.entries, target, period);
        ledger.partial = collected.is_partial();
        ledger.unavailable_sources = collected.unavailable.clone();
        ledger.skipped_count += collected.batch.skipped_count();
        ledger
    }
}

fn absorb<T>(
    kind: SourceKind,
    result: Result<Vec<T>, SourceError>,
    wrap: fn(T) -> RawRecord,
    records: &mut Vec<RawRecord>,
    unavailable: &mut Vec<SourceKind>,
) {
    match result {
        Ok(items) => records.extend(items.into_iter().map(wrap)),
        Err(_) => unavailable.push(kind),
    }
}
