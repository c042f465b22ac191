//! In-memory record store and role directory.

use async_trait::async_trait;
use authority::{RoleId, UserId};
use dashmap::{DashMap, DashSet};
use scoring::{
    BonusRecord, BuddyEvaluation, ChecklistSubmission, ControlEvaluation, HrTemplateEvaluation,
    PeriodRange, RawRecord, RecordKind, SourceKind,
};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use super::traits::*;

/// In-memory store for tests and local tooling.
///
/// Records are keyed by kind and id; inserting a record with an existing
/// key replaces it. Individual sources can be failed or slowed down to
/// exercise partial results.
pub struct InMemoryStore {
    records: DashMap<(RecordKind, String), RawRecord>,
    roles: DashMap<UserId, Vec<RoleId>>,
    failing: DashSet<SourceKind>,
    delays: DashMap<SourceKind, Duration>,
    directory_available: AtomicBool,
    fetch_count: AtomicU32,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            roles: DashMap::new(),
            failing: DashSet::new(),
            delays: DashMap::new(),
            directory_available: AtomicBool::new(true),
            fetch_count: AtomicU32::new(0),
        }
    }

    /// Insert or replace a record.
    pub fn insert(&self, record: RawRecord) {
        let key = (record.kind(), record.id().to_string());
        self.records.insert(key, record);
    }

    /// Insert several records.
    pub fn extend(&self, records: impl IntoIterator<Item = RawRecord>) {
        for record in records {
            self.insert(record);
        }
    }

    /// Builder: register a user with their roles.
    pub fn with_user(self, user_id: UserId, roles: Vec<RoleId>) -> Self {
        self.set_roles(user_id, roles);
        self
    }

    /// Register or replace a user's roles.
    pub fn set_roles(&self, user_id: UserId, roles: Vec<RoleId>) {
        self.roles.insert(user_id, roles);
    }

    /// Make a source fail until restored.
    pub fn fail_source(&self, kind: SourceKind) {
        self.failing.insert(kind);
    }

    /// Undo [`fail_source`](Self::fail_source).
    pub fn restore_source(&self, kind: SourceKind) {
        self.failing.remove(&kind);
    }

    /// Delay every read from a source.
    pub fn delay_source(&self, kind: SourceKind, delay: Duration) {
        self.delays.insert(kind, delay);
    }

    /// Set role directory availability.
    pub fn set_directory_available(&self, available: bool) {
        self.directory_available.store(available, Ordering::SeqCst);
    }

    /// Number of source reads served or attempted.
    pub fn fetch_count(&self) -> u32 {
        self.fetch_count.load(Ordering::SeqCst)
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    async fn begin(&self, kind: SourceKind) -> Result<(), SourceError> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);

        let delay = self.delays.get(&kind).map(|d| *d);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.contains(&kind) {
            return Err(SourceError::Unavailable(format!("{} store disabled", kind)));
        }
        Ok(())
    }

    /// Records of one kind belonging to the user within the range, ordered by id.
    ///
    /// Records without a timestamp are returned for every range so the
    /// engine can report them as skipped rather than lose them silently.
    fn select<T>(
        &self,
        kind: RecordKind,
        user_id: &UserId,
        range: &PeriodRange,
        pick: impl Fn(&RawRecord) -> Option<T>,
    ) -> Vec<T> {
        let mut matched: Vec<(String, T)> = self
            .records
            .iter()
            .filter(|item| item.key().0 == kind)
            .filter(|item| item.value().involves(user_id))
            .filter(|item| item.value().occurred_at().map_or(true, |at| range.contains(at)))
            .filter_map(|item| pick(item.value()).map(|record| (item.key().1.clone(), record)))
            .collect();
        matched.sort_by(|a, b| a.0.cmp(&b.0));
        matched.into_iter().map(|(_, record)| record).collect()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordSource for InMemoryStore {
    async fn get_checklist_submissions(
        &self,
        user_id: &UserId,
        range: &PeriodRange,
    ) -> Result<Vec<ChecklistSubmission>, SourceError> {
        self.begin(SourceKind::Checklist).await?;
        Ok(self.select(RecordKind::Checklist, user_id, range, |r| match r {
            RawRecord::Checklist(s) => Some(s.clone()),
            _ => None,
        }))
    }

    async fn get_buddy_evaluations(
        &self,
        user_id: &UserId,
        range: &PeriodRange,
    ) -> Result<Vec<BuddyEvaluation>, SourceError> {
        self.begin(SourceKind::Buddy).await?;
        Ok(self.select(RecordKind::Buddy, user_id, range, |r| match r {
            RawRecord::Buddy(e) => Some(e.clone()),
            _ => None,
        }))
    }

    async fn get_hr_template_evaluations(
        &self,
        user_id: &UserId,
        range: &PeriodRange,
    ) -> Result<Vec<HrTemplateEvaluation>, SourceError> {
        self.begin(SourceKind::HrTemplate).await?;
        Ok(self.select(RecordKind::HrTemplate, user_id, range, |r| match r {
            RawRecord::HrTemplate(e) => Some(e.clone()),
            _ => None,
        }))
    }

    async fn get_attendance_adjustments(
        &self,
        user_id: &UserId,
        range: &PeriodRange,
    ) -> Result<AttendanceAdjustments, SourceError> {
        self.begin(SourceKind::Attendance).await?;
        Ok(AttendanceAdjustments {
            overtime: self.select(RecordKind::Overtime, user_id, range, |r| match r {
                RawRecord::Overtime(o) => Some(o.clone()),
                _ => None,
            }),
            absence: self.select(RecordKind::Absence, user_id, range, |r| match r {
                RawRecord::Absence(a) => Some(a.clone()),
                _ => None,
            }),
        })
    }

    async fn get_bonus_records(
        &self,
        user_id: &UserId,
        range: &PeriodRange,
    ) -> Result<Vec<BonusRecord>, SourceError> {
        self.begin(SourceKind::Bonus).await?;
        Ok(self.select(RecordKind::Bonus, user_id, range, |r| match r {
            RawRecord::Bonus(b) => Some(b.clone()),
            _ => None,
        }))
    }

    async fn get_control_evaluations(
        &self,
        user_id: &UserId,
        range: &PeriodRange,
    ) -> Result<Vec<ControlEvaluation>, SourceError> {
        self.begin(SourceKind::Control).await?;
        Ok(self.select(RecordKind::Control, user_id, range, |r| match r {
            RawRecord::Control(c) => Some(c.clone()),
            _ => None,
        }))
    }
}

#[async_trait]
impl RoleDirectory for InMemoryStore {
    async fn roles_of(&self, user_id: &UserId) -> Result<Option<Vec<RoleId>>, SourceError> {
        if !self.directory_available.load(Ordering::SeqCst) {
            return Err(SourceError::Unavailable("role directory disabled".to_string()));
        }
        Ok(self.roles.get(user_id).map(|roles| roles.clone()))
    }
}
