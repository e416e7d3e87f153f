use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, NaiveDateTime};
use rusqlite::Connection;

use crate::db::queries;
use crate::models::AppointmentInfo;

/// Half-open interval overlap: `[s1, s1+d1)` and `[s2, s2+d2)` intersect iff
/// `s1 < s2+d2 && s2 < s1+d1`. A zero-length interval intersects nothing.
pub fn overlaps(s1: NaiveDateTime, d1: u32, s2: NaiveDateTime, d2: u32) -> bool {
    if d1 == 0 || d2 == 0 {
        return false;
    }
    let e1 = s1 + Duration::minutes(i64::from(d1));
    let e2 = s2 + Duration::minutes(i64::from(d2));
    s1 < e2 && s2 < e1
}

pub enum SlotClaim {
    Claimed,
    Conflicts(Vec<AppointmentInfo>),
}

/// Shared view of every booking's appointment, used for conflict detection.
#[async_trait]
pub trait AppointmentRepository: Send + Sync {
    async fn find_overlapping(
        &self,
        start: NaiveDateTime,
        duration_minutes: u32,
        exclude_booking: Option<&str>,
    ) -> anyhow::Result<Vec<AppointmentInfo>>;

    /// Checks for overlaps and stores `appointment` as one atomic step, so two concurrent
    /// claims for the same slot cannot both succeed. The appointment's own booking is
    /// ignored when checking.
    async fn claim_slot(&self, appointment: &AppointmentInfo) -> anyhow::Result<SlotClaim>;

    async fn upsert(&self, appointment: &AppointmentInfo) -> anyhow::Result<()>;

    /// Frees whatever slot the booking holds. Returns false if it held none.
    async fn release(&self, booking_id: &str) -> anyhow::Result<bool>;

    async fn list_active(&self) -> anyhow::Result<Vec<AppointmentInfo>>;
}

pub struct SqliteAppointmentRepository {
    db: Arc<Mutex<Connection>>,
}

impl SqliteAppointmentRepository {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AppointmentRepository for SqliteAppointmentRepository {
    async fn find_overlapping(
        &self,
        start: NaiveDateTime,
        duration_minutes: u32,
        exclude_booking: Option<&str>,
    ) -> anyhow::Result<Vec<AppointmentInfo>> {
        let db = self.db.lock().unwrap();
        queries::find_overlapping_appointments(&db, &start, duration_minutes, exclude_booking)
    }

    async fn claim_slot(&self, appointment: &AppointmentInfo) -> anyhow::Result<SlotClaim> {
        let db = self.db.lock().unwrap();
        let tx = db.unchecked_transaction()?;

        let conflicts = queries::find_overlapping_appointments(
            &tx,
            &appointment.scheduled_date,
            appointment.duration_minutes,
            Some(&appointment.booking_id),
        )?;
        if !conflicts.is_empty() {
            return Ok(SlotClaim::Conflicts(conflicts));
        }

        queries::upsert_appointment(&tx, appointment)?;
        tx.commit()?;
        Ok(SlotClaim::Claimed)
    }

    async fn upsert(&self, appointment: &AppointmentInfo) -> anyhow::Result<()> {
        let db = self.db.lock().unwrap();
        queries::upsert_appointment(&db, appointment)
    }

    async fn release(&self, booking_id: &str) -> anyhow::Result<bool> {
        let db = self.db.lock().unwrap();
        queries::delete_appointment(&db, booking_id)
    }

    async fn list_active(&self) -> anyhow::Result<Vec<AppointmentInfo>> {
        let db = self.db.lock().unwrap();
        queries::list_active_appointments(&db)
    }
}

/// Reports appointments that overlap a proposed window. Read-only.
pub struct ConflictChecker {
    repository: Arc<dyn AppointmentRepository>,
}

impl ConflictChecker {
    pub fn new(repository: Arc<dyn AppointmentRepository>) -> Self {
        Self { repository }
    }

    pub async fn find_conflicts(
        &self,
        start: NaiveDateTime,
        duration_minutes: u32,
        exclude_booking: Option<&str>,
    ) -> anyhow::Result<Vec<AppointmentInfo>> {
        if duration_minutes == 0 {
            return Ok(vec![]);
        }

        let candidates = self
            .repository
            .find_overlapping(start, duration_minutes, exclude_booking)
            .await?;

        // Repositories may answer with a coarser window; the overlap rule is authoritative.
        Ok(candidates
            .into_iter()
            .filter(|a| {
                a.is_active()
                    && exclude_booking != Some(a.booking_id.as_str())
                    && overlaps(start, duration_minutes, a.scheduled_date, a.duration_minutes)
            })
            .collect())
    }
}
