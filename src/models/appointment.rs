use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentInfo {
    pub id: String,
    pub booking_id: String,
    pub scheduled_date: NaiveDateTime,
    pub duration_minutes: u32,
    #[serde(default)]
    pub location: Option<String>,
    pub location_type: LocationType,
    pub status: AppointmentStatus,
    #[serde(default)]
    pub reminders: Vec<ReminderRecord>,
    /// Append-only.
    #[serde(default)]
    pub reschedule_history: Vec<RescheduleEntry>,
}

impl AppointmentInfo {
    pub fn ends_at(&self) -> NaiveDateTime {
        self.scheduled_date + Duration::minutes(i64::from(self.duration_minutes))
    }

    pub fn is_active(&self) -> bool {
        self.status != AppointmentStatus::Cancelled
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationType {
    #[default]
    InPerson,
    Online,
    Venue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    Cancelled,
    Completed,
    Rescheduled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Rescheduled => "rescheduled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderRecord {
    pub channel: String,
    pub sent_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RescheduleEntry {
    pub original_date: NaiveDateTime,
    pub new_date: NaiveDateTime,
    pub reason: String,
    pub initiator: RescheduleInitiator,
    pub timestamp: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RescheduleInitiator {
    Customer,
    Provider,
    System,
}
