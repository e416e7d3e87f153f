use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::{AppointmentInfo, CustomerInfo, PaymentInfo, PricingInfo, ServiceDetails, ServiceType};

/// Aggregate root for one customer's reservation of a service.
///
/// Only [`crate::services::lifecycle::BookingController`] mutates a booking; everything else
/// reads snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub customer: CustomerInfo,
    pub service: ServiceDetails,
    pub pricing: PricingInfo,
    #[serde(default)]
    pub appointment: Option<AppointmentInfo>,
    #[serde(default)]
    pub payment: Option<PaymentInfo>,
    pub status: BookingStatus,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Booking {
    pub fn service_type(&self) -> ServiceType {
        self.service.service_type()
    }

    /// The appointment, unless it has been cancelled.
    pub fn active_appointment(&self) -> Option<&AppointmentInfo> {
        self.appointment.as_ref().filter(|a| a.is_active())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Draft,
    PendingPayment,
    PaymentProcessing,
    Confirmed,
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
    Refunded,
    NoShow,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Draft => "draft",
            BookingStatus::PendingPayment => "pending_payment",
            BookingStatus::PaymentProcessing => "payment_processing",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Scheduled => "scheduled",
            BookingStatus::InProgress => "in_progress",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Refunded => "refunded",
            BookingStatus::NoShow => "no_show",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingStatus::Completed
                | BookingStatus::Cancelled
                | BookingStatus::Refunded
                | BookingStatus::NoShow
        )
    }

    /// Edges of the booking state machine. Terminal states have no outgoing edges; every
    /// other state may move to `cancelled`, `refunded` or `no_show`.
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        use BookingStatus::*;

        if self.is_terminal() {
            return false;
        }
        if matches!(next, Cancelled | Refunded | NoShow) {
            return true;
        }

        matches!(
            (self, next),
            (Draft, PendingPayment)
                | (Draft, PaymentProcessing)
                | (Draft, Confirmed)
                | (PendingPayment, PaymentProcessing)
                | (PendingPayment, Confirmed)
                | (PaymentProcessing, Confirmed)
                | (PaymentProcessing, PendingPayment)
                | (Confirmed, Scheduled)
                | (Scheduled, InProgress)
                | (InProgress, Completed)
        )
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
