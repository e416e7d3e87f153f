use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::errors::BookingError;
use crate::models::{
    AppointmentInfo, AppointmentStatus, Booking, BookingStatus, BookingValidation, CustomerInfo,
    LocationType, PaymentInfo, PaymentStatus, PricingInfo, RefundRecord, ReminderRecord,
    RescheduleEntry, RescheduleInitiator, ServiceDetails,
};
use crate::services::clock::{Clock, IdGenerator};
use crate::services::notifications::Notifier;
use crate::services::payment::{PaymentGateway, PaymentProcessor, PaymentRequest};
use crate::services::pricing;
use crate::services::scheduling::{AppointmentRepository, ConflictChecker, SlotClaim};
use crate::services::store::KeyValueStore;
use crate::services::validation;

pub const BOOKING_KEY_PREFIX: &str = "booking:";

pub fn booking_key(id: &str) -> String {
    format!("{BOOKING_KEY_PREFIX}{id}")
}

/// External collaborators the engine is wired to.
pub struct Collaborators {
    pub store: Arc<dyn KeyValueStore>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub appointments: Arc<dyn AppointmentRepository>,
    pub notifier: Arc<dyn Notifier>,
    pub clock: Arc<dyn Clock>,
    pub ids: Arc<dyn IdGenerator>,
}

/// Shared, stateless part of the engine. One instance serves every controller.
pub struct EngineContext {
    pub store: Arc<dyn KeyValueStore>,
    pub appointments: Arc<dyn AppointmentRepository>,
    pub notifier: Arc<dyn Notifier>,
    pub clock: Arc<dyn Clock>,
    pub ids: Arc<dyn IdGenerator>,
    pub payments: PaymentProcessor,
    pub conflicts: ConflictChecker,
    pub call_timeout: Duration,
    pub default_currency: String,
}

impl EngineContext {
    pub fn new(collaborators: Collaborators, call_timeout: Duration, default_currency: &str) -> Self {
        let Collaborators {
            store,
            gateway,
            appointments,
            notifier,
            clock,
            ids,
        } = collaborators;

        Self {
            payments: PaymentProcessor::new(gateway, clock.clone(), ids.clone(), call_timeout),
            conflicts: ConflictChecker::new(appointments.clone()),
            store,
            appointments,
            notifier,
            clock,
            ids,
            call_timeout,
            default_currency: default_currency.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppointmentProposal {
    pub scheduled_date: NaiveDateTime,
    pub duration_minutes: u32,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub location_type: LocationType,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Runs a collaborator call under a deadline, mapping adapter failures to persistence errors.
async fn bounded<T>(
    limit: Duration,
    operation: &'static str,
    call: impl Future<Output = anyhow::Result<T>>,
) -> Result<T, BookingError> {
    match tokio::time::timeout(limit, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(BookingError::Persistence(format!("{operation}: {e:#}"))),
        Err(_) => Err(BookingError::Timeout { operation }),
    }
}

/// Sole mutator of one booking. Every operation checks the state machine before touching
/// anything, and external calls happen before the in-memory booking changes so a failure
/// leaves the pre-call state intact.
pub struct BookingController {
    ctx: Arc<EngineContext>,
    booking: Booking,
    dirty: bool,
}

impl BookingController {
    pub fn create(
        ctx: Arc<EngineContext>,
        service: ServiceDetails,
        customer: CustomerInfo,
    ) -> Result<Self, BookingError> {
        check_email(&customer)?;

        let now = ctx.clock.now();
        let booking = Booking {
            id: ctx.ids.next_id("bkg"),
            customer,
            service,
            pricing: PricingInfo::new(&ctx.default_currency),
            appointment: None,
            payment: None,
            status: BookingStatus::Draft,
            notes: String::new(),
            metadata: Default::default(),
            created_at: now,
            updated_at: now,
        };

        tracing::info!(
            booking_id = %booking.id,
            service_type = booking.service_type().as_str(),
            "booking created"
        );

        Ok(Self {
            ctx,
            booking,
            dirty: true,
        })
    }

    /// Wraps a booking loaded from the store; it starts clean.
    pub fn from_booking(ctx: Arc<EngineContext>, booking: Booking) -> Self {
        Self {
            ctx,
            booking,
            dirty: false,
        }
    }

    pub fn booking(&self) -> &Booking {
        &self.booking
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn validate(&self) -> BookingValidation {
        validation::validate(&self.booking)
    }

    // ── Guards ──

    fn illegal(&self, operation: &'static str) -> BookingError {
        BookingError::IllegalTransition {
            from: self.booking.status,
            operation,
        }
    }

    fn ensure_transition(
        &self,
        next: BookingStatus,
        operation: &'static str,
    ) -> Result<(), BookingError> {
        if self.booking.status.can_transition_to(next) {
            Ok(())
        } else {
            Err(self.illegal(operation))
        }
    }

    fn ensure_editable(&self, operation: &'static str) -> Result<(), BookingError> {
        match self.booking.status {
            BookingStatus::Draft | BookingStatus::PendingPayment => Ok(()),
            _ => Err(self.illegal(operation)),
        }
    }

    fn ensure_live(&self, operation: &'static str) -> Result<(), BookingError> {
        if self.booking.status.is_terminal() {
            Err(self.illegal(operation))
        } else {
            Ok(())
        }
    }

    fn active_appointment(&self) -> Result<&AppointmentInfo, BookingError> {
        self.booking
            .active_appointment()
            .ok_or(BookingError::NoAppointment)
    }

    // ── Mutation helpers ──

    fn touch(&mut self) {
        let now = self.ctx.clock.now();
        if now > self.booking.updated_at {
            self.booking.updated_at = now;
        }
        self.dirty = true;
    }

    fn set_status(&mut self, next: BookingStatus) {
        tracing::info!(
            booking_id = %self.booking.id,
            from = self.booking.status.as_str(),
            to = next.as_str(),
            "booking status changed"
        );
        self.booking.status = next;
    }

    fn timeout_or_default(&self, secs: Option<u64>) -> Duration {
        secs.map(Duration::from_secs).unwrap_or(self.ctx.call_timeout)
    }

    async fn notify_confirmed(&self) {
        let send = self.ctx.notifier.send_booking_confirmation(&self.booking);
        match tokio::time::timeout(self.ctx.call_timeout, send).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(booking_id = %self.booking.id, error = %e, "confirmation notification failed");
            }
            Err(_) => {
                tracing::warn!(booking_id = %self.booking.id, "confirmation notification timed out");
            }
        }
    }

    /// Saves right away after money has moved; a failure is left to the autosave loop.
    async fn persist_now(&mut self) {
        if let Err(e) = self.save().await {
            tracing::error!(booking_id = %self.booking.id, error = %e, "immediate save failed, will retry on autosave");
        }
    }

    // ── Field updates ──

    pub fn update_customer_info(&mut self, customer: CustomerInfo) -> Result<(), BookingError> {
        self.ensure_editable("update customer info on")?;
        check_email(&customer)?;
        self.booking.customer = customer;
        self.touch();
        Ok(())
    }

    pub fn update_service_details(&mut self, service: ServiceDetails) -> Result<(), BookingError> {
        self.ensure_editable("update service details on")?;
        if service.service_type() != self.booking.service_type() {
            return Err(BookingError::validation(
                "service.service_type",
                format!(
                    "service type is fixed as {}",
                    self.booking.service_type().as_str()
                ),
            ));
        }
        self.booking.service = service;
        self.touch();
        Ok(())
    }

    pub fn update_pricing(&mut self, mut pricing_info: PricingInfo) -> Result<(), BookingError> {
        self.ensure_editable("update pricing on")?;
        pricing::check_pricing(&pricing_info)?;
        pricing_info.currency = pricing_info.currency.trim().to_uppercase();
        pricing_info.total_price = pricing::calculate_total(&pricing_info);
        self.booking.pricing = pricing_info;
        self.touch();
        Ok(())
    }

    pub fn update_notes(&mut self, notes: String) -> Result<(), BookingError> {
        self.ensure_live("update notes on")?;
        self.booking.notes = notes;
        self.touch();
        Ok(())
    }

    /// `None` removes the key.
    pub fn set_metadata(&mut self, key: &str, value: Option<String>) -> Result<(), BookingError> {
        self.ensure_live("update metadata on")?;
        if key.trim().is_empty() {
            return Err(BookingError::validation("metadata", "key cannot be empty"));
        }
        match value {
            Some(v) => {
                self.booking.metadata.insert(key.to_string(), v);
            }
            None => {
                self.booking.metadata.remove(key);
            }
        }
        self.touch();
        Ok(())
    }

    /// Moves a complete draft to `pending_payment`.
    pub fn submit(&mut self) -> Result<(), BookingError> {
        if self.booking.status != BookingStatus::Draft {
            return Err(self.illegal("submit"));
        }
        let report = self.validate();
        if !report.is_valid {
            return Err(BookingError::Validation {
                errors: report.errors,
            });
        }
        self.set_status(BookingStatus::PendingPayment);
        self.touch();
        Ok(())
    }

    // ── Payments ──

    pub async fn process_payment(
        &mut self,
        request: PaymentRequest,
    ) -> Result<PaymentInfo, BookingError> {
        if !matches!(
            self.booking.status,
            BookingStatus::Draft | BookingStatus::PendingPayment
        ) {
            return Err(self.illegal("process payment for"));
        }
        let report = self.validate();
        if !report.is_valid {
            return Err(BookingError::Validation {
                errors: report.errors,
            });
        }

        let payment = self
            .ctx
            .payments
            .process_payment(&self.booking, &request)
            .await?;

        let next = match payment.status {
            PaymentStatus::Completed => BookingStatus::Confirmed,
            _ => BookingStatus::PaymentProcessing,
        };
        self.booking.payment = Some(payment.clone());
        self.set_status(next);
        self.touch();

        if next == BookingStatus::Confirmed {
            self.notify_confirmed().await;
        }
        self.persist_now().await;

        Ok(payment)
    }

    /// Records the gateway's final word on a charge that was accepted without settling.
    pub async fn settle_payment(&mut self, succeeded: bool, reason: &str) -> Result<(), BookingError> {
        if self.booking.status != BookingStatus::PaymentProcessing {
            return Err(self.illegal("settle payment for"));
        }
        let now = self.ctx.clock.now();
        let payment = self
            .booking
            .payment
            .as_mut()
            .filter(|p| p.status == PaymentStatus::Processing)
            .ok_or(BookingError::NoPayment)?;

        if succeeded {
            payment.status = PaymentStatus::Completed;
            payment.processed_at = Some(now);
            self.set_status(BookingStatus::Confirmed);
        } else {
            payment.status = PaymentStatus::Failed;
            self.booking
                .metadata
                .insert("payment_failure_reason".to_string(), reason.to_string());
            tracing::warn!(booking_id = %self.booking.id, reason, "payment settlement failed");
            self.set_status(BookingStatus::PendingPayment);
        }
        self.touch();

        if succeeded {
            self.notify_confirmed().await;
        }
        self.persist_now().await;
        Ok(())
    }

    /// Partial refunds leave the booking status alone; the refund that brings the total to
    /// the paid amount moves both payment and booking to `refunded`.
    pub async fn refund_payment(
        &mut self,
        amount: Decimal,
        reason: &str,
        timeout: Option<Duration>,
    ) -> Result<RefundRecord, BookingError> {
        self.ensure_live("refund")?;
        let payment = self.booking.payment.as_ref().ok_or(BookingError::NoPayment)?;

        let refund = self
            .ctx
            .payments
            .refund_payment(&self.booking.id, payment, amount, reason, timeout)
            .await?;

        let fully_refunded = match self.booking.payment.as_mut() {
            Some(payment) => {
                payment.refunds.push(refund.clone());
                if payment.refunded_total() >= payment.amount {
                    payment.status = PaymentStatus::Refunded;
                    true
                } else {
                    false
                }
            }
            None => false,
        };

        if fully_refunded {
            self.release_appointment_quietly().await;
            self.set_status(BookingStatus::Refunded);
        }
        self.touch();
        self.persist_now().await;

        Ok(refund)
    }

    /// Cancels the active appointment, if any, after the money is already gone. Repository
    /// failures are logged; the slot is reconciled on the next startup.
    async fn release_appointment_quietly(&mut self) {
        let Some(current) = self.booking.active_appointment() else {
            return;
        };
        let mut updated = current.clone();
        updated.status = AppointmentStatus::Cancelled;

        let limit = self.ctx.call_timeout;
        let release = self.ctx.appointments.release(&self.booking.id);
        if let Err(e) = bounded(limit, "release appointment", release).await {
            tracing::error!(booking_id = %self.booking.id, error = %e, "failed to release appointment slot");
        }
        self.booking.appointment = Some(updated);
    }

    // ── Appointments ──

    pub async fn schedule_appointment(
        &mut self,
        proposal: AppointmentProposal,
    ) -> Result<AppointmentInfo, BookingError> {
        self.ensure_transition(BookingStatus::Scheduled, "schedule an appointment for")?;
        let limit = self.timeout_or_default(proposal.timeout_secs);

        let conflicts = bounded(
            limit,
            "conflict check",
            self.ctx.conflicts.find_conflicts(
                proposal.scheduled_date,
                proposal.duration_minutes,
                Some(self.booking.id.as_str()),
            ),
        )
        .await?;
        if !conflicts.is_empty() {
            return Err(BookingError::Conflict { conflicts });
        }

        let appointment = AppointmentInfo {
            id: self.ctx.ids.next_id("apt"),
            booking_id: self.booking.id.clone(),
            scheduled_date: proposal.scheduled_date,
            duration_minutes: proposal.duration_minutes,
            location: proposal.location,
            location_type: proposal.location_type,
            status: AppointmentStatus::Scheduled,
            reminders: vec![],
            reschedule_history: vec![],
        };
        self.claim(&appointment, limit).await?;

        self.booking.appointment = Some(appointment.clone());
        self.set_status(BookingStatus::Scheduled);
        self.touch();
        // The slot is already claimed in the repository; keep the stored booking in step.
        self.persist_now().await;
        Ok(appointment)
    }

    pub async fn reschedule_appointment(
        &mut self,
        new_start: NaiveDateTime,
        reason: &str,
        initiator: RescheduleInitiator,
        timeout: Option<Duration>,
    ) -> Result<AppointmentInfo, BookingError> {
        if self.booking.status != BookingStatus::Scheduled {
            return Err(self.illegal("reschedule"));
        }
        let current = self.active_appointment()?.clone();
        let limit = timeout.unwrap_or(self.ctx.call_timeout);

        let conflicts = bounded(
            limit,
            "conflict check",
            self.ctx.conflicts.find_conflicts(
                new_start,
                current.duration_minutes,
                Some(self.booking.id.as_str()),
            ),
        )
        .await?;
        if !conflicts.is_empty() {
            return Err(BookingError::Conflict { conflicts });
        }

        let mut updated = current.clone();
        updated.reschedule_history.push(RescheduleEntry {
            original_date: current.scheduled_date,
            new_date: new_start,
            reason: reason.to_string(),
            initiator,
            timestamp: self.ctx.clock.now(),
        });
        updated.scheduled_date = new_start;
        updated.status = AppointmentStatus::Rescheduled;
        self.claim(&updated, limit).await?;

        tracing::info!(
            booking_id = %self.booking.id,
            from = %current.scheduled_date,
            to = %new_start,
            "appointment rescheduled"
        );
        self.booking.appointment = Some(updated.clone());
        self.touch();
        self.persist_now().await;
        Ok(updated)
    }

    async fn claim(&self, appointment: &AppointmentInfo, limit: Duration) -> Result<(), BookingError> {
        let claim = bounded(limit, "slot claim", self.ctx.appointments.claim_slot(appointment)).await?;
        match claim {
            SlotClaim::Claimed => Ok(()),
            SlotClaim::Conflicts(conflicts) => Err(BookingError::Conflict { conflicts }),
        }
    }

    /// Writes a changed appointment to the repository, then into the booking.
    async fn store_appointment(&mut self, appointment: AppointmentInfo) -> Result<(), BookingError> {
        bounded(
            self.ctx.call_timeout,
            "appointment update",
            self.ctx.appointments.upsert(&appointment),
        )
        .await?;
        self.booking.appointment = Some(appointment);
        Ok(())
    }

    pub async fn cancel_appointment(&mut self, reason: &str) -> Result<(), BookingError> {
        self.ensure_transition(BookingStatus::Cancelled, "cancel the appointment of")?;
        let mut updated = self.active_appointment()?.clone();
        updated.status = AppointmentStatus::Cancelled;

        self.store_appointment(updated).await?;
        self.booking
            .metadata
            .insert("cancellation_reason".to_string(), reason.to_string());
        self.set_status(BookingStatus::Cancelled);
        self.touch();
        Ok(())
    }

    /// Customer acknowledged the slot.
    pub async fn confirm_appointment(&mut self) -> Result<(), BookingError> {
        if self.booking.status != BookingStatus::Scheduled {
            return Err(self.illegal("confirm the appointment of"));
        }
        let mut updated = self.active_appointment()?.clone();
        if !matches!(
            updated.status,
            AppointmentStatus::Scheduled | AppointmentStatus::Rescheduled
        ) {
            return Err(self.illegal("confirm the appointment of"));
        }
        updated.status = AppointmentStatus::Confirmed;

        self.store_appointment(updated).await?;
        self.touch();
        Ok(())
    }

    pub async fn record_reminder(&mut self, channel: &str) -> Result<(), BookingError> {
        self.ensure_live("send a reminder for")?;
        let mut updated = self.active_appointment()?.clone();
        updated.reminders.push(ReminderRecord {
            channel: channel.to_string(),
            sent_at: self.ctx.clock.now(),
        });

        self.store_appointment(updated).await?;
        self.touch();
        Ok(())
    }

    // ── Day of service ──

    pub fn start_service(&mut self) -> Result<(), BookingError> {
        self.ensure_transition(BookingStatus::InProgress, "start")?;
        self.set_status(BookingStatus::InProgress);
        self.touch();
        Ok(())
    }

    pub async fn complete_booking(&mut self) -> Result<(), BookingError> {
        self.ensure_transition(BookingStatus::Completed, "complete")?;
        if let Some(current) = self.booking.active_appointment() {
            let mut updated = current.clone();
            updated.status = AppointmentStatus::Completed;
            self.store_appointment(updated).await?;
        }
        self.set_status(BookingStatus::Completed);
        self.touch();
        Ok(())
    }

    pub async fn cancel_booking(&mut self, reason: &str) -> Result<(), BookingError> {
        self.ensure_transition(BookingStatus::Cancelled, "cancel")?;
        if let Some(current) = self.booking.active_appointment() {
            let mut updated = current.clone();
            updated.status = AppointmentStatus::Cancelled;
            self.store_appointment(updated).await?;
        }
        self.booking
            .metadata
            .insert("cancellation_reason".to_string(), reason.to_string());
        self.set_status(BookingStatus::Cancelled);
        self.touch();
        Ok(())
    }

    pub fn mark_no_show(&mut self) -> Result<(), BookingError> {
        self.ensure_transition(BookingStatus::NoShow, "mark as no-show")?;
        self.set_status(BookingStatus::NoShow);
        self.touch();
        Ok(())
    }

    // ── Persistence ──

    pub async fn save(&mut self) -> Result<(), BookingError> {
        let bytes = serde_json::to_vec(&self.booking)
            .map_err(|e| BookingError::Persistence(e.to_string()))?;
        let key = booking_key(&self.booking.id);

        bounded(self.ctx.call_timeout, "booking save", self.ctx.store.set(&key, &bytes)).await?;
        self.dirty = false;
        tracing::debug!(booking_id = %self.booking.id, "booking saved");
        Ok(())
    }

    /// Returns whether anything was written.
    pub async fn save_if_dirty(&mut self) -> Result<bool, BookingError> {
        if !self.dirty {
            return Ok(false);
        }
        self.save().await?;
        Ok(true)
    }
}

fn check_email(customer: &CustomerInfo) -> Result<(), BookingError> {
    if !customer.email.trim().is_empty() && !customer.has_valid_email() {
        return Err(BookingError::validation(
            "customer.email",
            "email address is not valid",
        ));
    }
    Ok(())
}

/// Every stored booking, most recently updated first. Unreadable records are skipped.
pub async fn load_booking_history(store: &dyn KeyValueStore) -> anyhow::Result<Vec<Booking>> {
    let keys = store.list_keys(BOOKING_KEY_PREFIX).await?;

    let mut bookings = Vec::with_capacity(keys.len());
    for key in keys {
        let bytes = match store.get(&key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "failed to read stored booking, skipping");
                continue;
            }
        };
        match serde_json::from_slice::<Booking>(&bytes) {
            Ok(booking) => bookings.push(booking),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "malformed booking record, skipping");
            }
        }
    }

    bookings.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    Ok(bookings)
}
