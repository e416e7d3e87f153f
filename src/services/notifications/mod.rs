pub mod webhook;

use async_trait::async_trait;

use crate::models::Booking;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_booking_confirmation(&self, booking: &Booking) -> anyhow::Result<()>;
}

/// Writes confirmations to the log only; used when no webhook is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_booking_confirmation(&self, booking: &Booking) -> anyhow::Result<()> {
        tracing::info!(
            booking_id = %booking.id,
            customer = %booking.customer.email,
            "booking confirmed (no notification channel configured)"
        );
        Ok(())
    }
}
