use anyhow::Context;
use async_trait::async_trait;
use serde_json::json;

use super::Notifier;
use crate::models::Booking;

pub struct WebhookNotifier {
    url: String,
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(url: String) -> Self {
        Self {
            url,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send_booking_confirmation(&self, booking: &Booking) -> anyhow::Result<()> {
        let body = json!({
            "event": "booking.confirmed",
            "booking_id": booking.id,
            "service_type": booking.service_type().as_str(),
            "customer": {
                "name": booking.customer.name,
                "email": booking.customer.email,
                "phone": booking.customer.phone,
                "preferred_contact": booking.customer.preferred_contact,
            },
            "total_price": booking.pricing.total_price.to_string(),
            "currency": booking.pricing.currency,
        });

        self.client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .context("failed to deliver booking confirmation webhook")?
            .error_for_status()
            .context("notification webhook returned error")?;

        Ok(())
    }
}
