pub mod http;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::BookingError;
use crate::models::{
    Booking, CustomerInfo, PaymentInfo, PaymentMethod, PaymentStatus, RefundRecord,
};
use crate::services::clock::{Clock, IdGenerator};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GatewayError {
    #[error("card declined: {0}")]
    Declined(String),

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("gateway unavailable: {0}")]
    Unavailable(String),

    #[error("gateway call timed out")]
    Timeout,

    #[error("no payment gateway is configured")]
    NotConfigured,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChargeRequest {
    pub booking_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub method: PaymentMethod,
    pub customer: CustomerInfo,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct GatewayCharge {
    pub transaction_id: String,
    /// False when the gateway accepted the charge but will report the outcome later.
    pub settled: bool,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    fn name(&self) -> &str;

    async fn charge(&self, request: &ChargeRequest) -> Result<GatewayCharge, GatewayError>;

    /// Returns the gateway's refund id.
    async fn refund(
        &self,
        transaction_id: &str,
        amount: Decimal,
        currency: &str,
    ) -> Result<String, GatewayError>;
}

/// Stand-in used when no gateway is configured; every call fails with a clear reason.
pub struct UnconfiguredGateway;

#[async_trait]
impl PaymentGateway for UnconfiguredGateway {
    fn name(&self) -> &str {
        "unconfigured"
    }

    async fn charge(&self, _request: &ChargeRequest) -> Result<GatewayCharge, GatewayError> {
        Err(GatewayError::NotConfigured)
    }

    async fn refund(&self, _: &str, _: Decimal, _: &str) -> Result<String, GatewayError> {
        Err(GatewayError::NotConfigured)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentRequest {
    pub amount: Decimal,
    pub currency: String,
    pub method: PaymentMethod,
    #[serde(default)]
    pub description: String,
    /// Overrides the configured gateway timeout.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Talks to the gateway and builds payment records. It never touches the booking itself and
/// never retries.
pub struct PaymentProcessor {
    gateway: Arc<dyn PaymentGateway>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    default_timeout: Duration,
}

impl PaymentProcessor {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
        default_timeout: Duration,
    ) -> Self {
        Self {
            gateway,
            clock,
            ids,
            default_timeout,
        }
    }

    pub async fn process_payment(
        &self,
        booking: &Booking,
        request: &PaymentRequest,
    ) -> Result<PaymentInfo, BookingError> {
        if request.amount <= Decimal::ZERO {
            return Err(BookingError::validation(
                "payment.amount",
                "amount must be greater than zero",
            ));
        }
        if !request.currency.eq_ignore_ascii_case(&booking.pricing.currency) {
            return Err(BookingError::validation(
                "payment.currency",
                format!("booking is priced in {}", booking.pricing.currency),
            ));
        }

        let charge_request = ChargeRequest {
            booking_id: booking.id.clone(),
            amount: request.amount,
            currency: booking.pricing.currency.clone(),
            method: request.method.clone(),
            customer: booking.customer.clone(),
            description: request.description.clone(),
        };

        let limit = request
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(self.default_timeout);
        let charge = match tokio::time::timeout(limit, self.gateway.charge(&charge_request)).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout),
        };

        let charge = charge.map_err(|e| {
            tracing::warn!(booking_id = %booking.id, error = %e, "payment charge failed");
            e
        })?;

        let now = self.clock.now();
        let status = if charge.settled {
            PaymentStatus::Completed
        } else {
            PaymentStatus::Processing
        };

        tracing::info!(
            booking_id = %booking.id,
            transaction_id = %charge.transaction_id,
            amount = %request.amount,
            status = status.as_str(),
            "payment charged"
        );

        Ok(PaymentInfo {
            id: self.ids.next_id("pay"),
            amount: request.amount,
            currency: booking.pricing.currency.clone(),
            method: request.method.clone(),
            gateway: self.gateway.name().to_string(),
            transaction_id: Some(charge.transaction_id),
            status,
            refunds: vec![],
            created_at: now,
            processed_at: charge.settled.then_some(now),
        })
    }

    /// Refunds part or all of a completed payment. Over-refunds are rejected before the
    /// gateway is contacted.
    pub async fn refund_payment(
        &self,
        booking_id: &str,
        payment: &PaymentInfo,
        amount: Decimal,
        reason: &str,
        timeout: Option<Duration>,
    ) -> Result<RefundRecord, BookingError> {
        if payment.status != PaymentStatus::Completed {
            return Err(BookingError::NoPayment);
        }
        if amount <= Decimal::ZERO {
            return Err(BookingError::validation(
                "refund.amount",
                "amount must be greater than zero",
            ));
        }
        let refundable = payment.refundable();
        if amount > refundable {
            return Err(BookingError::OverRefund {
                requested: amount,
                refundable,
            });
        }
        let transaction_id = payment.transaction_id.as_deref().ok_or(BookingError::NoPayment)?;

        let limit = timeout.unwrap_or(self.default_timeout);
        let refund = self.gateway.refund(transaction_id, amount, &payment.currency);
        let gateway_refund_id = match tokio::time::timeout(limit, refund).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout),
        }
        .map_err(|e| {
            tracing::warn!(booking_id, error = %e, "refund failed");
            e
        })?;

        tracing::info!(booking_id, amount = %amount, reason, "refund processed");

        Ok(RefundRecord {
            id: self.ids.next_id("rfd"),
            amount,
            reason: reason.to_string(),
            gateway_refund_id: Some(gateway_refund_id),
            processed_at: self.clock.now(),
        })
    }
}
