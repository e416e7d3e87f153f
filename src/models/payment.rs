use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentInfo {
    pub id: String,
    pub amount: Decimal,
    pub currency: String,
    pub method: PaymentMethod,
    pub gateway: String,
    #[serde(default)]
    pub transaction_id: Option<String>,
    pub status: PaymentStatus,
    #[serde(default)]
    pub refunds: Vec<RefundRecord>,
    pub created_at: NaiveDateTime,
    #[serde(default)]
    pub processed_at: Option<NaiveDateTime>,
}

impl PaymentInfo {
    pub fn refunded_total(&self) -> Decimal {
        self.refunds.iter().map(|r| r.amount).sum()
    }

    /// What can still be returned to the customer.
    pub fn refundable(&self) -> Decimal {
        (self.amount - self.refunded_total()).max(Decimal::ZERO)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub kind: PaymentMethodKind,
    /// Gateway-issued token for the instrument (card token, mandate id, ...).
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethodKind {
    Card,
    BankTransfer,
    Paypal,
    Cash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Refunded,
    Cancelled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Processing => "processing",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefundRecord {
    pub id: String,
    pub amount: Decimal,
    pub reason: String,
    #[serde(default)]
    pub gateway_refund_id: Option<String>,
    pub processed_at: NaiveDateTime,
}
