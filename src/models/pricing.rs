use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingInfo {
    pub base_price: Decimal,
    #[serde(default)]
    pub adjustments: Vec<PriceAdjustment>,
    #[serde(default)]
    pub discounts: Vec<Discount>,
    /// Derived from the fields above; see [`crate::services::pricing::calculate_total`].
    #[serde(default)]
    pub total_price: Decimal,
    pub currency: String,
    #[serde(default)]
    pub payment_schedule: Option<Vec<Installment>>,
}

impl PricingInfo {
    pub fn new(currency: &str) -> Self {
        Self {
            base_price: Decimal::ZERO,
            adjustments: vec![],
            discounts: vec![],
            total_price: Decimal::ZERO,
            currency: currency.to_string(),
            payment_schedule: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceAdjustment {
    pub amount: Decimal,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Discount {
    /// Percent of the running total at the point the discount is applied.
    Percentage { percent: Decimal, description: String },
    Fixed { amount: Decimal, description: String },
}

impl Discount {
    pub fn description(&self) -> &str {
        match self {
            Discount::Percentage { description, .. } | Discount::Fixed { description, .. } => {
                description
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Installment {
    pub due_date: NaiveDate,
    pub amount: Decimal,
    #[serde(default)]
    pub paid: bool,
}
