use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rust_decimal::Decimal;

use crate::models::{AppointmentInfo, BookingStatus};
use crate::services::payment::GatewayError;

/// Failures a controller operation reports to its caller. None of them leave a partial
/// mutation behind.
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("booking is incomplete or invalid")]
    Validation { errors: BTreeMap<String, String> },

    #[error("requested time conflicts with {} existing appointment(s)", conflicts.len())]
    Conflict { conflicts: Vec<AppointmentInfo> },

    #[error("payment gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("cannot {operation} a booking in status {from}")]
    IllegalTransition {
        from: BookingStatus,
        operation: &'static str,
    },

    #[error("over-refund: requested {requested}, refundable {refundable}")]
    OverRefund { requested: Decimal, refundable: Decimal },

    #[error("booking has no completed payment")]
    NoPayment,

    #[error("booking has no active appointment")]
    NoAppointment,

    #[error("{operation} timed out")]
    Timeout { operation: &'static str },

    #[error("persistence error: {0}")]
    Persistence(String),
}

impl BookingError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        let mut errors = BTreeMap::new();
        errors.insert(field.to_string(), message.into());
        BookingError::Validation { errors }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Booking(#[from] BookingError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Booking(e) => match e {
                BookingError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                BookingError::Conflict { .. } => StatusCode::CONFLICT,
                BookingError::Gateway(GatewayError::Timeout) => StatusCode::GATEWAY_TIMEOUT,
                BookingError::Gateway(GatewayError::Unavailable(_)) => StatusCode::BAD_GATEWAY,
                BookingError::Gateway(GatewayError::NotConfigured) => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                BookingError::Gateway(_) => StatusCode::PAYMENT_REQUIRED,
                BookingError::IllegalTransition { .. } => StatusCode::CONFLICT,
                BookingError::OverRefund { .. } => StatusCode::CONFLICT,
                BookingError::NoPayment | BookingError::NoAppointment => StatusCode::CONFLICT,
                BookingError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                BookingError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let mut body = serde_json::json!({ "success": false, "error": self.to_string() });
        match &self {
            AppError::Booking(BookingError::Conflict { conflicts }) => {
                body["conflicts"] = serde_json::json!(conflicts);
            }
            AppError::Booking(BookingError::Validation { errors }) => {
                body["errors"] = serde_json::json!(errors);
            }
            _ => {}
        }

        (status, axum::Json(body)).into_response()
    }
}
