use async_trait::async_trait;
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;

use super::{ChargeRequest, GatewayCharge, GatewayError, PaymentGateway};

/// JSON-over-HTTP gateway adapter. Expects `POST /charges` and `POST /refunds` endpoints that
/// answer with `{"id": ..., "status": ...}` or `{"error": {"message": ...}}`.
pub struct HttpPaymentGateway {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl HttpPaymentGateway {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client: reqwest::Client::new(),
        }
    }

    async fn post(&self, path: &str, body: serde_json::Value) -> Result<GatewayReply, GatewayError> {
        let resp = self
            .client
            .post(format!("{}{path}", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;

        let status = resp.status();
        let data: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| GatewayError::Unavailable(format!("unreadable response: {e}")))?;

        if !status.is_success() {
            return Err(error_from_response(status, &data));
        }

        serde_json::from_value(data)
            .map_err(|e| GatewayError::Unavailable(format!("unexpected response: {e}")))
    }
}

#[derive(Debug, Deserialize)]
struct GatewayReply {
    id: String,
    #[serde(default)]
    status: Option<String>,
}

fn error_from_response(status: StatusCode, data: &serde_json::Value) -> GatewayError {
    let message = data["error"]["message"]
        .as_str()
        .map(|s| s.to_string())
        .unwrap_or_else(|| format!("gateway returned {status}"));

    match status {
        StatusCode::PAYMENT_REQUIRED => GatewayError::Declined(message),
        s if s.is_server_error() => GatewayError::Unavailable(message),
        _ => GatewayError::Rejected(message),
    }
}

fn is_settled(status: Option<&str>) -> bool {
    !matches!(status, Some("pending") | Some("processing"))
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    fn name(&self) -> &str {
        "http"
    }

    async fn charge(&self, request: &ChargeRequest) -> Result<GatewayCharge, GatewayError> {
        let body = json!({
            "amount": request.amount.to_string(),
            "currency": request.currency,
            "method": request.method,
            "description": request.description,
            "reference": request.booking_id,
            "customer": {
                "name": request.customer.name,
                "email": request.customer.email,
            },
        });

        let reply = self.post("/charges", body).await?;
        Ok(GatewayCharge {
            settled: is_settled(reply.status.as_deref()),
            transaction_id: reply.id,
        })
    }

    async fn refund(
        &self,
        transaction_id: &str,
        amount: Decimal,
        currency: &str,
    ) -> Result<String, GatewayError> {
        let body = json!({
            "transaction_id": transaction_id,
            "amount": amount.to_string(),
            "currency": currency,
        });

        let reply = self.post("/refunds", body).await?;
        Ok(reply.id)
    }
}
