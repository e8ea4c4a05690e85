//! Mercado Pago REST client for preapprovals (recurring subscriptions)

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use super::{CheckoutRequest, GatewayPayment, PaymentGateway, Preapproval};

#[derive(Clone)]
pub struct MercadoPagoClient {
    client: Client,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct PaymentResponse {
    id: Value,
    status: String,
    #[serde(default)]
    transaction_amount: f64,
    #[serde(default)]
    external_reference: Option<String>,
    #[serde(default)]
    metadata: Option<Value>,
    #[serde(default)]
    point_of_interaction: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: String,
}

/// Ids come back as numbers for payments and strings for preapprovals
fn id_to_string(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Major units (e.g. 49900.0 COP) to cents
fn to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

impl MercadoPagoClient {
    pub fn new(access_token: &str, api_base: &str) -> Result<Self, String> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        let auth_value = header::HeaderValue::from_str(&format!("Bearer {}", access_token))
            .map_err(|e| format!("Invalid access token format: {}", e))?;
        headers.insert(header::AUTHORIZATION, auth_value);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    async fn read<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T, String> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| format!("Failed to read gateway response: {}", e))?;

        if !status.is_success() {
            if let Ok(error) = serde_json::from_str::<ErrorResponse>(&body) {
                return Err(format!("Gateway error: {}", error.message));
            }
            return Err(format!("Gateway returned error status: {}, body: {}", status, body));
        }

        serde_json::from_str(&body).map_err(|e| format!("Failed to parse gateway response: {} - body: {}", e, body))
    }
}

#[async_trait]
impl PaymentGateway for MercadoPagoClient {
    async fn create_preapproval(&self, request: &CheckoutRequest<'_>) -> Result<Preapproval, String> {
        let body = json!({
            "reason": format!("Salon {} plan", request.plan.label()),
            "external_reference": request.account_id.to_string(),
            "payer_email": request.payer_email,
            "back_url": request.back_url,
            "auto_recurring": {
                "frequency": 1,
                "frequency_type": "months",
                "transaction_amount": request.plan.monthly_price() as f64 / 100.0,
                "currency_id": "COP"
            },
            "status": "pending"
        });

        log::info!(
            "[PAYMENTS] Creating preapproval for account {} on plan {}",
            request.account_id,
            request.plan
        );
        let response = self
            .client
            .post(format!("{}/preapproval", self.api_base))
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("Gateway request failed: {}", e))?;
        Self::read(response).await
    }

    async fn cancel_preapproval(&self, preapproval_id: &str) -> Result<(), String> {
        let response = self
            .client
            .put(format!("{}/preapproval/{}", self.api_base, preapproval_id))
            .json(&json!({ "status": "cancelled" }))
            .send()
            .await
            .map_err(|e| format!("Gateway request failed: {}", e))?;
        let _: Value = Self::read(response).await?;
        Ok(())
    }

    async fn get_preapproval(&self, preapproval_id: &str) -> Result<Preapproval, String> {
        let response = self
            .client
            .get(format!("{}/preapproval/{}", self.api_base, preapproval_id))
            .send()
            .await
            .map_err(|e| format!("Gateway request failed: {}", e))?;
        Self::read(response).await
    }

    async fn get_payment(&self, payment_id: &str) -> Result<GatewayPayment, String> {
        let response = self
            .client
            .get(format!("{}/v1/payments/{}", self.api_base, payment_id))
            .send()
            .await
            .map_err(|e| format!("Gateway request failed: {}", e))?;
        let payment: PaymentResponse = Self::read(response).await?;

        let preapproval_id = payment
            .metadata
            .as_ref()
            .and_then(|m| m.get("preapproval_id"))
            .or_else(|| {
                payment
                    .point_of_interaction
                    .as_ref()
                    .and_then(|p| p.pointer("/transaction_data/subscription_id"))
            })
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(GatewayPayment {
            id: id_to_string(&payment.id),
            status: payment.status,
            amount: to_cents(payment.transaction_amount),
            external_reference: payment.external_reference,
            preapproval_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_conversion() {
        assert_eq!(to_cents(49_900.0), 4_990_000);
        assert_eq!(to_cents(12.345), 1_235);
    }

    #[test]
    fn test_numeric_and_string_ids() {
        assert_eq!(id_to_string(&json!(123456789)), "123456789");
        assert_eq!(id_to_string(&json!("2c938084")), "2c938084");
    }
}
