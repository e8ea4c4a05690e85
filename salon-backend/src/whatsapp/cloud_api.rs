use async_trait::async_trait;
use reqwest::{header, Client};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use super::WhatsAppMessenger;

/// Graph API client for `/{phone_number_id}/messages`
#[derive(Clone)]
pub struct CloudApiClient {
    client: Client,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    #[serde(default)]
    messages: Vec<SentMessage>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    id: String,
}

#[derive(Debug, Deserialize)]
struct GraphErrorResponse {
    error: GraphError,
}

#[derive(Debug, Deserialize)]
struct GraphError {
    message: String,
}

impl CloudApiClient {
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
}

#[async_trait]
impl WhatsAppMessenger for CloudApiClient {
    async fn send_text(&self, phone_number_id: &str, to: &str, body: &str) -> Result<String, String> {
        let payload = json!({
            "messaging_product": "whatsapp",
            "recipient_type": "individual",
            "to": to,
            "type": "text",
            "text": { "preview_url": false, "body": body }
        });

        let response = self
            .client
            .post(format!("{}/{}/messages", self.api_base, phone_number_id))
            .json(&payload)
            .send()
            .await
            .map_err(|e| format!("WhatsApp API request failed: {}", e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| format!("Failed to read WhatsApp response: {}", e))?;

        if !status.is_success() {
            if let Ok(error) = serde_json::from_str::<GraphErrorResponse>(&text) {
                return Err(format!("WhatsApp API error: {}", error.error.message));
            }
            return Err(format!("WhatsApp API returned error status: {}, body: {}", status, text));
        }

        let parsed: SendResponse = serde_json::from_str(&text)
            .map_err(|e| format!("Failed to parse WhatsApp response: {} - body: {}", e, text))?;
        let id = parsed
            .messages
            .into_iter()
            .next()
            .map(|m| m.id)
            .ok_or_else(|| "WhatsApp API returned no message id".to_string())?;

        log::info!("[WHATSAPP] Sent message {} to {}", id, to);
        Ok(id)
    }
}
