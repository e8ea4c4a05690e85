//! WhatsApp Cloud API integration

pub mod cloud_api;
pub mod payload;

pub use cloud_api::CloudApiClient;
pub use payload::{extract_message_content, verify_hub_signature, WebhookPayload};

use async_trait::async_trait;

/// Outbound messaging through a business phone number
#[async_trait]
pub trait WhatsAppMessenger: Send + Sync {
    /// Send a text message, returning the provider message id
    async fn send_text(&self, phone_number_id: &str, to: &str, body: &str) -> Result<String, String>;
}
