use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: i64,
    pub business_id: i64,
    /// Customer phone in WhatsApp `wa_id` form (digits only, with country code)
    pub phone: String,
    pub contact_name: Option<String>,
    pub agent_enabled: bool,
    pub last_message_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MessageDirection {
    Inbound,
    Outbound,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsAppMessage {
    pub id: i64,
    pub conversation_id: i64,
    pub direction: MessageDirection,
    pub message_type: String,
    pub content: String,
    pub wa_message_id: Option<String>,
    /// Delivery status reported by the provider (sent, delivered, read, failed)
    pub status: Option<String>,
    pub created_at: DateTime<Utc>,
}
