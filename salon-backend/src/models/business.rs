use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::Currency;

/// A single salon/location under a business account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Business {
    pub id: i64,
    pub account_id: i64,
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub currency: Currency,
    pub opening_time: NaiveTime,
    pub closing_time: NaiveTime,
    /// WhatsApp Cloud API phone number id used to route inbound webhooks
    pub whatsapp_phone_number_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_opening_time() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN)
}

fn default_closing_time() -> NaiveTime {
    NaiveTime::from_hms_opt(19, 0, 0).unwrap_or(NaiveTime::MIN)
}

/// Create/update payload for a business
#[derive(Debug, Clone, Deserialize)]
pub struct BusinessInput {
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    #[serde(default)]
    pub currency: Currency,
    #[serde(default = "default_opening_time")]
    pub opening_time: NaiveTime,
    #[serde(default = "default_closing_time")]
    pub closing_time: NaiveTime,
    pub whatsapp_phone_number_id: Option<String>,
}
