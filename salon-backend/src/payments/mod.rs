//! Subscription billing through an external payment gateway

pub mod mercadopago;
pub mod signature;

pub use mercadopago::MercadoPagoClient;
pub use signature::{verify_signature, SignatureError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::Plan;

/// A recurring-payment authorization at the gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preapproval {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub init_point: Option<String>,
    #[serde(default)]
    pub external_reference: Option<String>,
}

/// A single charge at the gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayPayment {
    pub id: String,
    pub status: String,
    /// Amount in cents
    pub amount: i64,
    pub external_reference: Option<String>,
    pub preapproval_id: Option<String>,
}

pub struct CheckoutRequest<'a> {
    pub account_id: i64,
    pub plan: Plan,
    pub payer_email: &'a str,
    pub back_url: &'a str,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_preapproval(&self, request: &CheckoutRequest<'_>) -> Result<Preapproval, String>;

    async fn cancel_preapproval(&self, preapproval_id: &str) -> Result<(), String>;

    async fn get_preapproval(&self, preapproval_id: &str) -> Result<Preapproval, String>;

    async fn get_payment(&self, payment_id: &str) -> Result<GatewayPayment, String>;
}
