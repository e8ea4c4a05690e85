//! Shared fixtures for handler tests

use actix_web::web;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use crate::agent::runtime::testing::ScriptedLlm;
use crate::agent::AgentRuntime;
use crate::ai::{AiResponse, LlmClient, SpeechSynthesizer};
use crate::config::Config;
use crate::db::test_support::{seeded_db, Seed};
use crate::db::Database;
use crate::payments::{CheckoutRequest, GatewayPayment, PaymentGateway, Preapproval};
use crate::tools::create_default_registry;
use crate::whatsapp::WhatsAppMessenger;
use crate::AppState;

/// Returns the text bytes so tests can check chunk order
pub struct EchoSpeech;

#[async_trait]
impl SpeechSynthesizer for EchoSpeech {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, String> {
        Ok(format!("[{}]", text).into_bytes())
    }
}

/// Payment gateway answering from in-memory maps
#[derive(Default)]
pub struct FakeGateway {
    pub payments: HashMap<String, GatewayPayment>,
    pub preapprovals: HashMap<String, Preapproval>,
    pub cancelled: Mutex<Vec<String>>,
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_preapproval(&self, request: &CheckoutRequest<'_>) -> Result<Preapproval, String> {
        Ok(Preapproval {
            id: "pre-1".to_string(),
            status: "pending".to_string(),
            init_point: Some("https://gateway.test/checkout/pre-1".to_string()),
            external_reference: Some(request.account_id.to_string()),
        })
    }

    async fn cancel_preapproval(&self, preapproval_id: &str) -> Result<(), String> {
        self.cancelled.lock().push(preapproval_id.to_string());
        Ok(())
    }

    async fn get_preapproval(&self, preapproval_id: &str) -> Result<Preapproval, String> {
        self.preapprovals
            .get(preapproval_id)
            .cloned()
            .ok_or_else(|| "not found".to_string())
    }

    async fn get_payment(&self, payment_id: &str) -> Result<GatewayPayment, String> {
        self.payments
            .get(payment_id)
            .cloned()
            .ok_or_else(|| "not found".to_string())
    }
}

/// Records outbound texts instead of calling the Cloud API
#[derive(Default)]
pub struct RecordingMessenger {
    pub sent: Mutex<Vec<(String, String, String)>>,
}

#[async_trait]
impl WhatsAppMessenger for RecordingMessenger {
    async fn send_text(&self, phone_number_id: &str, to: &str, body: &str) -> Result<String, String> {
        let mut sent = self.sent.lock();
        sent.push((phone_number_id.to_string(), to.to_string(), body.to_string()));
        Ok(format!("wamid.out{}", sent.len()))
    }
}

pub struct StateBuilder {
    db: Database,
    config: Config,
    gateway: Option<Arc<dyn PaymentGateway>>,
    messenger: Option<Arc<dyn WhatsAppMessenger>>,
    llm: Arc<dyn LlmClient>,
}

impl StateBuilder {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            config: Config::default(),
            gateway: None,
            messenger: None,
            llm: Arc::new(ScriptedLlm::new(vec![AiResponse::text("¡Hola! ¿En qué te ayudo?")])),
        }
    }

    pub fn config(mut self, update: impl FnOnce(&mut Config)) -> Self {
        update(&mut self.config);
        self
    }

    pub fn gateway(mut self, gateway: Arc<dyn PaymentGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    pub fn messenger(mut self, messenger: Arc<dyn WhatsAppMessenger>) -> Self {
        self.messenger = Some(messenger);
        self
    }

    pub fn llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = llm;
        self
    }

    pub fn build(self) -> web::Data<AppState> {
        let db = Arc::new(self.db);
        let agent = Arc::new(AgentRuntime::new(db.clone(), self.llm, Arc::new(create_default_registry())));
        web::Data::new(AppState {
            db,
            config: self.config,
            gateway: self.gateway,
            messenger: self.messenger,
            speech: Arc::new(EchoSpeech),
            agent,
        })
    }
}

pub fn test_state() -> web::Data<AppState> {
    let db = Database::new(":memory:").unwrap();
    StateBuilder::new(db).build()
}

/// A bearer token for the seeded owner
pub fn owner_token(db: &Database, seed: &Seed) -> String {
    let token = format!("owner-token-{}", seed.user_id);
    db.create_session(seed.user_id, &token, Utc::now() + Duration::hours(1)).unwrap();
    token
}

pub fn seeded_state() -> (web::Data<AppState>, Seed, String) {
    let (db, seed) = seeded_db();
    let token = owner_token(&db, &seed);
    (StateBuilder::new(db).build(), seed, token)
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token))
}
