use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use std::io;
use std::sync::Arc;

mod agent;
mod ai;
mod config;
mod controllers;
mod db;
mod domain;
mod error;
mod middleware;
mod models;
mod payments;
mod scheduler;
mod services;
mod tools;
mod whatsapp;

#[cfg(test)]
mod testing;

use agent::AgentRuntime;
use ai::{LlmClient, OpenAIClient, OpenAISpeechClient, SpeechSynthesizer};
use config::Config;
use db::Database;
use error::{AppError, AppResult};
use payments::{MercadoPagoClient, PaymentGateway};
use scheduler::{Scheduler, SchedulerConfig};
use whatsapp::{CloudApiClient, WhatsAppMessenger};

pub struct AppState {
    pub db: Arc<Database>,
    pub config: Config,
    /// Absent when no payment access token is configured
    pub gateway: Option<Arc<dyn PaymentGateway>>,
    /// Absent when no WhatsApp access token is configured
    pub messenger: Option<Arc<dyn WhatsAppMessenger>>,
    pub speech: Arc<dyn SpeechSynthesizer>,
    pub agent: Arc<AgentRuntime>,
}

impl AppState {
    pub fn gateway(&self) -> AppResult<&dyn PaymentGateway> {
        self.gateway
            .as_deref()
            .ok_or_else(|| AppError::External("Payment gateway is not configured".to_string()))
    }

    pub fn messenger(&self) -> AppResult<&dyn WhatsAppMessenger> {
        self.messenger
            .as_deref()
            .ok_or_else(|| AppError::External("WhatsApp messaging is not configured".to_string()))
    }
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = Config::from_env().map_err(io::Error::other)?;
    let port = config.port;

    log::info!("Initializing database at {}", config.database_url);
    let db = Arc::new(Database::new(&config.database_url).map_err(io::Error::other)?);

    let gateway: Option<Arc<dyn PaymentGateway>> = match config.payment_access_token.as_deref() {
        Some(token) => Some(Arc::new(
            MercadoPagoClient::new(token, &config.payment_api_base).map_err(io::Error::other)?,
        )),
        None => {
            log::warn!("PAYMENT_ACCESS_TOKEN not set, subscription checkout is disabled");
            None
        }
    };
    if config.payment_webhook_secret.is_none() {
        log::warn!("PAYMENT_WEBHOOK_SECRET not set, payment webhooks will be rejected");
    }

    let messenger: Option<Arc<dyn WhatsAppMessenger>> = match config.whatsapp_access_token.as_deref() {
        Some(token) => Some(Arc::new(
            CloudApiClient::new(token, &config.whatsapp_api_base).map_err(io::Error::other)?,
        )),
        None => {
            log::warn!("WHATSAPP_ACCESS_TOKEN not set, outbound WhatsApp messages are disabled");
            None
        }
    };

    if config.llm_api_key.is_empty() {
        log::warn!("LLM_API_KEY not set, assistant requests will go out unauthenticated");
    }
    let llm: Arc<dyn LlmClient> = Arc::new(
        OpenAIClient::new(&config.llm_api_key, Some(&config.llm_endpoint), Some(&config.llm_model))
            .map_err(io::Error::other)?,
    );
    let speech: Arc<dyn SpeechSynthesizer> = Arc::new(
        OpenAISpeechClient::new(&config.llm_api_key, &config.tts_endpoint, &config.tts_voice)
            .map_err(io::Error::other)?,
    );

    log::info!("Initializing tool registry");
    let tool_registry = Arc::new(tools::create_default_registry());
    log::info!("Registered {} tools", tool_registry.len());
    let agent = Arc::new(AgentRuntime::new(db.clone(), llm, tool_registry));

    log::info!("Initializing scheduler");
    let scheduler = Arc::new(
        Scheduler::new(db.clone(), messenger.clone(), SchedulerConfig::from(&config)).map_err(io::Error::other)?,
    );
    let scheduler_handle = Arc::clone(&scheduler);
    let (scheduler_shutdown_tx, scheduler_shutdown_rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        scheduler_handle.start(scheduler_shutdown_rx).await;
    });

    log::info!("Starting salon backend on port {}", port);

    let state = web::Data::new(AppState {
        db,
        config,
        gateway,
        messenger,
        speech,
        agent,
    });

    let result = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .expose_headers(["x-session-id"])
            .max_age(3600);

        App::new()
            .app_data(state.clone())
            .wrap(Logger::default())
            .wrap(cors)
            .configure(controllers::health::config)
            .configure(controllers::auth::config)
            .configure(controllers::account::config)
            .configure(controllers::businesses::config)
            .configure(controllers::catalog::config)
            .configure(controllers::clients::config)
            .configure(controllers::appointments::config)
            .configure(controllers::invoices::config)
            .configure(controllers::commissions::config)
            .configure(controllers::inventory::config)
            .configure(controllers::dashboard::config)
            .configure(controllers::subscriptions::config)
            .configure(controllers::whatsapp::config)
            .configure(controllers::agent::config)
            .configure(controllers::webhooks::config)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await;

    let _ = scheduler_shutdown_tx.send(());
    result
}
