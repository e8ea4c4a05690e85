use std::env;
use std::str::FromStr;

#[derive(Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub session_ttl_hours: i64,
    pub payment_access_token: Option<String>,
    pub payment_webhook_secret: Option<String>,
    pub payment_api_base: String,
    pub payment_back_url: String,
    pub whatsapp_verify_token: Option<String>,
    pub whatsapp_app_secret: Option<String>,
    pub whatsapp_access_token: Option<String>,
    pub whatsapp_api_base: String,
    pub llm_endpoint: String,
    pub llm_api_key: String,
    pub llm_model: String,
    pub tts_endpoint: String,
    pub tts_voice: String,
    pub agent_idle_timeout_secs: u64,
    pub reminder_cron: String,
    pub reminder_lead_hours: i64,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Ok(Self {
            port: parse_var("PORT", 8080)?,
            database_url: var_or("DATABASE_URL", "./.db/salon.db"),
            session_ttl_hours: parse_var("SESSION_TTL_HOURS", 168)?,
            payment_access_token: optional_var("PAYMENT_ACCESS_TOKEN"),
            payment_webhook_secret: optional_var("PAYMENT_WEBHOOK_SECRET"),
            payment_api_base: var_or("PAYMENT_API_BASE", "https://api.mercadopago.com"),
            payment_back_url: var_or("PAYMENT_BACK_URL", "http://localhost:8080/billing"),
            whatsapp_verify_token: optional_var("WHATSAPP_VERIFY_TOKEN"),
            whatsapp_app_secret: optional_var("WHATSAPP_APP_SECRET"),
            whatsapp_access_token: optional_var("WHATSAPP_ACCESS_TOKEN"),
            whatsapp_api_base: var_or("WHATSAPP_API_BASE", "https://graph.facebook.com/v19.0"),
            llm_endpoint: var_or("LLM_ENDPOINT", "https://api.openai.com/v1/chat/completions"),
            llm_api_key: var_or("LLM_API_KEY", ""),
            llm_model: var_or("LLM_MODEL", "gpt-4o-mini"),
            tts_endpoint: var_or("TTS_ENDPOINT", "https://api.openai.com/v1/audio/speech"),
            tts_voice: var_or("TTS_VOICE", "alloy"),
            agent_idle_timeout_secs: parse_var("AGENT_IDLE_TIMEOUT_SECS", 25)?,
            reminder_cron: var_or("REMINDER_CRON", "0 */10 * * * *"),
            reminder_lead_hours: parse_var("REMINDER_LEAD_HOURS", 24)?,
        })
    }
}

impl Default for Config {
    /// Local-development defaults, also used by tests
    fn default() -> Self {
        Self {
            port: 8080,
            database_url: ":memory:".to_string(),
            session_ttl_hours: 168,
            payment_access_token: None,
            payment_webhook_secret: None,
            payment_api_base: "https://api.mercadopago.com".to_string(),
            payment_back_url: "http://localhost:8080/billing".to_string(),
            whatsapp_verify_token: None,
            whatsapp_app_secret: None,
            whatsapp_access_token: None,
            whatsapp_api_base: "https://graph.facebook.com/v19.0".to_string(),
            llm_endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            llm_api_key: String::new(),
            llm_model: "gpt-4o-mini".to_string(),
            tts_endpoint: "https://api.openai.com/v1/audio/speech".to_string(),
            tts_voice: "alloy".to_string(),
            agent_idle_timeout_secs: 25,
            reminder_cron: "0 */10 * * * *".to_string(),
            reminder_lead_hours: 24,
        }
    }
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T, String> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| format!("{} must be a valid number, got '{}'", name, raw)),
        Err(_) => Ok(default),
    }
}
