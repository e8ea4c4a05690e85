//! Text-to-speech synthesis

use async_trait::async_trait;
use reqwest::{header, Client};
use serde_json::json;
use std::time::Duration;

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize one chunk of text to MP3 bytes
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, String>;
}

/// OpenAI-compatible `/v1/audio/speech` client
#[derive(Clone)]
pub struct OpenAISpeechClient {
    client: Client,
    endpoint: String,
    voice: String,
}

impl OpenAISpeechClient {
    pub fn new(api_key: &str, endpoint: &str, voice: &str) -> Result<Self, String> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        if !api_key.is_empty() {
            let auth_value = header::HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|e| format!("Invalid API key format: {}", e))?;
            headers.insert(header::AUTHORIZATION, auth_value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            voice: voice.to_string(),
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAISpeechClient {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, String> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({
                "model": "tts-1",
                "voice": self.voice,
                "input": text,
                "response_format": "mp3"
            }))
            .send()
            .await
            .map_err(|e| format!("Speech request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("Speech API returned error status: {}, body: {}", status, body));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| format!("Failed to read speech audio: {}", e))?;
        log::debug!("[AGENT] Synthesized {} chars into {} bytes", text.len(), bytes.len());
        Ok(bytes.to_vec())
    }
}
