//! Chat completions with function calling against any OpenAI-compatible endpoint

use crate::ai::types::{AiResponse, ToolCall, ToolHistoryEntry};
use crate::ai::{LlmClient, Message};
use crate::tools::{ToolDefinition, ToolInputSchema};
use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const MAX_TOKENS: u32 = 800;
const TEMPERATURE: f32 = 0.3;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct OpenAIClient {
    client: Client,
    endpoint: String,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl WireMessage {
    fn from_message(message: Message) -> Self {
        Self {
            role: message.role.to_string(),
            content: Some(message.content),
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

#[derive(Serialize)]
struct WireTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunction<'a>,
}

#[derive(Serialize)]
struct WireFunction<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a ToolInputSchema,
}

impl<'a> From<&'a ToolDefinition> for WireTool<'a> {
    fn from(definition: &'a ToolDefinition) -> Self {
        Self {
            kind: "function",
            function: WireFunction {
                name: &definition.name,
                description: &definition.description,
                parameters: &definition.input_schema,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: WireFunctionCall,
}

fn function_kind() -> String {
    "function".to_string()
}

/// Arguments travel as a JSON-encoded string
#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

impl OpenAIClient {
    pub fn new(api_key: &str, endpoint: Option<&str>, model: Option<&str>) -> Result<Self, String> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        // Local OpenAI-compatible servers run without a key
        if !api_key.is_empty() {
            let auth_value = header::HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|e| format!("Invalid API key format: {}", e))?;
            headers.insert(header::AUTHORIZATION, auth_value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            client,
            endpoint: endpoint.filter(|e| !e.is_empty()).unwrap_or(DEFAULT_ENDPOINT).to_string(),
            model: model.filter(|m| !m.is_empty()).unwrap_or(DEFAULT_MODEL).to_string(),
        })
    }

    /// Conversation followed by every completed tool round: the assistant's
    /// calls, then one `tool` message per result.
    fn wire_messages(messages: Vec<Message>, tool_history: &[ToolHistoryEntry]) -> Vec<WireMessage> {
        let mut wire: Vec<WireMessage> = messages.into_iter().map(WireMessage::from_message).collect();
        for entry in tool_history {
            wire.extend(Self::round_messages(entry));
        }
        wire
    }

    fn round_messages(entry: &ToolHistoryEntry) -> Vec<WireMessage> {
        let calls = entry
            .tool_calls
            .iter()
            .map(|call| WireToolCall {
                id: call.id.clone(),
                kind: function_kind(),
                function: WireFunctionCall {
                    name: call.name.clone(),
                    arguments: call.arguments.to_string(),
                },
            })
            .collect();

        let mut messages = vec![WireMessage {
            role: "assistant".to_string(),
            content: None,
            tool_calls: Some(calls),
            tool_call_id: None,
        }];
        messages.extend(entry.tool_responses.iter().map(|response| WireMessage {
            role: "tool".to_string(),
            content: Some(response.content.clone()),
            tool_calls: None,
            tool_call_id: Some(response.tool_call_id.clone()),
        }));
        messages
    }

    fn decode_response(body: &str) -> Result<AiResponse, String> {
        let response: ChatResponse =
            serde_json::from_str(body).map_err(|e| format!("Failed to parse completion response: {}", e))?;
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| "Completion response has no choices".to_string())?;

        let tool_calls: Vec<ToolCall> = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| {
                let arguments = serde_json::from_str::<Value>(&call.function.arguments).unwrap_or_else(|e| {
                    log::warn!(
                        "[LLM] Malformed arguments for {}: {}",
                        call.function.name,
                        e
                    );
                    json!({})
                });
                ToolCall {
                    id: call.id,
                    name: call.function.name,
                    arguments,
                }
            })
            .collect();

        log::debug!(
            "[LLM] finish_reason={:?} tool_calls={}",
            choice.finish_reason,
            tool_calls.len()
        );
        let stop_reason = if tool_calls.is_empty() { "end_turn" } else { "tool_use" };
        Ok(AiResponse {
            content: choice.message.content.unwrap_or_default(),
            tool_calls,
            stop_reason: Some(stop_reason.to_string()),
        })
    }

    fn describe_error(status: StatusCode, body: &str) -> String {
        match serde_json::from_str::<ErrorBody>(body) {
            Ok(parsed) => format!("Completion API error ({}): {}", status, parsed.error.message),
            Err(_) => format!("Completion API returned {}: {}", status, body),
        }
    }
}

#[async_trait]
impl LlmClient for OpenAIClient {
    async fn generate_with_tools(
        &self,
        messages: Vec<Message>,
        tool_history: &[ToolHistoryEntry],
        tools: &[ToolDefinition],
    ) -> Result<AiResponse, String> {
        let request = ChatRequest {
            model: &self.model,
            messages: Self::wire_messages(messages, tool_history),
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
            tools: tools.iter().map(WireTool::from).collect(),
            tool_choice: (!tools.is_empty()).then_some("auto"),
        };
        log::info!(
            "[LLM] Requesting completion from {} ({} messages, {} tool rounds)",
            self.model,
            request.messages.len(),
            tool_history.len()
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("Completion request failed: {}", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| format!("Failed to read completion response: {}", e))?;
        if !status.is_success() {
            return Err(Self::describe_error(status, &body));
        }
        Self::decode_response(&body)
    }
}
