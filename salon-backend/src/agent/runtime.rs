//! Tool-calling loop behind the chat endpoint and WhatsApp auto-replies

use chrono::NaiveDateTime;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::events::{AgentEvent, ToolPhase};
use super::intent::classify_intent;
use super::tts::TtsBuffer;
use crate::ai::{LlmClient, Message, MessageRole, ToolHistoryEntry, ToolResponse};
use crate::db::Database;
use crate::models::{AgentSession, Business, MessageDirection};
use crate::services::whatsapp::{self as whatsapp_service, PendingReply};
use crate::tools::{ToolContext, ToolRegistry};
use crate::whatsapp::WhatsAppMessenger;

pub const MAX_ROUNDS: usize = 6;
/// Transcript messages replayed to the model
pub const HISTORY_LIMIT: i64 = 20;
const TTS_MAX_TOKENS: usize = 12;
const TTS_MAX_WAIT: Duration = Duration::from_millis(400);
const EVENT_BUFFER: usize = 32;

pub const IDLE_FALLBACK_MESSAGE: &str =
    "Sorry, this is taking longer than expected. Please try again in a moment.";
const EMPTY_REPLY_MESSAGE: &str = "Sorry, I didn't catch that. Could you rephrase?";

#[derive(Debug, Error)]
pub enum TurnError {
    #[error("turn cancelled")]
    Cancelled,
    #[error("language model error: {0}")]
    Llm(String),
    #[error("assistant did not finish within {0} rounds")]
    TooManyRounds(usize),
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("{0}")]
    Delivery(String),
}

impl TurnError {
    /// Text safe to show to the customer
    pub fn public_message(&self) -> &'static str {
        match self {
            TurnError::TooManyRounds(_) => "I couldn't complete that request. Could you try rephrasing it?",
            _ => "The assistant is unavailable right now. Please try again later.",
        }
    }
}

/// In-flight turns keyed by session. Starting a new turn for a key cancels
/// the previous one.
#[derive(Default)]
pub struct TurnRegistry {
    turns: DashMap<String, (u64, CancellationToken)>,
    next_id: AtomicU64,
}

impl TurnRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self, key: &str) -> (u64, CancellationToken) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        if let Some((_, (_, previous))) = self.turns.remove(key) {
            log::debug!("[AGENT] Superseding running turn for {}", key);
            previous.cancel();
        }
        self.turns.insert(key.to_string(), (id, token.clone()));
        (id, token)
    }

    /// Drop the entry if it still belongs to turn `id`
    pub fn finish(&self, key: &str, id: u64) {
        self.turns.remove_if(key, |_, (current, _)| *current == id);
    }

    pub fn cancel(&self, key: &str) -> bool {
        match self.turns.remove(key) {
            Some((_, (_, token))) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn in_flight(&self) -> usize {
        self.turns.len()
    }
}

pub struct AgentRuntime {
    db: Arc<Database>,
    llm: Arc<dyn LlmClient>,
    tools: Arc<ToolRegistry>,
    turns: TurnRegistry,
    max_rounds: usize,
}

impl AgentRuntime {
    pub fn new(db: Arc<Database>, llm: Arc<dyn LlmClient>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            db,
            llm,
            tools,
            turns: TurnRegistry::new(),
            max_rounds: MAX_ROUNDS,
        }
    }

    pub fn turns(&self) -> &TurnRegistry {
        &self.turns
    }

    fn system_prompt(business: &Business, now: NaiveDateTime) -> String {
        format!(
            "You are the booking assistant of {name}, a beauty and wellness business. \
             Today is {today} and the local time is {time}. Opening hours are {open} to {close}; \
             prices are in {currency}.\n\
             Help customers discover services, check availability and book appointments. \
             Always use the tools for services, specialists and free times; never invent them. \
             Before booking, confirm the service, specialist, date and time, and ask for the \
             customer's full name and phone number. Answer in the customer's language, briefly.",
            name = business.name,
            today = now.format("%A %Y-%m-%d"),
            time = now.format("%H:%M"),
            open = business.opening_time.format("%H:%M"),
            close = business.closing_time.format("%H:%M"),
            currency = business.currency,
        )
    }

    async fn emit(events: Option<&mpsc::Sender<AgentEvent>>, event: AgentEvent) {
        if let Some(tx) = events {
            // A closed receiver means the client left; cancellation handles the rest
            let _ = tx.send(event).await;
        }
    }

    /// Run the tool loop for `history` and return the assistant's final text
    pub async fn complete(
        &self,
        context: &ToolContext,
        history: Vec<Message>,
        events: Option<&mpsc::Sender<AgentEvent>>,
        cancel: &CancellationToken,
    ) -> Result<String, TurnError> {
        let definitions = self.tools.definitions();
        let mut messages = vec![Message::system(Self::system_prompt(&context.business, context.now))];
        messages.extend(history);
        let mut tool_history: Vec<ToolHistoryEntry> = Vec::new();

        for round in 0..self.max_rounds {
            let response = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(TurnError::Cancelled),
                result = self.llm.generate_with_tools(messages.clone(), &tool_history, &definitions) => {
                    result.map_err(TurnError::Llm)?
                }
            };

            if !response.is_tool_use() {
                log::info!(
                    "[AGENT] Turn finished after {} round(s) for business {}",
                    round + 1,
                    context.business.id
                );
                return Ok(response.content);
            }

            let mut responses = Vec::with_capacity(response.tool_calls.len());
            for call in &response.tool_calls {
                if cancel.is_cancelled() {
                    return Err(TurnError::Cancelled);
                }
                Self::emit(
                    events,
                    AgentEvent::Tool {
                        name: call.name.clone(),
                        phase: ToolPhase::Started,
                        success: None,
                    },
                )
                .await;

                log::info!("[AGENT] Executing tool {} ({})", call.name, call.id);
                let result = self.tools.execute(&call.name, call.arguments.clone(), context).await;
                if !result.success {
                    log::warn!("[AGENT] Tool {} failed: {}", call.name, result.content);
                }

                Self::emit(
                    events,
                    AgentEvent::Tool {
                        name: call.name.clone(),
                        phase: ToolPhase::Completed,
                        success: Some(result.success),
                    },
                )
                .await;
                responses.push(if result.success {
                    ToolResponse::success(&call.id, result.content)
                } else {
                    ToolResponse::error(&call.id, result.content)
                });
            }
            tool_history.push(ToolHistoryEntry::new(response.tool_calls, responses));
        }

        Err(TurnError::TooManyRounds(self.max_rounds))
    }

    fn session_history(&self, session_id: &str) -> Result<Vec<Message>, TurnError> {
        let stored = self.db.list_agent_messages(session_id, HISTORY_LIMIT)?;
        Ok(stored
            .into_iter()
            .map(|m| Message {
                role: m.role.parse().unwrap_or(MessageRole::User),
                content: m.content,
            })
            .collect())
    }

    /// One chat turn: typing, intent, tool progress, buffered message
    /// segments, then the feedback handle. Errors are reported as an
    /// `error` event.
    pub async fn run_chat_turn(
        &self,
        session: &AgentSession,
        business: &Business,
        user_text: &str,
        now: NaiveDateTime,
        events: &mpsc::Sender<AgentEvent>,
        cancel: &CancellationToken,
    ) {
        Self::emit(Some(events), AgentEvent::Typing).await;
        let intent = classify_intent(user_text);
        log::info!("[AGENT] Session {} intent: {}", session.id, intent);
        Self::emit(Some(events), AgentEvent::Intent(intent)).await;

        match self.chat_turn(session, business, user_text, now, events, cancel).await {
            Ok(message_id) => {
                Self::emit(Some(events), AgentEvent::Feedback { message_id }).await;
            }
            Err(TurnError::Cancelled) => {
                log::info!("[AGENT] Turn for session {} cancelled", session.id);
            }
            Err(e) => {
                log::error!("[AGENT] Turn for session {} failed: {}", session.id, e);
                Self::emit(Some(events), AgentEvent::Error(e.public_message().to_string())).await;
            }
        }
    }

    async fn chat_turn(
        &self,
        session: &AgentSession,
        business: &Business,
        user_text: &str,
        now: NaiveDateTime,
        events: &mpsc::Sender<AgentEvent>,
        cancel: &CancellationToken,
    ) -> Result<i64, TurnError> {
        self.db
            .insert_agent_message(&session.id, MessageRole::User.as_ref(), user_text)?;
        let history = self.session_history(&session.id)?;

        let context = ToolContext::new(self.db.clone(), business.clone(), now).with_conversation(session.id.clone());
        let reply = self.complete(&context, history, Some(events), cancel).await?;
        let reply = if reply.trim().is_empty() {
            EMPTY_REPLY_MESSAGE.to_string()
        } else {
            reply
        };
        if cancel.is_cancelled() {
            return Err(TurnError::Cancelled);
        }

        let mut buffer = TtsBuffer::new(TTS_MAX_TOKENS, TTS_MAX_WAIT, Instant::now());
        for token in reply.split_inclusive(char::is_whitespace) {
            if let Some(segment) = buffer.push(token, Instant::now()) {
                Self::emit(Some(events), AgentEvent::Message(segment)).await;
            }
        }
        if let Some(segment) = buffer.flush(Instant::now()) {
            Self::emit(Some(events), AgentEvent::Message(segment)).await;
        }

        let stored = self
            .db
            .insert_agent_message(&session.id, MessageRole::Assistant.as_ref(), &reply)?;
        Ok(stored.id)
    }

    /// Start a chat turn in the background. Events arrive on the returned
    /// receiver; cancelling the token stops the turn.
    pub fn spawn_chat_turn(
        self: &Arc<Self>,
        session: AgentSession,
        business: Business,
        user_text: String,
        now: NaiveDateTime,
    ) -> (mpsc::Receiver<AgentEvent>, CancellationToken) {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let (turn_id, cancel) = self.turns.begin(&session.id);
        let runtime = Arc::clone(self);
        let token = cancel.clone();

        tokio::spawn(async move {
            runtime
                .run_chat_turn(&session, &business, &user_text, now, &tx, &token)
                .await;
            runtime.turns.finish(&session.id, turn_id);
        });

        (rx, cancel)
    }

    /// Answer an inbound WhatsApp message and send the reply back through the
    /// business number. Returns the text sent, if any.
    pub async fn answer_whatsapp(
        &self,
        messenger: &dyn WhatsAppMessenger,
        reply: &PendingReply,
        now: NaiveDateTime,
    ) -> Result<Option<String>, TurnError> {
        let key = format!("wa:{}", reply.conversation.id);
        let (turn_id, cancel) = self.turns.begin(&key);
        let result = self.whatsapp_turn(messenger, reply, now, &cancel).await;
        self.turns.finish(&key, turn_id);
        result
    }

    async fn whatsapp_turn(
        &self,
        messenger: &dyn WhatsAppMessenger,
        reply: &PendingReply,
        now: NaiveDateTime,
        cancel: &CancellationToken,
    ) -> Result<Option<String>, TurnError> {
        let history: Vec<Message> = self
            .db
            .list_whatsapp_messages(reply.conversation.id, HISTORY_LIMIT)?
            .into_iter()
            .map(|m| match m.direction {
                MessageDirection::Inbound => Message::user(m.content),
                MessageDirection::Outbound => Message::assistant(m.content),
            })
            .collect();

        log::info!(
            "[AGENT] Answering WhatsApp conversation {} ({})",
            reply.conversation.id,
            classify_intent(&reply.text)
        );
        let context = ToolContext::new(self.db.clone(), reply.business.clone(), now)
            .with_conversation(format!("whatsapp:{}", reply.conversation.id));
        let text = self.complete(&context, history, None, cancel).await?;
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }

        whatsapp_service::send_text(&self.db, messenger, &reply.business, &reply.conversation, text)
            .await
            .map_err(|e| TurnError::Delivery(e.to_string()))?;
        Ok(Some(text.to_string()))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::ai::{AiResponse, ToolCall};
    use crate::tools::ToolDefinition;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::collections::VecDeque;

    /// Replays canned responses; repeats the last one when the script runs out
    pub struct ScriptedLlm {
        script: Mutex<VecDeque<AiResponse>>,
        pub calls: Mutex<usize>,
    }

    impl ScriptedLlm {
        pub fn new(script: Vec<AiResponse>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: Mutex::new(0),
            }
        }
    }

    pub fn tool_call(name: &str, arguments: serde_json::Value) -> AiResponse {
        AiResponse {
            content: String::new(),
            tool_calls: vec![ToolCall {
                id: format!("call_{}", name),
                name: name.to_string(),
                arguments,
            }],
            stop_reason: Some("tool_use".to_string()),
        }
    }

    pub fn list_services_call() -> AiResponse {
        tool_call("list_services", json!({}))
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn generate_with_tools(
            &self,
            _messages: Vec<Message>,
            _tool_history: &[ToolHistoryEntry],
            _tools: &[ToolDefinition],
        ) -> Result<AiResponse, String> {
            *self.calls.lock() += 1;
            let mut script = self.script.lock();
            if script.len() > 1 {
                script.pop_front().ok_or_else(|| "script exhausted".to_string())
            } else {
                script.front().cloned().ok_or_else(|| "script exhausted".to_string())
            }
        }
    }
}
