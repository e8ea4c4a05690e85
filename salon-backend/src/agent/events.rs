use serde::Serialize;
use serde_json::{json, Value};

use super::Intent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolPhase {
    Started,
    Completed,
}

/// Events streamed to the chat client during one turn
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    Typing,
    Intent(Intent),
    Tool {
        name: String,
        phase: ToolPhase,
        success: Option<bool>,
    },
    Message(String),
    /// Stored assistant message the client may rate
    Feedback { message_id: i64 },
    Error(String),
}

impl AgentEvent {
    pub fn name(&self) -> &'static str {
        match self {
            AgentEvent::Typing => "typing",
            AgentEvent::Intent(_) => "intent",
            AgentEvent::Tool { .. } => "tool",
            AgentEvent::Message(_) => "message",
            AgentEvent::Feedback { .. } => "feedback",
            AgentEvent::Error(_) => "error",
        }
    }

    pub fn data(&self) -> Value {
        match self {
            AgentEvent::Typing => json!({ "typing": true }),
            AgentEvent::Intent(intent) => json!({ "intent": intent }),
            AgentEvent::Tool { name, phase, success } => {
                let mut data = json!({ "name": name, "status": phase });
                if let Some(success) = success {
                    data["success"] = json!(success);
                }
                data
            }
            AgentEvent::Message(content) => json!({ "content": content }),
            AgentEvent::Feedback { message_id } => json!({ "message_id": message_id }),
            AgentEvent::Error(message) => json!({ "error": message }),
        }
    }

    /// `event: <name>\ndata: <json>\n\n`
    pub fn to_sse_frame(&self) -> String {
        format!("event: {}\ndata: {}\n\n", self.name(), self.data())
    }

    /// Whether this event closes the turn
    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentEvent::Feedback { .. } | AgentEvent::Error(_))
    }
}
