use crate::db::Database;
use crate::error::AppError;
use crate::models::Business;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// One parameter in a tool's JSON Schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    pub description: String,
}

impl PropertySchema {
    pub fn integer(description: &str) -> Self {
        Self {
            schema_type: "integer".to_string(),
            description: description.to_string(),
        }
    }

    pub fn string(description: &str) -> Self {
        Self {
            schema_type: "string".to_string(),
            description: description.to_string(),
        }
    }
}

/// Object schema for a tool's arguments. Properties are kept sorted so the
/// prompt sent to the model does not change between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInputSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    pub properties: BTreeMap<String, PropertySchema>,
    #[serde(default)]
    pub required: Vec<String>,
}

impl Default for ToolInputSchema {
    fn default() -> Self {
        Self::object()
    }
}

impl ToolInputSchema {
    /// Object with no parameters
    pub fn object() -> Self {
        Self {
            schema_type: "object".to_string(),
            properties: BTreeMap::new(),
            required: Vec::new(),
        }
    }

    pub fn required(mut self, name: &str, property: PropertySchema) -> Self {
        self.properties.insert(name.to_string(), property);
        self.required.push(name.to_string());
        self
    }

    pub fn optional(mut self, name: &str, property: PropertySchema) -> Self {
        self.properties.insert(name.to_string(), property);
        self
    }
}

/// What the model sees of a tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: ToolInputSchema,
}

/// Outcome of a tool call. `content` goes back to the model; `metadata`
/// carries structured data for callers and tests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl ToolResult {
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            success: true,
            content: content.into(),
            metadata: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            content: message.into(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Database and internal details are logged, never handed to the model
impl From<AppError> for ToolResult {
    fn from(err: AppError) -> Self {
        if matches!(err, AppError::Database(_) | AppError::Internal(_)) {
            log::error!("[TOOLS] {}", err);
        }
        Self::error(err.public_message())
    }
}

/// Everything a tool may touch during one turn. Tools only ever see the
/// business the turn belongs to.
#[derive(Clone)]
pub struct ToolContext {
    pub db: Arc<Database>,
    pub business: Business,
    /// Business wall-clock time the turn started at
    pub now: NaiveDateTime,
    /// Agent session or WhatsApp conversation the turn belongs to
    pub conversation_ref: Option<String>,
}

impl std::fmt::Debug for ToolContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolContext")
            .field("business_id", &self.business.id)
            .field("now", &self.now)
            .field("conversation_ref", &self.conversation_ref)
            .finish()
    }
}

impl ToolContext {
    pub fn new(db: Arc<Database>, business: Business, now: NaiveDateTime) -> Self {
        Self {
            db,
            business,
            now,
            conversation_ref: None,
        }
    }

    pub fn with_conversation(mut self, conversation_ref: impl Into<String>) -> Self {
        self.conversation_ref = Some(conversation_ref.into());
        self
    }
}
