//! Read-only catalog tools: the service menu and the team

use crate::domain::format_currency;
use crate::error::AppError;
use crate::tools::registry::Tool;
use crate::tools::types::{ToolContext, ToolDefinition, ToolInputSchema, ToolResult};
use async_trait::async_trait;
use serde_json::{json, Value};

pub struct ListServicesTool {
    definition: ToolDefinition,
}

impl ListServicesTool {
    pub fn new() -> Self {
        ListServicesTool {
            definition: ToolDefinition {
                name: "list_services".to_string(),
                description: "List the services this business offers with their id, duration and price. \
                              Call this before quoting prices or booking."
                    .to_string(),
                input_schema: ToolInputSchema::default(),
            },
        }
    }
}

impl Default for ListServicesTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for ListServicesTool {
    fn definition(&self) -> ToolDefinition {
        self.definition.clone()
    }

    async fn execute(&self, _params: Value, context: &ToolContext) -> ToolResult {
        let services = match context.db.list_services(context.business.id, true) {
            Ok(services) => services,
            Err(e) => return AppError::from(e).into(),
        };
        if services.is_empty() {
            return ToolResult::success("This business has no services available right now.");
        }

        let lines: Vec<String> = services
            .iter()
            .map(|s| {
                format!(
                    "#{} {} - {} min - {}",
                    s.id,
                    s.name,
                    s.duration_minutes,
                    format_currency(s.price, context.business.currency)
                )
            })
            .collect();

        ToolResult::success(lines.join("\n")).with_metadata(json!({
            "services": services.iter().map(|s| json!({
                "id": s.id,
                "name": s.name,
                "duration_minutes": s.duration_minutes,
                "price": s.price
            })).collect::<Vec<_>>()
        }))
    }
}

pub struct ListSpecialistsTool {
    definition: ToolDefinition,
}

impl ListSpecialistsTool {
    pub fn new() -> Self {
        ListSpecialistsTool {
            definition: ToolDefinition {
                name: "list_specialists".to_string(),
                description: "List the specialists who take appointments, with their id.".to_string(),
                input_schema: ToolInputSchema::default(),
            },
        }
    }
}

impl Default for ListSpecialistsTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for ListSpecialistsTool {
    fn definition(&self) -> ToolDefinition {
        self.definition.clone()
    }

    async fn execute(&self, _params: Value, context: &ToolContext) -> ToolResult {
        match context.db.list_specialists(context.business.id, true) {
            Ok(specialists) if specialists.is_empty() => {
                ToolResult::success("No specialists are taking appointments right now.")
            }
            Ok(specialists) => ToolResult::success(
                specialists
                    .iter()
                    .map(|s| format!("#{} {}", s.id, s.name))
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
            Err(e) => AppError::from(e).into(),
        }
    }
}
