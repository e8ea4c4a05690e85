use super::parse_date;
use crate::error::AppError;
use crate::services::appointments;
use crate::tools::registry::Tool;
use crate::tools::types::{PropertySchema, ToolContext, ToolDefinition, ToolInputSchema, ToolResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

/// Slots listed per specialist before truncating
const MAX_SLOTS_SHOWN: usize = 12;

pub struct CheckAvailabilityTool {
    definition: ToolDefinition,
}

impl CheckAvailabilityTool {
    pub fn new() -> Self {
        CheckAvailabilityTool {
            definition: ToolDefinition {
                name: "check_availability".to_string(),
                description: "Find free start times for a service on a given day.".to_string(),
                input_schema: ToolInputSchema::object()
                    .required("service_id", PropertySchema::integer("Id of the service, from list_services"))
                    .required("date", PropertySchema::string("Day to check, formatted YYYY-MM-DD"))
                    .optional(
                        "specialist_id",
                        PropertySchema::integer("Optional specialist id from list_specialists. Omit to check everyone."),
                    ),
            },
        }
    }
}

impl Default for CheckAvailabilityTool {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct AvailabilityParams {
    service_id: i64,
    date: String,
    specialist_id: Option<i64>,
}

#[async_trait]
impl Tool for CheckAvailabilityTool {
    fn definition(&self) -> ToolDefinition {
        self.definition.clone()
    }

    async fn execute(&self, params: Value, context: &ToolContext) -> ToolResult {
        let params: AvailabilityParams = match serde_json::from_value(params) {
            Ok(p) => p,
            Err(e) => return ToolResult::error(format!("Invalid parameters: {}", e)),
        };
        let Some(date) = parse_date(&params.date) else {
            return ToolResult::error(format!("Invalid date '{}', use YYYY-MM-DD", params.date));
        };

        let specialists = match params.specialist_id {
            Some(id) => match context.db.get_specialist(context.business.id, id) {
                Ok(Some(s)) => vec![s],
                Ok(None) => return ToolResult::error(format!("Specialist {} not found", id)),
                Err(e) => return AppError::from(e).into(),
            },
            None => match context.db.list_specialists(context.business.id, true) {
                Ok(list) => list,
                Err(e) => return AppError::from(e).into(),
            },
        };

        let mut lines = Vec::new();
        let mut found = Vec::new();
        for specialist in &specialists {
            let slots = match appointments::availability(
                &context.db,
                &context.business,
                specialist.id,
                params.service_id,
                date,
                context.now,
            ) {
                Ok(slots) => slots,
                Err(e) => return e.into(),
            };
            if slots.is_empty() {
                continue;
            }

            let times: Vec<String> = slots.iter().map(|s| s.format("%H:%M").to_string()).collect();
            let shown = times.len().min(MAX_SLOTS_SHOWN);
            let mut line = format!("#{} {}: {}", specialist.id, specialist.name, times[..shown].join(", "));
            if times.len() > shown {
                line.push_str(&format!(" (+{} more)", times.len() - shown));
            }
            lines.push(line);
            found.push(json!({"specialist_id": specialist.id, "slots": times}));
        }

        if lines.is_empty() {
            return ToolResult::success(format!("No free times on {}.", date.format("%Y-%m-%d")));
        }
        ToolResult::success(format!("Free times on {}:\n{}", date.format("%Y-%m-%d"), lines.join("\n")))
            .with_metadata(json!({ "date": params.date, "availability": found }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::builtin::test_context::context;

    #[tokio::test]
    async fn test_full_day_is_open() {
        let (ctx, seed) = context();
        let result = CheckAvailabilityTool::new()
            .execute(json!({"service_id": seed.service_id, "date": "2030-06-04"}), &ctx)
            .await;
        assert!(result.success, "{}", result.content);
        assert!(result.content.contains("09:00, 09:30"));
        assert!(result.content.contains("(+"));
    }

    #[tokio::test]
    async fn test_bad_date_is_reported() {
        let (ctx, seed) = context();
        let result = CheckAvailabilityTool::new()
            .execute(json!({"service_id": seed.service_id, "date": "next friday"}), &ctx)
            .await;
        assert!(!result.success);
    }
}
