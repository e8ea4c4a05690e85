use super::parse_datetime;
use crate::domain::format_currency;
use crate::services::{appointments, clients};
use crate::tools::registry::Tool;
use crate::tools::types::{PropertySchema, ToolContext, ToolDefinition, ToolInputSchema, ToolResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

pub struct BookAppointmentTool {
    definition: ToolDefinition,
}

impl BookAppointmentTool {
    pub fn new() -> Self {
        BookAppointmentTool {
            definition: ToolDefinition {
                name: "book_appointment".to_string(),
                description: "Book an appointment once the customer confirmed service, specialist, time, \
                              name and phone. The appointment starts as pending until the salon confirms."
                    .to_string(),
                input_schema: ToolInputSchema::object()
                    .required("service_id", PropertySchema::integer("Id of the service, from list_services"))
                    .required(
                        "specialist_id",
                        PropertySchema::integer("Id of the specialist, from check_availability"),
                    )
                    .required("starts_at", PropertySchema::string("Start time, formatted YYYY-MM-DDTHH:MM"))
                    .required("client_name", PropertySchema::string("Customer full name"))
                    .required(
                        "client_phone",
                        PropertySchema::string("Customer phone number with country code"),
                    )
                    .optional("notes", PropertySchema::string("Optional notes for the specialist")),
            },
        }
    }
}

impl Default for BookAppointmentTool {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct BookingParams {
    service_id: i64,
    specialist_id: i64,
    starts_at: String,
    client_name: String,
    client_phone: String,
    notes: Option<String>,
}

#[async_trait]
impl Tool for BookAppointmentTool {
    fn definition(&self) -> ToolDefinition {
        self.definition.clone()
    }

    async fn execute(&self, params: Value, context: &ToolContext) -> ToolResult {
        let params: BookingParams = match serde_json::from_value(params) {
            Ok(p) => p,
            Err(e) => return ToolResult::error(format!("Invalid parameters: {}", e)),
        };
        let Some(starts_at) = parse_datetime(&params.starts_at) else {
            return ToolResult::error(format!(
                "Invalid start time '{}', use YYYY-MM-DDTHH:MM",
                params.starts_at
            ));
        };

        let client = match clients::find_or_create_by_phone(
            &context.db,
            context.business.id,
            &params.client_name,
            &params.client_phone,
        ) {
            Ok(client) => client,
            Err(e) => return e.into(),
        };

        let request = appointments::BookingRequest {
            client_id: client.id,
            specialist_id: params.specialist_id,
            service_id: params.service_id,
            starts_at,
            notes: params.notes,
        };
        let appointment = match appointments::book(&context.db, &context.business, &request, context.now) {
            Ok(appointment) => appointment,
            Err(e) => return e.into(),
        };

        log::info!(
            "[AGENT] Booked appointment {} for client {} via {:?}",
            appointment.id,
            client.id,
            context.conversation_ref
        );
        ToolResult::success(format!(
            "Booked appointment #{} for {} on {} (total {}). Status: {}.",
            appointment.id,
            client.full_name,
            appointment.starts_at.format("%Y-%m-%d %H:%M"),
            format_currency(appointment.total_amount, context.business.currency),
            appointment.status
        ))
        .with_metadata(json!({
            "appointment_id": appointment.id,
            "client_id": client.id,
            "starts_at": appointment.starts_at,
            "ends_at": appointment.ends_at
        }))
    }
}
