pub mod builtin;
pub mod registry;
pub mod types;

pub use registry::{Tool, ToolRegistry};
pub use types::{PropertySchema, ToolContext, ToolDefinition, ToolInputSchema, ToolResult};

use std::sync::Arc;

/// Register the booking assistant's tools
fn register_all_tools(registry: &mut ToolRegistry) {
    // Catalog lookups
    registry.register(Arc::new(builtin::ListServicesTool::new()));
    registry.register(Arc::new(builtin::ListSpecialistsTool::new()));

    // Scheduling
    registry.register(Arc::new(builtin::CheckAvailabilityTool::new()));
    registry.register(Arc::new(builtin::BookAppointmentTool::new()));
}

/// Create a new ToolRegistry with all booking tools registered
pub fn create_default_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    register_all_tools(&mut registry);
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry() {
        let registry = create_default_registry();
        assert_eq!(registry.len(), 4);
        let names: Vec<String> = registry.definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(
            names,
            vec!["book_appointment", "check_availability", "list_services", "list_specialists"]
        );
        assert!(registry.get("transfer_funds").is_none());
    }
}
