//! Projection of the MCP tool catalogue into model tool definitions.

use crate::types::{ToolDefinition, ToolDescriptor};

impl From<&ToolDescriptor> for ToolDefinition {
    fn from(descriptor: &ToolDescriptor) -> Self {
        Self {
            name: descriptor.name.clone(),
            description: descriptor.description.clone(),
            input_schema: descriptor.input_schema.clone(),
        }
    }
}

/// Map every descriptor to a definition, keeping length and order.
///
/// Schemas are passed through untouched; the provider is the one to reject
/// a malformed schema.
pub fn adapt(descriptors: &[ToolDescriptor]) -> Vec<ToolDefinition> {
    descriptors.iter().map(ToolDefinition::from).collect()
}
