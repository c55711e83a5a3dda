//! Runtime-discovered table of callable remote operations.
//!
//! The service's tool surface is schema-less from the client's point of
//! view, so it is fetched once per run and every call is validated against
//! the discovered descriptor before it touches the wire.

use std::collections::HashMap;

use serde_json::Value;
use thiserror::Error;

use crate::convert::ConvertError;
use crate::transport::{ToolTransport, TransportError};

/// Discovery failures abort the whole run: without the tool surface no task
/// can be trusted to pick the right operation.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("tool discovery failed: {0}")]
    Transport(#[from] TransportError),
}

/// Metadata for one callable remote operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    /// Input fields the declared schema marks as required.
    pub required_inputs: Vec<String>,
}

impl ToolDescriptor {
    /// Parse a descriptor from one entry of a `tools/list` result. Entries
    /// without a name are dropped.
    pub fn from_value(value: &Value) -> Option<Self> {
        let name = value.get("name")?.as_str()?.to_string();
        let description = value
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let required_inputs = value
            .get("inputSchema")
            .and_then(|schema| schema.get("required"))
            .and_then(Value::as_array)
            .map(|fields| {
                fields
                    .iter()
                    .filter_map(Value::as_str)
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Some(Self {
            name,
            description,
            required_inputs,
        })
    }
}

#[derive(Debug)]
pub struct ToolRegistry {
    tools: HashMap<String, ToolDescriptor>,
}

impl ToolRegistry {
    /// Query the transport once and build the lookup table.
    pub async fn discover(transport: &dyn ToolTransport) -> Result<Self, DiscoveryError> {
        let tools = transport.list_tools().await?;
        log::info!("discovered {} tool(s)", tools.len());
        Ok(Self::from_descriptors(tools))
    }

    pub fn from_descriptors(descriptors: Vec<ToolDescriptor>) -> Self {
        Self {
            tools: descriptors
                .into_iter()
                .map(|tool| (tool.name.clone(), tool))
                .collect(),
        }
    }

    /// Look up an operation; an unknown name fails before any dispatch.
    pub fn resolve(&self, name: &str) -> Result<&ToolDescriptor, ConvertError> {
        self.tools
            .get(name)
            .ok_or_else(|| ConvertError::ToolNotAvailable(name.to_string()))
    }

    /// Reject a call whose declared required inputs are not all present.
    pub fn validate_arguments(
        descriptor: &ToolDescriptor,
        arguments: &Value,
    ) -> Result<(), ConvertError> {
        for field in &descriptor.required_inputs {
            if arguments.get(field).is_none() {
                return Err(ConvertError::MissingInput {
                    tool: descriptor.name.clone(),
                    field: field.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
