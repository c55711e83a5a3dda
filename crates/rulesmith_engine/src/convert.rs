//! The conversion task: one rule in, one artifact (or failure record) out.

use std::sync::Arc;
use std::time::Instant;

use serde_json::{json, Value};
use thiserror::Error;

use rulesmith_core::{
    assemble_rule_artifact, detection_query, response_query, ConversionResult, RuleItem,
    SectionOutcome,
};

use crate::filename::artifact_filename;
use crate::persist::OutputSink;
use crate::registry::ToolRegistry;
use crate::transport::{ToolTransport, TransportError};

/// Tool producing the detection section.
pub const DETECTION_TOOL: &str = "generate_dr_rule_detection";
/// Tool producing the response section.
pub const RESPONSE_TOOL: &str = "generate_dr_rule_respond";

/// Per-task errors. None of these escape the task boundary: they are folded
/// into the item's `ConversionResult` and the batch continues.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("tool not available: {0}")]
    ToolNotAvailable(String),
    #[error("call to {tool} is missing required input '{field}'")]
    MissingInput { tool: String, field: String },
    /// The service reported an error object for a well-formed call.
    #[error("remote tool error: {0}")]
    RemoteLogic(String),
    #[error("{tool} returned no usable content")]
    EmptyGeneration { tool: String },
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Converts rule items via the remote generation tools.
///
/// Holds only shared read-only collaborators, so one converter is safely
/// invoked from every worker concurrently.
pub struct RuleConverter {
    transport: Arc<dyn ToolTransport>,
    registry: Arc<ToolRegistry>,
    sink: OutputSink,
    platform: String,
}

impl std::fmt::Debug for RuleConverter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleConverter")
            .field("registry", &self.registry)
            .field("platform", &self.platform)
            .finish_non_exhaustive()
    }
}

impl RuleConverter {
    /// Both generation tools must exist in the registry; their absence means
    /// no task could succeed, so it aborts construction.
    pub fn new(
        transport: Arc<dyn ToolTransport>,
        registry: Arc<ToolRegistry>,
        sink: OutputSink,
        platform: impl Into<String>,
    ) -> Result<Self, ConvertError> {
        registry.resolve(DETECTION_TOOL)?;
        registry.resolve(RESPONSE_TOOL)?;
        Ok(Self {
            transport,
            registry,
            sink,
            platform: platform.into(),
        })
    }

    /// Convert one rule. Never returns an error: every failure mode becomes
    /// a result with the original message attached.
    pub async fn convert(&self, item: &RuleItem) -> ConversionResult {
        let started = Instant::now();

        if item.content.trim().is_empty() {
            return ConversionResult::failed(&item.name, "empty rule file", started.elapsed());
        }

        let detect = match self
            .generate_section(
                DETECTION_TOOL,
                detection_query(&self.platform, item),
                "detection",
            )
            .await
        {
            Ok(yaml) => SectionOutcome::Generated(yaml),
            Err(err) => SectionOutcome::Failed(err.to_string()),
        };

        // A failed detection stops further calls for this item only; a
        // response without its detection would be meaningless.
        let respond = match &detect {
            SectionOutcome::Generated(detection_yaml) => {
                match self
                    .generate_section(
                        RESPONSE_TOOL,
                        response_query(&self.platform, item, detection_yaml),
                        "respond",
                    )
                    .await
                {
                    Ok(yaml) => SectionOutcome::Generated(yaml),
                    Err(err) => SectionOutcome::Failed(err.to_string()),
                }
            }
            _ => SectionOutcome::Skipped("detection section failed".to_string()),
        };

        let artifact = assemble_rule_artifact(&item.name, &self.platform, &detect, &respond);
        let filename = artifact_filename(&item.name);
        if let Err(err) = self.sink.write_artifact(&filename, &artifact) {
            return ConversionResult::failed(
                &item.name,
                format!("failed to write artifact: {err}"),
                started.elapsed(),
            );
        }
        log::debug!("{}: wrote {}", item.name, filename);

        let elapsed = started.elapsed();
        match (&detect, &respond) {
            (SectionOutcome::Generated(_), SectionOutcome::Generated(_)) => {
                ConversionResult::success(&item.name, artifact, elapsed)
            }
            (SectionOutcome::Generated(_), SectionOutcome::Failed(err)) => {
                ConversionResult::partial(&item.name, artifact, format!("respond: {err}"), elapsed)
            }
            (SectionOutcome::Failed(err), _) => {
                ConversionResult::failed(&item.name, format!("detection: {err}"), elapsed)
            }
            // Detection can only be Generated or Failed.
            _ => ConversionResult::failed(&item.name, "conversion produced no sections", elapsed),
        }
    }

    /// One remote call: resolve, validate, dispatch, extract the section.
    async fn generate_section(
        &self,
        tool: &str,
        query: String,
        section_field: &str,
    ) -> Result<String, ConvertError> {
        let descriptor = self.registry.resolve(tool)?;
        let arguments = json!({ "query": query });
        ToolRegistry::validate_arguments(descriptor, &arguments)?;

        let result = self.transport.call_tool(tool, arguments).await?;
        self.extract_section(result, tool, section_field).await
    }

    /// Pull the generated YAML out of a tool result.
    ///
    /// Precedence mirrors the service's response shapes: `structuredContent`
    /// (with `resource_link` indirection for oversized payloads), then a
    /// top-level section field, then plain `content` text blocks. An
    /// explicit error field anywhere is the task's failure, message intact.
    async fn extract_section(
        &self,
        result: Value,
        tool: &str,
        section_field: &str,
    ) -> Result<String, ConvertError> {
        if let Some(text) = result.as_str() {
            return Ok(text.to_string());
        }

        if let Some(error) = result.get("error") {
            return Err(ConvertError::RemoteLogic(error_text(error)));
        }

        if let Some(structured) = result.get("structuredContent") {
            if let Some(error) = structured.get("error") {
                return Err(ConvertError::RemoteLogic(error_text(error)));
            }
            if let Some(link) = structured.get("resource_link").and_then(Value::as_str) {
                if structured.get("success").and_then(Value::as_bool) == Some(true) {
                    log::debug!(
                        "{tool}: fetching oversized result ({} bytes) from resource link",
                        structured
                            .get("resource_size")
                            .and_then(Value::as_u64)
                            .unwrap_or(0)
                    );
                    let body = self.transport.fetch_resource(link).await?;
                    return Ok(linked_section(&body, section_field));
                }
            }
            if let Some(value) = structured.get(section_field) {
                return section_text(value, tool);
            }
        }

        if let Some(value) = result.get(section_field) {
            return section_text(value, tool);
        }

        // MCP text content blocks: [{"type": "text", "text": ...}, ...]
        if let Some(blocks) = result.get("content").and_then(Value::as_array) {
            let text: Vec<&str> = blocks
                .iter()
                .filter_map(|block| block.get("text").and_then(Value::as_str))
                .collect();
            if !text.is_empty() {
                return Ok(text.join("\n"));
            }
        }

        Err(ConvertError::EmptyGeneration {
            tool: tool.to_string(),
        })
    }
}

/// A linked resource body is either JSON holding the section field, or the
/// section text itself.
fn linked_section(body: &str, section_field: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(value) => match value.get(section_field) {
            Some(Value::String(text)) => text.clone(),
            Some(other) => serde_json::to_string_pretty(other).unwrap_or_else(|_| body.to_string()),
            None => serde_json::to_string_pretty(&value).unwrap_or_else(|_| body.to_string()),
        },
        Err(_) => body.to_string(),
    }
}

fn section_text(value: &Value, tool: &str) -> Result<String, ConvertError> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Ok(text.clone()),
        Value::String(_) => Err(ConvertError::EmptyGeneration {
            tool: tool.to_string(),
        }),
        other => serde_json::to_string_pretty(other).map_err(|_| ConvertError::EmptyGeneration {
            tool: tool.to_string(),
        }),
    }
}

fn error_text(error: &Value) -> String {
    match error {
        Value::String(message) => message.clone(),
        other => other.to_string(),
    }
}
