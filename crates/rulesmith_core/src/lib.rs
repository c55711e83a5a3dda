//! Rulesmith core: pure conversion domain, no IO.
mod artifact;
mod config;
mod prompt;
mod report;
mod types;

pub use artifact::{assemble_rule_artifact, SectionOutcome};
pub use config::{BatchSettings, ConfigError, DEFAULT_WORKERS, MAX_WORKERS, MIN_WORKERS};
pub use prompt::{detection_query, response_query};
pub use report::render_report;
pub use types::{ConversionResult, ConversionStatus, RuleItem, RunSummary};
