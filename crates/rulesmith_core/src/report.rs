//! Human-readable run report rendering.

use crate::{ConversionStatus, RunSummary};

const RULE: &str =
    "======================================================================";
const DASHES: &str =
    "----------------------------------------------------------------------";

/// Render the final text report for a completed run.
///
/// `generated_utc` is a preformatted timestamp supplied by the caller, which
/// keeps clock access out of this crate. Error messages are included
/// verbatim so an authentication failure stays distinguishable from a
/// malformed rule or a missing tool.
pub fn render_report(summary: &RunSummary, generated_utc: &str) -> String {
    let mut lines = vec![
        RULE.to_string(),
        "RULE CONVERSION REPORT".to_string(),
        RULE.to_string(),
        String::new(),
        format!("Generated: {generated_utc}"),
        format!("Duration: {:.2} seconds", summary.duration.as_secs_f64()),
        String::new(),
        "SUMMARY".to_string(),
        DASHES.to_string(),
        format!("Total rules processed: {}", summary.total),
        format!("Successfully converted: {}", summary.succeeded),
        format!("Failed conversions: {}", summary.failed),
        format!("Success rate: {:.1}%", summary.success_rate()),
        String::new(),
        "RESULTS".to_string(),
        DASHES.to_string(),
    ];

    for result in &summary.results {
        lines.push(format!(
            "{name} ... {status} ({elapsed:.1}s)",
            name = result.name,
            status = result.status,
            elapsed = result.elapsed.as_secs_f64(),
        ));
    }
    lines.push(String::new());

    let failures: Vec<_> = summary
        .results
        .iter()
        .filter(|r| r.status != ConversionStatus::Success)
        .collect();
    if !failures.is_empty() {
        lines.push("ERRORS".to_string());
        lines.push(DASHES.to_string());
        for result in failures {
            lines.push(String::new());
            lines.push(format!("File: {}", result.name));
            lines.push(format!(
                "Error: {}",
                result.error.as_deref().unwrap_or("unknown error")
            ));
        }
        lines.push(String::new());
    }

    lines.push(RULE.to_string());
    lines.push("END OF REPORT".to_string());
    lines.push(RULE.to_string());
    lines.join("\n")
}
