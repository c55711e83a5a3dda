//! Assembly of the combined detect/respond rule document.
//!
//! Each section is marked independently: a generated section is emitted as
//! indented YAML under its key, a failed one keeps its key with the error
//! inlined as comments, so one section's failure never discards the other.

/// How one section of the conversion ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionOutcome {
    /// The tool produced section content (YAML text).
    Generated(String),
    /// The call for this section failed; carries the error verbatim.
    Failed(String),
    /// The section was never attempted, with the reason.
    Skipped(String),
}

impl SectionOutcome {
    pub fn is_generated(&self) -> bool {
        matches!(self, SectionOutcome::Generated(_))
    }
}

/// Build the final rule document from both section outcomes.
pub fn assemble_rule_artifact(
    rule_name: &str,
    platform: &str,
    detect: &SectionOutcome,
    respond: &SectionOutcome,
) -> String {
    let mut doc = String::new();
    doc.push_str(&format!("# Converted from {platform} rule: {rule_name}\n"));
    push_section(&mut doc, "detect", detect);
    push_section(&mut doc, "respond", respond);
    doc
}

fn push_section(doc: &mut String, key: &str, outcome: &SectionOutcome) {
    match outcome {
        SectionOutcome::Generated(yaml) => {
            doc.push_str(key);
            doc.push_str(":\n");
            for line in yaml.trim_end().lines() {
                if line.is_empty() {
                    doc.push('\n');
                } else {
                    doc.push_str("  ");
                    doc.push_str(line);
                    doc.push('\n');
                }
            }
        }
        SectionOutcome::Failed(error) => {
            doc.push_str(key);
            doc.push_str(":\n");
            for line in error.lines() {
                doc.push_str("  # section failed: ");
                doc.push_str(line);
                doc.push('\n');
            }
        }
        SectionOutcome::Skipped(reason) => {
            doc.push_str(key);
            doc.push_str(":\n  # section skipped: ");
            doc.push_str(reason);
            doc.push('\n');
        }
    }
}
