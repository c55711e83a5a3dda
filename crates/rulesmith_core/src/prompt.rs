//! Natural-language query construction for the remote generation tools.
//!
//! The queries are the tool service's whole input, so they must embed the
//! source rule verbatim along with the platform and the wanted section.
//! Construction is deterministic: same inputs, same text.

use crate::RuleItem;

/// Query asking for the detection section of the converted rule.
pub fn detection_query(platform: &str, item: &RuleItem) -> String {
    format!(
        "Convert this {platform} security detection rule to D&R detection format.\n\
         \n\
         Rule name: {name}\n\
         Platform: {platform}\n\
         {format_line}\
         \n\
         Original rule:\n\
         {content}\n\
         \n\
         Generate the detection component in D&R YAML format.",
        name = item.name,
        format_line = format_line(item),
        content = item.content,
    )
}

/// Query asking for the response section. The already-generated detection
/// section is embedded so the response actions match it.
pub fn response_query(platform: &str, item: &RuleItem, detection_yaml: &str) -> String {
    format!(
        "Convert this {platform} security detection rule to D&R response format.\n\
         \n\
         Rule name: {name}\n\
         Platform: {platform}\n\
         {format_line}\
         \n\
         Original rule:\n\
         {content}\n\
         \n\
         Detection component:\n\
         {detection_yaml}\n\
         \n\
         Generate the response component in D&R YAML format.",
        name = item.name,
        format_line = format_line(item),
        content = item.content,
    )
}

fn format_line(item: &RuleItem) -> String {
    match item.format.as_deref() {
        Some(format) => format!("Rule format: {format}\n"),
        None => String::new(),
    }
}
