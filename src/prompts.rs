//! System instruction for page classification.
//!
//! The instruction is assembled from [`PageLabel`] descriptions and the
//! [`Classification`] JSON schema, so adding a category means touching the
//! enum only. Callers can override it via
//! [`crate::config::LabelConfig::system_prompt`].

use crate::label::{Classification, PageLabel};
use once_cell::sync::Lazy;

const PREAMBLE: &str = "Please classify the following image into the most appropriate category. \
If the image does not clearly fit any category or if you're unsure, select 'UNKNOWN'. \
Here are the categories to choose from:";

const CLOSING: &str = "Select the single most fitting category based on the image's content.";

/// Default system instruction, built once.
pub static DEFAULT_SYSTEM_PROMPT: Lazy<String> = Lazy::new(build_system_prompt);

fn build_system_prompt() -> String {
    let categories: Vec<String> = PageLabel::ALL
        .iter()
        .filter_map(|l| l.description().map(|d| format!("- {}: {}", l.as_str(), d)))
        .collect();

    format!(
        "{PREAMBLE}\n\n{}\n\n{CLOSING}\n{}",
        categories.join("\n"),
        format_instructions()
    )
}

/// Directive telling the model to answer with a JSON object matching the
/// [`Classification`] schema and nothing else.
pub fn format_instructions() -> String {
    let schema = serde_json::to_string(&Classification::json_schema())
        .unwrap_or_else(|_| r#"{"label": "<CATEGORY>"}"#.to_string());
    format!(
        "The output should be formatted as a JSON instance that conforms to the JSON schema below.\n\
Respond with the JSON object only, without code fences or commentary.\n\n\
Here is the output schema:\n```\n{schema}\n```"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_describes_nine_categories() {
        let listed = DEFAULT_SYSTEM_PROMPT
            .lines()
            .filter(|l| l.starts_with("- "))
            .count();
        assert_eq!(listed, 9);
        assert!(DEFAULT_SYSTEM_PROMPT.contains("'UNKNOWN'"));
    }

    #[test]
    fn prompt_embeds_schema() {
        assert!(DEFAULT_SYSTEM_PROMPT.contains("\"required\":[\"label\"]"));
        assert!(DEFAULT_SYSTEM_PROMPT.contains("TEXT_PLUS_TABLE_PAGE"));
    }
}
