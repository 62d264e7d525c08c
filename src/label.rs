//! The classification contract: the closed set of page labels and the
//! structured reply the model must produce.
//!
//! The model is asked for `{"label": "<CATEGORY>"}`. Replies are parsed into
//! [`Classification`]; any label outside [`PageLabel`] is rejected here
//! rather than trusted to the prompt.

use crate::error::ClassifyError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Content category of one page image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PageLabel {
    CoverPage,
    BlankPage,
    TextPage,
    ImagePage,
    DiagramPage,
    TextPlusImagePage,
    TextPlusDiagramPage,
    TablePage,
    TextPlusTablePage,
    Unknown,
}

impl PageLabel {
    /// Every label, in the order they are presented to the model.
    pub const ALL: [PageLabel; 10] = [
        PageLabel::CoverPage,
        PageLabel::BlankPage,
        PageLabel::TextPage,
        PageLabel::ImagePage,
        PageLabel::DiagramPage,
        PageLabel::TextPlusImagePage,
        PageLabel::TextPlusDiagramPage,
        PageLabel::TablePage,
        PageLabel::TextPlusTablePage,
        PageLabel::Unknown,
    ];

    /// Wire name, e.g. `TEXT_PLUS_TABLE_PAGE`.
    pub fn as_str(self) -> &'static str {
        match self {
            PageLabel::CoverPage => "COVER_PAGE",
            PageLabel::BlankPage => "BLANK_PAGE",
            PageLabel::TextPage => "TEXT_PAGE",
            PageLabel::ImagePage => "IMAGE_PAGE",
            PageLabel::DiagramPage => "DIAGRAM_PAGE",
            PageLabel::TextPlusImagePage => "TEXT_PLUS_IMAGE_PAGE",
            PageLabel::TextPlusDiagramPage => "TEXT_PLUS_DIAGRAM_PAGE",
            PageLabel::TablePage => "TABLE_PAGE",
            PageLabel::TextPlusTablePage => "TEXT_PLUS_TABLE_PAGE",
            PageLabel::Unknown => "UNKNOWN",
        }
    }

    /// One-line description used in the system instruction.
    ///
    /// `UNKNOWN` has none: the prompt introduces it separately as the
    /// fallback choice.
    pub fn description(self) -> Option<&'static str> {
        match self {
            PageLabel::CoverPage => {
                Some("The image serves as the front page or cover of a document or book.")
            }
            PageLabel::BlankPage => {
                Some("The image shows a blank page without text or significant markings.")
            }
            PageLabel::TextPage => {
                Some("The image is predominantly text-based, similar to a book or document page.")
            }
            PageLabel::ImagePage => Some(
                "The image is primarily a photograph or illustration without significant text.",
            ),
            PageLabel::DiagramPage => {
                Some("The image contains diagrams, charts, or graphs, with minimal text.")
            }
            PageLabel::TextPlusImagePage => Some(
                "The image includes both text and significant photographic or illustrative content.",
            ),
            PageLabel::TextPlusDiagramPage => {
                Some("The image combines text with diagrams, charts, or graphs.")
            }
            PageLabel::TablePage => Some("The image features tables or spreadsheets."),
            PageLabel::TextPlusTablePage => {
                Some("The image includes both text and table(s) or spreadsheet(s).")
            }
            PageLabel::Unknown => None,
        }
    }
}

impl fmt::Display for PageLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PageLabel {
    type Err = ClassifyError;

    /// Case-insensitive; spaces and hyphens read as underscores.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalised: String = s
            .trim()
            .chars()
            .map(|c| match c {
                ' ' | '-' => '_',
                c => c.to_ascii_uppercase(),
            })
            .collect();
        PageLabel::ALL
            .into_iter()
            .find(|l| l.as_str() == normalised)
            .ok_or_else(|| ClassifyError::UnknownLabel {
                value: s.trim().to_string(),
            })
    }
}

/// The structured reply: a single required `label` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub label: PageLabel,
}

/// Shape used to read the reply before the label is checked against the set.
#[derive(Deserialize)]
struct RawClassification {
    label: String,
}

impl Classification {
    /// JSON schema of the reply, embedded in the system instruction.
    pub fn json_schema() -> serde_json::Value {
        let values: Vec<&str> = PageLabel::ALL.iter().map(|l| l.as_str()).collect();
        serde_json::json!({
            "title": "Classification",
            "type": "object",
            "properties": {
                "label": {
                    "title": "Label",
                    "description": format!("one of the following: {}", values.join(", ")),
                    "type": "string",
                    "enum": values,
                }
            },
            "required": ["label"],
        })
    }

    /// Parse a raw model reply.
    ///
    /// Accepts the object on its own, wrapped in a code fence, or surrounded
    /// by stray prose; the outermost `{...}` is what gets deserialised.
    pub fn parse(reply: &str) -> Result<Self, ClassifyError> {
        let body = strip_code_fence(reply.trim());
        let json = match (body.find('{'), body.rfind('}')) {
            (Some(start), Some(end)) if start < end => &body[start..=end],
            _ => {
                return Err(ClassifyError::InvalidResponse {
                    detail: format!("no JSON object in reply {:?}", truncate(reply)),
                })
            }
        };
        let raw: RawClassification =
            serde_json::from_str(json).map_err(|e| ClassifyError::InvalidResponse {
                detail: format!("{e} in reply {:?}", truncate(reply)),
            })?;
        Ok(Self {
            label: raw.label.parse()?,
        })
    }
}

static RE_CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z]*\s*\n?(.*?)\n?```$").unwrap());

fn strip_code_fence(input: &str) -> &str {
    match RE_CODE_FENCE.captures(input).and_then(|c| c.get(1)) {
        Some(m) => m.as_str(),
        None => input,
    }
}

fn truncate(s: &str) -> String {
    const MAX: usize = 120;
    match s.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_string(),
    }
}
