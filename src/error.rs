//! Error types for the pdf-pagelabel library.
//!
//! Failures come in two weights:
//!
//! * [`PageLabelError`]: **Fatal**: the run cannot proceed at all (bad
//!   input file, unparseable image name, provider not configured, a
//!   classification failure while failures are not tolerated). Returned as
//!   `Err(PageLabelError)` from the top-level entry points.
//!
//! * [`ClassifyError`]: **Non-fatal**: a single image could not be
//!   classified. With `return_exceptions` enabled it occupies that image's
//!   slot in the [`crate::output::LabelTable`]; otherwise it is wrapped in
//!   [`PageLabelError::ClassificationFailed`] and aborts the run.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that stop a rasterisation or labelling run.
#[derive(Debug, Error)]
pub enum PageLabelError {
    // ── Opening the document ──────────────────────────────────────────────
    #[error("No PDF at '{path}'")]
    FileNotFound { path: PathBuf },

    #[error("Not allowed to read '{path}' (check its permissions)")]
    PermissionDenied { path: PathBuf },

    /// Empty input string.
    #[error("'{input}' is neither a file path nor an http(s) URL")]
    InvalidInput { input: String },

    #[error("Could not fetch '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    #[error("Gave up fetching '{url}' after {secs}s")]
    DownloadTimeout { url: String, secs: u64 },

    /// The first four bytes are not `%PDF`.
    #[error("'{path}' does not look like a PDF (starts with {magic:?})")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// pdfium could not parse the document.
    #[error("Cannot parse PDF '{path}': {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    #[error("PDF '{path}' is password protected; pass --password")]
    PasswordRequired { path: PathBuf },

    #[error("The password given for '{path}' was rejected")]
    WrongPassword { path: PathBuf },

    // ── Rendering pages ───────────────────────────────────────────────────
    #[error("Page {page} could not be rendered: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    #[error("Page {page} could not be saved as '{path}': {detail}")]
    PageWriteFailed {
        page: usize,
        path: PathBuf,
        detail: String,
    },

    // ── Selecting page images ─────────────────────────────────────────────
    #[error("Cannot list images in '{path}': {reason}")]
    ImageDirUnreadable { path: PathBuf, reason: String },

    #[error("Bad glob pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// An image file name does not start with `{page}_`.
    #[error(
        "Cannot read a page number from '{path}'\n\
Page images must be named '{{page}}_{{document}}.{{ext}}' (e.g. 12_report.png)."
    )]
    InvalidPageFileName { path: PathBuf },

    #[error("Page manifest '{path}': {reason}")]
    Manifest { path: PathBuf, reason: String },

    // ── Labelling ─────────────────────────────────────────────────────────
    /// No usable provider could be built from config or environment.
    #[error("No vision model available via '{provider}'.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// One image failed and failures are not being recorded.
    #[error("Labelling '{path}' failed: {source}\nPass --return_exceptions to keep going and record the failure instead.")]
    ClassificationFailed {
        path: PathBuf,
        #[source]
        source: ClassifyError,
    },

    // ── Output and setup ──────────────────────────────────────────────────
    #[error("Cannot write '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(
        "pdfium library not found: {0}\n\n\
Download a build from https://github.com/bblanchon/pdfium-binaries, then put it\n\
next to the binary or point PDFIUM_LIB_PATH at it.\n"
    )]
    PdfiumBindingFailed(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PageLabelError {
    /// `true` when the source document could not be opened at all.
    ///
    /// The rasterizer reports these and stops before touching any page.
    pub fn is_open_failure(&self) -> bool {
        matches!(
            self,
            PageLabelError::FileNotFound { .. }
                | PageLabelError::PermissionDenied { .. }
                | PageLabelError::InvalidInput { .. }
                | PageLabelError::DownloadFailed { .. }
                | PageLabelError::DownloadTimeout { .. }
                | PageLabelError::NotAPdf { .. }
                | PageLabelError::CorruptPdf { .. }
                | PageLabelError::PasswordRequired { .. }
                | PageLabelError::WrongPassword { .. }
        )
    }
}

/// A non-fatal error for a single image.
///
/// Its `Display` text is what lands in the `label` column when failures are
/// tolerated.
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
pub enum ClassifyError {
    /// The image file could not be read, so no request was sent.
    #[error("ERROR: image could not be read: {detail}")]
    MissingImage { detail: String },

    /// The provider call itself failed.
    #[error("ERROR: LLM call failed: {detail}")]
    LlmFailed { detail: String },

    /// The reply is not a JSON object with a `label` field.
    #[error("ERROR: invalid model response: {detail}")]
    InvalidResponse { detail: String },

    /// The reply named a label outside the category set.
    #[error("ERROR: unknown label '{value}'")]
    UnknownLabel { value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_failures_are_flagged() {
        assert!(PageLabelError::CorruptPdf {
            path: "a.pdf".into(),
            detail: "bad xref".into(),
        }
        .is_open_failure());
        assert!(PageLabelError::FileNotFound { path: "a.pdf".into() }.is_open_failure());
        assert!(!PageLabelError::PageWriteFailed {
            page: 2,
            path: "2_a.png".into(),
            detail: "disk full".into(),
        }
        .is_open_failure());
    }

    #[test]
    fn classification_failed_display() {
        let e = PageLabelError::ClassificationFailed {
            path: "3_doc.png".into(),
            source: ClassifyError::LlmFailed {
                detail: "HTTP 500".into(),
            },
        };
        let msg = e.to_string();
        assert!(msg.contains("3_doc.png"), "got: {msg}");
        assert!(msg.contains("HTTP 500"), "got: {msg}");
    }

    #[test]
    fn invalid_file_name_mentions_contract() {
        let e = PageLabelError::InvalidPageFileName {
            path: "cover.png".into(),
        };
        assert!(e.to_string().contains("{page}_{document}.{ext}"));
    }

    #[test]
    fn classify_error_text_is_marked() {
        let e = ClassifyError::UnknownLabel {
            value: "POSTER".into(),
        };
        assert_eq!(e.to_string(), "ERROR: unknown label 'POSTER'");
    }
}
