//! # pdf-pagelabel
//!
//! Rasterise PDF pages to images, then label each page image with a content
//! category using a Vision Language Model (VLM).
//!
//! Document pipelines use the labels to triage pages before extraction:
//! text pages go to a text extractor, tables to a table extractor, blank
//! pages nowhere.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ rasterize   pdfium renders each page at DPI/72 scale
//!  │              → {page}_{document}.png  (+ optional manifest.json)
//!  │
//!  └─ label       glob + numeric sort → base64 → batched VLM calls
//!                 → labels.csv  (local_image_path,label)
//! ```
//!
//! The two steps share nothing but the image directory, so they can run on
//! different machines or at different times.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_pagelabel::{label_to_file, rasterize, LabelConfig, RasterizeConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let raster = RasterizeConfig::builder().output_dir("data").dpi(300).build()?;
//!     rasterize("report.pdf", &raster).await?;
//!
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let label = LabelConfig::builder()
//!         .images_dir("data")
//!         .pattern("*_report.png")
//!         .batch_size(20)
//!         .return_exceptions(true)
//!         .build()?;
//!     let table = label_to_file(&label).await?;
//!     eprintln!("{} pages labelled", table.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Labels
//!
//! `COVER_PAGE`, `BLANK_PAGE`, `TEXT_PAGE`, `IMAGE_PAGE`, `DIAGRAM_PAGE`,
//! `TEXT_PLUS_IMAGE_PAGE`, `TEXT_PLUS_DIAGRAM_PAGE`, `TABLE_PAGE`,
//! `TEXT_PLUS_TABLE_PAGE`, and `UNKNOWN` when the model is unsure.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2images` and `pagelabel` binaries |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod label;
pub mod labeler;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod rasterize;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    ImageSource, LabelConfig, LabelConfigBuilder, PageImageFormat, RasterizeConfig,
    RasterizeConfigBuilder,
};
pub use error::{ClassifyError, PageLabelError};
pub use label::{Classification, PageLabel};
pub use labeler::{label_images, label_images_with, label_to_file, label_to_file_with};
pub use naming::PageImageName;
pub use output::{LabelCell, LabelRow, LabelTable, PageImage, PageManifest};
pub use pipeline::classify::{PageClassifier, VisionClassifier};
pub use pipeline::encode::ClassificationRequest;
pub use progress::{NoopProgressCallback, ProgressCallback, RunProgressCallback};
pub use rasterize::{rasterize, rasterize_sync};
