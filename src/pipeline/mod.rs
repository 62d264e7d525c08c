//! Pipeline stages for rasterising and labelling.
//!
//! Each submodule implements one step; the entry points in
//! [`crate::rasterize`] and [`crate::labeler`] compose them.
//!
//! ## Data Flow
//!
//! ```text
//! rasterize:  input ──▶ render ──▶ page images (+ manifest)
//! label:      discover ──▶ encode ──▶ batch ──▶ classify ──▶ label table
//! ```
//!
//! 1. [`input`]    resolve the PDF path or URL to a local file
//! 2. [`render`]   rasterise every page with pdfium inside `spawn_blocking`
//!    and save it as `{page}_{document}.{ext}`
//! 3. [`discover`] list page images by glob or manifest, in page order
//! 4. [`encode`]   read each image and base64-wrap it for the request body
//! 5. [`batch`]    run one batch concurrently under the failure policy
//! 6. [`classify`] the VLM call and reply parsing; the only network stage

pub mod batch;
pub mod classify;
pub mod discover;
pub mod encode;
pub mod input;
pub mod render;
