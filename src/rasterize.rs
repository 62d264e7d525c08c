//! Rasterizer entry points: PDF → one image file per page.

use crate::config::RasterizeConfig;
use crate::error::PageLabelError;
use crate::output::PageManifest;
use crate::pipeline::{input, render};
use std::time::Instant;
use tracing::info;

/// Render every page of a PDF file or URL into `config.output_dir`.
///
/// The output directory is created first. If the document cannot be opened
/// the returned error satisfies [`PageLabelError::is_open_failure`] and no
/// page has been written. A page that fails to render or save aborts the
/// run; pages saved before it stay on disk.
///
/// # Example
/// ```rust,no_run
/// use pdf_pagelabel::{rasterize, RasterizeConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = RasterizeConfig::builder().output_dir("data/").dpi(400).build()?;
/// let manifest = rasterize("raw_data/zoning-code.pdf", &config).await?;
/// println!("{} pages", manifest.page_count());
/// # Ok(())
/// # }
/// ```
pub async fn rasterize(
    input_str: impl AsRef<str>,
    config: &RasterizeConfig,
) -> Result<PageManifest, PageLabelError> {
    config.validate()?;
    let start = Instant::now();
    let input_str = input_str.as_ref();
    info!("Rasterising {} at {} DPI", input_str, config.dpi);

    tokio::fs::create_dir_all(&config.output_dir)
        .await
        .map_err(|e| PageLabelError::OutputWriteFailed {
            path: config.output_dir.clone(),
            source: e,
        })?;

    let resolved = input::resolve_pdf(input_str, config.download_timeout_secs).await?;
    let manifest = render::render_document(resolved.path(), resolved.base_name(), config).await?;

    if let Some(ref manifest_path) = config.manifest_path {
        manifest.write(manifest_path)?;
    }

    info!(
        "Rasterised {} pages in {}ms",
        manifest.page_count(),
        start.elapsed().as_millis()
    );
    Ok(manifest)
}

/// Synchronous wrapper around [`rasterize`].
///
/// Creates a temporary tokio runtime internally.
pub fn rasterize_sync(
    input_str: impl AsRef<str>,
    config: &RasterizeConfig,
) -> Result<PageManifest, PageLabelError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| PageLabelError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(rasterize(input_str, config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn output_dir_created_even_when_open_fails() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("a/b/c");
        let config = RasterizeConfig::builder().output_dir(&out).build().unwrap();

        let err = rasterize(dir.path().join("missing.pdf").to_str().unwrap(), &config)
            .await
            .unwrap_err();

        assert!(err.is_open_failure());
        assert!(out.is_dir());
        assert_eq!(std::fs::read_dir(&out).unwrap().count(), 0);
    }
}
