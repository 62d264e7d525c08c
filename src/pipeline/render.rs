//! PDF rasterisation: render every page via pdfium and save it to disk.
//!
//! pdfium keeps thread-local state and must not be driven from async worker
//! threads, so the whole document is processed inside one
//! `tokio::task::spawn_blocking` call. Pages are written as soon as they are
//! rendered; only one bitmap is alive at a time.
//!
//! Resolution follows the DPI directly: pdfium renders at
//! `dpi / 72` pixels per PDF point, so doubling the DPI doubles both pixel
//! dimensions.

use crate::config::{PageImageFormat, RasterizeConfig};
use crate::error::PageLabelError;
use crate::naming::PageImageName;
use crate::output::{PageImage, PageManifest};
use crate::progress::ProgressCallback;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming an explicit pdfium library file.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Bind to pdfium: `PDFIUM_LIB_PATH`, then the working directory, then the
/// system library search path.
pub fn bind_pdfium() -> Result<Pdfium, PageLabelError> {
    let bindings = match std::env::var(PDFIUM_LIB_PATH_ENV) {
        Ok(path) if !path.is_empty() => Pdfium::bind_to_library(&path),
        _ => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| PageLabelError::PdfiumBindingFailed(e.to_string()))?;

    Ok(Pdfium::new(bindings))
}

/// Everything the blocking render task needs, owned.
struct RenderJob {
    pdf_path: PathBuf,
    base_name: String,
    output_dir: PathBuf,
    dpi: u32,
    scale: f32,
    format: PageImageFormat,
    password: Option<String>,
    progress: Option<ProgressCallback>,
}

/// Render every page of `pdf_path` into `config.output_dir`.
///
/// The output directory must already exist.
pub async fn render_document(
    pdf_path: &Path,
    base_name: &str,
    config: &RasterizeConfig,
) -> Result<PageManifest, PageLabelError> {
    let job = RenderJob {
        pdf_path: pdf_path.to_path_buf(),
        base_name: base_name.to_string(),
        output_dir: config.output_dir.clone(),
        dpi: config.dpi,
        scale: config.scale_factor(),
        format: config.image_format,
        password: config.password.clone(),
        progress: config.progress_callback.clone(),
    };

    tokio::task::spawn_blocking(move || render_document_blocking(&job))
        .await
        .map_err(|e| PageLabelError::Internal(format!("Render task panicked: {}", e)))?
}

fn render_document_blocking(job: &RenderJob) -> Result<PageManifest, PageLabelError> {
    let pdfium = bind_pdfium()?;
    let document = open_document(&pdfium, &job.pdf_path, job.password.as_deref())?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF loaded: {} pages", total_pages);
    if let Some(ref cb) = job.progress {
        cb.on_rasterize_start(total_pages);
    }

    let render_config = PdfRenderConfig::new().scale_page_by_factor(job.scale);
    let mut written = Vec::with_capacity(total_pages);

    for idx in 0..total_pages {
        let page_num = idx + 1;
        let page = pages
            .get(idx as u16)
            .map_err(|e| PageLabelError::RasterisationFailed {
                page: page_num,
                detail: format!("{:?}", e),
            })?;

        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            PageLabelError::RasterisationFailed {
                page: page_num,
                detail: format!("{:?}", e),
            }
        })?;

        let image = bitmap.as_image();
        let name = PageImageName::new(page_num, job.base_name.as_str());
        let path = job.output_dir.join(name.file_name(job.format.extension()));
        save_page(&image, job.format, &path).map_err(|e| PageLabelError::PageWriteFailed {
            page: page_num,
            path: path.clone(),
            detail: e.to_string(),
        })?;

        debug!(
            "Rendered page {} → {}x{} px",
            page_num,
            image.width(),
            image.height()
        );
        info!("Saved {}", path.display());
        if let Some(ref cb) = job.progress {
            cb.on_page_saved(page_num, total_pages, &path);
        }

        written.push(PageImage {
            page: page_num,
            path,
            width: image.width(),
            height: image.height(),
        });
    }

    Ok(PageManifest {
        document: job.base_name.clone(),
        dpi: job.dpi,
        image_format: job.format,
        pages: written,
    })
}

/// Open the document, sorting pdfium failures into password and corruption
/// errors.
fn open_document<'a>(
    pdfium: &'a Pdfium,
    pdf_path: &Path,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, PageLabelError> {
    pdfium.load_pdf_from_file(pdf_path, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                PageLabelError::WrongPassword {
                    path: pdf_path.to_path_buf(),
                }
            } else {
                PageLabelError::PasswordRequired {
                    path: pdf_path.to_path_buf(),
                }
            }
        } else {
            PageLabelError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: err_str,
            }
        }
    })
}

/// Encode and write one page. JPEG has no alpha channel, so RGBA bitmaps are
/// flattened to RGB first.
pub fn save_page(
    image: &DynamicImage,
    format: PageImageFormat,
    path: &Path,
) -> Result<(), image::ImageError> {
    match format {
        PageImageFormat::Png => image.save_with_format(path, format.image_format()),
        PageImageFormat::Jpeg => DynamicImage::ImageRgb8(image.to_rgb8())
            .save_with_format(path, format.image_format()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn sample() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 4, Rgba([20, 40, 60, 255])))
    }

    #[test]
    fn save_png_keeps_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("1_doc.png");
        save_page(&sample(), PageImageFormat::Png, &path).unwrap();
        let back = image::open(&path).unwrap();
        assert_eq!((back.width(), back.height()), (8, 4));
    }

    #[test]
    fn save_jpeg_from_rgba() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("1_doc.jpg");
        save_page(&sample(), PageImageFormat::Jpeg, &path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn save_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing/1_doc.png");
        assert!(save_page(&sample(), PageImageFormat::Png, &path).is_err());
    }
}
