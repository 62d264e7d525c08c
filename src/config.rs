//! Configuration types for rasterisation and labelling.
//!
//! The two utilities are configured independently: [`RasterizeConfig`] for
//! PDF → page images and [`LabelConfig`] for page images → label table.
//! Both are built through a builder that validates in `build()`; the entry
//! points run the same `validate()` again since the fields are public.

use crate::error::PageLabelError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

/// Model used when neither the config nor the environment names one.
pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";

// ── Image format ─────────────────────────────────────────────────────────

/// File format of the page images written by the rasterizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageImageFormat {
    /// Lossless; the default.
    #[default]
    Png,
    /// Smaller files; the alpha channel is dropped before encoding.
    Jpeg,
}

impl PageImageFormat {
    /// File extension used in page image names.
    pub fn extension(self) -> &'static str {
        match self {
            PageImageFormat::Png => "png",
            PageImageFormat::Jpeg => "jpg",
        }
    }

    pub fn image_format(self) -> image::ImageFormat {
        match self {
            PageImageFormat::Png => image::ImageFormat::Png,
            PageImageFormat::Jpeg => image::ImageFormat::Jpeg,
        }
    }
}

impl FromStr for PageImageFormat {
    type Err = PageLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "png" => Ok(PageImageFormat::Png),
            "jpg" | "jpeg" => Ok(PageImageFormat::Jpeg),
            other => Err(PageLabelError::InvalidConfig(format!(
                "unsupported image format '{other}' (expected png, jpg or jpeg)"
            ))),
        }
    }
}

// ── Rasterizer ───────────────────────────────────────────────────────────

/// Configuration for rendering a PDF into one image per page.
///
/// # Example
/// ```rust
/// use pdf_pagelabel::{PageImageFormat, RasterizeConfig};
///
/// let config = RasterizeConfig::builder()
///     .output_dir("data/")
///     .dpi(400)
///     .image_format(PageImageFormat::Png)
///     .build()
///     .unwrap();
/// assert_eq!(config.dpi, 400);
/// ```
#[derive(Clone)]
pub struct RasterizeConfig {
    /// Directory receiving the page images; created if absent. Default: `.`.
    pub output_dir: PathBuf,

    /// Rendering resolution. Pixel size is `page_points * dpi / 72`. Default: 300.
    pub dpi: u32,

    /// Output image format. Default: PNG.
    pub image_format: PageImageFormat,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Where to write the page manifest, if anywhere.
    pub manifest_path: Option<PathBuf>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Receives a `Saved <path>` event per page.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for RasterizeConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            dpi: 300,
            image_format: PageImageFormat::default(),
            password: None,
            manifest_path: None,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for RasterizeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RasterizeConfig")
            .field("output_dir", &self.output_dir)
            .field("dpi", &self.dpi)
            .field("image_format", &self.image_format)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("manifest_path", &self.manifest_path)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .finish()
    }
}

impl RasterizeConfig {
    pub fn builder() -> RasterizeConfigBuilder {
        RasterizeConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn validate(&self) -> Result<(), PageLabelError> {
        if self.dpi == 0 || self.dpi > 1200 {
            return Err(PageLabelError::InvalidConfig(format!(
                "DPI must be 1–1200, got {}",
                self.dpi
            )));
        }
        Ok(())
    }

    /// Scale factor handed to pdfium: PDF user space is 72 units per inch.
    pub fn scale_factor(&self) -> f32 {
        self.dpi as f32 / 72.0
    }
}

/// Builder for [`RasterizeConfig`].
#[derive(Debug)]
pub struct RasterizeConfigBuilder {
    config: RasterizeConfig,
}

impl RasterizeConfigBuilder {
    pub fn output_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.config.output_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi;
        self
    }

    pub fn image_format(mut self, format: PageImageFormat) -> Self {
        self.config.image_format = format;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn manifest_path(mut self, path: impl AsRef<Path>) -> Self {
        self.config.manifest_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<RasterizeConfig, PageLabelError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// ── Labeler ──────────────────────────────────────────────────────────────

/// Where the labeler takes its list of page images from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Every entry of `dir` matching the glob `pattern`, ordered by the
    /// page number at the front of each file name.
    Directory { dir: PathBuf, pattern: String },
    /// The pages recorded in a manifest written by the rasterizer.
    Manifest(PathBuf),
}

impl Default for ImageSource {
    fn default() -> Self {
        ImageSource::Directory {
            dir: PathBuf::from("."),
            pattern: "*.*".to_string(),
        }
    }
}

/// Configuration for classifying page images.
///
/// # Example
/// ```rust
/// use pdf_pagelabel::LabelConfig;
///
/// let config = LabelConfig::builder()
///     .images_dir("data/")
///     .pattern("*_annual-report.png")
///     .batch_size(20)
///     .sleep_secs(60.0)
///     .return_exceptions(true)
///     .build()
///     .unwrap();
/// assert_eq!(config.batch_size, 20);
/// ```
#[derive(Clone)]
pub struct LabelConfig {
    /// Which images to classify.
    pub source: ImageSource,

    /// Requests per batch; batches run one after another. Must be ≥ 1. Default: 10.
    pub batch_size: usize,

    /// Pause between consecutive batches, in seconds. Default: 0 (no pause).
    pub sleep_secs: f64,

    /// Record per-image failures in the table instead of aborting. Default: false.
    pub return_exceptions: bool,

    /// Destination of the CSV table. Default: `labels.csv`.
    pub output_path: PathBuf,

    /// LLM model identifier. If None, uses [`DEFAULT_MODEL`] or the environment.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "gemini").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.3.
    pub temperature: f32,

    /// Maximum tokens the model may generate per image. Default: 64.
    pub max_tokens: usize,

    /// Custom system instruction. If None, uses the built-in taxonomy prompt.
    pub system_prompt: Option<String>,

    /// Receives batch-level events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            source: ImageSource::default(),
            batch_size: 10,
            sleep_secs: 0.0,
            return_exceptions: false,
            output_path: PathBuf::from("labels.csv"),
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.3,
            max_tokens: 64,
            system_prompt: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for LabelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LabelConfig")
            .field("source", &self.source)
            .field("batch_size", &self.batch_size)
            .field("sleep_secs", &self.sleep_secs)
            .field("return_exceptions", &self.return_exceptions)
            .field("output_path", &self.output_path)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl LabelConfig {
    pub fn builder() -> LabelConfigBuilder {
        LabelConfigBuilder {
            config: Self::default(),
        }
    }

    /// Check the constraints `build()` enforces. Entry points re-check,
    /// since the fields are public.
    pub fn validate(&self) -> Result<(), PageLabelError> {
        if self.batch_size == 0 {
            return Err(PageLabelError::InvalidConfig(
                "Batch size must be ≥ 1".into(),
            ));
        }
        if !self.sleep_secs.is_finite() || self.sleep_secs < 0.0 {
            return Err(PageLabelError::InvalidConfig(format!(
                "Sleep must be a non-negative number of seconds, got {}",
                self.sleep_secs
            )));
        }
        if let ImageSource::Directory { pattern, .. } = &self.source {
            if pattern.trim().is_empty() {
                return Err(PageLabelError::InvalidConfig(
                    "Glob pattern must not be empty".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Builder for [`LabelConfig`].
#[derive(Debug)]
pub struct LabelConfigBuilder {
    config: LabelConfig,
}

impl LabelConfigBuilder {
    /// Scan `dir`, keeping the current pattern.
    pub fn images_dir(mut self, dir: impl AsRef<Path>) -> Self {
        let pattern = match &self.config.source {
            ImageSource::Directory { pattern, .. } => pattern.clone(),
            ImageSource::Manifest(_) => "*.*".to_string(),
        };
        self.config.source = ImageSource::Directory {
            dir: dir.as_ref().to_path_buf(),
            pattern,
        };
        self
    }

    /// Glob applied to file names inside the image directory.
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        let dir = match &self.config.source {
            ImageSource::Directory { dir, .. } => dir.clone(),
            ImageSource::Manifest(_) => PathBuf::from("."),
        };
        self.config.source = ImageSource::Directory {
            dir,
            pattern: pattern.into(),
        };
        self
    }

    /// Read the image list from a manifest instead of scanning a directory.
    pub fn manifest(mut self, path: impl AsRef<Path>) -> Self {
        self.config.source = ImageSource::Manifest(path.as_ref().to_path_buf());
        self
    }

    pub fn batch_size(mut self, n: usize) -> Self {
        self.config.batch_size = n;
        self
    }

    pub fn sleep_secs(mut self, secs: f64) -> Self {
        self.config.sleep_secs = secs;
        self
    }

    pub fn return_exceptions(mut self, v: bool) -> Self {
        self.config.return_exceptions = v;
        self
    }

    pub fn output_path(mut self, path: impl AsRef<Path>) -> Self {
        self.config.output_path = path.as_ref().to_path_buf();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<LabelConfig, PageLabelError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
