//! CLI binary: render every page of a PDF to an image file.
//!
//! A thin shim over [`pdf_pagelabel::rasterize`] that maps flags to
//! `RasterizeConfig` and prints one line per saved page.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf_pagelabel::{rasterize, PageImageFormat, RasterizeConfig, RunProgressCallback};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Prints `Saved <path>` above a page counter.
struct SavedPagePrinter {
    bar: ProgressBar,
}

impl SavedPagePrinter {
    fn new(show_bar: bool) -> Arc<Self> {
        let bar = if show_bar {
            let bar = ProgressBar::new(0);
            bar.set_style(
                ProgressStyle::with_template(
                    "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} pages  ⏱ {elapsed_precise}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▉▊▋▌▍▎▏  "),
            );
            bar.set_prefix("Rendering");
            bar.enable_steady_tick(Duration::from_millis(80));
            bar
        } else {
            ProgressBar::hidden()
        };
        Arc::new(Self { bar })
    }
}

impl RunProgressCallback for SavedPagePrinter {
    fn on_rasterize_start(&self, total_pages: usize) {
        self.bar.set_length(total_pages as u64);
    }

    fn on_page_saved(&self, _page_num: usize, total_pages: usize, path: &Path) {
        let line = format!("Saved {}", path.display());
        if self.bar.is_hidden() {
            println!("{line}");
        } else {
            self.bar.println(line);
        }
        self.bar.inc(1);
        if self.bar.position() as usize >= total_pages {
            self.bar.finish_and_clear();
        }
    }
}

/// Convert each page of a PDF into an image file named {page}_{document}.{ext}.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2images",
    version,
    about = "Render each page of a PDF to an image file",
    arg_required_else_help = true,
    after_help = "EXAMPLE:\n  pdf2images raw_data/zoning-code.pdf --output-dir data/ --image-format png --dpi 400"
)]
struct Cli {
    /// Path (or HTTP/HTTPS URL) of the PDF file.
    pdf_path: String,

    /// Directory to save the output images.
    #[arg(long, env = "PDF2IMAGES_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// The image format for output: png, jpg or jpeg.
    #[arg(long, env = "PDF2IMAGES_FORMAT", default_value = "png")]
    image_format: String,

    /// Dots per inch for the output image.
    #[arg(long, env = "PDF2IMAGES_DPI", default_value_t = 300)]
    dpi: u32,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF2IMAGES_PASSWORD")]
    password: Option<String>,

    /// Also write a JSON manifest of the produced pages to this path.
    #[arg(long)]
    manifest: Option<PathBuf>,

    /// Show a progress bar instead of plain status lines.
    #[arg(long)]
    progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2IMAGES_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2IMAGES_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let image_format: PageImageFormat = cli
        .image_format
        .parse()
        .context("Invalid --image-format")?;

    let mut builder = RasterizeConfig::builder()
        .output_dir(&cli.output_dir)
        .dpi(cli.dpi)
        .image_format(image_format);
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd);
    }
    if let Some(ref path) = cli.manifest {
        builder = builder.manifest_path(path);
    }
    if !cli.quiet {
        builder = builder.progress_callback(SavedPagePrinter::new(cli.progress));
    }
    let config = builder.build().context("Invalid configuration")?;

    match rasterize(&cli.pdf_path, &config).await {
        Ok(manifest) => {
            if let Some(ref path) = cli.manifest {
                if !cli.quiet {
                    eprintln!(
                        "Wrote manifest for {} pages to {}",
                        manifest.page_count(),
                        path.display()
                    );
                }
            }
            Ok(())
        }
        // An unopenable document is reported, not raised.
        Err(e) if e.is_open_failure() => {
            eprintln!("Failed to open the PDF file: {e}");
            Ok(())
        }
        Err(e) => Err(e).context("Rasterisation failed"),
    }
}
