//! CLI binary: label page images with a Vision LLM and write a CSV.
//!
//! A thin shim over [`pdf_pagelabel::label_to_file`] that maps flags to
//! `LabelConfig` and reports progress batch by batch.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf_pagelabel::{label_to_file, LabelConfig, ProgressCallback, RunProgressCallback};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── Batch progress ───────────────────────────────────────────────────────────

type LineSink = Box<dyn Fn(&str) + Send + Sync>;

/// One status line per batch above a bar counting images.
struct BatchProgress {
    bar: ProgressBar,
    batch_size: usize,
    // Where lines go when the bar is hidden.
    plain: LineSink,
}

impl BatchProgress {
    fn new(batch_size: usize) -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} images  ⏱ {elapsed_precise}  {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  "),
        );
        bar.set_prefix("Labelling");
        bar.enable_steady_tick(Duration::from_millis(80));
        Self::with_bar(bar, batch_size, Box::new(|line| eprintln!("{line}")))
    }

    fn with_bar(bar: ProgressBar, batch_size: usize, plain: LineSink) -> Arc<Self> {
        Arc::new(Self {
            bar,
            batch_size,
            plain,
        })
    }

    /// Print above the bar, or straight to stderr when there is no terminal
    /// to draw the bar on.
    fn line(&self, msg: impl AsRef<str>) {
        if self.bar.is_hidden() {
            (self.plain)(msg.as_ref());
        } else {
            self.bar.println(msg);
        }
    }
}

impl RunProgressCallback for BatchProgress {
    fn on_labeling_start(&self, total_images: usize, total_batches: usize) {
        self.bar.set_length(total_images as u64);
        self.line(format!(
            "{} images in {} batches",
            bold(&total_images.to_string()),
            total_batches
        ));
    }

    fn on_batch_start(&self, batch: usize, total_batches: usize) {
        self.line(format!("Batch {batch}/{total_batches} processing..."));
        self.bar.set_message(format!("batch {batch}/{total_batches}"));
    }

    fn on_batch_complete(&self, batch: usize, total_batches: usize, failed: usize) {
        let remaining = self.bar.length().unwrap_or(0).saturating_sub(self.bar.position());
        self.bar.inc(remaining.min(self.batch_size as u64));
        let status = if failed == 0 {
            green("✓")
        } else {
            red(&format!("✗ {failed} failed"))
        };
        self.line(format!("  {status} batch {batch}/{total_batches}"));
        self.line("-".repeat(50));
    }

    fn on_sleep(&self, batch: usize, total_batches: usize, secs: f64) {
        self.line(dim(&format!(
            "Batch {batch}/{total_batches} processed! Sleeping for {secs} seconds..."
        )));
    }

    fn on_labeling_complete(&self, total_images: usize, failed: usize) {
        self.bar.finish_and_clear();
        if failed == 0 {
            eprintln!("{} {} images labelled", green("✔"), bold(&total_images.to_string()));
        } else {
            eprintln!(
                "{} {}/{} images labelled  ({} recorded as errors)",
                red("⚠"),
                total_images - failed,
                total_images,
                red(&failed.to_string())
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Label every page image of one document, 20 at a time, pausing 60s between batches
  pagelabel data/ 20 --regex "*_2022-denver-green-code.png" --sleep 60 --output-path labels_file1.csv

  # Keep going when individual pages fail; failures land in the label column
  pagelabel data/ 10 --return_exceptions

  # Use the manifest written by `pdf2images --manifest`
  pagelabel data/ 10 --manifest data/manifest.json

ENVIRONMENT VARIABLES (also read from .env):
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
"#;

/// Classify page images into content categories using a Vision LLM.
#[derive(Parser, Debug)]
#[command(
    name = "pagelabel",
    version,
    about = "Classify page images into content categories using a Vision LLM",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Path to the images directory.
    images_path: PathBuf,

    /// Number of images to process at a time.
    #[arg(value_parser = clap::value_parser!(u64).range(1..))]
    batch_size: u64,

    /// Record failed calls in the table instead of aborting the run.
    #[arg(long = "return_exceptions")]
    return_exceptions: bool,

    /// Glob pattern to filter the images.
    #[arg(long, default_value = "*.*")]
    regex: String,

    /// Seconds to sleep between batches.
    #[arg(long, default_value_t = 0.0)]
    sleep: f64,

    /// Path to save the label table.
    #[arg(long, env = "PAGELABEL_OUTPUT", default_value = "labels.csv")]
    output_path: PathBuf,

    /// Read the image list from a manifest written by pdf2images.
    #[arg(long)]
    manifest: Option<PathBuf>,

    /// LLM model ID (e.g. gpt-4.1-nano, gpt-4o, claude-sonnet-4-20250514).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "PAGELABEL_TEMPERATURE", default_value_t = 0.3)]
    temperature: f32,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "PAGELABEL_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Disable progress bar.
    #[arg(long, env = "PAGELABEL_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PAGELABEL_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PAGELABEL_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress reporter already prints the batch lines; keep INFO logs
    // for runs without it. Warnings (unreadable images) always show.
    let show_progress = !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else if show_progress {
        "warn"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let batch_size = usize::try_from(cli.batch_size).context("Batch size too large")?;
    let progress: Option<ProgressCallback> = if show_progress {
        let cb: ProgressCallback = BatchProgress::new(batch_size);
        Some(cb)
    } else {
        None
    };

    let config = build_config(&cli, batch_size, progress).await?;
    let table = label_to_file(&config).await.context("Labelling failed")?;

    if !cli.quiet {
        eprintln!(
            "   {} rows  →  {}",
            table.len(),
            bold(&cli.output_path.display().to_string())
        );
    }
    Ok(())
}

/// Whether `images_path` names the manifest's own directory.
fn same_dir(images_path: &Path, manifest_dir: Option<&Path>) -> bool {
    let manifest_dir = match manifest_dir.filter(|p| !p.as_os_str().is_empty()) {
        Some(dir) => dir,
        None => Path::new("."),
    };
    match (images_path.canonicalize(), manifest_dir.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => images_path == manifest_dir,
    }
}

/// Map CLI args to `LabelConfig`.
async fn build_config(
    cli: &Cli,
    batch_size: usize,
    progress: Option<ProgressCallback>,
) -> Result<LabelConfig> {
    let mut builder = LabelConfig::builder()
        .images_dir(&cli.images_path)
        .pattern(cli.regex.as_str())
        .batch_size(batch_size)
        .sleep_secs(cli.sleep)
        .return_exceptions(cli.return_exceptions)
        .output_path(&cli.output_path)
        .temperature(cli.temperature);

    if let Some(ref manifest) = cli.manifest {
        if !same_dir(&cli.images_path, manifest.parent()) {
            warn!(
                "--manifest {} takes precedence; ignoring images path {}",
                manifest.display(),
                cli.images_path.display()
            );
        }
        builder = builder.manifest(manifest);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn hidden_progress(batch_size: usize) -> (Arc<BatchProgress>, Arc<Mutex<Vec<String>>>) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&lines);
        let progress = BatchProgress::with_bar(
            ProgressBar::hidden(),
            batch_size,
            Box::new(move |line| sink.lock().unwrap().push(line.to_string())),
        );
        (progress, lines)
    }

    #[test]
    fn hidden_bar_still_reports_every_batch() {
        let (progress, lines) = hidden_progress(2);
        progress.on_labeling_start(5, 3);
        for batch in 1..=3 {
            progress.on_batch_start(batch, 3);
            progress.on_batch_complete(batch, 3, 0);
            if batch < 3 {
                progress.on_sleep(batch, 3, 1.0);
            }
        }

        let lines = lines.lock().unwrap();
        for batch in 1..=3 {
            let started = format!("Batch {batch}/3 processing...");
            assert!(lines.iter().any(|l| *l == started), "missing {started:?} in {lines:?}");
        }
        assert_eq!(lines.iter().filter(|l| l.contains("Sleeping for 1 seconds")).count(), 2);
    }

    #[test]
    fn separator_follows_each_batch_including_the_last() {
        let (progress, lines) = hidden_progress(4);
        progress.on_batch_start(1, 2);
        progress.on_batch_complete(1, 2, 1);
        progress.on_sleep(1, 2, 0.5);
        progress.on_batch_start(2, 2);
        progress.on_batch_complete(2, 2, 0);

        let lines = lines.lock().unwrap();
        let separator = "-".repeat(50);
        assert_eq!(lines.iter().filter(|l| **l == separator).count(), 2);
        assert_eq!(lines.last(), Some(&separator));
        let first_sep = lines.iter().position(|l| *l == separator).unwrap();
        let sleep = lines.iter().position(|l| l.contains("Sleeping")).unwrap();
        assert!(first_sep < sleep, "separator should close batch 1 before the pause: {lines:?}");
    }

    #[test]
    fn manifest_in_images_dir_is_the_same_dir() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("manifest.json");
        assert!(same_dir(dir.path(), manifest.parent()));

        let other = tempfile::tempdir().unwrap();
        assert!(!same_dir(other.path(), manifest.parent()));
    }

    #[test]
    fn bare_manifest_name_means_current_dir() {
        let manifest = Path::new("manifest.json");
        assert!(same_dir(Path::new("."), manifest.parent()));
    }
}
