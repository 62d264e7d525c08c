//! Labeler entry points: page images → label table.
//!
//! One async task drives the run. It awaits each batch, then the optional
//! pause, then starts the next batch; there is no overlap between batches
//! and no timeout around them. Rows are appended batch by batch in
//! submission order, so the table follows page order whatever the
//! concurrency inside a batch.
//!
//! Nothing is written until every batch has finished: a fatal error leaves
//! no partial CSV behind.

use crate::config::LabelConfig;
use crate::error::PageLabelError;
use crate::output::{LabelCell, LabelRow, LabelTable};
use crate::pipeline::batch::{batch_count, run_batch};
use crate::pipeline::classify::{PageClassifier, VisionClassifier};
use crate::pipeline::discover::discover_images;
use crate::pipeline::encode::encode_batch;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, info};

/// Classify every image selected by `config` with the configured VLM.
///
/// # Errors
/// Fatal errors only: invalid config, no provider, unreadable directory, a
/// file name without a page number, or (unless `return_exceptions` is set)
/// the first failed classification.
pub async fn label_images(config: &LabelConfig) -> Result<LabelTable, PageLabelError> {
    config.validate()?;
    let classifier = VisionClassifier::from_config(config)?;
    label_images_with(&classifier, config).await
}

/// Classify every image selected by `config` with a caller-supplied
/// classifier.
pub async fn label_images_with(
    classifier: &dyn PageClassifier,
    config: &LabelConfig,
) -> Result<LabelTable, PageLabelError> {
    config.validate()?;
    let start = Instant::now();
    let paths = discover_images(&config.source)?;
    let total_batches = batch_count(paths.len(), config.batch_size);

    if let Some(ref cb) = config.progress_callback {
        cb.on_labeling_start(paths.len(), total_batches);
    }

    let mut cells: Vec<LabelCell> = Vec::with_capacity(paths.len());

    for (idx, chunk) in paths.chunks(config.batch_size).enumerate() {
        let batch_num = idx + 1;
        info!("Batch {}/{} processing...", batch_num, total_batches);
        if let Some(ref cb) = config.progress_callback {
            cb.on_batch_start(batch_num, total_batches);
        }

        let requests = encode_batch(chunk).await;
        let results = run_batch(classifier, &requests, config.return_exceptions).await?;
        let failed = results.iter().filter(|r| r.is_err()).count();
        cells.extend(results.into_iter().map(LabelCell::from));

        debug!("Batch {}/{}: {} failed", batch_num, total_batches, failed);
        if let Some(ref cb) = config.progress_callback {
            cb.on_batch_complete(batch_num, total_batches, failed);
        }

        if config.sleep_secs > 0.0 && batch_num < total_batches {
            info!(
                "Batch {}/{} processed! Sleeping for {} seconds...",
                batch_num, total_batches, config.sleep_secs
            );
            if let Some(ref cb) = config.progress_callback {
                cb.on_sleep(batch_num, total_batches, config.sleep_secs);
            }
            sleep(Duration::from_secs_f64(config.sleep_secs)).await;
        }
    }

    let table = LabelTable {
        rows: paths
            .into_iter()
            .zip(cells)
            .map(|(local_image_path, label)| LabelRow {
                local_image_path,
                label,
            })
            .collect(),
    };

    info!(
        "Labelled {} images ({} failed) in {}ms",
        table.len(),
        table.failed_count(),
        start.elapsed().as_millis()
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_labeling_complete(table.len(), table.failed_count());
    }

    Ok(table)
}

/// Run [`label_images`] and write the table to `config.output_path`.
pub async fn label_to_file(config: &LabelConfig) -> Result<LabelTable, PageLabelError> {
    config.validate()?;
    let classifier = VisionClassifier::from_config(config)?;
    label_to_file_with(&classifier, config).await
}

/// Run [`label_images_with`] and write the table to `config.output_path`.
pub async fn label_to_file_with(
    classifier: &dyn PageClassifier,
    config: &LabelConfig,
) -> Result<LabelTable, PageLabelError> {
    let table = label_images_with(classifier, config).await?;
    table.write_to_file(&config.output_path).await?;
    Ok(table)
}
