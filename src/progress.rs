//! Progress-callback trait for rasterisation and labelling events.
//!
//! Inject an [`Arc<dyn RunProgressCallback>`] via
//! [`crate::config::RasterizeConfigBuilder::progress_callback`] or
//! [`crate::config::LabelConfigBuilder::progress_callback`]. The binaries use
//! it to print one status line per saved page and per batch; library callers
//! can forward the events anywhere.
//!
//! # Example
//!
//! ```rust
//! use pdf_pagelabel::{LabelConfig, RunProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct BatchCounter(AtomicUsize);
//!
//! impl RunProgressCallback for BatchCounter {
//!     fn on_batch_complete(&self, _batch: usize, _total: usize, _failed: usize) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let config = LabelConfig::builder()
//!     .progress_callback(Arc::new(BatchCounter(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use std::path::Path;
use std::sync::Arc;

/// Called by the rasterizer and the labeler as they make progress.
///
/// All methods default to no-ops. Rasterizer events are delivered from the
/// blocking render thread, hence `Send + Sync`.
pub trait RunProgressCallback: Send + Sync {
    /// Called once the document is open and its page count is known.
    fn on_rasterize_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called after each page image has been written.
    ///
    /// # Arguments
    /// * `page_num`: 1-indexed page number
    /// * `path`    : file the page was saved to
    fn on_page_saved(&self, page_num: usize, total_pages: usize, path: &Path) {
        let _ = (page_num, total_pages, path);
    }

    /// Called once the image list is known, before any request is sent.
    fn on_labeling_start(&self, total_images: usize, total_batches: usize) {
        let _ = (total_images, total_batches);
    }

    /// Called before a batch is submitted. `batch` is 1-indexed.
    fn on_batch_start(&self, batch: usize, total_batches: usize) {
        let _ = (batch, total_batches);
    }

    /// Called when every request of a batch has resolved.
    ///
    /// `failed` counts the items stored as errors (always 0 when failures
    /// are not tolerated, since the first one aborts the run).
    fn on_batch_complete(&self, batch: usize, total_batches: usize, failed: usize) {
        let _ = (batch, total_batches, failed);
    }

    /// Called right before the inter-batch pause.
    fn on_sleep(&self, batch: usize, total_batches: usize, secs: f64) {
        let _ = (batch, total_batches, secs);
    }

    /// Called once after the last batch.
    fn on_labeling_complete(&self, total_images: usize, failed: usize) {
        let _ = (total_images, failed);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl RunProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in the configs.
pub type ProgressCallback = Arc<dyn RunProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        pages: AtomicUsize,
        batches_started: AtomicUsize,
        batches_done: AtomicUsize,
        failed: AtomicUsize,
    }

    impl RunProgressCallback for TrackingCallback {
        fn on_page_saved(&self, _page_num: usize, _total_pages: usize, _path: &Path) {
            self.pages.fetch_add(1, Ordering::SeqCst);
        }

        fn on_batch_start(&self, _batch: usize, _total_batches: usize) {
            self.batches_started.fetch_add(1, Ordering::SeqCst);
        }

        fn on_batch_complete(&self, _batch: usize, _total_batches: usize, failed: usize) {
            self.batches_done.fetch_add(1, Ordering::SeqCst);
            self.failed.fetch_add(failed, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_rasterize_start(3);
        cb.on_page_saved(1, 3, Path::new("1_doc.png"));
        cb.on_labeling_start(3, 2);
        cb.on_batch_start(1, 2);
        cb.on_batch_complete(1, 2, 0);
        cb.on_sleep(1, 2, 1.5);
        cb.on_labeling_complete(3, 0);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_page_saved(1, 2, Path::new("1_doc.png"));
        tracker.on_page_saved(2, 2, Path::new("2_doc.png"));
        tracker.on_batch_start(1, 2);
        tracker.on_batch_complete(1, 2, 1);
        tracker.on_batch_start(2, 2);
        tracker.on_batch_complete(2, 2, 0);

        assert_eq!(tracker.pages.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.batches_started.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.batches_done.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.failed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_labeling_start(10, 1);
    }
}
