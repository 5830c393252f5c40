//! Progress-callback trait for per-item pipeline events.
//!
//! Inject an [`Arc<dyn SiftProgressCallback>`] via
//! [`crate::config::ExtractConfigBuilder::progress_callback`] or
//! [`crate::config::ClassifyConfigBuilder::progress_callback`] to receive
//! events as each extracted image is written or each input image is
//! classified. An "item" is one embedded image for the extractor and one
//! input file for the classifier.
//!
//! # Example
//!
//! ```rust
//! use figsift::{ClassifyConfig, SiftProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     done: AtomicUsize,
//! }
//!
//! impl SiftProgressCallback for CountingCallback {
//!     fn on_item_complete(&self, item: usize, total: usize, name: &str, _detail: &str) {
//!         self.done.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{item}/{total} {name}");
//!     }
//! }
//!
//! let config = ClassifyConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { done: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the pipelines as they process each item.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. `item` is 1-based.
pub trait SiftProgressCallback: Send + Sync {
    /// Called once before the first item, with the number of items.
    fn on_run_start(&self, total: usize) {
        let _ = total;
    }

    /// Called just before an item is processed.
    fn on_item_start(&self, item: usize, total: usize, name: &str) {
        let _ = (item, total, name);
    }

    /// Called when an item completes. `detail` is a short outcome label
    /// (e.g. `"meaningful"`, `"discarded"`, `"jpg"`).
    fn on_item_complete(&self, item: usize, total: usize, name: &str, detail: &str) {
        let _ = (item, total, name, detail);
    }

    /// Called when an item fails.
    fn on_item_error(&self, item: usize, total: usize, name: &str, error: &str) {
        let _ = (item, total, name, error);
    }

    /// Called once after every item has been attempted.
    fn on_run_complete(&self, total: usize, success_count: usize) {
        let _ = (total, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl SiftProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in the configs.
pub type ProgressCallback = Arc<dyn SiftProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        total: AtomicUsize,
        succeeded: AtomicUsize,
    }

    impl SiftProgressCallback for TrackingCallback {
        fn on_run_start(&self, total: usize) {
            self.total.store(total, Ordering::SeqCst);
        }

        fn on_item_start(&self, _item: usize, _total: usize, _name: &str) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_item_complete(&self, _item: usize, _total: usize, _name: &str, _detail: &str) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_item_error(&self, _item: usize, _total: usize, _name: &str, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_run_complete(&self, _total: usize, success_count: usize) {
            self.succeeded.store(success_count, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_run_start(2);
        cb.on_item_start(1, 2, "a.png");
        cb.on_item_complete(1, 2, "a.png", "meaningful");
        cb.on_item_error(2, 2, "b.png", "timeout");
        cb.on_run_complete(2, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_run_start(3);
        tracker.on_item_start(1, 3, "a.png");
        tracker.on_item_complete(1, 3, "a.png", "meaningful");
        tracker.on_item_start(2, 3, "b.png");
        tracker.on_item_complete(2, 3, "b.png", "discarded");
        tracker.on_item_start(3, 3, "c.png");
        tracker.on_item_error(3, 3, "c.png", "HTTP 500");
        tracker.on_run_complete(3, 2);

        assert_eq!(tracker.total.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.starts.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.succeeded.load(Ordering::SeqCst), 2);
    }
}
