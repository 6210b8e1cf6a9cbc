//! Progress-callback trait for per-page run events.
//!
//! Inject an [`Arc<dyn RunProgressCallback>`] via
//! [`crate::config::RunConfigBuilder::progress_callback`] to receive
//! real-time events as the pipeline works through the page sequence.
//!
//! # Why callbacks instead of channels?
//!
//! The callback approach is the least-invasive integration point: callers can
//! forward events to a terminal progress bar, a log file, or a GUI without
//! the library knowing anything about how the host application communicates.
//! The trait is `Send + Sync` so the same implementation also works from
//! multi-threaded hosts, even though the pipeline itself processes pages
//! strictly sequentially.

use std::sync::Arc;

/// Called by the pipeline as it processes each page.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Pages are processed one at a time in ascending
/// order, so events for page N+1 never arrive before page N is finished.
pub trait RunProgressCallback: Send + Sync {
    /// Called once before any page is attempted.
    fn on_run_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called just before a page's URL is loaded (not called for skips).
    fn on_page_start(&self, page: u32, total_pages: usize) {
        let _ = (page, total_pages);
    }

    /// Called when a page's raw capture has been written.
    ///
    /// `image_bytes` is the on-disk size of the capture, useful for
    /// progress displays that track output volume.
    fn on_page_captured(&self, page: u32, total_pages: usize, image_bytes: u64) {
        let _ = (page, total_pages, image_bytes);
    }

    /// Called when `skip_existing` short-circuited a page.
    fn on_page_skipped(&self, page: u32, total_pages: usize) {
        let _ = (page, total_pages);
    }

    /// Called when a page's capture or transform failed.
    fn on_page_error(&self, page: u32, total_pages: usize, error: &str) {
        let _ = (page, total_pages, error);
    }

    /// Called once after all pages have been attempted, before assembly.
    fn on_run_complete(&self, total_pages: usize, success_count: usize) {
        let _ = (total_pages, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl RunProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::RunConfig`].
pub type ProgressCallback = Arc<dyn RunProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TrackingCallback {
        starts: AtomicUsize,
        captures: AtomicUsize,
        skips: AtomicUsize,
        errors: AtomicUsize,
        completed_success: AtomicUsize,
    }

    impl RunProgressCallback for TrackingCallback {
        fn on_page_start(&self, _page: u32, _total: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }
        fn on_page_captured(&self, _page: u32, _total: usize, _bytes: u64) {
            self.captures.fetch_add(1, Ordering::SeqCst);
        }
        fn on_page_skipped(&self, _page: u32, _total: usize) {
            self.skips.fetch_add(1, Ordering::SeqCst);
        }
        fn on_page_error(&self, _page: u32, _total: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
        fn on_run_complete(&self, _total: usize, success: usize) {
            self.completed_success.store(success, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_run_start(3);
        cb.on_page_start(1, 3);
        cb.on_page_captured(1, 3, 1024);
        cb.on_page_skipped(2, 3);
        cb.on_page_error(3, 3, "navigation failed");
        cb.on_run_complete(3, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let t = TrackingCallback {
            starts: AtomicUsize::new(0),
            captures: AtomicUsize::new(0),
            skips: AtomicUsize::new(0),
            errors: AtomicUsize::new(0),
            completed_success: AtomicUsize::new(0),
        };

        t.on_run_start(3);
        t.on_page_start(1, 3);
        t.on_page_captured(1, 3, 2048);
        t.on_page_skipped(2, 3);
        t.on_page_start(3, 3);
        t.on_page_error(3, 3, "timeout");
        t.on_run_complete(3, 2);

        assert_eq!(t.starts.load(Ordering::SeqCst), 2);
        assert_eq!(t.captures.load(Ordering::SeqCst), 1);
        assert_eq!(t.skips.load(Ordering::SeqCst), 1);
        assert_eq!(t.errors.load(Ordering::SeqCst), 1);
        assert_eq!(t.completed_success.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: Arc<dyn RunProgressCallback> = Arc::new(NoopProgressCallback);
        cb.on_run_start(10);
        cb.on_page_captured(1, 10, 512);
    }
}
