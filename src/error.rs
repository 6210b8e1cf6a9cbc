//! Error types for the pagesnap library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`SnapError`] — **Fatal**: the run cannot proceed at all (unusable URL
//!   template, no page range, no browser executable). Returned as
//!   `Err(SnapError)` from the top-level `run*` functions before any page
//!   work starts, or surfaced per assembly variant.
//!
//! * [`PageError`] — **Non-fatal**: a single page failed (navigation glitch,
//!   missing content region, screenshot error) but all other pages are fine.
//!   Stored inside [`crate::output::CaptureResult`] /
//!   [`crate::output::TransformResult`] so callers can inspect partial
//!   success rather than losing the whole run to one bad page.
//!
//! The separation makes "continue past failures" an explicit contract: page
//! errors are values threaded through the orchestrator, never exceptions
//! crossing component boundaries.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pagesnap library.
///
/// Page-level failures use [`PageError`] and are stored in the per-page
/// result records rather than propagated here.
#[derive(Debug, Error)]
pub enum SnapError {
    // ── Configuration errors ──────────────────────────────────────────────
    /// The template URL has neither a `{page}` placeholder nor any digits.
    #[error(
        "Template URL '{template}' contains no digits and no {{page}} placeholder.\n\
         Provide one of those, e.g. '.../page{{page:04d}}.xhtml' or '.../page0001.xhtml'."
    )]
    InvalidTemplate { template: String },

    /// Neither an end page nor a page count was supplied.
    #[error("Either an end page or a page count must be provided")]
    MissingRange,

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Capability errors ─────────────────────────────────────────────────
    /// No Chrome/Chromium executable could be located or launched.
    #[error(
        "No usable Chrome/Chromium browser: {detail}\n\
         Install chromium (or google-chrome) so it is on PATH, or point the\n\
         CHROME environment variable at an existing executable."
    )]
    BrowserUnavailable { detail: String },

    // ── Assembly errors ───────────────────────────────────────────────────
    /// The image directory holds no file with the expected extension.
    #[error("No eligible images found in '{dir}'")]
    NoEligibleImages { dir: PathBuf },

    /// The raster-to-PDF conversion itself failed.
    #[error("PDF encoding failed: {detail}")]
    PdfEncodeFailed { detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file or directory.
    #[error("Failed to write '{path}': {source}")]
    OutputIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Inspection errors ─────────────────────────────────────────────────
    /// Single-page inspection could not complete.
    #[error("Inspection of '{url}' failed: {detail}")]
    InspectionFailed { url: String, detail: String },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SnapError {
    /// True for errors that should abort before any page work starts.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            SnapError::InvalidTemplate { .. }
                | SnapError::MissingRange
                | SnapError::InvalidConfig(_)
        )
    }
}

/// A non-fatal error for a single page.
///
/// Stored in [`crate::output::CaptureResult`] or
/// [`crate::output::TransformResult`] when a page fails.
/// The overall run always continues to the next page.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// Navigation or page load failed.
    #[error("Page {page}: navigation failed: {detail}")]
    NavigationFailed { page: u32, detail: String },

    /// Page load exceeded the per-page timeout budget.
    #[error("Page {page}: load timed out after {ms}ms")]
    Timeout { page: u32, ms: u64 },

    /// The content region selector resolved to no element with a layout box.
    #[error("Page {page}: content region '{selector}' is unavailable")]
    RegionUnavailable { page: u32, selector: String },

    /// In-page JavaScript evaluation failed.
    #[error("Page {page}: script evaluation failed: {detail}")]
    ScriptFailed { page: u32, detail: String },

    /// The screenshot itself failed or could not be written.
    #[error("Page {page}: screenshot failed: {detail}")]
    ScreenshotFailed { page: u32, detail: String },

    /// The captured image could not be transformed (corrupt, unsupported).
    #[error("Page {page}: transform failed: {detail}")]
    TransformFailed { page: u32, detail: String },
}

impl PageError {
    /// The page number this error belongs to.
    pub fn page(&self) -> u32 {
        match self {
            PageError::NavigationFailed { page, .. }
            | PageError::Timeout { page, .. }
            | PageError::RegionUnavailable { page, .. }
            | PageError::ScriptFailed { page, .. }
            | PageError::ScreenshotFailed { page, .. }
            | PageError::TransformFailed { page, .. } => *page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_template_display() {
        let e = SnapError::InvalidTemplate {
            template: "https://example.com/index.xhtml".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("index.xhtml"), "got: {msg}");
        assert!(msg.contains("{page"), "got: {msg}");
    }

    #[test]
    fn configuration_classification() {
        assert!(SnapError::MissingRange.is_configuration());
        assert!(SnapError::InvalidConfig("x".into()).is_configuration());
        assert!(!SnapError::BrowserUnavailable {
            detail: "not found".into()
        }
        .is_configuration());
    }

    #[test]
    fn timeout_display() {
        let e = PageError::Timeout { page: 7, ms: 30000 };
        assert!(e.to_string().contains("30000ms"));
        assert!(e.to_string().contains("Page 7"));
    }

    #[test]
    fn page_accessor() {
        let e = PageError::RegionUnavailable {
            page: 41,
            selector: "#PageContainer41".into(),
        };
        assert_eq!(e.page(), 41);
    }
}
