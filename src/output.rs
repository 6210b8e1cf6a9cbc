//! Result records produced by a capture-and-assemble run.
//!
//! Every requested page yields exactly one [`PageRecord`] — success,
//! failure, or skip — so a caller can always reconcile the run against the
//! requested range. Records are created once by the pipeline and never
//! mutated afterwards.

use crate::config::PdfVariant;
use crate::error::PageError;
use crate::pipeline::locate::ElementMetrics;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Outcome of the capture step for one page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureResult {
    /// 1-based page number as it appears in the URL.
    pub page: u32,
    /// Where the raw image was (or would have been) written.
    pub image_path: PathBuf,
    /// True when an existing artifact short-circuited the browser step.
    pub skipped: bool,
    /// Set when the capture failed; `None` means the artifact exists.
    pub error: Option<PageError>,
}

impl CaptureResult {
    pub fn success(&self) -> bool {
        self.error.is_none()
    }
}

/// Outcome of the grayscale transform for one page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformResult {
    pub page: u32,
    /// Where the processed image was (or would have been) written.
    pub image_path: PathBuf,
    /// True when an existing artifact short-circuited the transform.
    pub skipped: bool,
    pub error: Option<PageError>,
}

impl TransformResult {
    pub fn success(&self) -> bool {
        self.error.is_none()
    }
}

/// Everything that happened to one page during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageRecord {
    pub page: u32,
    /// Zero-padded page label used in filenames (e.g. `"0039"`).
    pub label: String,
    pub url: String,
    pub capture: CaptureResult,
    /// Present only when the black-white stage ran for this page.
    pub transform: Option<TransformResult>,
}

impl PageRecord {
    /// The page reached its final artifact (capture and, if enabled,
    /// transform both succeeded).
    pub fn succeeded(&self) -> bool {
        self.capture.success() && self.transform.as_ref().map_or(true, |t| t.success())
    }
}

/// Outcome of one PDF assembly variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblyRecord {
    pub variant: PdfVariant,
    /// Number of PDF files written (1 for merged, N for per-page).
    pub files_written: usize,
    pub ok: bool,
    /// Failure detail when `ok` is false.
    pub detail: Option<String>,
}

/// Aggregate counters for a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStats {
    /// Pages in the requested sequence.
    pub pages_total: usize,
    /// Pages captured by the browser this run.
    pub captured: usize,
    /// Pages short-circuited by `skip_existing`.
    pub skipped: usize,
    /// Pages whose capture failed.
    pub capture_failures: usize,
    /// Pages transformed this run.
    pub transformed: usize,
    /// Pages whose transform failed.
    pub transform_failures: usize,
    /// PDF files written across all variants.
    pub pdfs_written: usize,
    /// Assembly variants that failed.
    pub assembly_failures: usize,
    /// Wall-clock duration of the whole run.
    pub total_duration_ms: u64,
}

/// The full, ordered account of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    /// One record per requested page, ascending page order.
    pub pages: Vec<PageRecord>,
    /// One record per requested PDF variant, in request order.
    pub assemblies: Vec<AssemblyRecord>,
    pub stats: RunStats,
}

impl RunOutcome {
    /// Pages that reached their final artifact.
    pub fn succeeded_pages(&self) -> usize {
        self.pages.iter().filter(|p| p.succeeded()).count()
    }

    /// Pages that failed capture or transform.
    pub fn failed_pages(&self) -> usize {
        self.pages.len() - self.succeeded_pages()
    }
}

/// A large element found while inspecting a page, candidate content region.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerCandidate {
    pub tag: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub classes: String,
    pub width: i64,
    pub height: i64,
    pub x: i64,
    pub y: i64,
}

/// Diagnostic report for a single rendered page.
///
/// Produced by [`crate::run::inspect_page`]; mirrors what a capture would
/// see without writing any artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageInspection {
    pub url: String,
    /// Selector a capture of this page would clip to.
    pub selector: String,
    /// False when the fallback selector had to be used.
    pub detected: bool,
    /// Layout metrics of the selected element, when it has a box.
    pub metrics: Option<ElementMetrics>,
    /// Background-image URL extracted from the computed style, if any.
    pub background_url: Option<String>,
    /// All significant (>100×100 px) container candidates on the page.
    pub candidates: Vec<ContainerCandidate>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PageError;

    fn capture_ok(page: u32) -> CaptureResult {
        CaptureResult {
            page,
            image_path: PathBuf::from(format!("raw/page{page:04}.png")),
            skipped: false,
            error: None,
        }
    }

    #[test]
    fn record_success_requires_both_stages() {
        let ok = PageRecord {
            page: 1,
            label: "0001".into(),
            url: "https://x/page0001.xhtml".into(),
            capture: capture_ok(1),
            transform: Some(TransformResult {
                page: 1,
                image_path: PathBuf::from("proc/page0001.png"),
                skipped: false,
                error: None,
            }),
        };
        assert!(ok.succeeded());

        let transform_failed = PageRecord {
            transform: Some(TransformResult {
                page: 1,
                image_path: PathBuf::from("proc/page0001.png"),
                skipped: false,
                error: Some(PageError::TransformFailed {
                    page: 1,
                    detail: "corrupt".into(),
                }),
            }),
            ..ok.clone()
        };
        assert!(!transform_failed.succeeded());
    }

    #[test]
    fn outcome_counts() {
        let outcome = RunOutcome {
            pages: vec![
                PageRecord {
                    page: 1,
                    label: "01".into(),
                    url: "u1".into(),
                    capture: capture_ok(1),
                    transform: None,
                },
                PageRecord {
                    page: 2,
                    label: "02".into(),
                    url: "u2".into(),
                    capture: CaptureResult {
                        error: Some(PageError::Timeout { page: 2, ms: 100 }),
                        ..capture_ok(2)
                    },
                    transform: None,
                },
            ],
            assemblies: vec![],
            stats: RunStats::default(),
        };
        assert_eq!(outcome.succeeded_pages(), 1);
        assert_eq!(outcome.failed_pages(), 1);
    }
}
