//! Run orchestration: sequence pages through capture, transform, assembly.
//!
//! ## Control flow
//!
//! Pages are processed strictly sequentially in ascending order. Each page
//! moves `Pending → Captured → (Transformed) → Done`, or
//! `Pending → CaptureFailed → Done`; there is no retry state, each page is
//! attempted exactly once per run. Per-page failures are recorded in the
//! page's result and never raised past this module — a run that finished
//! its page loop returns `Ok`, whatever the per-page outcomes.
//!
//! PDF assembly runs after the loop, once per requested variant, against
//! the raw (color) or processed (grayscale) directory; one variant's
//! failure does not prevent the others from being attempted.

use crate::config::{PdfVariant, RunConfig};
use crate::error::SnapError;
use crate::output::{
    AssemblyRecord, CaptureResult, PageInspection, PageRecord, RunOutcome, RunStats,
    TransformResult,
};
use crate::pipeline::urlgen::UrlTemplate;
use crate::pipeline::{assemble, browser, transform};
use std::fs;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Execute one capture-and-assemble run.
///
/// # Errors
/// Returns `Err(SnapError)` only for fatal conditions detected before page
/// work starts: an unusable template, a missing range, an unwritable output
/// directory, or no browser when at least one page needs capturing.
/// Per-page failures are reported inside the returned [`RunOutcome`].
pub async fn run(config: &RunConfig) -> Result<RunOutcome, SnapError> {
    let started = Instant::now();

    let template = UrlTemplate::parse(&config.template)?;
    let sequence = template.pages(config.start, config.end, config.count)?;
    let total = sequence.len();
    info!(pages = total, template = %config.template, "run starting");

    if config.clear_output {
        clear_output_dirs(config);
    }

    create_dir(&config.raw_dir)?;
    if config.black_white {
        create_dir(&config.processed_dir)?;
    }

    // A missing browser is a fatal capability error, but only when some page
    // actually needs the browser — a fully skip-resumable run works without
    // one.
    let needs_browser = sequence
        .clone()
        .any(|spec| !(config.skip_existing && config.raw_image_path(&spec).exists()));
    if total > 0 && needs_browser {
        browser::probe_browser()?;
    }

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_start(total);
    }

    // ── Per-page loop ────────────────────────────────────────────────────
    let mut pages: Vec<PageRecord> = Vec::with_capacity(total);
    for spec in sequence {
        let raw_path = config.raw_image_path(&spec);

        let capture = if config.skip_existing && raw_path.exists() {
            info!(page = spec.number, path = %raw_path.display(), "skipping existing capture");
            if let Some(ref cb) = config.progress_callback {
                cb.on_page_skipped(spec.number, total);
            }
            CaptureResult {
                page: spec.number,
                image_path: raw_path.clone(),
                skipped: true,
                error: None,
            }
        } else {
            if let Some(ref cb) = config.progress_callback {
                cb.on_page_start(spec.number, total);
            }
            let result = browser::capture(&spec, &raw_path, config).await;
            if let Some(ref cb) = config.progress_callback {
                match &result.error {
                    None => {
                        let bytes = fs::metadata(&raw_path).map(|m| m.len()).unwrap_or(0);
                        cb.on_page_captured(spec.number, total, bytes);
                    }
                    Some(e) => cb.on_page_error(spec.number, total, &e.to_string()),
                }
            }
            result
        };

        let transform = if config.black_white && capture.success() {
            let processed_path = config.processed_image_path(&spec);
            let result = if config.skip_existing && processed_path.exists() {
                debug!(page = spec.number, path = %processed_path.display(),
                       "skipping existing transform");
                TransformResult {
                    page: spec.number,
                    image_path: processed_path,
                    skipped: true,
                    error: None,
                }
            } else {
                transform::transform(spec.number, &raw_path, &processed_path)
            };
            if let Some(e) = &result.error {
                if let Some(ref cb) = config.progress_callback {
                    cb.on_page_error(spec.number, total, &e.to_string());
                }
            }
            Some(result)
        } else {
            None
        };

        pages.push(PageRecord {
            page: spec.number,
            label: spec.label,
            url: spec.url,
            capture,
            transform,
        });
    }

    let success_count = pages.iter().filter(|p| p.succeeded()).count();
    if let Some(ref cb) = config.progress_callback {
        cb.on_run_complete(total, success_count);
    }

    // ── Assembly ─────────────────────────────────────────────────────────
    let mut assemblies: Vec<AssemblyRecord> = Vec::with_capacity(config.pdf_variants.len());
    for &variant in &config.pdf_variants {
        assemblies.push(assemble_variant(config, variant));
    }

    // ── Stats ────────────────────────────────────────────────────────────
    let stats = RunStats {
        pages_total: total,
        captured: pages
            .iter()
            .filter(|p| p.capture.success() && !p.capture.skipped)
            .count(),
        skipped: pages.iter().filter(|p| p.capture.skipped).count(),
        capture_failures: pages.iter().filter(|p| !p.capture.success()).count(),
        transformed: pages
            .iter()
            .filter(|p| {
                p.transform
                    .as_ref()
                    .map_or(false, |t| t.success() && !t.skipped)
            })
            .count(),
        transform_failures: pages
            .iter()
            .filter(|p| p.transform.as_ref().map_or(false, |t| !t.success()))
            .count(),
        pdfs_written: assemblies.iter().map(|a| a.files_written).sum(),
        assembly_failures: assemblies.iter().filter(|a| !a.ok).count(),
        total_duration_ms: started.elapsed().as_millis() as u64,
    };

    info!(
        captured = stats.captured,
        skipped = stats.skipped,
        failed = stats.capture_failures,
        pdfs = stats.pdfs_written,
        duration_ms = stats.total_duration_ms,
        "run complete"
    );

    Ok(RunOutcome {
        pages,
        assemblies,
        stats,
    })
}

/// Synchronous wrapper around [`run`].
///
/// Creates a temporary tokio runtime internally.
pub fn run_sync(config: &RunConfig) -> Result<RunOutcome, SnapError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| SnapError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(run(config))
}

/// Load one URL and report the content region a capture would clip to.
///
/// Diagnostic counterpart to a run: nothing is written to disk.
pub async fn inspect_page(url: &str, config: &RunConfig) -> Result<PageInspection, SnapError> {
    browser::probe_browser()?;
    browser::inspect_target(url, config)
        .await
        .map_err(|detail| SnapError::InspectionFailed {
            url: url.to_string(),
            detail,
        })
}

/// Run the assembler for one variant, containing its failure.
fn assemble_variant(config: &RunConfig, variant: PdfVariant) -> AssemblyRecord {
    if variant.uses_processed() && !config.black_white {
        warn!(
            variant = variant.label(),
            "skipping: black-white stage is disabled"
        );
        return AssemblyRecord {
            variant,
            files_written: 0,
            ok: false,
            detail: Some("black-white stage is disabled".to_string()),
        };
    }

    let image_dir = config.variant_image_dir(variant);
    let output_name = variant.output_name(&config.pdf_name);
    info!(variant = variant.label(), dir = %image_dir.display(), "assembling PDF");

    match assemble::assemble(
        image_dir,
        &config.pdf_dir,
        config.format.extension(),
        variant.merged(),
        &output_name,
    ) {
        Ok(files_written) => AssemblyRecord {
            variant,
            files_written,
            ok: true,
            detail: None,
        },
        Err(e) => {
            warn!(variant = variant.label(), error = %e, "assembly failed");
            AssemblyRecord {
                variant,
                files_written: 0,
                ok: false,
                detail: Some(e.to_string()),
            }
        }
    }
}

fn create_dir(dir: &Path) -> Result<(), SnapError> {
    fs::create_dir_all(dir).map_err(|e| SnapError::OutputIo {
        path: dir.to_path_buf(),
        source: e,
    })
}

/// Delete image and PDF artifacts from the three output directories.
///
/// Missing directories are fine; individual deletion failures are warnings,
/// not errors.
fn clear_output_dirs(config: &RunConfig) {
    info!("clearing output directories");
    for dir in [&config.raw_dir, &config.processed_dir, &config.pdf_dir] {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(_) => continue,
        };
        for path in entries.filter_map(|e| e.ok().map(|e| e.path())) {
            let clearable = path
                .extension()
                .map(|ext| {
                    let ext = ext.to_string_lossy();
                    ext.eq_ignore_ascii_case("png")
                        || ext.eq_ignore_ascii_case("jpg")
                        || ext.eq_ignore_ascii_case("pdf")
                })
                .unwrap_or(false);
            if !clearable {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => debug!(file = %path.display(), "deleted"),
                Err(e) => warn!(file = %path.display(), error = %e, "failed to delete"),
            }
        }
    }
}
