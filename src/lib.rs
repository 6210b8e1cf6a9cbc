//! # pagesnap
//!
//! Capture a sequence of web-hosted document pages as clipped page images
//! and assemble them into PDFs.
//!
//! ## Why this crate?
//!
//! Online document viewers often serve each page as its own URL
//! (`.../page0001.xhtml`, `.../page0002.xhtml`, …) with the visual content
//! inside one container element, and offer no download button. This crate
//! renders each page in headless Chrome, clips the screenshot to the
//! detected content container, optionally produces a darkened
//! high-contrast grayscale variant, and binds the results into color
//! and/or black-white PDFs.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Template URL
//!  │
//!  ├─ 1. Generate  expand the page range into ordered URLs
//!  ├─ 2. Capture   headless Chrome, clip to the content region
//!  ├─ 3. Transform darken + contrast + grayscale (optional)
//!  └─ 4. Assemble  merged or per-page PDFs, color and/or bw
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pagesnap::{run, PdfVariant, RunConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RunConfig::builder("https://example.com/book/page0001.xhtml")
//!         .start(1)
//!         .count(20)
//!         .black_white(true)
//!         .pdf_variant(PdfVariant::ColorMerged)
//!         .pdf_variant(PdfVariant::BwMerged)
//!         .build()?;
//!     let outcome = run(&config).await?;
//!     eprintln!(
//!         "{}/{} pages, {} PDFs",
//!         outcome.succeeded_pages(),
//!         outcome.stats.pages_total,
//!         outcome.stats.pdfs_written
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Failure model
//!
//! One bad page never sinks the run: capture and transform failures are
//! recorded per page in the [`RunOutcome`] and the loop continues. Only
//! configuration problems (unusable template, no range) and a missing
//! browser abort up front — see [`SnapError`] vs [`PageError`].
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pagesnap` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only
//! deps:
//! ```toml
//! pagesnap = { version = "0.4", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod run;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ImageFormat, PdfVariant, RunConfig, RunConfigBuilder};
pub use error::{PageError, SnapError};
pub use output::{
    AssemblyRecord, CaptureResult, ContainerCandidate, PageInspection, PageRecord, RunOutcome,
    RunStats, TransformResult,
};
pub use pipeline::urlgen::{PageSequence, PageSpec, UrlTemplate};
pub use progress::{NoopProgressCallback, ProgressCallback, RunProgressCallback};
pub use run::{inspect_page, run, run_sync};
