//! Pipeline stages for the capture-and-assemble run.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations (e.g. switch browser backend) without touching
//! other stages.
//!
//! ## Data Flow
//!
//! ```text
//! urlgen ──▶ browser ──▶ transform ──▶ assemble
//! (PageSpec)  (capture)   (grayscale)   (PDFs)
//! ```
//!
//! 1. [`urlgen`]    — expand the template URL into an ordered page sequence
//! 2. [`locate`]    — pure half of content-region detection: selectors,
//!    injected CSS, clip arithmetic, background-URL extraction
//! 3. [`browser`]   — drive one headless-Chrome page load and clipped
//!    screenshot per page; the only stage holding a browser process
//! 4. [`transform`] — deterministic darken/contrast/grayscale re-encode
//! 5. [`assemble`]  — gather images into merged or per-page PDFs
//! 6. [`probe`]     — best-effort HEAD status checks for generated URLs

pub mod assemble;
pub mod browser;
pub mod locate;
pub mod probe;
pub mod transform;
pub mod urlgen;
