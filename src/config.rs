//! Configuration types for a capture run.
//!
//! All run behaviour is controlled through [`RunConfig`], built via its
//! [`RunConfigBuilder`]. The config is constructed exactly once at startup
//! from whatever source the caller prefers (CLI flags, environment, code)
//! and then passed by reference into every pipeline component — no component
//! reads ambient process state.
//!
//! # Design choice: builder over constructor
//! A fifteen-field constructor is unreadable and breaks on every new field.
//! The builder pattern lets callers set only what they care about and rely on
//! documented defaults for the rest.

use crate::error::SnapError;
use crate::pipeline::urlgen::PageSpec;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Default per-page load timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Raster format for captured page images.
///
/// PNG is the default: captures are mostly rendered text, and lossless
/// compression keeps glyph edges crisp through the later grayscale
/// transform. JPEG (fixed quality 90) trades some crispness for much
/// smaller files on photo-heavy pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ImageFormat {
    /// Lossless PNG (default).
    #[default]
    Png,
    /// JPEG at fixed quality 90.
    Jpeg,
}

impl ImageFormat {
    /// File extension used for artifacts of this format.
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageFormat::Png => write!(f, "png"),
            ImageFormat::Jpeg => write!(f, "jpeg"),
        }
    }
}

/// One requested PDF output.
///
/// A run may request any combination of the four variants; the assembler is
/// invoked once per requested variant, and one variant's failure does not
/// prevent the others from being attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PdfVariant {
    /// All raw captures merged into `{name}_color.pdf`.
    ColorMerged,
    /// One PDF per raw capture, named after the image stem.
    ColorPerPage,
    /// All grayscale-transformed images merged into `{name}_bw.pdf`.
    BwMerged,
    /// One PDF per transformed image.
    BwPerPage,
}

impl PdfVariant {
    /// True when the variant reads from the processed (grayscale) directory.
    pub fn uses_processed(&self) -> bool {
        matches!(self, PdfVariant::BwMerged | PdfVariant::BwPerPage)
    }

    /// True when all images are concatenated into a single document.
    pub fn merged(&self) -> bool {
        matches!(self, PdfVariant::ColorMerged | PdfVariant::BwMerged)
    }

    /// Output filename for merged variants (ignored in per-page mode).
    pub fn output_name(&self, base: &str) -> String {
        match self {
            PdfVariant::ColorMerged | PdfVariant::ColorPerPage => format!("{base}_color.pdf"),
            PdfVariant::BwMerged | PdfVariant::BwPerPage => format!("{base}_bw.pdf"),
        }
    }

    /// Short label for log lines and summaries.
    pub fn label(&self) -> &'static str {
        match self {
            PdfVariant::ColorMerged => "color/merged",
            PdfVariant::ColorPerPage => "color/per-page",
            PdfVariant::BwMerged => "bw/merged",
            PdfVariant::BwPerPage => "bw/per-page",
        }
    }
}

/// Configuration for one capture-and-assemble run.
///
/// Built via [`RunConfig::builder()`]. Immutable once built.
///
/// # Example
/// ```rust
/// use pagesnap::{PdfVariant, RunConfig};
///
/// let config = RunConfig::builder("https://example.com/book/page0001.xhtml")
///     .start(1)
///     .count(5)
///     .black_white(true)
///     .pdf_variant(PdfVariant::BwMerged)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct RunConfig {
    /// Template URL: either contains a `{page}` / `{page:04d}` placeholder,
    /// or an embedded decimal digit run identifying the page number.
    pub template: String,

    /// First page number. Default: 1.
    pub start: u32,

    /// Last page number (inclusive). Exactly one of `end` / `count` must be
    /// set, else the generator rejects the range.
    pub end: Option<u32>,

    /// Number of pages; `end` is derived as `start + count - 1`.
    pub count: Option<u32>,

    /// Directory receiving raw captures. Default: `output/imgs_raw`.
    pub raw_dir: PathBuf,

    /// Directory receiving grayscale-transformed images.
    /// Default: `output/imgs_processed`.
    pub processed_dir: PathBuf,

    /// Directory receiving assembled PDFs. Default: `output/pdfs`.
    pub pdf_dir: PathBuf,

    /// Capture image format. Default: [`ImageFormat::Png`].
    pub format: ImageFormat,

    /// Filename prefix for page images. Default: `"page"`.
    ///
    /// Artifacts are named `{prefix}{zero-padded page}.{ext}`; the padding
    /// width comes from the template's digit run, so filenames sort into
    /// page order lexicographically.
    pub image_prefix: String,

    /// Extra pixels added symmetrically around the detected content region
    /// before clipping. Default: 0.
    pub clip_padding: u32,

    /// Capture the full page instead of clipping to the content region.
    /// Default: false.
    pub full_page: bool,

    /// Inject the white-background/zero-margin stylesheet before the
    /// screenshot. Default: true.
    ///
    /// Disabling captures the page exactly as served, including any gray
    /// "paper" chrome around the content.
    pub inject_css: bool,

    /// Explicit content-region selector, bypassing dynamic detection.
    /// Default: None (detect per page).
    pub selector: Option<String>,

    /// Per-page load timeout in milliseconds. Default: 30 000.
    ///
    /// A timeout fails that page only; the run continues.
    pub timeout_ms: u64,

    /// Skip capture and transform for a page whose target artifact already
    /// exists on disk. Default: false.
    ///
    /// Lets an interrupted run be resumed without re-rendering finished
    /// pages; skipped pages still count as handled in the summary.
    pub skip_existing: bool,

    /// Delete `*.png` / `*.jpg` / `*.pdf` from all three output directories
    /// before the run. Default: false.
    pub clear_output: bool,

    /// Enable the darken/contrast/grayscale transform stage. Default: false.
    pub black_white: bool,

    /// Requested PDF outputs, assembled after all pages are processed.
    /// Default: empty (no PDFs).
    pub pdf_variants: Vec<PdfVariant>,

    /// Base name for merged PDF files. Default: `"combined"`.
    pub pdf_name: String,

    /// Optional per-page progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl RunConfig {
    /// Create a new builder around a template URL.
    pub fn builder(template: impl Into<String>) -> RunConfigBuilder {
        RunConfigBuilder {
            config: RunConfig {
                template: template.into(),
                start: 1,
                end: None,
                count: None,
                raw_dir: PathBuf::from("output/imgs_raw"),
                processed_dir: PathBuf::from("output/imgs_processed"),
                pdf_dir: PathBuf::from("output/pdfs"),
                format: ImageFormat::default(),
                image_prefix: "page".to_string(),
                clip_padding: 0,
                full_page: false,
                inject_css: true,
                selector: None,
                timeout_ms: DEFAULT_TIMEOUT_MS,
                skip_existing: false,
                clear_output: false,
                black_white: false,
                pdf_variants: Vec::new(),
                pdf_name: "combined".to_string(),
                progress_callback: None,
            },
        }
    }

    /// Path of the raw capture artifact for a page.
    pub fn raw_image_path(&self, spec: &PageSpec) -> PathBuf {
        self.raw_dir.join(self.image_file_name(spec))
    }

    /// Path of the transformed artifact for a page (same numbering as raw).
    pub fn processed_image_path(&self, spec: &PageSpec) -> PathBuf {
        self.processed_dir.join(self.image_file_name(spec))
    }

    /// `{prefix}{zero-padded page}.{ext}`
    pub fn image_file_name(&self, spec: &PageSpec) -> String {
        format!(
            "{}{}.{}",
            self.image_prefix,
            spec.label,
            self.format.extension()
        )
    }

    /// Source directory an assembly variant reads from.
    pub fn variant_image_dir(&self, variant: PdfVariant) -> &Path {
        if variant.uses_processed() {
            &self.processed_dir
        } else {
            &self.raw_dir
        }
    }
}

impl fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunConfig")
            .field("template", &self.template)
            .field("start", &self.start)
            .field("end", &self.end)
            .field("count", &self.count)
            .field("raw_dir", &self.raw_dir)
            .field("processed_dir", &self.processed_dir)
            .field("pdf_dir", &self.pdf_dir)
            .field("format", &self.format)
            .field("image_prefix", &self.image_prefix)
            .field("clip_padding", &self.clip_padding)
            .field("full_page", &self.full_page)
            .field("inject_css", &self.inject_css)
            .field("selector", &self.selector)
            .field("timeout_ms", &self.timeout_ms)
            .field("skip_existing", &self.skip_existing)
            .field("clear_output", &self.clear_output)
            .field("black_white", &self.black_white)
            .field("pdf_variants", &self.pdf_variants)
            .field("pdf_name", &self.pdf_name)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn callback>"),
            )
            .finish()
    }
}

/// Builder for [`RunConfig`].
#[derive(Debug)]
pub struct RunConfigBuilder {
    config: RunConfig,
}

impl RunConfigBuilder {
    pub fn start(mut self, n: u32) -> Self {
        self.config.start = n;
        self
    }

    pub fn end(mut self, n: u32) -> Self {
        self.config.end = Some(n);
        self
    }

    pub fn count(mut self, n: u32) -> Self {
        self.config.count = Some(n);
        self
    }

    pub fn raw_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.raw_dir = dir.into();
        self
    }

    pub fn processed_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.processed_dir = dir.into();
        self
    }

    pub fn pdf_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.pdf_dir = dir.into();
        self
    }

    pub fn format(mut self, format: ImageFormat) -> Self {
        self.config.format = format;
        self
    }

    pub fn image_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.image_prefix = prefix.into();
        self
    }

    pub fn clip_padding(mut self, px: u32) -> Self {
        self.config.clip_padding = px;
        self
    }

    pub fn full_page(mut self, v: bool) -> Self {
        self.config.full_page = v;
        self
    }

    pub fn inject_css(mut self, v: bool) -> Self {
        self.config.inject_css = v;
        self
    }

    pub fn selector(mut self, selector: impl Into<String>) -> Self {
        self.config.selector = Some(selector.into());
        self
    }

    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.config.timeout_ms = ms.max(1);
        self
    }

    pub fn skip_existing(mut self, v: bool) -> Self {
        self.config.skip_existing = v;
        self
    }

    pub fn clear_output(mut self, v: bool) -> Self {
        self.config.clear_output = v;
        self
    }

    pub fn black_white(mut self, v: bool) -> Self {
        self.config.black_white = v;
        self
    }

    /// Add one PDF variant to the requested set (deduplicated).
    pub fn pdf_variant(mut self, variant: PdfVariant) -> Self {
        if !self.config.pdf_variants.contains(&variant) {
            self.config.pdf_variants.push(variant);
        }
        self
    }

    pub fn pdf_variants(mut self, variants: impl IntoIterator<Item = PdfVariant>) -> Self {
        for v in variants {
            self = self.pdf_variant(v);
        }
        self
    }

    pub fn pdf_name(mut self, name: impl Into<String>) -> Self {
        self.config.pdf_name = name.into();
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<RunConfig, SnapError> {
        let c = &self.config;
        if c.template.trim().is_empty() {
            return Err(SnapError::InvalidConfig("Template URL is empty".into()));
        }
        if c.image_prefix.contains(std::path::MAIN_SEPARATOR) {
            return Err(SnapError::InvalidConfig(format!(
                "Image prefix '{}' must not contain a path separator",
                c.image_prefix
            )));
        }
        if c.pdf_name.trim().is_empty() {
            return Err(SnapError::InvalidConfig("PDF base name is empty".into()));
        }
        Ok(self.config)
    }
}
