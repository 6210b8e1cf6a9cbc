//! CLI binary for pagesnap.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `RunConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pagesnap::{
    inspect_page, run, ImageFormat, PdfVariant, ProgressCallback, RunConfig, RunProgressCallback,
    SnapError, UrlTemplate,
};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: renders a live progress bar and per-page log
/// lines using [indicatif].
struct CliProgressCallback {
    /// The single progress bar anchored at the bottom of the terminal.
    bar: ProgressBar,
    /// Per-page wall-clock start times for elapsed reporting.
    start_times: Mutex<HashMap<u32, Instant>>,
    /// Pages already counted towards the bar position. A page can emit both
    /// a capture event and a later transform error; it must advance the bar
    /// once.
    counted: Mutex<HashSet<u32>>,
    /// Count of pages that errored out.
    errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Create a callback whose progress-bar length is set dynamically
    /// by `on_run_start` (called before any pages are processed).
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0); // length set in on_run_start

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Generating URLs…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            counted: Mutex::new(HashSet::new()),
            errors: AtomicUsize::new(0),
        })
    }

    /// Switch to the full progress-bar style once we know `total`.
    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Capturing");
        self.bar.reset_eta();
    }

    fn elapsed_ms(&self, page: u32) -> u128 {
        self.start_times
            .lock()
            .unwrap()
            .remove(&page)
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0)
    }

    /// True the first time a page finishes; advances the bar.
    fn count_once(&self, page: u32) -> bool {
        let fresh = self.counted.lock().unwrap().insert(page);
        if fresh {
            self.bar.inc(1);
        }
        fresh
    }
}

impl RunProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Capturing {total_pages} pages…"))
        ));
    }

    fn on_page_start(&self, page: u32, _total: usize) {
        self.start_times
            .lock()
            .unwrap()
            .insert(page, Instant::now());
        self.bar.set_message(format!("page {page}"));
    }

    fn on_page_captured(&self, page: u32, total: usize, image_bytes: u64) {
        let elapsed_ms = self.elapsed_ms(page);
        self.bar.println(format!(
            "  {} Page {:>4}/{:<4}  {:<10}  {}",
            green("✓"),
            page,
            total,
            dim(&format!("{:>6} KiB", image_bytes / 1024)),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
        self.count_once(page);
    }

    fn on_page_skipped(&self, page: u32, total: usize) {
        self.bar.println(format!(
            "  {} Page {:>4}/{:<4}  {}",
            cyan("↷"),
            page,
            total,
            dim("exists, skipped"),
        ));
        self.count_once(page);
    }

    fn on_page_error(&self, page: u32, total: usize, error: &str) {
        let elapsed_ms = self.elapsed_ms(page);
        self.errors.fetch_add(1, Ordering::SeqCst);

        // Truncate very long error messages to keep output tidy.
        let msg = if error.len() > 80 {
            format!("{}\u{2026}", &error[..79])
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Page {:>4}/{:<4}  {}  {}",
            red("✗"),
            page,
            total,
            red(&msg),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
        self.count_once(page);
    }

    fn on_run_complete(&self, total_pages: usize, success_count: usize) {
        let failed = total_pages.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} pages captured successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} pages captured  ({} failed)",
                if failed == total_pages {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&success_count.to_string()),
                total_pages,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Print the first ten URLs a template expands to
  pagesnap "https://host/book/page0001.xhtml" --print-only

  # Capture pages 39-41, clipped to the detected content container
  pagesnap "https://host/book/page0039.xhtml" -s 39 -e 41

  # Explicit placeholder with width
  pagesnap "https://host/book/page{page:04d}.xhtml" -s 1 -c 20

  # Full run: captures + grayscale + merged color and bw PDFs
  pagesnap "https://host/book/page0001.xhtml" -c 50 \
      --bw --pdf-color --pdf-bw --merge --pdf-name book

  # Resume an interrupted run without re-rendering finished pages
  pagesnap "https://host/book/page0001.xhtml" -c 50 --skip-existing

  # Check which pages exist before capturing
  pagesnap "https://host/book/page0001.xhtml" -c 50 --check-head

  # Inspect the content containers of one page (no files written)
  pagesnap "https://host/book/page0039.xhtml" --inspect-only

EXIT CODES:
  0  run completed (individual pages may still have failed; see summary)
  2  configuration error (unusable template URL, no page range)
  3  no usable Chrome/Chromium browser found

ENVIRONMENT VARIABLES:
  PAGESNAP_URL            Template URL (alternative to the positional arg)
  PAGESNAP_START          Default --start
  PAGESNAP_END            Default --end
  PAGESNAP_COUNT          Default --count
  PAGESNAP_IMG_FORMAT     Default --img-format (png|jpeg)
  PAGESNAP_RAW_DIR        Default --out-dir
  PAGESNAP_PROCESSED_DIR  Default --processed-dir
  PAGESNAP_PDF_DIR        Default --pdf-dir
  PAGESNAP_PDF_NAME       Default --pdf-name
  CHROME                  Path to the Chrome/Chromium executable

SETUP:
  1. Install chromium (or google-chrome) so it is on PATH.
  2. Capture:  pagesnap "https://host/book/page0001.xhtml" -c 10
"#;

/// Capture paginated web documents as images and assemble them into PDFs.
#[derive(Parser, Debug)]
#[command(
    name = "pagesnap",
    version,
    about = "Capture paginated web documents as images and assemble them into PDFs",
    long_about = "Expand a template URL into a page range, render each page in headless \
Chrome clipped to its content container, optionally produce darkened grayscale variants, \
and bind the images into color and/or black-white PDFs.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Template URL or URL containing a numeric page to replace.
    #[arg(env = "PAGESNAP_URL")]
    url: Option<String>,

    /// Start page (default: the number found in the URL, else 1).
    #[arg(short, long, env = "PAGESNAP_START")]
    start: Option<u32>,

    /// End page (inclusive).
    #[arg(short, long, env = "PAGESNAP_END")]
    end: Option<u32>,

    /// Number of pages to generate.
    #[arg(short, long, env = "PAGESNAP_COUNT")]
    count: Option<u32>,

    /// Only print the generated URLs, capture nothing.
    #[arg(long)]
    print_only: bool,

    /// HEAD-request each URL and print its HTTP status instead of capturing.
    #[arg(long)]
    check_head: bool,

    /// Stop after this many pages.
    #[arg(short, long)]
    limit: Option<u32>,

    /// Output directory for raw captures.
    #[arg(long, env = "PAGESNAP_RAW_DIR", default_value = "output/imgs_raw")]
    out_dir: PathBuf,

    /// Output directory for grayscale-transformed images.
    #[arg(
        long,
        env = "PAGESNAP_PROCESSED_DIR",
        default_value = "output/imgs_processed"
    )]
    processed_dir: PathBuf,

    /// Output directory for assembled PDFs.
    #[arg(long, env = "PAGESNAP_PDF_DIR", default_value = "output/pdfs")]
    pdf_dir: PathBuf,

    /// Capture image format.
    #[arg(long, env = "PAGESNAP_IMG_FORMAT", value_enum, default_value = "png")]
    img_format: FormatArg,

    /// Filename prefix for captured images.
    #[arg(long, default_value = "page")]
    img_prefix: String,

    /// Padding in pixels added around the clipped content region.
    #[arg(long, default_value_t = 0)]
    clip_padding: u32,

    /// Capture the full page instead of clipping to the content region.
    #[arg(long)]
    img_fullpage: bool,

    /// Skip pages whose output file already exists.
    #[arg(long)]
    skip_existing: bool,

    /// Do not inject fallback CSS before screenshotting (capture as-is).
    #[arg(long)]
    disable_css_injection: bool,

    /// Explicit content-region selector, bypassing detection.
    #[arg(long)]
    selector: Option<String>,

    /// Per-page load timeout in milliseconds.
    #[arg(long, env = "PAGESNAP_TIMEOUT_MS", default_value_t = 30_000)]
    timeout: u64,

    /// Delete previous images and PDFs from the output directories first.
    #[arg(long, env = "PAGESNAP_CLEAR_OUTPUT")]
    clear_output: bool,

    /// Produce darkened grayscale variants of the captures.
    #[arg(long, env = "PAGESNAP_BW")]
    bw: bool,

    /// Assemble a PDF from the raw (color) captures.
    #[arg(long, env = "PAGESNAP_PDF_COLOR")]
    pdf_color: bool,

    /// Assemble a PDF from the grayscale images (implies --bw).
    #[arg(long, env = "PAGESNAP_PDF_BW")]
    pdf_bw: bool,

    /// Merge all pages into one PDF per variant instead of one PDF per page.
    #[arg(long, env = "PAGESNAP_PDF_MERGE")]
    merge: bool,

    /// Base name for merged PDF files.
    #[arg(long, env = "PAGESNAP_PDF_NAME", default_value = "combined")]
    pdf_name: String,

    /// Load the first page and report its content containers, no capture.
    #[arg(long)]
    inspect_only: bool,

    /// Output structured JSON instead of human-readable text.
    #[arg(long)]
    json: bool,

    /// Disable progress bar.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum FormatArg {
    Png,
    Jpeg,
}

impl From<FormatArg> for ImageFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Png => ImageFormat::Png,
            FormatArg::Jpeg => ImageFormat::Jpeg,
        }
    }
}

/// Map an error class to the process exit code.
fn exit_code(err: &SnapError) -> i32 {
    if err.is_configuration() {
        2
    } else if matches!(err, SnapError::BrowserUnavailable { .. }) {
        3
    } else {
        1
    }
}

fn fail(err: SnapError) -> ! {
    eprintln!("{} {err}", red("error:"));
    std::process::exit(exit_code(&err));
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    // ── Resolve template and range ───────────────────────────────────────
    let Some(url) = cli.url.clone() else {
        fail(SnapError::InvalidConfig(
            "URL is required: pass it as an argument or set PAGESNAP_URL".into(),
        ));
    };

    let template = match UrlTemplate::parse(&url) {
        Ok(t) => t,
        Err(e) => fail(e),
    };

    let start = cli.start.or_else(|| template.embedded_start()).unwrap_or(1);
    let (end, count) = resolve_range(start, cli.end, cli.count, cli.limit);

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let first_url = template.page_url(start);
        let config = match inspect_config(&cli) {
            Ok(c) => c,
            Err(e) => fail(e),
        };
        let inspection = match inspect_page(&first_url, &config).await {
            Ok(i) => i,
            Err(e) => fail(e),
        };

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&inspection).context("serialise inspection")?
            );
        } else {
            print_inspection(&inspection);
        }
        return Ok(());
    }

    // ── Print-only / head-check modes ────────────────────────────────────
    if cli.print_only || cli.check_head {
        let sequence = match template.pages(start, end, count) {
            Ok(s) => s,
            Err(e) => fail(e),
        };
        if cli.check_head {
            let client = match pagesnap::pipeline::probe::probe_client() {
                Ok(c) => c,
                Err(e) => fail(e),
            };
            for spec in sequence {
                let status = pagesnap::pipeline::probe::head_check(&client, &spec.url).await;
                println!("{}  -> {}", spec.url, status);
            }
        } else {
            for spec in sequence {
                println!("{}", spec.url);
            }
        }
        return Ok(());
    }

    // ── Build config and run ─────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new_dynamic() as Arc<dyn RunProgressCallback>)
    } else {
        None
    };

    let config = match build_config(&cli, start, end, count, progress_cb) {
        Ok(c) => c,
        Err(e) => fail(e),
    };

    let outcome = match run(&config).await {
        Ok(o) => o,
        Err(e) => fail(e),
    };

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&outcome).context("serialise outcome")?
        );
        return Ok(());
    }

    // Summary (the callback already printed the per-page log).
    if !cli.quiet {
        for assembly in &outcome.assemblies {
            if assembly.ok {
                eprintln!(
                    "{} PDF {}  {}",
                    green("✔"),
                    bold(assembly.variant.label()),
                    dim(&format!("{} file(s)", assembly.files_written)),
                );
            } else {
                eprintln!(
                    "{} PDF {}  {}",
                    red("✘"),
                    bold(assembly.variant.label()),
                    red(assembly.detail.as_deref().unwrap_or("failed")),
                );
            }
        }
        if !show_progress {
            eprintln!(
                "Captured {}/{} pages in {}ms ({} skipped, {} failed)",
                outcome.succeeded_pages(),
                outcome.stats.pages_total,
                outcome.stats.total_duration_ms,
                outcome.stats.skipped,
                outcome.failed_pages(),
            );
        }
    }

    Ok(())
}

/// Apply the CLI's range conventions: `--limit` caps the range, and with no
/// range at all a ten-page preview starting at `start` is assumed.
fn resolve_range(
    start: u32,
    end: Option<u32>,
    count: Option<u32>,
    limit: Option<u32>,
) -> (Option<u32>, Option<u32>) {
    match (end, count) {
        (None, None) => match limit {
            Some(l) => (None, Some(l)),
            None => (Some(start.saturating_add(9)), None),
        },
        (end, count) => match limit {
            None => (end, count),
            Some(l) => {
                let range_end = end.unwrap_or_else(|| {
                    start
                        .saturating_add(count.unwrap_or(1))
                        .saturating_sub(1)
                });
                let limit_end = start.saturating_add(l).saturating_sub(1);
                (Some(range_end.min(limit_end)), None)
            }
        },
    }
}

/// Map CLI args to `RunConfig`.
fn build_config(
    cli: &Cli,
    start: u32,
    end: Option<u32>,
    count: Option<u32>,
    progress: Option<ProgressCallback>,
) -> Result<RunConfig, SnapError> {
    let mut variants: Vec<PdfVariant> = Vec::new();
    if cli.pdf_color {
        variants.push(if cli.merge {
            PdfVariant::ColorMerged
        } else {
            PdfVariant::ColorPerPage
        });
    }
    if cli.pdf_bw {
        variants.push(if cli.merge {
            PdfVariant::BwMerged
        } else {
            PdfVariant::BwPerPage
        });
    }

    let url = cli.url.clone().unwrap_or_default();
    let mut builder = RunConfig::builder(url)
        .start(start)
        .raw_dir(cli.out_dir.clone())
        .processed_dir(cli.processed_dir.clone())
        .pdf_dir(cli.pdf_dir.clone())
        .format(cli.img_format.clone().into())
        .image_prefix(cli.img_prefix.clone())
        .clip_padding(cli.clip_padding)
        .full_page(cli.img_fullpage)
        .inject_css(!cli.disable_css_injection)
        .timeout_ms(cli.timeout)
        .skip_existing(cli.skip_existing)
        .clear_output(cli.clear_output)
        .black_white(cli.bw || cli.pdf_bw)
        .pdf_variants(variants)
        .pdf_name(cli.pdf_name.clone());

    if let Some(e) = end {
        builder = builder.end(e);
    }
    if let Some(c) = count {
        builder = builder.count(c);
    }
    if let Some(ref s) = cli.selector {
        builder = builder.selector(s.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build()
}

/// Minimal config for inspect-only mode (no outputs are written).
fn inspect_config(cli: &Cli) -> Result<RunConfig, SnapError> {
    let url = cli.url.clone().unwrap_or_default();
    let mut builder = RunConfig::builder(url).timeout_ms(cli.timeout);
    if let Some(ref s) = cli.selector {
        builder = builder.selector(s.clone());
    }
    builder.build()
}

fn print_inspection(inspection: &pagesnap::PageInspection) {
    println!("URL:        {}", inspection.url);
    println!(
        "Selector:   {}  {}",
        inspection.selector,
        if inspection.detected {
            green("(detected)")
        } else {
            dim("(fallback)")
        }
    );
    match &inspection.metrics {
        Some(m) => {
            println!(
                "Region:     {:.0}×{:.0} at ({:.0}, {:.0})",
                m.width, m.height, m.x, m.y
            );
        }
        None => println!("Region:     {}", red("unavailable")),
    }
    match &inspection.background_url {
        Some(url) => println!("Background: {url}"),
        None => println!("Background: {}", dim("none")),
    }
    println!("\nContainers >100×100 px:");
    for (i, c) in inspection.candidates.iter().take(15).enumerate() {
        print!("  {:>2}. <{}>", i + 1, c.tag.to_lowercase());
        if !c.id.is_empty() {
            print!("  #{}", c.id);
        }
        if !c.classes.is_empty() {
            print!("  .{}", c.classes.replace(' ', " ."));
        }
        println!("  {}×{} at ({}, {})", c.width, c.height, c.x, c.y);
    }
    if inspection.candidates.len() > 15 {
        println!("  … and {} more", inspection.candidates.len() - 15);
    }
}
