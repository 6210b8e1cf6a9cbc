//! Page capture: drive one headless-Chrome page load and screenshot.
//!
//! ## Resource discipline
//!
//! Each page gets a fresh browser process, wrapped in a [`BrowserSession`]
//! that is launched at the start of [`capture`] and closed before it
//! returns, on every exit path — success, per-page error, or timeout. No
//! two pages ever hold a live browser, and a failure on one page cannot
//! leak a process into the next.
//!
//! ## Failure policy
//!
//! Nothing in this module propagates an error past [`capture`]: every
//! navigation, evaluation, or screenshot failure is converted into a
//! [`CaptureResult`] with `error` set, logged with the page identity, and
//! the run moves on.

use crate::config::{ImageFormat, RunConfig};
use crate::error::{PageError, SnapError};
use crate::output::{CaptureResult, ContainerCandidate, PageInspection};
use crate::pipeline::locate::{self, ElementMetrics};
use crate::pipeline::urlgen::PageSpec;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::{CaptureScreenshotFormat, Viewport};
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use std::path::Path;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Viewport close to an A4 page at a working DPI, so captures scale
/// consistently across documents.
pub const VIEWPORT_WIDTH: u32 = 1240;
pub const VIEWPORT_HEIGHT: u32 = 1754;

/// Fixed settle delay after network idle, for late-loading assets and fonts.
pub const SETTLE_DELAY_MS: u64 = 1000;

/// Fixed JPEG quality when capturing in JPEG format.
pub const JPEG_QUALITY: i64 = 90;

/// Verify a Chrome/Chromium executable can be located, without launching it.
///
/// The orchestrator calls this once before page work starts so a missing
/// browser surfaces as a single fatal [`SnapError::BrowserUnavailable`]
/// instead of one capture failure per page.
pub fn probe_browser() -> Result<(), SnapError> {
    browser_config(crate::config::DEFAULT_TIMEOUT_MS)
        .map(|_| ())
        .map_err(|detail| SnapError::BrowserUnavailable { detail })
}

fn browser_config(timeout_ms: u64) -> Result<BrowserConfig, String> {
    BrowserConfig::builder()
        .window_size(VIEWPORT_WIDTH, VIEWPORT_HEIGHT)
        .request_timeout(Duration::from_millis(timeout_ms))
        .no_sandbox()
        // sRGB keeps captures identical across hosts with different
        // OS-level colour management.
        .arg("--force-color-profile=srgb")
        .arg("--disable-gpu")
        .arg("--hide-scrollbars")
        .arg("--mute-audio")
        .build()
}

/// A launched browser plus its spawned CDP event loop.
///
/// `close` tears down the process and the event task; callers hold the
/// session across exactly one page's work.
struct BrowserSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
}

impl BrowserSession {
    async fn launch(timeout_ms: u64) -> Result<Self, String> {
        let config = browser_config(timeout_ms)?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| format!("browser launch: {e}"))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("browser handler: {e}");
                }
            }
        });

        Ok(Self {
            browser,
            handler_task,
        })
    }

    async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            debug!("browser close: {e}");
        }
        if let Err(e) = self.browser.wait().await {
            debug!("browser wait: {e}");
        }
        self.handler_task.abort();
    }
}

/// Capture one page to `out_path`.
///
/// Never fails the run: all errors come back inside the [`CaptureResult`].
pub async fn capture(spec: &PageSpec, out_path: &Path, config: &RunConfig) -> CaptureResult {
    info!(page = spec.number, url = %spec.url, "capturing");
    match capture_inner(spec, out_path, config).await {
        Ok(()) => CaptureResult {
            page: spec.number,
            image_path: out_path.to_path_buf(),
            skipped: false,
            error: None,
        },
        Err(error) => {
            warn!(page = spec.number, url = %spec.url, %error, "capture failed");
            CaptureResult {
                page: spec.number,
                image_path: out_path.to_path_buf(),
                skipped: false,
                error: Some(error),
            }
        }
    }
}

async fn capture_inner(
    spec: &PageSpec,
    out_path: &Path,
    config: &RunConfig,
) -> Result<(), PageError> {
    let page_no = spec.number;
    let session = BrowserSession::launch(config.timeout_ms)
        .await
        .map_err(|detail| PageError::NavigationFailed {
            page: page_no,
            detail,
        })?;

    let result = drive_page(&session.browser, spec, out_path, config).await;
    session.close().await;
    result
}

async fn drive_page(
    browser: &Browser,
    spec: &PageSpec,
    out_path: &Path,
    config: &RunConfig,
) -> Result<(), PageError> {
    let page_no = spec.number;
    let page =
        browser
            .new_page("about:blank")
            .await
            .map_err(|e| PageError::NavigationFailed {
                page: page_no,
                detail: e.to_string(),
            })?;

    let result = capture_on_page(&page, spec, out_path, config).await;
    if let Err(e) = page.close().await {
        debug!(page = page_no, "page close: {e}");
    }
    result
}

async fn capture_on_page(
    page: &Page,
    spec: &PageSpec,
    out_path: &Path,
    config: &RunConfig,
) -> Result<(), PageError> {
    let page_no = spec.number;

    load_settled(page, &spec.url, config.timeout_ms, page_no).await?;

    // Resolve the content selector: explicit override, else detection with
    // the family fallback.
    let selector = match &config.selector {
        Some(s) => s.clone(),
        None => resolve_selector(page)
            .await
            .map_err(|detail| PageError::ScriptFailed {
                page: page_no,
                detail,
            })?,
    };
    debug!(page = page_no, %selector, "content selector resolved");

    // Probe the computed background before injection rewrites it.
    let probe = element_metrics(page, &selector)
        .await
        .map_err(|detail| PageError::ScriptFailed {
            page: page_no,
            detail,
        })?;

    if config.inject_css {
        inject_style(page, &locate::base_stylesheet(&selector))
            .await
            .map_err(|detail| PageError::ScriptFailed {
                page: page_no,
                detail,
            })?;

        let background_url = probe
            .as_ref()
            .and_then(|m| m.background_image.as_deref())
            .and_then(locate::extract_background_url);
        if let Some(bg_url) = background_url {
            debug!(page = page_no, %bg_url, "forcing background to cover");
            inject_style(page, &locate::cover_stylesheet(&selector, &bg_url))
                .await
                .map_err(|detail| PageError::ScriptFailed {
                    page: page_no,
                    detail,
                })?;
        }
    }

    let mut params = ScreenshotParams::builder().full_page(config.full_page);
    params = match config.format {
        ImageFormat::Png => params.format(CaptureScreenshotFormat::Png),
        ImageFormat::Jpeg => params
            .format(CaptureScreenshotFormat::Jpeg)
            .quality(JPEG_QUALITY),
    };

    if !config.full_page {
        // Injection can reflow the layout, so measure the box afterwards.
        let metrics = element_metrics(page, &selector)
            .await
            .map_err(|detail| PageError::ScriptFailed {
                page: page_no,
                detail,
            })?
            .ok_or_else(|| PageError::RegionUnavailable {
                page: page_no,
                selector: selector.clone(),
            })?;
        let clip = locate::clip_rect(&metrics, config.clip_padding);
        debug!(page = page_no, ?clip, "clipping to content region");
        params = params.clip(Viewport {
            x: clip.x as f64,
            y: clip.y as f64,
            width: clip.width as f64,
            height: clip.height as f64,
            scale: 1.0,
        });
    }

    page.save_screenshot(params.build(), out_path)
        .await
        .map_err(|e| PageError::ScreenshotFailed {
            page: page_no,
            detail: e.to_string(),
        })?;

    info!(page = page_no, path = %out_path.display(), "capture written");
    Ok(())
}

/// Navigate and wait for the load to finish within the page budget, then
/// give late assets the fixed settle delay.
async fn load_settled(
    page: &Page,
    url: &str,
    timeout_ms: u64,
    page_no: u32,
) -> Result<(), PageError> {
    let navigation = async {
        page.goto(url).await?;
        page.wait_for_navigation().await?;
        Ok::<(), chromiumoxide::error::CdpError>(())
    };
    match tokio::time::timeout(Duration::from_millis(timeout_ms), navigation).await {
        Err(_) => {
            return Err(PageError::Timeout {
                page: page_no,
                ms: timeout_ms,
            })
        }
        Ok(Err(e)) => {
            return Err(PageError::NavigationFailed {
                page: page_no,
                detail: e.to_string(),
            })
        }
        Ok(Ok(())) => {}
    }
    tokio::time::sleep(Duration::from_millis(SETTLE_DELAY_MS)).await;
    Ok(())
}

/// Detected `#PageContainer*` selector, or `None` when absent.
async fn detect_container(page: &Page) -> Result<Option<String>, String> {
    let detected = page
        .evaluate_function(locate::detect_container_js())
        .await
        .map_err(|e| e.to_string())?
        .into_value::<Option<String>>()
        .unwrap_or(None);
    Ok(detected)
}

/// Detected selector with the family fallback applied.
async fn resolve_selector(page: &Page) -> Result<String, String> {
    Ok(detect_container(page)
        .await?
        .unwrap_or_else(|| locate::FALLBACK_SELECTOR.to_string()))
}

/// Layout metrics for `selector`; `None` when the element has no box.
async fn element_metrics(page: &Page, selector: &str) -> Result<Option<ElementMetrics>, String> {
    let metrics = page
        .evaluate_function(locate::metrics_js(selector))
        .await
        .map_err(|e| e.to_string())?
        .into_value::<Option<ElementMetrics>>()
        .unwrap_or(None);
    Ok(metrics)
}

async fn inject_style(page: &Page, css: &str) -> Result<(), String> {
    page.evaluate_function(locate::inject_style_js(css))
        .await
        .map_err(|e| e.to_string())?;
    Ok(())
}

async fn container_candidates(page: &Page) -> Result<Vec<ContainerCandidate>, String> {
    let candidates = page
        .evaluate_function(locate::CONTAINER_CANDIDATES_JS)
        .await
        .map_err(|e| e.to_string())?
        .into_value::<Vec<ContainerCandidate>>()
        .unwrap_or_default();
    Ok(candidates)
}

/// Load one URL and report what a capture of it would see.
///
/// Used by [`crate::run::inspect_page`]; same session discipline as
/// [`capture`].
pub(crate) async fn inspect_target(
    url: &str,
    config: &RunConfig,
) -> Result<PageInspection, String> {
    let session = BrowserSession::launch(config.timeout_ms).await?;
    let result = inspect_on_browser(&session.browser, url, config).await;
    session.close().await;
    result
}

async fn inspect_on_browser(
    browser: &Browser,
    url: &str,
    config: &RunConfig,
) -> Result<PageInspection, String> {
    let page = browser
        .new_page("about:blank")
        .await
        .map_err(|e| e.to_string())?;

    let result = async {
        load_settled(&page, url, config.timeout_ms, 0)
            .await
            .map_err(|e| e.to_string())?;

        let (selector, detected) = match &config.selector {
            Some(s) => (s.clone(), true),
            None => match detect_container(&page).await? {
                Some(s) => (s, true),
                None => (locate::FALLBACK_SELECTOR.to_string(), false),
            },
        };

        let metrics = element_metrics(&page, &selector).await?;
        let background_url = metrics
            .as_ref()
            .and_then(|m| m.background_image.as_deref())
            .and_then(locate::extract_background_url);
        let candidates = container_candidates(&page).await?;

        Ok(PageInspection {
            url: url.to_string(),
            selector,
            detected,
            metrics,
            background_url,
            candidates,
        })
    }
    .await;

    if let Err(e) = page.close().await {
        debug!("page close: {e}");
    }
    result
}
