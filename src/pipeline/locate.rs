//! Content-region location: selectors, injected CSS, and clip arithmetic.
//!
//! The browser half of the locator lives in [`crate::pipeline::browser`];
//! this module holds everything that does not need a live page — the
//! detection/metrics JavaScript, the fallback selector, the injected
//! stylesheets, the `url(...)` extraction from a computed background-image,
//! and the float-to-integer clip-rectangle arithmetic. Keeping these pure
//! makes the interesting edge cases testable without a browser.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Content containers carry ids of the form `PageContainer<N>`.
pub const CONTAINER_ID_PREFIX: &str = "PageContainer";

/// Selector used when no `PageContainer*` element is present.
pub const FALLBACK_SELECTOR: &str = "#PageContainer3";

/// JS: first element whose id starts with the container prefix, as a
/// `#id` selector string, or null. A pure query over the DOM snapshot —
/// repeated evaluation on an unchanged page returns the same value.
pub fn detect_container_js() -> String {
    format!(
        r#"() => {{
    const container = document.querySelector('[id^="{CONTAINER_ID_PREFIX}"]');
    return container ? '#' + container.id : null;
}}"#
    )
}

/// JS: every element with an id or a container/page/content class whose
/// layout box exceeds 100×100 px — the candidate list for `inspect`.
pub const CONTAINER_CANDIDATES_JS: &str = r#"() => {
    const elements = document.querySelectorAll(
        '[id], [class*="container"], [class*="page"], [class*="content"]');
    const info = [];
    elements.forEach(el => {
        const rect = el.getBoundingClientRect();
        if (rect.width > 100 && rect.height > 100) {
            info.push({
                tag: el.tagName,
                id: el.id || '',
                classes: el.className || '',
                width: Math.round(rect.width),
                height: Math.round(rect.height),
                x: Math.round(rect.x),
                y: Math.round(rect.y)
            });
        }
    });
    return info;
}"#;

/// Layout metrics and computed background of one element, in viewport px.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementMetrics {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Computed `background-image` value (e.g. `url("...")` or `none`).
    #[serde(default)]
    pub background_image: Option<String>,
}

/// JS: metrics + computed background-image for `selector`, or null when the
/// element cannot be located.
pub fn metrics_js(selector: &str) -> String {
    let sel = serde_json::to_string(selector).unwrap_or_else(|_| "\"\"".into());
    format!(
        r#"() => {{
    const el = document.querySelector({sel});
    if (!el) return null;
    const style = window.getComputedStyle(el);
    const rect = el.getBoundingClientRect();
    return {{
        x: rect.x,
        y: rect.y,
        width: rect.width,
        height: rect.height,
        backgroundImage: style.backgroundImage || null
    }};
}}"#
    )
}

/// Stylesheet injected before the screenshot: zero document margins, force a
/// white page background (removes the viewer's gray "paper" chrome), widen
/// common content wrappers, and pin the container's own background to the
/// top-left at contain sizing.
pub fn base_stylesheet(selector: &str) -> String {
    format!(
        "html, body {{ margin: 0 !important; padding: 0 !important; background: #ffffff !important; }}\n\
         img {{ display: block !important; }}\n\
         .content-wrapper, main, article {{ width: 100% !important; max-width: none !important; \
         margin: 0 !important; padding: 0 !important; background: #ffffff !important; }}\n\
         {selector} {{ background-position: top left !important; \
         background-repeat: no-repeat !important; background-size: contain !important; }}"
    )
}

/// Follow-up rule applied when the container exposes a background image:
/// re-assert the extracted URL and stretch it to cover over a white base.
pub fn cover_stylesheet(selector: &str, background_url: &str) -> String {
    format!(
        "{selector} {{ background-image: url('{background_url}') !important; \
         background-size: cover !important; background-color: #ffffff !important; }}"
    )
}

/// JS that appends `css` to the document as a `<style>` element.
pub fn inject_style_js(css: &str) -> String {
    let css = serde_json::to_string(css).unwrap_or_else(|_| "\"\"".into());
    format!(
        r#"() => {{
    const style = document.createElement('style');
    style.textContent = {css};
    document.head.appendChild(style);
}}"#
    )
}

static RE_CSS_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"url\((?:"|')?(.*?)(?:"|')?\)"#).unwrap());

/// Extract the URL from a computed `background-image` value.
///
/// Returns `None` for `none`, empty values, and strings the pattern does not
/// match — a silent no-match means "no background override", the clip still
/// happens.
pub fn extract_background_url(background_image: &str) -> Option<String> {
    let trimmed = background_image.trim();
    if trimmed.is_empty() || trimmed == "none" {
        return None;
    }
    RE_CSS_URL
        .captures(trimmed)
        .map(|caps| caps[1].to_string())
        .filter(|url| !url.is_empty())
}

/// Integer-pixel clip rectangle for a screenshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipRect {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

/// Build the clip rectangle for an element, expanded by `padding` pixels on
/// every side.
///
/// Layout measurements are floats; the clip is truncated to integer pixels
/// the way the screenshot API expects. The origin is clamped at zero so a
/// padded region near the viewport edge never produces negative
/// coordinates.
pub fn clip_rect(metrics: &ElementMetrics, padding: u32) -> ClipRect {
    let pad = i64::from(padding);
    ClipRect {
        x: (metrics.x as i64 - pad).max(0),
        y: (metrics.y as i64 - pad).max(0),
        width: metrics.width as i64 + pad * 2,
        height: metrics.height as i64 + pad * 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(x: f64, y: f64, w: f64, h: f64) -> ElementMetrics {
        ElementMetrics {
            x,
            y,
            width: w,
            height: h,
            background_image: None,
        }
    }

    #[test]
    fn extract_double_quoted_url() {
        assert_eq!(
            extract_background_url(r#"url("https://x/bg/p39.jpg")"#).as_deref(),
            Some("https://x/bg/p39.jpg")
        );
    }

    #[test]
    fn extract_single_quoted_and_bare_url() {
        assert_eq!(
            extract_background_url("url('img/bg.png')").as_deref(),
            Some("img/bg.png")
        );
        assert_eq!(
            extract_background_url("url(img/bg.png)").as_deref(),
            Some("img/bg.png")
        );
    }

    #[test]
    fn extract_none_and_garbage() {
        assert_eq!(extract_background_url("none"), None);
        assert_eq!(extract_background_url(""), None);
        assert_eq!(extract_background_url("linear-gradient(red, blue)"), None);
        assert_eq!(extract_background_url("url()"), None);
    }

    #[test]
    fn clip_truncates_floats() {
        let c = clip_rect(&metrics(10.7, 20.2, 1200.9, 1700.4), 0);
        assert_eq!(
            c,
            ClipRect {
                x: 10,
                y: 20,
                width: 1200,
                height: 1700
            }
        );
    }

    #[test]
    fn clip_padding_is_symmetric() {
        let c = clip_rect(&metrics(50.0, 60.0, 100.0, 200.0), 8);
        assert_eq!(c.x, 42);
        assert_eq!(c.y, 52);
        assert_eq!(c.width, 116);
        assert_eq!(c.height, 216);
    }

    #[test]
    fn clip_origin_clamped_at_zero() {
        let c = clip_rect(&metrics(2.0, 3.0, 100.0, 100.0), 10);
        assert_eq!(c.x, 0);
        assert_eq!(c.y, 0);
    }

    #[test]
    fn metrics_js_embeds_selector_safely() {
        let js = metrics_js("#PageContainer39");
        assert!(js.contains("\"#PageContainer39\""));
        // A hostile selector must stay inside the string literal.
        let js = metrics_js("#x\"); alert(1); (");
        assert!(js.contains("\\\""));
    }

    #[test]
    fn base_stylesheet_targets_selector() {
        let css = base_stylesheet("#PageContainer7");
        assert!(css.contains("#PageContainer7 { background-position: top left"));
        assert!(css.contains("background: #ffffff"));
    }

    #[test]
    fn detection_js_queries_the_container_family() {
        let js = detect_container_js();
        assert!(js.contains(r#"[id^="PageContainer"]"#));
    }

    #[test]
    fn fallback_selector_is_in_the_container_family() {
        assert!(FALLBACK_SELECTOR[1..].starts_with(CONTAINER_ID_PREFIX));
    }
}
