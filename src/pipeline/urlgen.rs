//! URL sequence generation: expand a template URL into ordered page URLs.
//!
//! Two resolution modes, tried in this order:
//!
//! 1. **Placeholder** — the template contains a `{page}` marker, optionally
//!    with a printf-style width (`{page:04d}`). Each page number is formatted
//!    to that width and substituted.
//! 2. **Digit run** — no placeholder; the *last* maximal run of decimal
//!    digits anywhere in the template is replaced, zero-padded to the same
//!    width as the original run. `.../page0001.xhtml` → `.../page0002.xhtml`.
//!
//! Both modes reduce to the same shape: a prefix, a zero-padded page number,
//! and a suffix. Generation is pure — no I/O, no randomness — and
//! re-creating a sequence from the same parameters always yields the same
//! URLs in the same order.

use crate::error::SnapError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static RE_PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{page(?::0?(\d+)d)?\}").unwrap());
static RE_DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

/// One page of the sequence: its number, padded filename label, and URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSpec {
    /// Page number as it appears in the URL.
    pub number: u32,
    /// The number zero-padded to the template's width, for filenames.
    pub label: String,
    pub url: String,
}

/// A parsed template URL, ready to emit page URLs.
#[derive(Debug, Clone)]
pub struct UrlTemplate {
    prefix: String,
    suffix: String,
    /// Zero-padding width (0 = unpadded).
    width: usize,
    /// The page number found in the template's digit run, absent in
    /// placeholder mode.
    embedded: Option<u32>,
}

impl UrlTemplate {
    /// Parse a template URL.
    ///
    /// Fails with [`SnapError::InvalidTemplate`] when the string has neither
    /// a `{page}` placeholder nor any digits.
    pub fn parse(template: &str) -> Result<Self, SnapError> {
        if let Some(caps) = RE_PLACEHOLDER.captures(template) {
            let m = caps.get(0).expect("capture 0 always present");
            let width = caps
                .get(1)
                .map(|w| w.as_str().parse::<usize>().unwrap_or(0))
                .unwrap_or(0);
            return Ok(UrlTemplate {
                prefix: template[..m.start()].to_string(),
                suffix: template[m.end()..].to_string(),
                width,
                embedded: None,
            });
        }

        let last = RE_DIGIT_RUN
            .find_iter(template)
            .last()
            .ok_or_else(|| SnapError::InvalidTemplate {
                template: template.to_string(),
            })?;
        Ok(UrlTemplate {
            prefix: template[..last.start()].to_string(),
            suffix: template[last.end()..].to_string(),
            width: last.as_str().len(),
            // Runs too long for a u32 (timestamps etc.) don't make a usable
            // default start; the caller's explicit start still governs.
            embedded: last.as_str().parse().ok(),
        })
    }

    /// Zero-padding width pages are formatted to (0 = unpadded).
    pub fn width(&self) -> usize {
        self.width
    }

    /// The page number embedded in the template's digit run, when present.
    ///
    /// Used by the CLI to default `start` to the page already in the URL.
    pub fn embedded_start(&self) -> Option<u32> {
        self.embedded
    }

    /// The zero-padded label for a page number.
    pub fn label(&self, number: u32) -> String {
        if self.width == 0 {
            number.to_string()
        } else {
            format!("{number:0width$}", width = self.width)
        }
    }

    /// The URL for a page number.
    pub fn page_url(&self, number: u32) -> String {
        format!("{}{}{}", self.prefix, self.label(number), self.suffix)
    }

    /// Build the page sequence for `start..=end` (or `start..start+count`).
    ///
    /// Fails with [`SnapError::MissingRange`] when neither `end` nor `count`
    /// is supplied. An end before start yields an empty sequence, not an
    /// error.
    pub fn pages(
        &self,
        start: u32,
        end: Option<u32>,
        count: Option<u32>,
    ) -> Result<PageSequence, SnapError> {
        let end = match (end, count) {
            (Some(e), _) => i64::from(e),
            (None, Some(c)) => i64::from(start) + i64::from(c) - 1,
            (None, None) => return Err(SnapError::MissingRange),
        };
        Ok(PageSequence {
            template: self.clone(),
            next: i64::from(start),
            end,
        })
    }
}

/// Lazy, finite, restartable iterator over [`PageSpec`]s.
///
/// Cloning yields an independent iterator positioned at the original start,
/// so the same sequence can be walked any number of times.
#[derive(Debug, Clone)]
pub struct PageSequence {
    template: UrlTemplate,
    next: i64,
    end: i64,
}

impl PageSequence {
    /// Remaining pages in the sequence.
    pub fn len(&self) -> usize {
        (self.end - self.next + 1).max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Iterator for PageSequence {
    type Item = PageSpec;

    fn next(&mut self) -> Option<PageSpec> {
        if self.next > self.end {
            return None;
        }
        let number = self.next as u32;
        self.next += 1;
        Some(PageSpec {
            number,
            label: self.template.label(number),
            url: self.template.page_url(number),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.len();
        (n, Some(n))
    }
}

impl ExactSizeIterator for PageSequence {}
