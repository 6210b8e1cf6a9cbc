//! Best-effort HTTP status probing for generated page URLs.
//!
//! A convenience for checking a page range before spending browser time on
//! it: HEAD first, falling back to GET for servers that reject HEAD, with a
//! short fixed timeout. Network failure is not an error here — it reports
//! status 0 and the caller decides what to make of it.

use std::time::Duration;
use tracing::debug;

/// Timeout applied to each probe request.
pub const HEAD_TIMEOUT_SECS: u64 = 6;

/// Build the client used for [`head_check`] calls.
///
/// One client is meant to be reused across a whole page range so connection
/// pooling applies.
pub fn probe_client() -> Result<reqwest::Client, crate::error::SnapError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(HEAD_TIMEOUT_SECS))
        .build()
        .map_err(|e| crate::error::SnapError::Internal(format!("probe client: {e}")))
}

/// HTTP status for `url`, via HEAD with a GET fallback.
///
/// Redirects are followed. Returns 0 when both requests fail entirely
/// (DNS, connect, timeout).
pub async fn head_check(client: &reqwest::Client, url: &str) -> u16 {
    match client.head(url).send().await {
        Ok(response) => response.status().as_u16(),
        Err(head_err) => {
            debug!(%url, error = %head_err, "HEAD failed, retrying as GET");
            match client.get(url).send().await {
                Ok(response) => response.status().as_u16(),
                Err(get_err) => {
                    debug!(%url, error = %get_err, "GET fallback failed");
                    0
                }
            }
        }
    }
}
