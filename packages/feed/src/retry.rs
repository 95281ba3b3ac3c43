//! HTTP retry helper for transient errors.
//!
//! Feed requests go through [`send_text`] rather than calling
//! `reqwest::RequestBuilder::send()` directly so that connection resets,
//! timeouts, rate limiting and server errors are retried with exponential
//! backoff.
//!
//! The retry budget is kept well under the poll interval: if the feed is
//! still unavailable after that, the cycle is skipped and the next poll
//! tries again.

use std::time::Duration;

use crate::FeedError;

/// Maximum number of retry attempts for transient HTTP errors.
///
/// With exponential backoff (2s, 4s, 8s) the total wait before giving up
/// is 14 seconds.
const MAX_RETRIES: u32 = 3;

/// Maximum number of full re-fetch attempts when the response body cannot
/// be read.
const MAX_BODY_RETRIES: u32 = 2;

/// Sends an HTTP request and returns the response body as text.
///
/// The `build_request` closure is called on each attempt to construct a
/// fresh [`reqwest::RequestBuilder`], since builders are consumed by
/// `.send()`.
///
/// Does **not** retry HTTP 4xx (except 429), which are permanent.
///
/// # Errors
///
/// Returns [`FeedError`] if the request fails after all retries, the
/// server returns a non-retryable status code, or the body cannot be read.
#[allow(clippy::future_not_send)]
pub async fn send_text<F>(build_request: F) -> Result<String, FeedError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut body_attempt = 0;

    loop {
        let response = send_inner(&build_request, MAX_RETRIES).await?;

        let url = response.url().to_string();
        let status = response.status();

        match response.text().await {
            Ok(text) => return Ok(text),
            Err(e) if body_attempt < MAX_BODY_RETRIES => {
                body_attempt += 1;
                let delay = Duration::from_secs(1u64 << body_attempt);
                log::warn!(
                    "Body read failed (body retry {body_attempt}/{MAX_BODY_RETRIES}), \
                     re-fetching in {delay:?}...\n  \
                     url: {url}\n  \
                     status: {status}\n  \
                     error: {e}",
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                log::error!(
                    "Body read failed after {MAX_BODY_RETRIES} retries, giving up.\n  \
                     url: {url}\n  \
                     status: {status}\n  \
                     error: {e}",
                );
                return Err(FeedError::Http(e));
            }
        }
    }
}

/// Core retry loop.
///
/// Sends the request built by `build_request`, retrying on transient
/// errors up to `max_retries` times with exponential backoff. Returns the
/// successful [`reqwest::Response`] (status 2xx or 3xx).
#[allow(clippy::future_not_send)]
async fn send_inner<F>(build_request: &F, max_retries: u32) -> Result<reqwest::Response, FeedError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut attempt = 0;

    loop {
        if attempt > 0 {
            let delay = Duration::from_secs(1u64 << attempt);
            log::warn!("  retry {attempt}/{max_retries} in {delay:?}...");
            tokio::time::sleep(delay).await;
        }
        let can_retry = attempt < max_retries;
        attempt += 1;

        let response = match build_request().send().await {
            Ok(response) => response,
            Err(e) if can_retry && is_transient(&e) => {
                log::warn!("  transient error: {e}");
                continue;
            }
            Err(e) => return Err(FeedError::Http(e)),
        };

        let status = response.status();
        match classify_status(status) {
            StatusClass::Success => return Ok(response),
            StatusClass::Transient if can_retry => {
                log::warn!("  HTTP {status}");
            }
            StatusClass::Transient => {
                return Err(FeedError::Status {
                    message: format!("HTTP {status} after {max_retries} retries"),
                });
            }
            StatusClass::Permanent => {
                return Err(FeedError::Status {
                    message: format!("HTTP {status}"),
                });
            }
        }
    }
}

/// How a response status should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusClass {
    Success,
    /// 429 and 5xx.
    Transient,
    /// Any other 4xx.
    Permanent,
}

fn classify_status(status: reqwest::StatusCode) -> StatusClass {
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        StatusClass::Transient
    } else if status.is_client_error() {
        StatusClass::Permanent
    } else {
        StatusClass::Success
    }
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_decode() || e.is_request()
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use super::*;

    #[test]
    fn classifies_statuses() {
        assert_eq!(classify_status(StatusCode::OK), StatusClass::Success);
        assert_eq!(classify_status(StatusCode::FOUND), StatusClass::Success);
        assert_eq!(
            classify_status(StatusCode::TOO_MANY_REQUESTS),
            StatusClass::Transient
        );
        assert_eq!(
            classify_status(StatusCode::BAD_GATEWAY),
            StatusClass::Transient
        );
        assert_eq!(classify_status(StatusCode::NOT_FOUND), StatusClass::Permanent);
        assert_eq!(classify_status(StatusCode::FORBIDDEN), StatusClass::Permanent);
    }
}
