//! Core HTTP operations with rate limiting and retry logic
//!
//! Steam community pages are fetched politely: a `governor` rate limiter
//! spaces requests out, and transient failures (transport errors, 429, 503)
//! are retried with exponential backoff a bounded number of times.

use std::num::NonZeroU32;
use std::time::Duration;

use governor::{clock::DefaultClock, state::InMemoryState, Jitter, Quota, RateLimiter};
use reqwest::{Client, StatusCode};
use url::Url;

use crate::constants::limits;
use crate::errors::{DownloadError, DownloadResult};

type DirectRateLimiter = RateLimiter<governor::state::NotKeyed, InMemoryState, DefaultClock>;

/// HTTP operations handler with resilience patterns
#[derive(Debug)]
pub struct HttpHandler {
    client: Client,
    rate_limiter: DirectRateLimiter,
    max_retries: u32,
}

impl HttpHandler {
    /// Creates a new HttpHandler with the given client and rate limiting
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if the rate limit is zero
    pub fn new(client: Client, rate_limit_rps: u32, max_retries: u32) -> DownloadResult<Self> {
        let rate_limiter = Self::build_rate_limiter(rate_limit_rps)?;
        Ok(Self {
            client,
            rate_limiter,
            max_retries,
        })
    }

    fn build_rate_limiter(rate_limit_rps: u32) -> DownloadResult<DirectRateLimiter> {
        let rps = NonZeroU32::new(rate_limit_rps)
            .ok_or_else(|| DownloadError::Other("Rate limit must be non-zero".to_string()))?;
        Ok(RateLimiter::direct(Quota::per_second(rps)))
    }

    fn backoff_delay(attempt: u32) -> Duration {
        Duration::from_millis(limits::RETRY_BASE_DELAY_MS * 2_u64.pow(attempt))
    }

    /// Fetches a response, retrying transient failures
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if the request still fails after the retries,
    /// or if the server answers with a non-success status
    pub async fn get_response(&self, url: &Url) -> DownloadResult<reqwest::Response> {
        let mut retries = 0;
        loop {
            self.rate_limiter
                .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(100)))
                .await;

            match self.client.get(url.as_str()).send().await {
                Ok(response) => {
                    let status = response.status();

                    if status == StatusCode::TOO_MANY_REQUESTS
                        || status == StatusCode::SERVICE_UNAVAILABLE
                    {
                        if retries < self.max_retries {
                            retries += 1;
                            let delay = Self::backoff_delay(retries);
                            tracing::warn!(
                                "Server answered {} for {}. Backing off for {}ms",
                                status.as_u16(),
                                url,
                                delay.as_millis()
                            );
                            tokio::time::sleep(delay).await;
                            continue;
                        }
                        return Err(if status == StatusCode::TOO_MANY_REQUESTS {
                            DownloadError::RateLimitExceeded
                        } else {
                            DownloadError::ServerOverloaded
                        });
                    }

                    if !status.is_success() {
                        return Err(DownloadError::ServerError {
                            status: status.as_u16(),
                        });
                    }

                    tracing::debug!("Successfully fetched response: {}", url);
                    return Ok(response);
                }
                Err(e) if retries < self.max_retries => {
                    retries += 1;
                    let delay = Self::backoff_delay(retries);
                    tracing::warn!(
                        "Request failed (attempt {}/{}): {}. Retrying in {}ms",
                        retries,
                        self.max_retries,
                        e,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    tracing::error!("Request to {} failed after {} retries: {}", url, retries, e);
                    if retries == 0 {
                        return Err(DownloadError::Http(e));
                    }
                    return Err(DownloadError::MaxRetriesExceeded {
                        max_retries: self.max_retries,
                    });
                }
            }
        }
    }

    /// Fetches the body of a page as text
    pub async fn get_page(&self, url: &Url) -> DownloadResult<String> {
        let response = self.get_response(url).await?;
        let text = response.text().await?;
        tracing::debug!("Fetched page {} ({} bytes)", url, text.len());
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::client::config::ClientConfig;

    #[tokio::test]
    async fn test_rate_limiter_creation() {
        let rate_limiter = HttpHandler::build_rate_limiter(5).unwrap();
        rate_limiter.until_ready().await;
    }

    #[test]
    fn test_rate_limiter_zero_fails() {
        assert!(HttpHandler::build_rate_limiter(0).is_err());
    }

    #[tokio::test]
    async fn test_http_handler_creation() {
        let config = ClientConfig::default();
        let client = config.build_http_client().unwrap();
        assert!(HttpHandler::new(client, 2, 1).is_ok());
    }

    #[test]
    fn test_exponential_backoff_calculation() {
        assert_eq!(HttpHandler::backoff_delay(1).as_millis(), 1000);
        assert_eq!(HttpHandler::backoff_delay(2).as_millis(), 2000);
    }
}
