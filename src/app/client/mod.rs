//! HTTP client for Steam community pages
//!
//! The resolver and the update checker only need "give me the HTML at this
//! URL". That need is the [`PageSource`] trait; [`WorkshopClient`] is the
//! real implementation, and tests substitute canned pages.
//!
//! The module is organized into:
//! - `config`: HTTP client configuration and building
//! - `http`: request execution with rate limiting and retries

use std::future::Future;

use url::Url;

use crate::errors::DownloadResult;

pub mod config;
pub mod http;

pub use config::ClientConfig;

use http::HttpHandler;

/// Anything that can return the HTML body for a URL
pub trait PageSource: Send + Sync {
    /// Fetch the page at `url` as text
    fn fetch_page(&self, url: &Url) -> impl Future<Output = DownloadResult<String>> + Send;
}

impl<P: PageSource> PageSource for &P {
    fn fetch_page(&self, url: &Url) -> impl Future<Output = DownloadResult<String>> + Send {
        (**self).fetch_page(url)
    }
}

/// Rate-limited HTTP client for Steam workshop pages
#[derive(Debug)]
pub struct WorkshopClient {
    http_handler: HttpHandler,
}

impl WorkshopClient {
    /// Creates a client with default settings
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if the HTTP client cannot be built
    pub fn new() -> DownloadResult<Self> {
        Self::with_config(&ClientConfig::default())
    }

    /// Creates a client with custom configuration
    pub fn with_config(config: &ClientConfig) -> DownloadResult<Self> {
        let client = config.build_http_client()?;
        let http_handler = HttpHandler::new(client, config.rate_limit_rps, config.max_retries)?;

        tracing::debug!(
            rate_limit_rps = config.rate_limit_rps,
            max_retries = config.max_retries,
            "Created workshop client"
        );

        Ok(Self { http_handler })
    }
}

impl PageSource for WorkshopClient {
    fn fetch_page(&self, url: &Url) -> impl Future<Output = DownloadResult<String>> + Send {
        self.http_handler.get_page(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        assert!(WorkshopClient::new().is_ok());
    }

    #[test]
    fn test_zero_rate_limit_rejected() {
        let config = ClientConfig {
            rate_limit_rps: 0,
            ..Default::default()
        };
        assert!(WorkshopClient::with_config(&config).is_err());
    }
}
