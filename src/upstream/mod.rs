//! Third-party API clients.
//!
//! # Data Flow
//! ```text
//! handler
//!     → coingecko.rs / youtube.rs (GET, retried with backoff)
//!     → newsletter.rs (POST, single attempt)
//!     → UpstreamError on failure, mapped by the handler
//! ```
//!
//! All clients share one `reqwest::Client` with connect and request deadlines.

pub mod coingecko;
pub mod newsletter;
pub mod youtube;

use std::time::Duration;

use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

use crate::config::schema::TimeoutConfig;
use crate::observability::metrics;

pub use coingecko::{BitcoinQuote, PriceFeed};
pub use newsletter::{NewsletterClient, Signup, SignupOutcome};
pub use youtube::{Video, VideoCatalog, VideoPage};

/// Failure talking to a third-party API.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("upstream timed out")]
    Timeout,

    #[error("upstream connection failed: {0}")]
    Connect(String),

    #[error("upstream returned status {0}")]
    Status(u16),

    #[error("upstream response could not be decoded: {0}")]
    Decode(String),

    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("invalid upstream URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("upstream request failed: {0}")]
    Transport(String),
}

impl UpstreamError {
    /// Transient failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout | Self::Connect(_) => true,
            Self::Status(status) => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_connect() {
            Self::Connect(e.to_string())
        } else if e.is_decode() {
            Self::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            Self::Status(status.as_u16())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

/// Shared outbound client with the configured deadlines.
pub fn build_http_client(timeouts: &TimeoutConfig) -> Result<reqwest::Client, UpstreamError> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(timeouts.upstream_connect_secs))
        .timeout(Duration::from_secs(timeouts.upstream_request_secs))
        .user_agent(concat!("betirement-gateway/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(UpstreamError::from)
}

/// Parse a configured base URL so that `join` appends rather than replaces
/// the last path segment.
pub(crate) fn base_url(raw: &str) -> Result<Url, UpstreamError> {
    let mut url = Url::parse(raw)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// GET a JSON document, mapping non-2xx statuses to [`UpstreamError::Status`].
pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    provider: &'static str,
    url: Url,
) -> Result<T, UpstreamError> {
    let result = async {
        let response = client.get(url).send().await?.error_for_status()?;
        Ok::<T, UpstreamError>(response.json::<T>().await?)
    }
    .await;

    metrics::record_upstream(provider, if result.is_ok() { "ok" } else { "error" });
    result
}
