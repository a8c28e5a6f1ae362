//! Streaming fetch seam and its HTTP implementation.

use std::io::Read;
use std::time::Duration;

use reqwest::blocking::Client;

use super::error::{TransferError, TransferResult};

/// Default connect/read timeout in seconds.
///
/// Short enough that a dead host does not stall the whole session.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// An open, successful response.
pub struct FetchResponse {
    /// Length declared by the server, if any.
    pub content_length: Option<u64>,
    /// Response body.
    pub body: Box<dyn Read + Send>,
}

/// Opens a streaming GET for a URL.
///
/// Implementations must only return `Ok` for 2xx responses.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, url: &str) -> TransferResult<FetchResponse>;
}

/// HTTP fetcher backed by a blocking reqwest client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    pub(crate) timeout: Duration,
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpFetcher {
    /// Create a fetcher with the default timeout.
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a fetcher with a custom connect/read timeout.
    ///
    /// The blocking client applies the timeout to each read of the body, so a
    /// long transfer is fine as long as bytes keep arriving.
    pub fn with_timeout(timeout: Duration) -> Self {
        let client = Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { client, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> TransferResult<FetchResponse> {
        let response = self.client.get(url).send().map_err(|e| {
            if e.is_timeout() {
                TransferError::Timeout {
                    url: url.to_string(),
                    timeout_secs: self.timeout.as_secs(),
                }
            } else {
                TransferError::Request {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(FetchResponse {
            content_length: response.content_length(),
            body: Box::new(response),
        })
    }
}
