//! HTTP transport shared by sources and calendars.
//!
//! Wraps a `reqwest::Client` with bounded retries (capped exponential backoff)
//! and races every network call and backoff sleep against a cancellation token.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::error::{OsminokalError, OsminokalResult};

const DEFAULT_MAX_RETRIES: u32 = 10;
const DEFAULT_WAIT_MIN: Duration = Duration::from_secs(1);
const DEFAULT_WAIT_MAX: Duration = Duration::from_secs(30);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("request canceled")]
    Canceled,

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(StatusCode),

    #[error("giving up after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<TransportError>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub wait_min: Duration,
    pub wait_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: DEFAULT_MAX_RETRIES,
            wait_min: DEFAULT_WAIT_MIN,
            wait_max: DEFAULT_WAIT_MAX,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (zero-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.min(31)).unwrap_or(u32::MAX);
        self.wait_min.saturating_mul(factor).min(self.wait_max)
    }
}

/// PEM files for mutual TLS. All three are required together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsMaterial {
    pub ca_cert: PathBuf,
    pub client_cert: PathBuf,
    pub client_key: PathBuf,
}

#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
    retry: RetryPolicy,
}

impl HttpClient {
    pub fn new(retry: RetryPolicy) -> OsminokalResult<Self> {
        let inner = base_builder()
            .build()
            .map_err(|e| OsminokalError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(HttpClient { inner, retry })
    }

    /// Build a client that presents a client certificate and trusts the given CA
    /// in addition to the built-in roots.
    pub fn with_mtls(retry: RetryPolicy, tls: &TlsMaterial) -> OsminokalResult<Self> {
        let ca_pem = read_pem(&tls.ca_cert, "CA certificate")?;
        let ca = reqwest::Certificate::from_pem(&ca_pem).map_err(|e| {
            OsminokalError::Config(format!(
                "Invalid CA certificate {}: {}",
                tls.ca_cert.display(),
                e
            ))
        })?;

        let mut identity_pem = read_pem(&tls.client_cert, "client certificate")?;
        identity_pem.push(b'\n');
        identity_pem.extend(read_pem(&tls.client_key, "client certificate key")?);
        let identity = reqwest::Identity::from_pem(&identity_pem).map_err(|e| {
            OsminokalError::Config(format!("Invalid client certificate or key: {}", e))
        })?;

        let inner = base_builder()
            .add_root_certificate(ca)
            .identity(identity)
            .build()
            .map_err(|e| OsminokalError::Config(format!("Failed to build mTLS client: {}", e)))?;

        Ok(HttpClient { inner, retry })
    }

    /// Send a request, retrying connection failures, 429 and 5xx responses.
    ///
    /// `build` is called once per attempt since a `RequestBuilder` is consumed by `send`.
    pub async fn send<F>(&self, cancel: &CancellationToken, build: F) -> Result<Response, TransportError>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let mut attempt = 0;

        loop {
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(TransportError::Canceled),
                result = build(&self.inner).send() => result,
            };

            let err = match outcome {
                Ok(resp) if resp.status().is_success() => return Ok(resp),
                Ok(resp) => {
                    let status = resp.status();
                    if !is_retryable_status(status) {
                        return Err(TransportError::Status(status));
                    }
                    TransportError::Status(status)
                }
                Err(e) if e.is_builder() => return Err(TransportError::Request(e)),
                Err(e) => TransportError::Request(e),
            };

            if attempt >= self.retry.max_retries {
                return Err(TransportError::Exhausted {
                    attempts: attempt + 1,
                    last: Box::new(err),
                });
            }

            let delay = self.retry.backoff(attempt);
            tracing::debug!(error = %err, attempt = attempt + 1, delay = ?delay, "retrying request");

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(TransportError::Canceled),
                _ = tokio::time::sleep(delay) => {}
            }

            attempt += 1;
        }
    }
}

/// Read a full response body, giving up if the token fires first.
pub async fn read_body(cancel: &CancellationToken, resp: Response) -> Result<Vec<u8>, TransportError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(TransportError::Canceled),
        body = resp.bytes() => Ok(body?.to_vec()),
    }
}

fn base_builder() -> reqwest::ClientBuilder {
    Client::builder()
        .use_rustls_tls()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!("osminokal/", env!("CARGO_PKG_VERSION")))
}

fn read_pem(path: &Path, what: &str) -> OsminokalResult<Vec<u8>> {
    std::fs::read(path).map_err(|e| {
        OsminokalError::Config(format!("Failed to read {} {}: {}", what, path.display(), e))
    })
}

fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}
