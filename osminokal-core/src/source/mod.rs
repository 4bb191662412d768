//! Upstream session sources.
//!
//! Each provider fetches its feed over HTTP and normalizes it into
//! [`Session`]s. Providers are looked up by name in a [`SourceRegistry`]
//! built once at startup.

mod david;
mod whizzy;

pub use david::DavidSource;
pub use whizzy::WhizzySource;

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::{OsminokalError, OsminokalResult};
use crate::http::{HttpClient, TransportError, read_body};
use crate::identity::IdentityDeriver;
use crate::session::Session;

#[async_trait]
pub trait Source: Send + Sync {
    /// Provider name, used in logs and errors.
    fn name(&self) -> &str;

    /// Fetch the current sessions. Returns [`OsminokalError::Canceled`] if the
    /// token fires before the fetch completes.
    async fn fetch(&self, cancel: &CancellationToken) -> OsminokalResult<Vec<Session>>;
}

/// Everything a provider needs at construction.
#[derive(Debug, Clone)]
pub struct SourceContext {
    pub http: HttpClient,
    pub identity: IdentityDeriver,
    /// Replaces the provider's default feed URL.
    pub url: Option<String>,
}

pub type SourceFactory = fn(SourceContext) -> Box<dyn Source>;

/// Read-only table of source providers keyed by name.
pub struct SourceRegistry {
    factories: BTreeMap<&'static str, SourceFactory>,
}

impl Default for SourceRegistry {
    fn default() -> Self {
        let mut factories: BTreeMap<&'static str, SourceFactory> = BTreeMap::new();
        factories.insert(WhizzySource::NAME, whizzy::factory);
        factories.insert(DavidSource::NAME, david::factory);
        SourceRegistry { factories }
    }
}

impl SourceRegistry {
    pub fn names(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }

    pub fn build(&self, name: &str, ctx: SourceContext) -> OsminokalResult<Box<dyn Source>> {
        let factory = self.factories.get(name).ok_or_else(|| {
            OsminokalError::Config(format!(
                "Invalid source '{}'. Must be one of: {}",
                name,
                self.names().join(", ")
            ))
        })?;

        Ok(factory(ctx))
    }
}

/// GET `url` and return the body, mapping transport failures onto the source's error.
async fn fetch_body(
    provider: &str,
    http: &HttpClient,
    url: &str,
    cancel: &CancellationToken,
) -> OsminokalResult<Vec<u8>> {
    tracing::debug!(source = provider, url, "fetching sessions");

    let resp = http
        .send(cancel, |c| c.get(url))
        .await
        .map_err(|e| transport_to_fetch(provider, e))?;

    read_body(cancel, resp)
        .await
        .map_err(|e| transport_to_fetch(provider, e))
}

fn transport_to_fetch(provider: &str, err: TransportError) -> OsminokalError {
    match err {
        TransportError::Canceled => OsminokalError::Canceled,
        other => OsminokalError::source_fetch(provider, other),
    }
}
