//! Builds the sync pipeline from configuration and hooks up OS signals.

use anyhow::{Context, Result};
use osminokal_core::OsminokalResult;
use osminokal_core::calendar::{Calendar, CalendarRegistry};
use osminokal_core::config::Config;
use osminokal_core::http::{HttpClient, RetryPolicy};
use osminokal_core::identity::IdentityDeriver;
use osminokal_core::source::{SourceContext, SourceRegistry};
use osminokal_core::sync::SyncEngine;
use tokio_util::sync::CancellationToken;

/// Unknown source names and bad mTLS material are fatal. A calendar that
/// can't be built is logged and left out; the rest still run.
pub fn build_engine(config: &Config) -> OsminokalResult<SyncEngine> {
    let source_http = HttpClient::new(RetryPolicy::default())?;
    let calendar_http = match &config.tls {
        Some(tls) => {
            let client = HttpClient::with_mtls(RetryPolicy::default(), tls)?;
            tracing::info!("loaded client certificate and key");
            tracing::debug!(
                ca_cert_path = %tls.ca_cert.display(),
                client_cert_path = %tls.client_cert.display(),
                client_cert_key_path = %tls.client_key.display(),
                "mTLS material"
            );
            client
        }
        None => HttpClient::new(RetryPolicy::default())?,
    };

    let source = SourceRegistry::default().build(
        &config.source,
        SourceContext {
            http: source_http,
            identity: IdentityDeriver::new(config.namespace),
            url: config.source_url.clone(),
        },
    )?;
    tracing::info!(source = %config.source, "created source client");

    let registry = CalendarRegistry::default();
    let calendars: Vec<Box<dyn Calendar>> = config
        .calendars
        .iter()
        .filter_map(|cal| match registry.build(cal, calendar_http.clone()) {
            Ok(calendar) => Some(calendar),
            Err(e) => {
                tracing::error!(name = %cal.name, endpoint = %cal.endpoint, error = %e, "cannot create calendar");
                None
            }
        })
        .collect();

    if calendars.is_empty() {
        tracing::warn!("no usable calendars configured, sessions will only be fetched");
    }

    Ok(SyncEngine::new(source, calendars))
}

/// Cancel `token` on SIGINT or SIGTERM.
pub fn cancel_on_shutdown_signal(token: CancellationToken) -> Result<()> {
    #[cfg(unix)]
    let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .context("Failed to install SIGTERM handler")?;

    tokio::spawn(async move {
        #[cfg(unix)]
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = terminate.recv() => {}
        }

        #[cfg(not(unix))]
        let _ = tokio::signal::ctrl_c().await;

        tracing::info!("received shutdown signal, exiting");
        token.cancel();
    });

    Ok(())
}
