//! Process configuration, read from `OSMINOKAL_*` environment variables.

use std::path::PathBuf;
use std::time::Duration;

use ::config::Environment;
use serde::Deserialize;
use uuid::Uuid;

use crate::calendar::CalendarConfig;
use crate::error::{OsminokalError, OsminokalResult};
use crate::http::TlsMaterial;
use crate::identity::DEFAULT_NAMESPACE;

pub const ENV_PREFIX: &str = "OSMINOKAL";

static DEFAULT_POLL_INTERVAL: &str = "15m";

/// Environment as read, before validation. Every value arrives as a string.
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    source: Option<String>,
    source_url: Option<String>,
    poll_interval: Option<String>,
    namespace: Option<String>,
    calendars: Option<String>,
    ca_cert_path: Option<String>,
    client_cert_path: Option<String>,
    client_cert_key_path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Source provider name, lower-cased.
    pub source: String,
    pub source_url: Option<String>,
    pub poll_interval: Duration,
    /// Namespace for derived session ids.
    pub namespace: Uuid,
    pub calendars: Vec<CalendarConfig>,
    /// mTLS material for the calendar transport.
    pub tls: Option<TlsMaterial>,
}

impl Config {
    pub fn from_env() -> OsminokalResult<Self> {
        Self::load(Environment::with_prefix(ENV_PREFIX))
    }

    pub fn load(env: Environment) -> OsminokalResult<Self> {
        let raw: RawConfig = ::config::Config::builder()
            .add_source(env)
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| OsminokalError::Config(e.to_string()))?;

        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> OsminokalResult<Self> {
        let source = non_empty(raw.source)
            .map(|s| s.to_lowercase())
            .ok_or_else(|| OsminokalError::Config("OSMINOKAL_SOURCE is not set".into()))?;

        let namespace = match non_empty(raw.namespace) {
            Some(s) => Uuid::parse_str(&s).map_err(|e| {
                OsminokalError::Config(format!("Invalid OSMINOKAL_NAMESPACE '{}': {}", s, e))
            })?,
            None => DEFAULT_NAMESPACE,
        };

        Ok(Config {
            source,
            source_url: non_empty(raw.source_url),
            poll_interval: parse_poll_interval(non_empty(raw.poll_interval)),
            namespace,
            calendars: parse_calendars(non_empty(raw.calendars))?,
            tls: tls_material(raw.ca_cert_path, raw.client_cert_path, raw.client_cert_key_path),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Falls back to the default on unparsable or zero durations.
fn parse_poll_interval(value: Option<String>) -> Duration {
    let default = || humantime::parse_duration(DEFAULT_POLL_INTERVAL).unwrap_or(Duration::from_secs(900));

    let Some(value) = value else {
        return default();
    };

    match humantime::parse_duration(&value) {
        Ok(d) if !d.is_zero() => d,
        Ok(_) => {
            tracing::warn!(OSMINOKAL_POLL_INTERVAL = %value, default = DEFAULT_POLL_INTERVAL, "poll interval must be positive, using default");
            default()
        }
        Err(e) => {
            tracing::warn!(OSMINOKAL_POLL_INTERVAL = %value, default = DEFAULT_POLL_INTERVAL, error = %e, "cannot parse poll interval duration, using default");
            default()
        }
    }
}

fn parse_calendars(value: Option<String>) -> OsminokalResult<Vec<CalendarConfig>> {
    let json = value.ok_or_else(|| {
        OsminokalError::Config(
            "OSMINOKAL_CALENDARS is not set. Cannot proceed without any valid calendars".into(),
        )
    })?;

    let mut calendars: Vec<CalendarConfig> = serde_json::from_str(&json)
        .map_err(|e| OsminokalError::Config(format!("Failed to parse OSMINOKAL_CALENDARS json: {}", e)))?;

    if calendars.is_empty() {
        return Err(OsminokalError::Config(
            "OSMINOKAL_CALENDARS is empty. Cannot proceed without any valid calendars".into(),
        ));
    }

    for calendar in &mut calendars {
        calendar.kind = calendar.kind.to_lowercase();
    }

    Ok(calendars)
}

fn tls_material(
    ca_cert: Option<String>,
    client_cert: Option<String>,
    client_key: Option<String>,
) -> Option<TlsMaterial> {
    match (non_empty(ca_cert), non_empty(client_cert), non_empty(client_key)) {
        (Some(ca), Some(cert), Some(key)) => Some(TlsMaterial {
            ca_cert: PathBuf::from(ca),
            client_cert: PathBuf::from(cert),
            client_key: PathBuf::from(key),
        }),
        _ => {
            tracing::info!("one of CA cert path, client cert path or client cert key path not set, not setting up mTLS");
            None
        }
    }
}
