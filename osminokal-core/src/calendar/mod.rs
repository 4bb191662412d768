//! Calendar backends that sessions are materialized into.
//!
//! A backend turns each session into a [`CalendarEvent`](crate::event::CalendarEvent)
//! and writes it under a key derived from the session id, so writing the same
//! batch twice touches the same objects.

mod caldav;

pub use caldav::CaldavCalendar;

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::error::{OsminokalError, OsminokalResult};
use crate::http::HttpClient;
use crate::session::Session;

/// One configured calendar destination.
#[derive(Clone, Deserialize, PartialEq, Eq)]
pub struct CalendarConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub endpoint: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl fmt::Debug for CalendarConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CalendarConfig")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("endpoint", &self.endpoint)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Outcome of writing one batch to one calendar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PutSummary {
    pub written: usize,
    pub failed: usize,
}

#[async_trait]
pub trait Calendar: Send + Sync {
    fn name(&self) -> &str;

    /// Upsert one event per session. A failed session is logged and the rest
    /// are still attempted; only cancellation aborts the batch.
    async fn put_sessions(
        &self,
        cancel: &CancellationToken,
        sessions: &[Session],
    ) -> OsminokalResult<PutSummary>;
}

pub type CalendarFactory = fn(&CalendarConfig, HttpClient) -> OsminokalResult<Box<dyn Calendar>>;

/// Read-only table of calendar backends keyed by type.
pub struct CalendarRegistry {
    factories: BTreeMap<&'static str, CalendarFactory>,
}

impl Default for CalendarRegistry {
    fn default() -> Self {
        let mut factories: BTreeMap<&'static str, CalendarFactory> = BTreeMap::new();
        factories.insert(CaldavCalendar::KIND, caldav::factory);
        CalendarRegistry { factories }
    }
}

impl CalendarRegistry {
    pub fn kinds(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }

    pub fn build(&self, config: &CalendarConfig, http: HttpClient) -> OsminokalResult<Box<dyn Calendar>> {
        let factory = self.factories.get(config.kind.as_str()).ok_or_else(|| {
            OsminokalError::Config(format!(
                "Unsupported calendar type '{}' for calendar '{}'. Must be one of: {}",
                config.kind,
                config.name,
                self.kinds().join(", ")
            ))
        })?;

        factory(config, http)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::RetryPolicy;

    fn config(kind: &str) -> CalendarConfig {
        CalendarConfig {
            name: "home".into(),
            kind: kind.into(),
            endpoint: "https://dav.example.com/cal/home/".into(),
            username: "me".into(),
            password: "hunter2".into(),
        }
    }

    #[test]
    fn builds_caldav() {
        let http = HttpClient::new(RetryPolicy::default()).unwrap();
        let calendar = CalendarRegistry::default().build(&config("caldav"), http).unwrap();

        assert_eq!(calendar.name(), "home");
    }

    #[test]
    fn unsupported_type_is_config_error() {
        let http = HttpClient::new(RetryPolicy::default()).unwrap();
        let err = CalendarRegistry::default()
            .build(&config("exchange"), http)
            .err()
            .unwrap();

        match err {
            OsminokalError::Config(msg) => {
                assert!(msg.contains("exchange"));
                assert!(msg.contains("home"));
            }
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[test]
    fn debug_hides_password() {
        let rendered = format!("{:?}", config("caldav"));

        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }
}
