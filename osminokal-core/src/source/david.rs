//! davidskendall.co.uk free electricity feed.
//!
//! Sessions are published as a UK local date plus wall-clock start and end
//! times, optionally with an id of their own. Local times are resolved in
//! `Europe/London` before anything else looks at them.

use async_trait::async_trait;
use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Europe::London;
use serde::{Deserialize, Deserializer};
use tokio_util::sync::CancellationToken;

use super::{Source, SourceContext, fetch_body};
use crate::error::{OsminokalError, OsminokalResult};
use crate::http::HttpClient;
use crate::identity::IdentityDeriver;
use crate::session::Session;

const DEFAULT_URL: &str = "https://oe-api.davidskendall.co.uk/free_electricity.json";

#[derive(Debug, Deserialize)]
struct DavidSession {
    date: NaiveDate,
    #[serde(deserialize_with = "wall_clock")]
    start_time: NaiveTime,
    #[serde(deserialize_with = "wall_clock")]
    end_time: NaiveTime,
    #[serde(default)]
    id: Option<String>,
}

/// Accepts both `HH:MM` and `HH:MM:SS`.
fn wall_clock<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
    let s = String::deserialize(deserializer)?;
    NaiveTime::parse_from_str(&s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(&s, "%H:%M:%S"))
        .map_err(serde::de::Error::custom)
}

pub struct DavidSource {
    http: HttpClient,
    identity: IdentityDeriver,
    url: String,
}

pub(super) fn factory(ctx: SourceContext) -> Box<dyn Source> {
    Box::new(DavidSource::new(ctx))
}

impl DavidSource {
    pub const NAME: &'static str = "david";

    pub fn new(ctx: SourceContext) -> Self {
        DavidSource {
            http: ctx.http,
            identity: ctx.identity,
            url: ctx.url.unwrap_or_else(|| DEFAULT_URL.to_string()),
        }
    }

    fn parse(&self, body: &[u8]) -> OsminokalResult<Vec<Session>> {
        let raw: Vec<DavidSession> = serde_json::from_slice(body)
            .map_err(|e| OsminokalError::source_fetch(Self::NAME, format!("malformed payload: {}", e)))?;

        Ok(raw.into_iter().filter_map(|s| self.normalize(s)).collect())
    }

    fn normalize(&self, raw: DavidSession) -> Option<Session> {
        let start_local = raw.date.and_time(raw.start_time);
        let mut end_local = raw.date.and_time(raw.end_time);
        // Sessions running past midnight only carry the start date.
        if end_local <= start_local {
            end_local += Duration::days(1);
        }

        let (Some(start), Some(end)) = (london_to_utc(start_local), london_to_utc(end_local)) else {
            tracing::warn!(source = Self::NAME, date = %raw.date, "skipping session with nonexistent local time");
            return None;
        };

        let id = match raw.id {
            Some(id) if !id.trim().is_empty() => id,
            _ => self.identity.derive(&start).to_string(),
        };

        Session::new(id, start, end)
    }
}

/// Earliest instant for ambiguous times; `None` for times skipped by DST.
fn london_to_utc(local: NaiveDateTime) -> Option<DateTime<Utc>> {
    match London.from_local_datetime(&local) {
        LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
        LocalResult::None => None,
    }
}

#[async_trait]
impl Source for DavidSource {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn fetch(&self, cancel: &CancellationToken) -> OsminokalResult<Vec<Session>> {
        tracing::info!(source = Self::NAME, "fetching sessions");
        let body = fetch_body(Self::NAME, &self.http, &self.url, cancel).await?;
        self.parse(&body)
    }
}
