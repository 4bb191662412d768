//! CalDAV backend.
//!
//! Each session becomes its own calendar object, `PUT` to
//! `{endpoint}/{id}-osminokal-event.ics` with basic auth. The endpoint is the
//! calendar collection URL. The object name is always a single escaped path
//! segment, so ids from upstream feeds can't leave the collection. Writing to
//! the same key again replaces the object.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Url;
use reqwest::header::CONTENT_TYPE;
use tokio_util::sync::CancellationToken;

use super::{Calendar, CalendarConfig, PutSummary};
use crate::error::{OsminokalError, OsminokalResult};
use crate::event::CalendarEvent;
use crate::http::{HttpClient, TransportError};
use crate::ics::generate_ics;
use crate::session::Session;

const CALENDAR_MIME: &str = "text/calendar; charset=utf-8";

pub struct CaldavCalendar {
    http: HttpClient,
    name: String,
    endpoint: Url,
    username: String,
    password: String,
}

pub(super) fn factory(config: &CalendarConfig, http: HttpClient) -> OsminokalResult<Box<dyn Calendar>> {
    Ok(Box::new(CaldavCalendar::new(config, http)?))
}

impl CaldavCalendar {
    pub const KIND: &'static str = "caldav";

    pub fn new(config: &CalendarConfig, http: HttpClient) -> OsminokalResult<Self> {
        let endpoint = Url::parse(&config.endpoint).map_err(|e| {
            OsminokalError::Config(format!(
                "Invalid endpoint '{}' for calendar '{}': {}",
                config.endpoint, config.name, e
            ))
        })?;
        if endpoint.cannot_be_a_base() {
            return Err(OsminokalError::Config(format!(
                "Invalid endpoint '{}' for calendar '{}': not a collection URL",
                config.endpoint, config.name
            )));
        }

        tracing::info!(calendar = %config.name, "created caldav client");

        Ok(CaldavCalendar {
            http,
            name: config.name.clone(),
            endpoint,
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    async fn put_object(
        &self,
        cancel: &CancellationToken,
        url: &Url,
        ics: &str,
    ) -> Result<reqwest::StatusCode, TransportError> {
        let resp = self
            .http
            .send(cancel, |c| {
                c.put(url.clone())
                    .basic_auth(&self.username, Some(&self.password))
                    .header(CONTENT_TYPE, CALENDAR_MIME)
                    .body(ics.to_string())
            })
            .await?;

        Ok(resp.status())
    }
}

/// Build the URL for an event resource. `object_name` is percent-encoded as one
/// path segment, including any `/`, `#` or `?` it contains.
pub fn event_url(calendar_url: &Url, object_name: &str) -> OsminokalResult<Url> {
    let mut url = calendar_url.clone();
    url.path_segments_mut()
        .map_err(|_| {
            OsminokalError::Config(format!("Calendar URL '{}' cannot hold event paths", calendar_url))
        })?
        .pop_if_empty()
        .push(object_name);
    Ok(url)
}

#[async_trait]
impl Calendar for CaldavCalendar {
    fn name(&self) -> &str {
        &self.name
    }

    async fn put_sessions(
        &self,
        cancel: &CancellationToken,
        sessions: &[Session],
    ) -> OsminokalResult<PutSummary> {
        let created = Utc::now();
        let mut summary = PutSummary::default();

        for session in sessions {
            let event = CalendarEvent::from_session(session, created);
            let url = event_url(&self.endpoint, &event.object_name())?;
            let ics = generate_ics(&event);

            match self.put_object(cancel, &url, &ics).await {
                Ok(status) => {
                    summary.written += 1;
                    tracing::debug!(calendar = %self.name, path = %url, %status, "event written");
                }
                Err(TransportError::Canceled) => return Err(OsminokalError::Canceled),
                Err(e) => {
                    summary.failed += 1;
                    let err = OsminokalError::materialize(&self.name, format!("{}: {}", url, e));
                    tracing::error!(calendar = %self.name, session = %session.id, error = %err, "error creating event in calendar");
                }
            }
        }

        Ok(summary)
    }
}
