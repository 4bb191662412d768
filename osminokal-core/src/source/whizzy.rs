//! whizzy.org free electricity session feed.
//!
//! The feed is a JSON array of `{"start": ..., "end": ...}` objects with
//! RFC 3339 timestamps and no ids, so every session id is derived from its start.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use super::{Source, SourceContext, fetch_body};
use crate::error::{OsminokalError, OsminokalResult};
use crate::http::HttpClient;
use crate::identity::IdentityDeriver;
use crate::session::Session;

const DEFAULT_URL: &str = "https://www.whizzy.org/octopus_powerups/free_electricity_session.json";

#[derive(Debug, Deserialize)]
struct WhizzySession {
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
}

pub struct WhizzySource {
    http: HttpClient,
    identity: IdentityDeriver,
    url: String,
}

pub(super) fn factory(ctx: SourceContext) -> Box<dyn Source> {
    Box::new(WhizzySource::new(ctx))
}

impl WhizzySource {
    pub const NAME: &'static str = "whizzy";

    pub fn new(ctx: SourceContext) -> Self {
        WhizzySource {
            http: ctx.http,
            identity: ctx.identity,
            url: ctx.url.unwrap_or_else(|| DEFAULT_URL.to_string()),
        }
    }

    fn parse(&self, body: &[u8]) -> OsminokalResult<Vec<Session>> {
        let raw: Vec<WhizzySession> = serde_json::from_slice(body)
            .map_err(|e| OsminokalError::source_fetch(Self::NAME, format!("malformed payload: {}", e)))?;

        let sessions = raw
            .into_iter()
            .filter_map(|s| {
                let start = s.start.with_timezone(&Utc);
                let end = s.end.with_timezone(&Utc);
                let id = self.identity.derive(&start).to_string();

                let session = Session::new(id, start, end);
                if session.is_none() {
                    tracing::warn!(source = Self::NAME, %start, %end, "skipping session that ends before it starts");
                }
                session
            })
            .collect();

        Ok(sessions)
    }
}

#[async_trait]
impl Source for WhizzySource {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn fetch(&self, cancel: &CancellationToken) -> OsminokalResult<Vec<Session>> {
        tracing::info!(source = Self::NAME, "fetching sessions");
        let body = fetch_body(Self::NAME, &self.http, &self.url, cancel).await?;
        self.parse(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::RetryPolicy;
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn source(url: String) -> WhizzySource {
        let retry = RetryPolicy {
            max_retries: 1,
            wait_min: Duration::from_millis(5),
            wait_max: Duration::from_millis(5),
        };
        WhizzySource::new(SourceContext {
            http: HttpClient::new(retry).unwrap(),
            identity: IdentityDeriver::default(),
            url: Some(url),
        })
    }

    async fn serve(template: ResponseTemplate) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sessions.json"))
            .respond_with(template)
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn derives_ids_for_sessions_without_one() {
        let server = serve(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"start": "2024-01-01T00:00:00Z", "end": "2024-01-01T02:00:00Z"}
        ])))
        .await;

        let sessions = source(format!("{}/sessions.json", server.uri()))
            .fetch(&CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(sessions.len(), 1);
        let expected = IdentityDeriver::default()
            .derive(&"2024-01-01T00:00:00Z".parse().unwrap())
            .to_string();
        assert_eq!(sessions[0].id, expected);
        assert_eq!(sessions[0].end - sessions[0].start, chrono::Duration::hours(2));
    }

    #[tokio::test]
    async fn offsets_do_not_change_identity() {
        let server = serve(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"start": "2024-06-01T13:00:00+01:00", "end": "2024-06-01T14:00:00+01:00"}
        ])))
        .await;
        let from_offset = source(format!("{}/sessions.json", server.uri()))
            .fetch(&CancellationToken::new())
            .await
            .unwrap();

        let server = serve(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"start": "2024-06-01T12:00:00Z", "end": "2024-06-01T13:00:00Z"}
        ])))
        .await;
        let from_utc = source(format!("{}/sessions.json", server.uri()))
            .fetch(&CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(from_offset, from_utc);
    }

    #[tokio::test]
    async fn skips_inverted_sessions() {
        let server = serve(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"start": "2024-01-01T02:00:00Z", "end": "2024-01-01T00:00:00Z"},
            {"start": "2024-01-02T00:00:00Z", "end": "2024-01-02T01:00:00Z"}
        ])))
        .await;

        let sessions = source(format!("{}/sessions.json", server.uri()))
            .fetch(&CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].start.to_rfc3339(), "2024-01-02T00:00:00+00:00");
    }

    #[tokio::test]
    async fn non_success_status_is_fetch_error() {
        let server = serve(ResponseTemplate::new(403)).await;

        let err = source(format!("{}/sessions.json", server.uri()))
            .fetch(&CancellationToken::new())
            .await
            .unwrap_err();

        assert!(
            matches!(err, OsminokalError::SourceFetch { ref provider, .. } if provider == "whizzy"),
            "got {:?}",
            err
        );
    }

    #[tokio::test]
    async fn malformed_json_is_fetch_error() {
        let server = serve(ResponseTemplate::new(200).set_body_string("<html>oops</html>")).await;

        let err = source(format!("{}/sessions.json", server.uri()))
            .fetch(&CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, OsminokalError::SourceFetch { .. }), "got {:?}", err);
    }

    #[tokio::test]
    async fn truncated_body_is_fetch_error() {
        // Promise more bytes than are sent, then hang up.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = tokio::io::AsyncReadExt::read(&mut socket, &mut buf).await;
            socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\n[{\"start\"")
                .await
                .unwrap();
            socket.shutdown().await.unwrap();
        });

        let err = source(format!("http://{}/sessions.json", addr))
            .fetch(&CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, OsminokalError::SourceFetch { .. }), "got {:?}", err);
    }

    #[tokio::test]
    async fn cancellation_mid_fetch_returns_canceled() {
        let server = serve(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([]))
                .set_delay(Duration::from_secs(30)),
        )
        .await;

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let src = source(format!("{}/sessions.json", server.uri()));
        let result = tokio::time::timeout(Duration::from_secs(5), src.fetch(&cancel))
            .await
            .expect("fetch should observe cancellation");

        assert!(matches!(result, Err(OsminokalError::Canceled)));
    }
}
