//! One sync tick: fetch sessions from the source, then deliver the whole
//! batch to every calendar in configured order.

use tokio_util::sync::CancellationToken;

use crate::calendar::{Calendar, PutSummary};
use crate::source::Source;

/// How a tick ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Sessions were fetched and every calendar was attempted.
    Delivered {
        sessions: usize,
        deliveries: Vec<Delivery>,
    },
    /// Shutdown was requested during the tick.
    Canceled,
    /// The source failed; no calendar was touched.
    FetchFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub calendar: String,
    /// `None` if the calendar as a whole failed.
    pub summary: Option<PutSummary>,
}

pub struct SyncEngine {
    source: Box<dyn Source>,
    calendars: Vec<Box<dyn Calendar>>,
}

impl SyncEngine {
    pub fn new(source: Box<dyn Source>, calendars: Vec<Box<dyn Calendar>>) -> Self {
        SyncEngine { source, calendars }
    }

    pub async fn tick(&self, cancel: &CancellationToken) -> TickOutcome {
        let source = self.source.name();

        let sessions = match self.source.fetch(cancel).await {
            Ok(sessions) => sessions,
            Err(e) if e.is_canceled() => {
                tracing::info!(source, "received shutdown signal, abandoning fetch");
                return TickOutcome::Canceled;
            }
            Err(e) => {
                tracing::error!(source, error = %e, "error getting sessions");
                return TickOutcome::FetchFailed;
            }
        };

        tracing::info!(source, sessions = sessions.len(), "fetched sessions");
        tracing::debug!(source, ?sessions, "session detail");

        let mut deliveries = Vec::with_capacity(self.calendars.len());

        for calendar in &self.calendars {
            if cancel.is_cancelled() {
                tracing::info!("received shutdown signal, stopping delivery");
                return TickOutcome::Canceled;
            }

            let name = calendar.name().to_string();
            match calendar.put_sessions(cancel, &sessions).await {
                Ok(summary) => {
                    if summary.failed > 0 {
                        tracing::warn!(calendar = %name, written = summary.written, failed = summary.failed, "some sessions were not written");
                    } else {
                        tracing::info!(calendar = %name, written = summary.written, "successfully put sessions to calendar");
                    }
                    deliveries.push(Delivery {
                        calendar: name,
                        summary: Some(summary),
                    });
                }
                Err(e) if e.is_canceled() => {
                    tracing::info!(calendar = %name, "received shutdown signal, stopping delivery");
                    return TickOutcome::Canceled;
                }
                Err(e) => {
                    tracing::error!(calendar = %name, error = %e, "error submitting sessions");
                    deliveries.push(Delivery {
                        calendar: name,
                        summary: None,
                    });
                }
            }
        }

        TickOutcome::Delivered {
            sessions: sessions.len(),
            deliveries,
        }
    }
}
