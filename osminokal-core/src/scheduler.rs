//! Poll loop driving [`SyncEngine`] ticks.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::sync::{SyncEngine, TickOutcome};

pub struct Scheduler {
    interval: Duration,
}

impl Scheduler {
    pub fn new(interval: Duration) -> Self {
        Scheduler { interval }
    }

    /// Tick now, then once per interval until `cancel` fires.
    ///
    /// The wait starts after a tick returns, so ticks never overlap. Returns
    /// the number of ticks run.
    pub async fn run(&self, engine: &SyncEngine, cancel: &CancellationToken) -> usize {
        tracing::info!(interval = %humantime::format_duration(self.interval), "started polling");
        let mut ticks = 0;

        loop {
            if cancel.is_cancelled() {
                break;
            }

            ticks += 1;
            if engine.tick(cancel).await == TickOutcome::Canceled {
                break;
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        tracing::info!(ticks, "received shutdown signal, stopped polling");
        ticks
    }
}
