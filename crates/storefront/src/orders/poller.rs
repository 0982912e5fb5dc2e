//! Background order lifecycle refresh.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::OrderBook;
use crate::error::{StorefrontError, report};
use crate::storage::KeyValueStore;

/// Outcome of the poller's most recent pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollReport {
    /// Passes completed since the poller started.
    pub passes: u64,
    /// Orders changed by the last pass.
    pub changed: usize,
    pub last_run: Option<DateTime<Utc>>,
    /// Message of the last failed pass, cleared by a successful one.
    pub last_error: Option<String>,
}

/// Periodically applies due order transitions until shut down.
///
/// The task is aborted when the poller is dropped.
pub struct OrderPoller {
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
    reports: watch::Receiver<PollReport>,
}

impl OrderPoller {
    /// Start polling `book` every `period`. The first pass runs immediately.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn spawn<S: KeyValueStore>(book: Arc<OrderBook<S>>, period: Duration) -> Self {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        let (report_tx, reports) = watch::channel(PollReport::default());

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!(period_ms = period.as_millis(), "Order poller started");

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = interval.tick() => {
                        let now = Utc::now();
                        let outcome = book.recompute_all(now).await;
                        report_tx.send_modify(|r| apply(r, now, outcome));
                    }
                }
            }

            info!("Order poller stopped");
        });

        Self {
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
            reports,
        }
    }

    /// Watch the outcome of each pass.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<PollReport> {
        self.reports.clone()
    }

    /// Returns `true` while the polling task is alive.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop polling and wait for an in-flight pass to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take()
            && let Err(e) = handle.await
        {
            warn!(error = %e, "Order poller task ended abnormally");
        }
    }
}

impl Drop for OrderPoller {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

fn apply(state: &mut PollReport, now: DateTime<Utc>, outcome: Result<usize, StorefrontError>) {
    state.passes += 1;
    state.last_run = Some(now);
    match outcome {
        Ok(changed) => {
            if changed > 0 {
                debug!(changed, "Order poll pass applied transitions");
            }
            state.changed = changed;
            state.last_error = None;
        }
        Err(e) => {
            report(&e);
            state.changed = 0;
            state.last_error = Some(e.to_string());
        }
    }
}
