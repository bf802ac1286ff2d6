use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::db::EventStore;
use crate::error::AppError;
use crate::fetcher::{map_external_event, EventSource};
use crate::usecases::{BetUseCase, EventUseCase};

/// Per-cycle counters, summarized in one log line per cycle.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub fetched: usize,
    pub upserted: usize,
    pub mapping_errors: usize,
    pub upsert_errors: usize,
    pub finalize_attempts: usize,
    pub finalize_errors: usize,
    pub cancel_attempts: usize,
    pub cancel_errors: usize,
}

/// Periodic reconciliation worker: pulls upstream truth, mirrors it into the
/// local store, and drives the finalize/cancel use cases for events the
/// upstream has resolved.
///
/// The syncer is not the serializing authority. It only writes events through
/// Upsert; every state transition goes through the re-entrant use cases,
/// which are safe to invoke again on the next tick.
pub struct EventSyncer {
    source: Arc<dyn EventSource>,
    events: Arc<dyn EventStore>,
    event_uc: Arc<EventUseCase>,
    bet_uc: Arc<BetUseCase>,
    sync_interval: Duration,
}

impl EventSyncer {
    pub fn new(
        source: Arc<dyn EventSource>,
        events: Arc<dyn EventStore>,
        event_uc: Arc<EventUseCase>,
        bet_uc: Arc<BetUseCase>,
        sync_interval: Duration,
    ) -> Self {
        Self {
            source,
            events,
            event_uc,
            bet_uc,
            sync_interval,
        }
    }

    /// Run until the shutdown channel flips. The first cycle runs
    /// immediately at startup; overrunning cycles delay the next tick rather
    /// than letting ticks pile up.
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        info!(interval_secs = self.sync_interval.as_secs(), "event syncer started");

        let mut ticker = interval(self.sync_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("event syncer stopping");
                        return;
                    }
                }

                _ = ticker.tick() => {
                    match self.run_sync().await {
                        Ok(stats) => info!(
                            fetched = stats.fetched,
                            upserted = stats.upserted,
                            mapping_errors = stats.mapping_errors,
                            upsert_errors = stats.upsert_errors,
                            finalize_attempts = stats.finalize_attempts,
                            finalize_errors = stats.finalize_errors,
                            cancel_attempts = stats.cancel_attempts,
                            cancel_errors = stats.cancel_errors,
                            "sync cycle finished"
                        ),
                        Err(e) => error!(error = %e, "sync cycle failed, will retry next tick"),
                    }
                }
            }
        }
    }

    /// One reconciliation cycle. Fails only when the upstream fetch fails;
    /// per-event problems are counted and the cycle continues.
    pub(crate) async fn run_sync(&self) -> crate::error::Result<SyncStats> {
        let external = self.source.fetch_active_events().await?;

        let mut stats = SyncStats {
            fetched: external.len(),
            ..SyncStats::default()
        };

        for ext in &external {
            let event = match map_external_event(ext, Utc::now()) {
                Ok(event) => event,
                Err(e) => {
                    warn!(external_id = %ext.id, error = %e, "skipping unmappable upstream event");
                    stats.mapping_errors += 1;
                    continue;
                }
            };

            // Decide the follow-up from the mapper output, before the upsert
            // overwrites the local record: after the upsert a canceled event
            // and one settled by time are indistinguishable in the store.
            let finalize_as = match (&event.event_result, event.is_active) {
                (Some(result), false) => Some(*result),
                _ => None,
            };
            let cancel = event.event_result.is_none() && !event.is_active && ext.is_canceled();

            if let Err(e) = self.events.upsert(&event).await {
                warn!(event_id = %event.id, error = %e, "failed to upsert event");
                stats.upsert_errors += 1;
                continue;
            }
            stats.upserted += 1;

            if let Some(result) = finalize_as {
                stats.finalize_attempts += 1;
                match self.event_uc.finalize_event(&event.id, result).await {
                    Ok(()) => {}
                    // Expected once the event is terminal locally.
                    Err(AppError::EventAlreadyFinalized) => {}
                    Err(e) => {
                        warn!(event_id = %event.id, error = %e, "syncer-triggered finalization failed");
                        stats.finalize_errors += 1;
                    }
                }
            } else if cancel {
                stats.cancel_attempts += 1;
                if let Err(e) = self.bet_uc.cancel_bets_for_event(&event.id).await {
                    warn!(event_id = %event.id, error = %e, "syncer-triggered cancellation failed");
                    stats.cancel_errors += 1;
                }
            }
        }

        Ok(stats)
    }
}
