//! Background sync schedule.
//!
//! Runs a sync cycle on a fixed interval. A failed cycle is logged and simply retried on the
//! next tick; nothing here loops on an error.

use super::batch::BatchProcessor;
use super::orchestrator::SyncOrchestrator;
use super::types::FetchOutcome;
use crate::error::SyncError;

use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3 * 60);

pub struct SyncWorker {
    orchestrator: Arc<SyncOrchestrator>,
    /// When set, fetched items are handed straight to the batch processor.
    batch: Option<Arc<BatchProcessor>>,
    poll_interval: Duration,
}

impl SyncWorker {
    pub fn new(
        orchestrator: Arc<SyncOrchestrator>,
        batch: Option<Arc<BatchProcessor>>,
        poll_interval: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            orchestrator,
            batch,
            poll_interval,
        })
    }

    /// Spawns the periodic loop and returns its handle.
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tracing::info!(
            "Starting sync worker (every {}s, auto act: {})",
            self.poll_interval.as_secs(),
            self.batch.is_some()
        );

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                if let Err(e) = self.run_cycle().await {
                    tracing::warn!("Sync cycle failed, retrying next tick: {}", e);
                }
            }
        })
    }

    /// One fetch, plus the batch when auto act is on.
    pub async fn run_cycle(&self) -> Result<FetchOutcome, SyncError> {
        let outcome = self.orchestrator.fetch_new_items().await?;

        if outcome.skipped_due_to_lease || outcome.already_running {
            return Ok(outcome);
        }
        if outcome.items.is_empty() {
            tracing::debug!("No new items this cycle");
            return Ok(outcome);
        }

        tracing::info!("Sync cycle found {} new items", outcome.items.len());

        if let Some(batch) = &self.batch {
            match batch
                .process_batch(outcome.items.clone(), |progress| {
                    tracing::debug!(
                        "Batch progress {}/{} ({})",
                        progress.completed,
                        progress.total,
                        progress.current_id
                    );
                })
                .await
            {
                Ok(report) if report.stopped_by_breaker => {
                    tracing::warn!(
                        "Batch cut short by the posting breaker, {} items deferred",
                        report.not_attempted.len()
                    );
                }
                Ok(_) => {}
                Err(e) => tracing::info!("Skipping auto act: {}", e),
            }
        }

        Ok(outcome)
    }
}
