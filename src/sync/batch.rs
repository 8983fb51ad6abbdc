//! Sequential batch processing.
//!
//! Items are acted on one at a time, in order, with a randomized pause before every item
//! except the first. Only one batch runs per instance.

use super::orchestrator::SyncOrchestrator;
use super::types::{BatchError, BatchItemResult, BatchProgress, BatchReport, DelayPolicy};
use crate::feed::CandidateItem;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub struct BatchProcessor {
    orchestrator: Arc<SyncOrchestrator>,
    delay: DelayPolicy,
    processing: AtomicBool,
}

impl BatchProcessor {
    pub fn new(orchestrator: Arc<SyncOrchestrator>, delay: DelayPolicy) -> Arc<Self> {
        Arc::new(Self {
            orchestrator,
            delay,
            processing: AtomicBool::new(false),
        })
    }

    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::Acquire)
    }

    /// Acts on every item with reply text, in order.
    ///
    /// `on_progress` is called after each attempted item. The batch stops as soon as the posting
    /// breaker reports open; the remaining ids are listed in `not_attempted`.
    pub async fn process_batch<F>(
        &self,
        items: Vec<CandidateItem>,
        mut on_progress: F,
    ) -> Result<BatchReport, BatchError>
    where
        F: FnMut(BatchProgress),
    {
        if self
            .processing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(BatchError::AlreadyProcessing);
        }
        let _processing = ProcessingFlag(&self.processing);

        let actionable: Vec<CandidateItem> = items
            .into_iter()
            .filter(|item| item.has_actionable_field())
            .collect();
        let total = actionable.len();
        let mut report = BatchReport::default();

        for (index, item) in actionable.iter().enumerate() {
            if index > 0 {
                let pause = self.delay.sample();
                tracing::info!(
                    "Processing item {}/{} after {}s pause",
                    index + 1,
                    total,
                    pause.as_secs()
                );
                tokio::time::sleep(pause).await;
            } else {
                tracing::info!("Processing item 1/{}", total);
            }

            let outcome = self.orchestrator.act(item).await;
            let circuit_open = outcome.is_circuit_open();
            report.results.push(BatchItemResult {
                id: item.id.clone(),
                outcome,
            });

            on_progress(BatchProgress {
                completed: index + 1,
                total,
                current_id: item.id.clone(),
            });

            if circuit_open {
                report.stopped_by_breaker = true;
                report.not_attempted = actionable[index + 1..]
                    .iter()
                    .map(|rest| rest.id.clone())
                    .collect();
                tracing::warn!(
                    "Posting breaker open, stopping batch with {} items left",
                    report.not_attempted.len()
                );
                break;
            }
        }

        tracing::info!(
            "Batch finished: {} completed, {} failed",
            report.completed(),
            report.failed()
        );
        Ok(report)
    }
}

struct ProcessingFlag<'a>(&'a AtomicBool);

impl Drop for ProcessingFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
