use super::types::{ActionExecutor, ActionReport};
use crate::error::SyncError;
use crate::feed::CandidateItem;

use async_trait::async_trait;

/// Stand-in used when no action target is configured. Declines every item, so nothing is ever
/// recorded as handled and the items stay available for a real executor later.
#[derive(Debug, Default)]
pub struct DryRunExecutor;

#[async_trait]
impl ActionExecutor for DryRunExecutor {
    async fn perform(&self, item: &CandidateItem) -> Result<ActionReport, SyncError> {
        tracing::info!(
            "Dry run: would act on item {} ({})",
            item.id,
            item.url().unwrap_or("no url")
        );
        Ok(ActionReport::rejected("no action target configured"))
    }
}
