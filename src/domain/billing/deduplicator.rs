//! Webhook event deduplication.
//!
//! ## Race Condition Handling
//!
//! `is_new` is only a fast path. When two deliveries of the same event run
//! concurrently both may see it as new; the first `record` wins on the
//! primary key and the loser gets `SaveResult::AlreadyExists`, which the
//! ingestor reports as `AlreadyProcessed`.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::info;

use super::WebhookError;
use crate::ports::{SaveResult, WebhookEventRecord, WebhookEventRepository};

#[derive(Clone)]
pub struct EventDeduplicator {
    repository: Arc<dyn WebhookEventRepository>,
}

impl EventDeduplicator {
    pub fn new(repository: Arc<dyn WebhookEventRepository>) -> Self {
        Self { repository }
    }

    /// True when no record exists for `event_id` yet.
    pub async fn is_new(&self, event_id: &str) -> Result<bool, WebhookError> {
        Ok(!self.repository.exists(event_id).await?)
    }

    /// Records the event as processed.
    pub async fn record(
        &self,
        event_id: &str,
        topic: &str,
        resource_id: Option<String>,
        raw_body: &[u8],
    ) -> Result<SaveResult, WebhookError> {
        let record = WebhookEventRecord::new(
            event_id,
            topic,
            resource_id,
            String::from_utf8_lossy(raw_body).into_owned(),
        );
        Ok(self.repository.save(record).await?)
    }

    /// Drops records older than `retention`. Dedup only needs recent history.
    pub async fn purge_older_than(&self, retention: Duration) -> Result<u64, WebhookError> {
        let cutoff = Utc::now() - retention;
        let deleted = self.repository.delete_before(cutoff).await?;
        if deleted > 0 {
            info!(deleted, cutoff = %cutoff, "Purged processed webhook events");
        }
        Ok(deleted)
    }
}
