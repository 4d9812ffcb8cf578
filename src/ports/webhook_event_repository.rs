//! WebhookEventRepository port - tracking of processed gateway webhooks.
//!
//! The gateway redelivers notifications on timeouts and non-2xx answers,
//! so the same event id can arrive many times and concurrently. A row per
//! event id is the only dedup signal; rows are never updated.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::foundation::DomainError;

/// Record of a processed webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookEventRecord {
    /// Dedup key derived from the payload.
    pub event_id: String,

    pub topic: String,

    /// Id of the resource the notification referred to, if any.
    pub resource_id: Option<String>,

    /// Body exactly as received, for audit.
    pub raw_body: String,

    pub processed_at: DateTime<Utc>,
}

impl WebhookEventRecord {
    pub fn new(
        event_id: impl Into<String>,
        topic: impl Into<String>,
        resource_id: Option<String>,
        raw_body: impl Into<String>,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            topic: topic.into(),
            resource_id,
            raw_body: raw_body.into(),
            processed_at: Utc::now(),
        }
    }
}

/// Result of attempting to save a webhook event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveResult {
    /// Record was inserted (first time seeing this event).
    Inserted,
    /// Record already exists (duplicate event).
    AlreadyExists,
}

/// Port for storing processed webhook events.
///
/// Implementations should use database constraints (PRIMARY KEY on event_id)
/// to prevent race conditions during concurrent webhook processing.
#[async_trait]
pub trait WebhookEventRepository: Send + Sync {
    async fn exists(&self, event_id: &str) -> Result<bool, DomainError>;

    /// Inserts with `ON CONFLICT DO NOTHING` semantics.
    async fn save(&self, record: WebhookEventRecord) -> Result<SaveResult, DomainError>;

    /// Deletes records processed before `timestamp`; returns how many.
    async fn delete_before(&self, timestamp: DateTime<Utc>) -> Result<u64, DomainError>;
}
