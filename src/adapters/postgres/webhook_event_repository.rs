//! PostgreSQL implementation of WebhookEventRepository.
//!
//! The primary key on `event_id` is the dedup boundary: two concurrent
//! deliveries of the same event both attempt the insert and exactly one
//! affects a row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::foundation::DomainError;
use crate::ports::{SaveResult, WebhookEventRecord, WebhookEventRepository};

pub struct PostgresWebhookEventRepository {
    pool: PgPool,
}

impl PostgresWebhookEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WebhookEventRepository for PostgresWebhookEventRepository {
    async fn exists(&self, event_id: &str) -> Result<bool, DomainError> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM webhook_events WHERE event_id = $1)")
                .bind(event_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| DomainError::database(format!("Failed to check webhook event: {}", e)))?;
        Ok(exists)
    }

    async fn save(&self, record: WebhookEventRecord) -> Result<SaveResult, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO webhook_events (event_id, topic, resource_id, raw_body, processed_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (event_id) DO NOTHING
            "#,
        )
        .bind(&record.event_id)
        .bind(&record.topic)
        .bind(&record.resource_id)
        .bind(&record.raw_body)
        .bind(record.processed_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to record webhook event: {}", e)))?;

        if result.rows_affected() == 0 {
            Ok(SaveResult::AlreadyExists)
        } else {
            Ok(SaveResult::Inserted)
        }
    }

    async fn delete_before(&self, timestamp: DateTime<Utc>) -> Result<u64, DomainError> {
        let result = sqlx::query("DELETE FROM webhook_events WHERE processed_at < $1")
            .bind(timestamp)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::database(format!("Failed to purge webhook events: {}", e)))?;
        Ok(result.rows_affected())
    }
}
