//! Redis pub/sub publisher for outbound billing events.
//!
//! Each envelope is serialized to JSON and `PUBLISH`ed on a single channel.
//! Subscribers that are offline miss the message; the approval itself is
//! already committed, so a lost publish is logged and not retried here.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use crate::domain::foundation::{DomainError, ErrorCode, EventEnvelope};
use crate::ports::EventPublisher;

/// Channel downstream consumers subscribe to for approved payments.
pub const PAYMENT_APPROVED_CHANNEL: &str = "payment-approved-event-topic";

#[derive(Clone)]
pub struct RedisEventPublisher {
    conn: MultiplexedConnection,
    channel: String,
}

impl RedisEventPublisher {
    pub fn new(conn: MultiplexedConnection) -> Self {
        Self::with_channel(conn, PAYMENT_APPROVED_CHANNEL)
    }

    pub fn with_channel(conn: MultiplexedConnection, channel: impl Into<String>) -> Self {
        Self {
            conn,
            channel: channel.into(),
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }
}

/// Serializes an envelope to the JSON message body.
pub(crate) fn encode_envelope(event: &EventEnvelope) -> Result<String, DomainError> {
    serde_json::to_string(event).map_err(|e| {
        DomainError::new(
            ErrorCode::PublishFailed,
            format!("Failed to serialize {}: {}", event.event_type, e),
        )
    })
}

#[async_trait]
impl EventPublisher for RedisEventPublisher {
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError> {
        let message = encode_envelope(&event)?;
        let mut conn = self.conn.clone();

        let receivers: i64 = conn
            .publish(&self.channel, message)
            .await
            .map_err(|e: redis::RedisError| {
                DomainError::new(ErrorCode::PublishFailed, format!("Redis publish failed: {}", e))
            })?;

        tracing::debug!(
            event_id = %event.event_id,
            event_type = %event.event_type,
            channel = %self.channel,
            receivers,
            "Published event"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{EventId, EventMetadata, Timestamp};

    #[test]
    fn encodes_envelope_as_json_object() {
        let envelope = EventEnvelope {
            event_id: EventId::from_string("evt-7"),
            event_type: "payment.approved.v1".to_string(),
            schema_version: 1,
            aggregate_id: "p-1".to_string(),
            aggregate_type: "Payment".to_string(),
            occurred_at: Timestamp::now(),
            payload: serde_json::json!({ "amount": "50.00" }),
            metadata: EventMetadata::default(),
        };

        let body = encode_envelope(&envelope).unwrap();
        let decoded: serde_json::Value = serde_json::from_str(&body).unwrap();

        assert_eq!(decoded["event_id"], "evt-7");
        assert_eq!(decoded["event_type"], "payment.approved.v1");
        assert_eq!(decoded["payload"]["amount"], "50.00");
    }
}
