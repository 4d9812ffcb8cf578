//! Event infrastructure for domain event publishing.
//!
//! - `EventId` - Unique identifier for events (deduplication downstream)
//! - `EventEnvelope` - Transport wrapper for domain events
//! - `DomainEvent` - Trait that all domain events implement
//! - `domain_event!` - Macro to simplify DomainEvent implementations

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use uuid::Uuid;

use super::Timestamp;

/// Trait that all domain events must implement.
pub trait DomainEvent: Send + Sync {
    /// Event type string with version suffix (e.g., "payment.approved.v1").
    fn event_type(&self) -> &'static str;

    /// Schema version number, matching the suffix in `event_type`.
    fn schema_version(&self) -> u32;

    /// ID of the aggregate that emitted this event.
    fn aggregate_id(&self) -> String;

    /// Type of aggregate (e.g., "Payment").
    fn aggregate_type(&self) -> &'static str;

    /// When the event occurred.
    fn occurred_at(&self) -> Timestamp;

    /// Unique ID for this event instance.
    fn event_id(&self) -> EventId;
}

/// Implements `DomainEvent` by pointing at fields of the event struct.
///
/// ```ignore
/// domain_event!(
///     PaymentApproved,
///     event_type = "payment.approved.v1",
///     schema_version = 1,
///     aggregate_id = payment_id,
///     aggregate_type = "Payment",
///     occurred_at = occurred_at,
///     event_id = event_id
/// );
/// ```
#[macro_export]
macro_rules! domain_event {
    (
        $event_name:ident,
        event_type = $event_type:expr,
        schema_version = $schema_version:expr,
        aggregate_id = $agg_id_field:ident,
        aggregate_type = $agg_type:expr,
        occurred_at = $occurred_field:ident,
        event_id = $event_id_field:ident
    ) => {
        impl $crate::domain::foundation::DomainEvent for $event_name {
            fn event_type(&self) -> &'static str {
                $event_type
            }

            fn schema_version(&self) -> u32 {
                $schema_version
            }

            fn aggregate_id(&self) -> String {
                self.$agg_id_field.to_string()
            }

            fn aggregate_type(&self) -> &'static str {
                $agg_type
            }

            fn occurred_at(&self) -> $crate::domain::foundation::Timestamp {
                self.$occurred_field
            }

            fn event_id(&self) -> $crate::domain::foundation::EventId {
                self.$event_id_field.clone()
            }
        }
    };
}

pub use domain_event;

/// Unique identifier for events.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    /// Creates a new random EventId using UUID v4.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Creates an EventId from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Returns the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tracing context carried alongside the payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// Transport envelope for domain events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event_id: EventId,
    pub event_type: String,
    pub schema_version: u32,
    pub aggregate_id: String,
    pub aggregate_type: String,
    pub occurred_at: Timestamp,
    pub payload: JsonValue,
    pub metadata: EventMetadata,
}

impl EventEnvelope {
    /// Creates an envelope from a domain event, serializing it as the payload.
    pub fn from_event<T>(event: &T) -> Result<Self, serde_json::Error>
    where
        T: DomainEvent + Serialize,
    {
        let event_type = event.event_type().to_string();
        let schema_version = Self::extract_version(&event_type);

        Ok(Self {
            event_id: event.event_id(),
            event_type,
            schema_version,
            aggregate_id: event.aggregate_id(),
            aggregate_type: event.aggregate_type().to_string(),
            occurred_at: event.occurred_at(),
            payload: serde_json::to_value(event)?,
            metadata: EventMetadata::default(),
        })
    }

    /// "payment.approved.v2" → 2; missing suffix → 1.
    pub(crate) fn extract_version(event_type: &str) -> u32 {
        event_type
            .rsplit_once(".v")
            .and_then(|(_, version_str)| version_str.parse::<u32>().ok())
            .unwrap_or(1)
    }

    /// Add user ID for audit.
    pub fn with_user_id(mut self, id: impl Into<String>) -> Self {
        self.metadata.user_id = Some(id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct InvoiceIssued {
        event_id: EventId,
        invoice_id: String,
        total: u32,
        issued_at: Timestamp,
    }

    domain_event!(
        InvoiceIssued,
        event_type = "invoice.issued.v2",
        schema_version = 2,
        aggregate_id = invoice_id,
        aggregate_type = "Invoice",
        occurred_at = issued_at,
        event_id = event_id
    );

    fn issued() -> InvoiceIssued {
        InvoiceIssued {
            event_id: EventId::from_string("evt-1"),
            invoice_id: "inv-9".to_string(),
            total: 42,
            issued_at: Timestamp::now(),
        }
    }

    #[test]
    fn event_id_generates_unique_values() {
        assert_ne!(EventId::new(), EventId::new());
    }

    #[test]
    fn extract_version_reads_suffix() {
        assert_eq!(EventEnvelope::extract_version("payment.approved.v1"), 1);
        assert_eq!(EventEnvelope::extract_version("payment.approved.v12"), 12);
        assert_eq!(EventEnvelope::extract_version("legacy"), 1);
    }

    #[test]
    fn from_event_copies_routing_fields() {
        let event = issued();
        let envelope = EventEnvelope::from_event(&event).unwrap();

        assert_eq!(envelope.event_id.as_str(), "evt-1");
        assert_eq!(envelope.event_type, "invoice.issued.v2");
        assert_eq!(envelope.schema_version, 2);
        assert_eq!(envelope.aggregate_id, "inv-9");
        assert_eq!(envelope.aggregate_type, "Invoice");
    }

    #[test]
    fn envelope_carries_payload_and_user() {
        let event = issued();
        let envelope = EventEnvelope::from_event(&event).unwrap().with_user_id("user-1");

        assert_eq!(envelope.payload["invoice_id"], "inv-9");
        assert_eq!(envelope.payload["total"], 42);
        assert_eq!(envelope.metadata.user_id.as_deref(), Some("user-1"));
        assert!(envelope.metadata.correlation_id.is_none());
    }
}
