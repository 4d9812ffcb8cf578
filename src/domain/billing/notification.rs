//! Parsed gateway webhook body.
//!
//! The gateway sends several notification shapes. Only a few fields matter:
//! an optional top-level `id`, a topic (`topic` or `type`), and the id of
//! the resource the notification is about (`data.id`, `resource.id`, or the
//! top-level `id`).

use serde_json::Value;

use super::WebhookError;
use crate::domain::foundation::GatewayPaymentId;

/// Topic recorded when the body names none.
pub const UNKNOWN_TOPIC: &str = "unknown";

/// A webhook body that parsed as JSON.
#[derive(Debug, Clone)]
pub struct WebhookNotification {
    root: Value,
}

impl WebhookNotification {
    /// Parses the raw body. Anything that is not JSON is a `ParseError`.
    pub fn parse(raw_body: &[u8]) -> Result<Self, WebhookError> {
        let root = serde_json::from_slice(raw_body)
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;
        Ok(Self { root })
    }

    /// Top-level `id`, if present.
    pub fn explicit_event_id(&self) -> Option<String> {
        text(self.root.get("id"))
    }

    /// `topic`, else `type`, else `"unknown"`.
    pub fn topic(&self) -> String {
        text(self.root.get("topic"))
            .or_else(|| text(self.root.get("type")))
            .unwrap_or_else(|| UNKNOWN_TOPIC.to_string())
    }

    /// `data.id`, else `resource.id`, else top-level `id`.
    pub fn resource_id(&self) -> Option<String> {
        text(self.root.get("data").and_then(|data| data.get("id")))
            .or_else(|| text(self.root.get("resource").and_then(|r| r.get("id"))))
            .or_else(|| self.explicit_event_id())
    }

    /// Gateway payment id the notification refers to.
    pub fn gateway_payment_id(&self) -> Option<GatewayPaymentId> {
        self.resource_id()
            .and_then(|id| GatewayPaymentId::new(id).ok())
    }

    /// Dedup key: the explicit id, else `"{topic}:{resource_id}"`.
    ///
    /// `None` when neither can be derived; such notifications are ignored.
    pub fn event_key(&self) -> Option<String> {
        self.explicit_event_id().or_else(|| {
            self.resource_id()
                .map(|resource_id| format!("{}:{}", self.topic(), resource_id))
        })
    }
}

/// Scalar JSON value as text; null, blank and compound values read as absent.
fn text(value: Option<&Value>) -> Option<String> {
    let raw = match value? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    if raw.is_empty() {
        None
    } else {
        Some(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> WebhookNotification {
        WebhookNotification::parse(body.as_bytes()).unwrap()
    }

    #[test]
    fn explicit_id_is_the_event_key() {
        let n = parse(r#"{"id":"evt-42","type":"payment","data":{"id":"123"}}"#);
        assert_eq!(n.event_key().as_deref(), Some("evt-42"));
    }

    #[test]
    fn numeric_explicit_id_is_stringified() {
        let n = parse(r#"{"id":987654,"type":"payment","data":{"id":"123"}}"#);
        assert_eq!(n.event_key().as_deref(), Some("987654"));
    }

    #[test]
    fn composite_key_uses_topic_and_data_id() {
        let n = parse(r#"{"topic":"payment","data":{"id":"123"}}"#);
        assert_eq!(n.event_key().as_deref(), Some("payment:123"));
    }

    #[test]
    fn topic_prefers_topic_over_type() {
        let n = parse(r#"{"topic":"merchant_order","type":"payment"}"#);
        assert_eq!(n.topic(), "merchant_order");
    }

    #[test]
    fn topic_defaults_to_unknown() {
        let n = parse(r#"{"resource":{"id":"55"}}"#);
        assert_eq!(n.topic(), UNKNOWN_TOPIC);
        assert_eq!(n.event_key().as_deref(), Some("unknown:55"));
    }

    #[test]
    fn resource_id_falls_back_in_order() {
        assert_eq!(
            parse(r#"{"data":{"id":"1"},"resource":{"id":"2"},"id":"3"}"#).resource_id().as_deref(),
            Some("1")
        );
        assert_eq!(
            parse(r#"{"resource":{"id":"2"},"id":"3"}"#).resource_id().as_deref(),
            Some("2")
        );
        assert_eq!(parse(r#"{"id":"3"}"#).resource_id().as_deref(), Some("3"));
    }

    #[test]
    fn resource_url_string_is_not_an_id() {
        let n = parse(r#"{"topic":"payment","resource":"https://api.example.com/v1/payments/9"}"#);
        assert_eq!(n.resource_id(), None);
        assert_eq!(n.event_key(), None);
    }

    #[test]
    fn nothing_derivable_yields_no_key() {
        let n = parse(r#"{"type":"payment","action":"payment.updated"}"#);
        assert_eq!(n.event_key(), None);
        assert_eq!(n.gateway_payment_id(), None);
    }

    #[test]
    fn blank_and_null_ids_are_absent() {
        let n = parse(r#"{"id":null,"type":"payment","data":{"id":"  "}}"#);
        assert_eq!(n.explicit_event_id(), None);
        assert_eq!(n.resource_id(), None);
    }

    #[test]
    fn gateway_payment_id_comes_from_resource() {
        let n = parse(r#"{"id":"evt-1","data":{"id":123456}}"#);
        assert_eq!(n.gateway_payment_id().unwrap().as_str(), "123456");
    }

    #[test]
    fn non_json_body_is_parse_error() {
        let err = WebhookNotification::parse(b"id=1&topic=payment").unwrap_err();
        assert!(matches!(err, WebhookError::ParseError(_)));
    }
}
