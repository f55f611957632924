//! Raw Stripe webhook event envelope.
//!
//! Only fields relevant to reconciliation are captured; the rest of Stripe's
//! event schema is ignored by serde.

use serde::{Deserialize, Serialize};

/// A verified Stripe webhook event.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEvent {
    /// Unique identifier for the event (evt_xxx).
    pub id: String,

    /// Event type string, e.g. "checkout.session.completed".
    #[serde(rename = "type")]
    pub event_type: String,

    /// Unix timestamp at which the provider created the event.
    pub created: i64,

    /// Event-specific payload.
    pub data: StripeEventData,

    /// Whether this is a live-mode event.
    #[serde(default)]
    pub livemode: bool,
}

/// Container for the polymorphic event payload.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEventData {
    /// The object that triggered the event; shape depends on `event_type`.
    pub object: serde_json::Value,
}

impl StripeEvent {
    /// Deserializes the payload object as the given type.
    pub fn deserialize_object<T: serde::de::DeserializeOwned>(
        &self,
    ) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.data.object.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_minimal_event() {
        let json = r#"{
            "id": "evt_1234567890",
            "type": "checkout.session.completed",
            "created": 1704067200,
            "data": { "object": {} },
            "livemode": false
        }"#;

        let event: StripeEvent = serde_json::from_str(json).unwrap();

        assert_eq!(event.id, "evt_1234567890");
        assert_eq!(event.event_type, "checkout.session.completed");
        assert_eq!(event.created, 1704067200);
        assert!(!event.livemode);
    }

    #[test]
    fn livemode_defaults_to_false() {
        let json = r#"{
            "id": "evt_x",
            "type": "ping",
            "created": 0,
            "data": { "object": {} }
        }"#;

        let event: StripeEvent = serde_json::from_str(json).unwrap();
        assert!(!event.livemode);
    }

    #[test]
    fn deserialize_object_to_typed_payload() {
        #[derive(Deserialize)]
        struct Session {
            id: String,
        }

        let json = r#"{
            "id": "evt_x",
            "type": "checkout.session.completed",
            "created": 0,
            "data": { "object": { "id": "cs_abc" } },
            "livemode": true
        }"#;

        let event: StripeEvent = serde_json::from_str(json).unwrap();
        let session: Session = event.deserialize_object().unwrap();
        assert_eq!(session.id, "cs_abc");
    }
}
