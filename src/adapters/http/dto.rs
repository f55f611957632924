//! Wire shapes for the HTTP surface.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::handlers::billing::ReconcileOutcome;

/// Acknowledgment body for a processed webhook delivery. Always paired with
/// HTTP 200; the optional fields annotate how the event was resolved.
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub ok: bool,
    pub handled: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked_trial: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignored: Option<bool>,
}

impl From<ReconcileOutcome> for WebhookAck {
    fn from(outcome: ReconcileOutcome) -> Self {
        match outcome {
            ReconcileOutcome::Applied { event_type } => WebhookAck {
                ok: true,
                handled: event_type,
                blocked_trial: None,
                status: None,
                warning: None,
                ignored: None,
            },
            ReconcileOutcome::BlockedTrial { event_type, status } => WebhookAck {
                ok: true,
                handled: event_type,
                blocked_trial: Some(true),
                status: Some(status.as_str().to_string()),
                warning: None,
                ignored: None,
            },
            ReconcileOutcome::Unmapped {
                event_type,
                warning,
            } => WebhookAck {
                ok: true,
                handled: event_type,
                blocked_trial: None,
                status: None,
                warning: Some(warning),
                ignored: None,
            },
            ReconcileOutcome::Ignored { event_type } => WebhookAck {
                ok: true,
                handled: event_type,
                blocked_trial: None,
                status: None,
                warning: None,
                ignored: Some(true),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Deserialize)]
pub struct IosVerifyRequest {
    pub user_id: Uuid,
    pub product_id: String,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub active_product_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct IosVerifyResponse {
    pub ok: bool,
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::SubscriptionStatus;

    #[test]
    fn applied_ack_omits_annotations() {
        let ack = WebhookAck::from(ReconcileOutcome::Applied {
            event_type: "customer.subscription.updated".to_string(),
        });
        let json = serde_json::to_value(&ack).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "ok": true, "handled": "customer.subscription.updated" })
        );
    }

    #[test]
    fn blocked_trial_ack_carries_status() {
        let ack = WebhookAck::from(ReconcileOutcome::BlockedTrial {
            event_type: "checkout.session.completed".to_string(),
            status: SubscriptionStatus::Active,
        });
        let json = serde_json::to_value(&ack).unwrap();
        assert_eq!(json["blocked_trial"], true);
        assert_eq!(json["status"], "active");
    }

    #[test]
    fn ios_request_defaults_optional_fields() {
        let request: IosVerifyRequest = serde_json::from_str(
            r#"{ "user_id": "b1946ac9-2f5e-4a6b-9d3c-8e7f6a5b4c3d", "product_id": "premium_monthly" }"#,
        )
        .unwrap();
        assert!(request.transaction_id.is_none());
        assert!(request.active_product_ids.is_empty());
    }
}
