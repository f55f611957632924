//! Webhook processing error taxonomy.
//!
//! The split matters for retry behavior at the HTTP boundary: signature and
//! parse failures are answered with a client error so the provider does not
//! redeliver a payload that can never succeed, while storage and
//! corrective-action failures are answered with a server error so the
//! provider's at-least-once delivery retries them.

use thiserror::Error;

use crate::domain::foundation::StorageError;

/// Errors that abort processing of a webhook delivery.
#[derive(Debug, Clone, Error)]
pub enum WebhookError {
    /// The signature header was missing, malformed, expired, or did not
    /// match the payload. Never retried by design.
    #[error("signature verification failed: {0}")]
    Signature(String),

    /// The payload was not valid JSON or did not match the shape its event
    /// type promises.
    #[error("payload parse failed: {0}")]
    Parse(String),

    /// A durable-store upsert or lookup failed. Safe to retry: every write
    /// is an idempotent upsert.
    #[error("storage failure: {0}")]
    Storage(String),

    /// A read against the payment provider's API failed. Safe to retry.
    #[error("payment provider failure: {0}")]
    Provider(String),

    /// The force-end-trial command against the provider failed. Must be
    /// retried; leaving an abusive trial running is the harm this service
    /// exists to prevent.
    #[error("corrective action failed: {0}")]
    CorrectiveAction(String),
}

impl From<StorageError> for WebhookError {
    fn from(err: StorageError) -> Self {
        WebhookError::Storage(err.to_string())
    }
}

impl WebhookError {
    /// True when the HTTP boundary should answer with a client error (4xx),
    /// signalling the provider not to redeliver.
    pub fn is_client_error(&self) -> bool {
        matches!(self, WebhookError::Signature(_) | WebhookError::Parse(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_and_parse_are_client_errors() {
        assert!(WebhookError::Signature("bad".into()).is_client_error());
        assert!(WebhookError::Parse("bad".into()).is_client_error());
    }

    #[test]
    fn storage_and_corrective_are_server_errors() {
        assert!(!WebhookError::Storage("down".into()).is_client_error());
        assert!(!WebhookError::Provider("timeout".into()).is_client_error());
        assert!(!WebhookError::CorrectiveAction("api".into()).is_client_error());
    }

    #[test]
    fn storage_error_converts() {
        let err: WebhookError = StorageError::Database("conn refused".into()).into();
        assert!(matches!(err, WebhookError::Storage(_)));
    }
}
