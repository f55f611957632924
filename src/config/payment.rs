use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Stripe secret API key (sk_...).
    pub stripe_secret_key: SecretString,
    /// Webhook endpoint signing secret (whsec_...).
    pub stripe_webhook_secret: SecretString,
}

impl PaymentConfig {
    pub(super) fn validate(&self) -> Result<(), ValidationError> {
        if !self.stripe_secret_key.expose_secret().starts_with("sk_") {
            return Err(ValidationError::invalid(
                "payment.stripe_secret_key",
                "must start with sk_",
            ));
        }
        if !self
            .stripe_webhook_secret
            .expose_secret()
            .starts_with("whsec_")
        {
            return Err(ValidationError::invalid(
                "payment.stripe_webhook_secret",
                "must start with whsec_",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(secret_key: &str, webhook_secret: &str) -> PaymentConfig {
        PaymentConfig {
            stripe_secret_key: SecretString::new(secret_key.to_string()),
            stripe_webhook_secret: SecretString::new(webhook_secret.to_string()),
        }
    }

    #[test]
    fn well_formed_keys_validate() {
        assert!(config("sk_test_123", "whsec_123").validate().is_ok());
    }

    #[test]
    fn swapped_keys_are_rejected() {
        assert!(config("whsec_123", "sk_test_123").validate().is_err());
    }

    #[test]
    fn publishable_key_is_rejected() {
        assert!(config("pk_test_123", "whsec_123").validate().is_err());
    }
}
