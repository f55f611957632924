//! Stripe REST adapter for the `PaymentProvider` port.
//!
//! Authenticates with the secret key via HTTP basic auth; request bodies are
//! form-encoded per Stripe's API conventions.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::warn;

use crate::domain::billing::{Expandable, SubscriptionObject};
use crate::ports::{CardPaymentMethod, PaymentError, PaymentProvider};

const DEFAULT_API_BASE: &str = "https://api.stripe.com/v1";

#[derive(Debug, Deserialize)]
struct Customer {
    #[serde(default)]
    invoice_settings: Option<InvoiceSettings>,
}

#[derive(Debug, Deserialize)]
struct InvoiceSettings {
    #[serde(default)]
    default_payment_method: Option<Expandable>,
}

#[derive(Debug, Deserialize)]
struct PaymentMethodList {
    #[serde(default)]
    data: Vec<CardPaymentMethod>,
}

pub struct StripeAdapter {
    client: Client,
    secret_key: SecretString,
    api_base: String,
}

impl StripeAdapter {
    pub fn new(client: Client, secret_key: SecretString) -> Self {
        Self {
            client,
            secret_key,
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    /// Points the adapter at a different API base, for tests against a stub
    /// server.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, PaymentError> {
        let response = self
            .client
            .get(format!("{}{}", self.api_base, path))
            .basic_auth(self.secret_key.expose_secret(), Option::<&str>::None)
            .query(query)
            .send()
            .await
            .map_err(|e| PaymentError::Request(e.to_string()))?;

        Self::parse_response(response).await
    }

    async fn post_form<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, PaymentError> {
        let response = self
            .client
            .post(format!("{}{}", self.api_base, path))
            .basic_auth(self.secret_key.expose_secret(), Option::<&str>::None)
            .form(params)
            .send()
            .await
            .map_err(|e| PaymentError::Request(e.to_string()))?;

        Self::parse_response(response).await
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, PaymentError> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "stripe api call failed");
            return Err(PaymentError::Api {
                status: status.as_u16(),
                message,
            });
        }
        response
            .json()
            .await
            .map_err(|e| PaymentError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl PaymentProvider for StripeAdapter {
    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<SubscriptionObject, PaymentError> {
        self.get_json(&format!("/subscriptions/{subscription_id}"), &[])
            .await
    }

    async fn customer_default_payment_method(
        &self,
        customer_id: &str,
    ) -> Result<Option<String>, PaymentError> {
        let customer: Customer = self.get_json(&format!("/customers/{customer_id}"), &[]).await?;
        Ok(customer
            .invoice_settings
            .and_then(|s| s.default_payment_method)
            .map(|pm| pm.id().to_string()))
    }

    async fn first_card_payment_method(
        &self,
        customer_id: &str,
    ) -> Result<Option<CardPaymentMethod>, PaymentError> {
        let list: PaymentMethodList = self
            .get_json(
                "/payment_methods",
                &[("customer", customer_id), ("type", "card"), ("limit", "1")],
            )
            .await?;
        Ok(list.data.into_iter().next())
    }

    async fn card_fingerprint(
        &self,
        payment_method_id: &str,
    ) -> Result<Option<String>, PaymentError> {
        let method: CardPaymentMethod = self
            .get_json(&format!("/payment_methods/{payment_method_id}"), &[])
            .await?;
        Ok(method.fingerprint().map(str::to_string))
    }

    async fn end_trial_now(&self, subscription_id: &str) -> Result<(), PaymentError> {
        let _: SubscriptionObject = self
            .post_form(
                &format!("/subscriptions/{subscription_id}"),
                &[("trial_end", "now"), ("cancel_at_period_end", "false")],
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn customer_parses_invoice_default() {
        let json = r#"{
            "id": "cus_1",
            "invoice_settings": { "default_payment_method": "pm_9" }
        }"#;

        let customer: Customer = serde_json::from_str(json).unwrap();
        let pm = customer
            .invoice_settings
            .and_then(|s| s.default_payment_method)
            .map(|pm| pm.id().to_string());
        assert_eq!(pm.as_deref(), Some("pm_9"));
    }

    #[test]
    fn customer_without_invoice_settings_parses() {
        let customer: Customer = serde_json::from_str(r#"{ "id": "cus_1" }"#).unwrap();
        assert!(customer.invoice_settings.is_none());
    }

    #[test]
    fn payment_method_list_parses_card_fingerprint() {
        let json = r#"{
            "object": "list",
            "data": [
                { "id": "pm_1", "card": { "fingerprint": "fp_abc", "brand": "visa" } }
            ]
        }"#;

        let list: PaymentMethodList = serde_json::from_str(json).unwrap();
        let first = list.data.into_iter().next().unwrap();
        assert_eq!(first.fingerprint(), Some("fp_abc"));
    }

    #[test]
    fn payment_method_without_card_has_no_fingerprint() {
        let method: CardPaymentMethod =
            serde_json::from_str(r#"{ "id": "pm_1", "type": "sepa_debit" }"#).unwrap();
        assert_eq!(method.fingerprint(), None);
    }
}
