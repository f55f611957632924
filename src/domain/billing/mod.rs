//! Billing domain: subscription state, webhook events, and signature
//! verification.
//!
//! The domain layer is pure: it parses and classifies provider payloads and
//! decides state transitions, but performs no I/O. Ports and adapters carry
//! the database and Stripe API traffic.

mod errors;
mod event;
mod stripe_event;
mod subscription;
mod webhook_verifier;

pub use errors::WebhookError;
pub use event::{BillingEvent, CheckoutSession, Expandable, SubscriptionObject};
pub use stripe_event::{StripeEvent, StripeEventData};
pub use subscription::{
    grants_trial_use, Platform, ProviderSubscription, SubscriptionRecord, SubscriptionStatus,
};
pub use webhook_verifier::{SignatureHeader, WebhookVerifier};

#[cfg(test)]
pub use webhook_verifier::compute_test_signature;
