//! Billing command handlers: webhook reconciliation and the iOS
//! subscription upsert.

mod reconcile_webhook;
mod verify_ios;

pub use reconcile_webhook::{ReconcileOutcome, ReconcileWebhookHandler};
pub use verify_ios::{VerifyIosCommand, VerifyIosHandler};
