//! Port traits: the seams between application logic and the outside world.
//!
//! Adapters implement these against Postgres and the Stripe REST API; tests
//! implement them with in-memory mocks.

mod fingerprint_ledger;
mod payment_provider;
mod subscription_store;
mod user_directory;

pub use fingerprint_ledger::{FingerprintEntry, FingerprintLedger};
pub use payment_provider::{CardDetails, CardPaymentMethod, PaymentError, PaymentProvider};
pub use subscription_store::SubscriptionStore;
pub use user_directory::UserDirectory;
