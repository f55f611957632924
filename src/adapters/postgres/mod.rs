mod fingerprint_ledger;
mod subscription_store;
mod user_directory;

pub use fingerprint_ledger::PostgresFingerprintLedger;
pub use subscription_store::PostgresSubscriptionStore;
pub use user_directory::PostgresUserDirectory;
