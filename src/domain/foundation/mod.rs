//! Shared value objects for the billing domain.

mod errors;
mod ids;
mod timestamp;

pub use errors::StorageError;
pub use ids::UserId;
pub use timestamp::Timestamp;
