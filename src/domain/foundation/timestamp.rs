//! Timestamp value object for immutable points in time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Immutable point in time, always UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a timestamp for the current moment.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a timestamp from a DateTime<Utc>.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Creates a timestamp from Unix seconds (the provider's wire format).
    ///
    /// Returns `None` for values outside chrono's representable range.
    pub fn from_unix(secs: i64) -> Option<Self> {
        DateTime::from_timestamp(secs, 0).map(Self)
    }

    /// Returns the inner DateTime.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Returns Unix seconds.
    pub fn unix(&self) -> i64 {
        self.0.timestamp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_unix_roundtrips() {
        let ts = Timestamp::from_unix(1_704_067_200).unwrap();
        assert_eq!(ts.unix(), 1_704_067_200);
    }

    #[test]
    fn from_unix_rejects_out_of_range() {
        assert!(Timestamp::from_unix(i64::MAX).is_none());
    }

    #[test]
    fn ordering_follows_time() {
        let earlier = Timestamp::from_unix(1_000).unwrap();
        let later = Timestamp::from_unix(2_000).unwrap();
        assert!(earlier < later);
    }
}
