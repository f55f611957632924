//! Stripe webhook signature verification.
//!
//! HMAC-SHA256 over `{timestamp}.{raw body}` with constant-time comparison
//! and a timestamp window to reject replays. Verification is pure CPU work
//! and happens before any side effect.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::errors::WebhookError;
use super::stripe_event::StripeEvent;

type HmacSha256 = Hmac<Sha256>;

/// Maximum allowed age for a delivery (5 minutes).
const MAX_EVENT_AGE_SECS: i64 = 300;

/// Tolerance for signatures timestamped in the future (clock skew).
const MAX_CLOCK_SKEW_SECS: i64 = 60;

/// Parsed `Stripe-Signature` header: `t=<unix>,v1=<hex>[,...]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    pub timestamp: i64,
    pub v1_signature: Vec<u8>,
}

impl SignatureHeader {
    /// Parses the signature header, ignoring scheme fields we do not know
    /// (Stripe reserves the right to add them).
    pub fn parse(header: &str) -> Result<Self, WebhookError> {
        let mut timestamp: Option<i64> = None;
        let mut v1_signature: Option<Vec<u8>> = None;

        for part in header.split(',') {
            let (key, value) = part.split_once('=').ok_or_else(|| {
                WebhookError::Signature("malformed signature header".to_string())
            })?;

            match key {
                "t" => {
                    timestamp = Some(value.parse().map_err(|_| {
                        WebhookError::Signature("invalid timestamp in header".to_string())
                    })?);
                }
                "v1" => {
                    v1_signature = Some(hex::decode(value).map_err(|_| {
                        WebhookError::Signature("v1 signature is not valid hex".to_string())
                    })?);
                }
                _ => {}
            }
        }

        Ok(SignatureHeader {
            timestamp: timestamp.ok_or_else(|| {
                WebhookError::Signature("missing timestamp in header".to_string())
            })?,
            v1_signature: v1_signature.ok_or_else(|| {
                WebhookError::Signature("missing v1 signature in header".to_string())
            })?,
        })
    }
}

/// Verifies webhook deliveries against the endpoint's signing secret.
pub struct WebhookVerifier {
    secret: SecretString,
}

impl WebhookVerifier {
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    /// Verifies the signature over the exact raw payload bytes and parses
    /// the event envelope.
    ///
    /// # Errors
    ///
    /// - `Signature` for a malformed header, stale or future timestamp, or
    ///   a mismatched MAC
    /// - `Parse` when the verified payload is not a valid event envelope
    pub fn verify_and_parse(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<StripeEvent, WebhookError> {
        let header = SignatureHeader::parse(signature_header)?;
        self.check_timestamp(header.timestamp)?;

        let expected = self.compute_mac(header.timestamp, payload);
        if !constant_time_eq(&expected, &header.v1_signature) {
            return Err(WebhookError::Signature("signature mismatch".to_string()));
        }

        serde_json::from_slice(payload)
            .map_err(|e| WebhookError::Parse(format!("invalid event envelope: {e}")))
    }

    fn check_timestamp(&self, timestamp: i64) -> Result<(), WebhookError> {
        let age = chrono::Utc::now().timestamp() - timestamp;

        if age > MAX_EVENT_AGE_SECS {
            return Err(WebhookError::Signature(format!(
                "event too old ({age}s); possible replay"
            )));
        }
        if age < -MAX_CLOCK_SKEW_SECS {
            return Err(WebhookError::Signature(
                "event timestamp in the future".to_string(),
            ));
        }
        Ok(())
    }

    fn compute_mac(&self, timestamp: i64, payload: &[u8]) -> Vec<u8> {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        mac.finalize().into_bytes().to_vec()
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Builds a valid signature header for test fixtures.
#[cfg(test)]
pub fn compute_test_signature(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key");
    mac.update(format!("{timestamp}.").as_bytes());
    mac.update(payload);
    format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_SECRET: &str = "whsec_test_secret_12345";

    fn verifier() -> WebhookVerifier {
        WebhookVerifier::new(SecretString::new(TEST_SECRET.to_string()))
    }

    const VALID_PAYLOAD: &str = r#"{
        "id": "evt_test123",
        "type": "checkout.session.completed",
        "created": 1704067200,
        "data": { "object": {} },
        "livemode": false
    }"#;

    #[test]
    fn header_parses_with_v1_only() {
        let hex_sig = "a".repeat(64);
        let header = SignatureHeader::parse(&format!("t=1234567890,v1={hex_sig}")).unwrap();

        assert_eq!(header.timestamp, 1234567890);
        assert_eq!(header.v1_signature.len(), 32);
    }

    #[test]
    fn header_ignores_unknown_schemes() {
        let hex_sig = "a".repeat(64);
        let header =
            SignatureHeader::parse(&format!("t=1234567890,v1={hex_sig},v0=legacy,x=y")).unwrap();
        assert_eq!(header.timestamp, 1234567890);
    }

    #[test]
    fn header_missing_timestamp_fails() {
        let hex_sig = "a".repeat(64);
        let result = SignatureHeader::parse(&format!("v1={hex_sig}"));
        assert!(matches!(result, Err(WebhookError::Signature(_))));
    }

    #[test]
    fn header_missing_v1_fails() {
        let result = SignatureHeader::parse("t=1234567890");
        assert!(matches!(result, Err(WebhookError::Signature(_))));
    }

    #[test]
    fn header_bad_hex_fails() {
        let result = SignatureHeader::parse("t=1234567890,v1=zz_not_hex");
        assert!(matches!(result, Err(WebhookError::Signature(_))));
    }

    #[test]
    fn valid_signature_verifies_and_parses() {
        let now = chrono::Utc::now().timestamp();
        let header = compute_test_signature(TEST_SECRET, now, VALID_PAYLOAD.as_bytes());

        let event = verifier()
            .verify_and_parse(VALID_PAYLOAD.as_bytes(), &header)
            .unwrap();

        assert_eq!(event.id, "evt_test123");
        assert_eq!(event.event_type, "checkout.session.completed");
    }

    #[test]
    fn corrupted_signature_is_rejected() {
        let now = chrono::Utc::now().timestamp();
        let header = format!("t={now},v1={}", "a".repeat(64));

        let result = verifier().verify_and_parse(VALID_PAYLOAD.as_bytes(), &header);
        assert!(matches!(result, Err(WebhookError::Signature(_))));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let now = chrono::Utc::now().timestamp();
        let header = compute_test_signature("whsec_other", now, VALID_PAYLOAD.as_bytes());

        let result = verifier().verify_and_parse(VALID_PAYLOAD.as_bytes(), &header);
        assert!(matches!(result, Err(WebhookError::Signature(_))));
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let now = chrono::Utc::now().timestamp();
        let header = compute_test_signature(TEST_SECRET, now, VALID_PAYLOAD.as_bytes());
        let tampered = VALID_PAYLOAD.replace("evt_test123", "evt_forged");

        let result = verifier().verify_and_parse(tampered.as_bytes(), &header);
        assert!(matches!(result, Err(WebhookError::Signature(_))));
    }

    #[test]
    fn stale_timestamp_is_rejected() {
        let stale = chrono::Utc::now().timestamp() - MAX_EVENT_AGE_SECS - 1;
        let header = compute_test_signature(TEST_SECRET, stale, VALID_PAYLOAD.as_bytes());

        let result = verifier().verify_and_parse(VALID_PAYLOAD.as_bytes(), &header);
        assert!(matches!(result, Err(WebhookError::Signature(_))));
    }

    #[test]
    fn boundary_timestamp_is_accepted() {
        let boundary = chrono::Utc::now().timestamp() - MAX_EVENT_AGE_SECS;
        let header = compute_test_signature(TEST_SECRET, boundary, VALID_PAYLOAD.as_bytes());

        assert!(verifier()
            .verify_and_parse(VALID_PAYLOAD.as_bytes(), &header)
            .is_ok());
    }

    #[test]
    fn future_timestamp_within_skew_is_accepted() {
        let near_future = chrono::Utc::now().timestamp() + 30;
        let header = compute_test_signature(TEST_SECRET, near_future, VALID_PAYLOAD.as_bytes());

        assert!(verifier()
            .verify_and_parse(VALID_PAYLOAD.as_bytes(), &header)
            .is_ok());
    }

    #[test]
    fn far_future_timestamp_is_rejected() {
        let far_future = chrono::Utc::now().timestamp() + MAX_CLOCK_SKEW_SECS + 60;
        let header = compute_test_signature(TEST_SECRET, far_future, VALID_PAYLOAD.as_bytes());

        let result = verifier().verify_and_parse(VALID_PAYLOAD.as_bytes(), &header);
        assert!(matches!(result, Err(WebhookError::Signature(_))));
    }

    #[test]
    fn valid_signature_over_invalid_json_is_a_parse_error() {
        let payload = b"not json at all";
        let now = chrono::Utc::now().timestamp();
        let header = compute_test_signature(TEST_SECRET, now, payload);

        let result = verifier().verify_and_parse(payload, &header);
        assert!(matches!(result, Err(WebhookError::Parse(_))));
    }
}
