//! FlashDeck billing service.
//!
//! Receives Stripe billing-lifecycle webhooks, verifies their signatures,
//! and reconciles them onto durable subscription state in PostgreSQL,
//! enforcing a one-trial-per-card policy via a payment-instrument
//! fingerprint ledger.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
