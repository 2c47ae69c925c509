//! Deterministic directive ids
//!
//! An id is a SHA-256 digest over instrument, side, entry price, the arrival
//! timestamp in nanoseconds and the registry's acceptance sequence number.
//! The sequence number keeps ids distinct for alerts that arrive within the
//! same clock tick.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use super::types::Directive;

/// Prefix carried by every generated id
pub const ID_PREFIX: &str = "sig_";

/// Number of hex characters kept from the digest
const ID_HEX_LEN: usize = 24;

/// Compute the fingerprint id for a directive that arrived at `arrived_at`
pub fn fingerprint(directive: &Directive, arrived_at: DateTime<Utc>, sequence: u64) -> String {
    let nanos = arrived_at
        .timestamp_nanos_opt()
        .unwrap_or_else(|| arrived_at.timestamp_micros().saturating_mul(1_000));

    let mut hasher = Sha256::new();
    hasher.update(directive.symbol.as_bytes());
    hasher.update(b"|");
    hasher.update(directive.side.to_string().as_bytes());
    hasher.update(b"|");
    hasher.update(directive.entry.price_target.normalize().to_string().as_bytes());
    hasher.update(b"|");
    hasher.update(nanos.to_be_bytes());
    hasher.update(sequence.to_be_bytes());
    let digest = hex::encode(hasher.finalize());

    format!("{}{}", ID_PREFIX, &digest[..ID_HEX_LEN])
}
