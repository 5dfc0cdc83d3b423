//! Stable request fingerprinting, used as both the result-cache key and the
//! audit record's primary key.
//!
//! Stability requirements (§8): the fingerprint must be invariant under key
//! order permutation and whitespace normalization of string fields. We get
//! this by building an explicit canonical form — a `BTreeMap` of already
//! normalized fields — rather than hashing caller-provided JSON, whose key
//! order and whitespace we don't control.

use std::collections::BTreeMap;

use bigdecimal::BigDecimal;
use sha2::{Digest, Sha256};

/// Canonicalize a ticker: trim, uppercase. Charset validation happens in
/// the orchestrator, which runs before fingerprinting.
pub fn canonical_ticker(ticker: &str) -> String {
    ticker.trim().to_ascii_uppercase()
}

pub fn canonical_client_id(client_id: &str) -> String {
    client_id.trim().to_string()
}

/// Fingerprint of a `compute_fee` request.
pub fn fee_request_fingerprint(
    client_id: &str,
    ticker: &str,
    position_value: &BigDecimal,
    loan_days: i64,
) -> String {
    let mut fields = BTreeMap::new();
    fields.insert("client_id", canonical_client_id(client_id));
    fields.insert("ticker", canonical_ticker(ticker));
    fields.insert("position_value", position_value.normalized().to_string());
    fields.insert("loan_days", loan_days.to_string());
    hash_fields(&fields)
}

/// Fingerprint of a `get_current_rate` request.
pub fn rate_request_fingerprint(ticker: &str) -> String {
    let mut fields = BTreeMap::new();
    fields.insert("ticker", canonical_ticker(ticker));
    hash_fields(&fields)
}

fn hash_fields(fields: &BTreeMap<&str, String>) -> String {
    let mut hasher = Sha256::new();
    for (key, value) in fields {
        hasher.update(key.as_bytes());
        hasher.update(b"=");
        hasher.update(value.as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn stable_under_whitespace_and_case() {
        let a = fee_request_fingerprint("client-1", "aapl", &BigDecimal::from_str("100000").unwrap(), 30);
        let b = fee_request_fingerprint(" client-1 ", " AAPL", &BigDecimal::from_str("100000.00").unwrap(), 30);
        assert_eq!(a, b);
    }

    #[test]
    fn differs_on_position_value() {
        let a = fee_request_fingerprint("client-1", "AAPL", &BigDecimal::from_str("100000").unwrap(), 30);
        let b = fee_request_fingerprint("client-1", "AAPL", &BigDecimal::from_str("100001").unwrap(), 30);
        assert_ne!(a, b);
    }
}
