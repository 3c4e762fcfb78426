//! Audit trail helpers
//!
//! The "blockchain" hash is a truncated SHA-256 standing in for a ledger
//! entry; nothing is anchored anywhere.

use crate::domain::record::AuditTrail;
use sha2::{Digest, Sha256};

/// Hex characters kept from the digest
const HASH_HEX_LEN: usize = 16;

pub const COMPLIANCE_VERIFIED: &str = "verified";

/// `0x` + first 16 hex chars of SHA-256(parcel_id + timestamp). Pure.
pub fn create_blockchain_hash(parcel_id: &str, timestamp: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(parcel_id.as_bytes());
    hasher.update(timestamp.as_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("0x{}", &digest[..HASH_HEX_LEN])
}

/// Fixed three-step custody chain
pub fn custody_chain(driver_number: u32) -> Vec<String> {
    vec!["warehouse".to_string(), format!("driver_{driver_number}"), "pending".to_string()]
}

pub fn build_audit_trail(parcel_id: &str, timestamp: &str, driver_number: u32) -> AuditTrail {
    AuditTrail {
        blockchain_hash: create_blockchain_hash(parcel_id, timestamp),
        chain_of_custody: custody_chain(driver_number),
        anomalies_detected: Vec::new(),
        compliance_status: COMPLIANCE_VERIFIED.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_shape() {
        let hash = create_blockchain_hash("PRC-20260101-000001", "2026-01-01T00:00:00.000000Z");
        assert_eq!(hash.len(), 18);
        assert!(hash.starts_with("0x"));
        assert!(hash[2..].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_hash_deterministic() {
        let a = create_blockchain_hash("PKG-1", "2026-01-01T00:00:00.000000Z");
        let b = create_blockchain_hash("PKG-1", "2026-01-01T00:00:00.000000Z");
        let c = create_blockchain_hash("PKG-1", "2026-01-01T00:00:01.000000Z");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_hash_is_over_concatenation() {
        // sha256("abc") = ba7816bf8f01cfea...
        assert_eq!(create_blockchain_hash("ab", "c"), "0xba7816bf8f01cfea");
        assert_eq!(create_blockchain_hash("a", "bc"), create_blockchain_hash("ab", "c"));
    }

    #[test]
    fn test_audit_trail() {
        let trail = build_audit_trail("PKG-1", "ts", 417);
        assert_eq!(trail.chain_of_custody, vec!["warehouse", "driver_417", "pending"]);
        assert!(trail.anomalies_detected.is_empty());
        assert_eq!(trail.compliance_status, "verified");
    }
}
