//! Query certificates: short-lived, read-only authorization for dry runs.
//!
//! A certificate binds an account to query rights against the cluster. It
//! is signed once per session by the account and attached, unchanged, to
//! every non-mutating query of that session.

use serde::{Serialize, Serializer};

use crate::crypto::{verify_ed25519, Account};
use crate::types::{to_hex, Address};

/// Domain separator prepended to the signed certificate body.
const CERTIFICATE_DOMAIN: &[u8] = b"deploykit/query-certificate/v1";

/// Authorization for read-only cluster queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryCertificate {
    #[serde(serialize_with = "serialize_hex")]
    pub address: Address,
    #[serde(serialize_with = "serialize_hex")]
    pub public_key: [u8; 32],
    /// Unix time (seconds) at which the certificate was signed.
    pub issued_at: u64,
    /// Lifetime in seconds from `issued_at`.
    pub ttl_secs: u64,
    #[serde(serialize_with = "serialize_hex")]
    pub signature: [u8; 64],
}

impl QueryCertificate {
    /// Sign a certificate for `account`, valid for `ttl_secs` from `now`.
    pub fn sign(account: &Account, now: u64, ttl_secs: u64) -> Self {
        let address = account.address();
        let body = signed_body(&address, now, ttl_secs);
        Self {
            address,
            public_key: account.public_key(),
            issued_at: now,
            ttl_secs,
            signature: account.sign(&body),
        }
    }

    /// Check the signature and that the key matches the bound address.
    pub fn verify(&self) -> bool {
        if self.public_key != self.address {
            return false;
        }
        let body = signed_body(&self.address, self.issued_at, self.ttl_secs);
        verify_ed25519(&body, &self.signature, &self.public_key)
    }

    /// Unix time after which the certificate is no longer accepted.
    pub fn expires_at(&self) -> u64 {
        self.issued_at.saturating_add(self.ttl_secs)
    }

    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.expires_at()
    }
}

fn signed_body(address: &Address, issued_at: u64, ttl_secs: u64) -> Vec<u8> {
    let mut body = Vec::with_capacity(CERTIFICATE_DOMAIN.len() + 32 + 16);
    body.extend_from_slice(CERTIFICATE_DOMAIN);
    body.extend_from_slice(address);
    body.extend_from_slice(&issued_at.to_le_bytes());
    body.extend_from_slice(&ttl_secs.to_le_bytes());
    body
}

fn serialize_hex<S: Serializer, const N: usize>(bytes: &[u8; N], s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&to_hex(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let account = Account::from_seed_phrase("//Alice");
        let cert = QueryCertificate::sign(&account, 1_700_000_000, 3600);
        assert_eq!(cert.address, account.address());
        assert!(cert.verify());
    }

    #[test]
    fn test_tampered_ttl_fails_verification() {
        let account = Account::from_seed_phrase("//Alice");
        let mut cert = QueryCertificate::sign(&account, 1_700_000_000, 3600);
        cert.ttl_secs = 7200;
        assert!(!cert.verify());
    }

    #[test]
    fn test_foreign_address_fails_verification() {
        let alice = Account::from_seed_phrase("//Alice");
        let bob = Account::from_seed_phrase("//Bob");
        let mut cert = QueryCertificate::sign(&alice, 1_700_000_000, 3600);
        cert.address = bob.address();
        assert!(!cert.verify());
    }

    #[test]
    fn test_expiry() {
        let account = Account::generate();
        let cert = QueryCertificate::sign(&account, 1_000, 60);
        assert_eq!(cert.expires_at(), 1_060);
        assert!(!cert.is_expired(1_059));
        assert!(cert.is_expired(1_060));
    }

    #[test]
    fn test_serializes_hex_fields() {
        let account = Account::from_seed_phrase("//Alice");
        let cert = QueryCertificate::sign(&account, 1, 2);
        let json = serde_json::to_value(&cert).unwrap();
        assert_eq!(json["address"], to_hex(&account.address()));
        assert_eq!(json["issuedAt"], 1);
        assert_eq!(json["ttlSecs"], 2);
        assert!(json["signature"].as_str().unwrap().starts_with("0x"));
    }
}
