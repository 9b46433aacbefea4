//! Query certificate issuance.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;

use deploykit_primitives::{Account, QueryCertificate};

/// Current Unix time in seconds (zero if the clock is before the epoch).
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Produces query certificates for an account.
#[async_trait]
pub trait CertificateIssuer: Send + Sync {
    async fn issue(&self, account: &Account) -> Result<QueryCertificate, String>;
}

/// Signs certificates locally with the account's own key.
#[derive(Debug, Clone)]
pub struct LocalCertificateIssuer {
    pub ttl: Duration,
}

impl LocalCertificateIssuer {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }
}

#[async_trait]
impl CertificateIssuer for LocalCertificateIssuer {
    async fn issue(&self, account: &Account) -> Result<QueryCertificate, String> {
        if self.ttl.as_secs() == 0 {
            return Err("certificate ttl must be at least one second".into());
        }
        Ok(QueryCertificate::sign(account, unix_now(), self.ttl.as_secs()))
    }
}
