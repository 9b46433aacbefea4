//! Shared helpers for the protocol integration tests.
//!
//! Deterministic accounts, the standard test pricing, and `MemChain`
//! factories with the test contract's code already uploaded.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use deploykit_primitives::{Account, Balance, ClusterPricing, CodeHash};
use deploykit_protocol::{DeployConfig, DeployRequest, Session};
use deploykit_transport::MemChain;

/// Code hash of the contract every test deploys.
pub const CODE_HASH: CodeHash = [0x96; 32];

/// One computation unit costs one balance unit; storage costs 1000 per byte.
pub const PRICING: ClusterPricing = ClusterPricing {
    gas_price: 1,
    deposit_per_byte: 1_000,
    deposit_per_item: 0,
};

/// Constructor call data length used by the reference deployment.
pub const PAYLOAD_LEN: usize = 500;

/// Value the reference deployment attaches at the default 5% margin:
/// `ceil((2_200_000 + 500_000) * 1.05)`.
pub const REFERENCE_VALUE: Balance = 2_835_000;

/// Plenty for several reference deployments.
pub const FUNDED: Balance = 100_000_000;

// ── Accounts ──

pub fn alice() -> Account {
    Account::from_seed_phrase("//Alice")
}

pub fn bob() -> Account {
    Account::from_seed_phrase("//Bob")
}

// ── Chains ──

/// Chain with the test code uploaded and nothing funded.
pub fn empty_chain() -> Arc<MemChain> {
    Arc::new(MemChain::new(PRICING).with_code(CODE_HASH))
}

/// Chain with the test code uploaded and `account` funded on-chain.
pub fn funded_chain(account: &Account, on_chain: Balance) -> Arc<MemChain> {
    Arc::new(
        MemChain::new(PRICING)
            .with_code(CODE_HASH)
            .with_account(account.address(), on_chain),
    )
}

// ── Requests ──

pub fn request(len: usize) -> DeployRequest {
    DeployRequest::new(CODE_HASH, vec![0xAB; len])
}

pub fn reference_request() -> DeployRequest {
    request(PAYLOAD_LEN)
}

/// Default config with a short finality bound so failing tests stay fast.
pub fn fast_config() -> DeployConfig {
    DeployConfig {
        finalize_timeout: Duration::from_millis(200),
        ..DeployConfig::default()
    }
}

pub async fn open(chain: &Arc<MemChain>) -> Session {
    Session::open(chain.clone()).await.expect("session opens")
}
