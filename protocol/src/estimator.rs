//! Dry-run estimator: the cluster's authoritative cost for a call.
//!
//! The estimator sends a non-mutating, certificate-authorized
//! instantiation to the cluster, pre-funded with the oracle's guard
//! deposit, and turns the response into a [`CostEstimate`]. A reverted
//! simulation is reported as such, with the cluster's reason untouched,
//! and is never confused with a transport failure.

use tracing::debug;

use deploykit_primitives::{
    to_hex, Account, Balance, CodeHash, CostEstimate, QueryCertificate,
};
use deploykit_transport::{CallOutcome, ChainTransport, InstantiateQuery};

use crate::certificate::unix_now;
use crate::error::DeployErrorKind;

/// The instantiation being priced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstantiateCall {
    pub code_hash: CodeHash,
    pub salt: Vec<u8>,
    /// Encoded constructor selector and arguments.
    pub call_data: Vec<u8>,
}

pub struct DryRunEstimator<'a> {
    transport: &'a dyn ChainTransport,
    now: Option<u64>,
}

impl<'a> DryRunEstimator<'a> {
    pub fn new(transport: &'a dyn ChainTransport) -> Self {
        Self {
            transport,
            now: None,
        }
    }

    /// Pin the clock used for certificate expiry checks.
    pub fn at(transport: &'a dyn ChainTransport, now: u64) -> Self {
        Self {
            transport,
            now: Some(now),
        }
    }

    /// Simulate `call` as `account` and return its cost.
    ///
    /// Fails with `Certificate` before any network traffic if the
    /// certificate has expired or belongs to another account.
    pub async fn estimate(
        &self,
        cert: &QueryCertificate,
        account: &Account,
        call: &InstantiateCall,
        guard_deposit: Balance,
    ) -> Result<CostEstimate, DeployErrorKind> {
        let now = self.now.unwrap_or_else(unix_now);
        if cert.is_expired(now) {
            return Err(DeployErrorKind::Certificate(format!(
                "certificate expired at {} (now {})",
                cert.expires_at(),
                now
            )));
        }
        if cert.address != account.address() {
            return Err(DeployErrorKind::Certificate(format!(
                "certificate is bound to {}, not {}",
                to_hex(&cert.address),
                to_hex(&account.address())
            )));
        }

        let query = InstantiateQuery {
            origin: account.address(),
            code_hash: call.code_hash,
            salt: call.salt.clone(),
            call_data: call.call_data.clone(),
            deposit: guard_deposit,
        };
        let response = self.transport.estimate_instantiate(cert, &query).await?;
        debug!(
            gas_consumed = response.gas_consumed,
            gas_required = response.gas_required,
            storage_deposit = ?response.storage_deposit,
            outcome = ?response.outcome,
            "dry run response"
        );

        match response.outcome {
            CallOutcome::Success => {}
            CallOutcome::Reverted { reason } => {
                return Err(DeployErrorKind::SimulationReverted { reason })
            }
        }
        if response.gas_required < response.gas_consumed {
            return Err(DeployErrorKind::InvariantViolation(format!(
                "dry run reports gas_required {} below gas_consumed {}",
                response.gas_required, response.gas_consumed
            )));
        }

        Ok(CostEstimate {
            gas_consumed: response.gas_consumed,
            gas_required: response.gas_required,
            storage_deposit: response.storage_deposit,
        })
    }
}
