//! Chain transport trait: the network-facing collaborator of the deployment protocol.
//!
//! A `ChainTransport` owns one connection to a chain node and the cluster
//! behind it. The protocol crate drives every read, dry run, submission,
//! and finality wait through this trait, so the same orchestration code
//! runs against [`MemChain`](crate::MemChain) in tests and
//! [`HttpTransport`](crate::HttpTransport) in production.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use deploykit_primitives::{
    Address, Balance, ClusterPricing, CodeHash, ComputationUnits, Hash, QueryCertificate,
    SignedTransaction, StorageDeposit, TxHash,
};

use crate::error::TransportResult;

/// Base-chain account state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct OnChainAccount {
    pub free: Balance,
    pub nonce: u64,
}

/// A non-mutating instantiation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstantiateQuery {
    /// Account the simulated call runs as.
    pub origin: Address,
    pub code_hash: CodeHash,
    pub salt: Vec<u8>,
    /// Encoded constructor selector and arguments.
    pub call_data: Vec<u8>,
    /// Balance credited to the origin for the duration of the simulation,
    /// so storage-deposit-dependent paths do not fail for lack of funds.
    pub deposit: Balance,
}

/// Whether the simulated call completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum CallOutcome {
    Success,
    Reverted { reason: String },
}

/// Raw result of a dry run, as reported by the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DryRunResponse {
    pub gas_consumed: ComputationUnits,
    pub gas_required: ComputationUnits,
    pub storage_deposit: StorageDeposit,
    pub outcome: CallOutcome,
}

/// A transaction observed in a finalized block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinalizedTx {
    pub tx_hash: TxHash,
    pub block_number: u64,
    pub block_hash: Hash,
    /// Address of the instance created by an instantiation, if any.
    pub contract_address: Option<Address>,
    /// Set when the transaction was included but its dispatch failed.
    pub dispatch_error: Option<String>,
}

impl FinalizedTx {
    pub fn is_success(&self) -> bool {
        self.dispatch_error.is_none()
    }
}

/// Connection to a chain node and its execution cluster.
///
/// Every method fails fast with the transport's own error; no method
/// retries. After [`close`](ChainTransport::close) every async method
/// returns [`TransportError::Closed`](crate::TransportError::Closed).
#[async_trait]
pub trait ChainTransport: Send + Sync {
    /// Endpoint description for logs.
    fn endpoint(&self) -> &str;

    // ── Cluster registry ──

    /// Current cluster pricing parameters.
    async fn cluster_pricing(&self) -> TransportResult<ClusterPricing>;

    // ── Ledger reads ──

    /// Free balance and next nonce of a base-chain account.
    async fn on_chain_account(&self, address: &Address) -> TransportResult<OnChainAccount>;

    /// Free balance of an account inside the cluster's ledger.
    async fn cluster_balance(&self, address: &Address) -> TransportResult<Balance>;

    // ── Certificate-authorized queries ──

    /// Whether the code behind `code_hash` has been uploaded to the cluster.
    async fn code_exists(
        &self,
        cert: &QueryCertificate,
        code_hash: &CodeHash,
    ) -> TransportResult<bool>;

    /// Simulate an instantiation without committing state.
    async fn estimate_instantiate(
        &self,
        cert: &QueryCertificate,
        query: &InstantiateQuery,
    ) -> TransportResult<DryRunResponse>;

    // ── Transactions ──

    /// Broadcast a signed transaction and return its hash.
    async fn submit(&self, tx: &SignedTransaction) -> TransportResult<TxHash>;

    /// Wait until the transaction is in a finalized block.
    ///
    /// Unbounded; callers impose their own timeout.
    async fn wait_finalized(&self, tx_hash: &TxHash) -> TransportResult<FinalizedTx>;

    // ── Lifecycle ──

    /// Close the connection. Idempotent.
    fn close(&self);

    fn is_closed(&self) -> bool;
}

#[async_trait]
impl<T: ChainTransport + ?Sized> ChainTransport for Arc<T> {
    fn endpoint(&self) -> &str {
        (**self).endpoint()
    }

    async fn cluster_pricing(&self) -> TransportResult<ClusterPricing> {
        (**self).cluster_pricing().await
    }

    async fn on_chain_account(&self, address: &Address) -> TransportResult<OnChainAccount> {
        (**self).on_chain_account(address).await
    }

    async fn cluster_balance(&self, address: &Address) -> TransportResult<Balance> {
        (**self).cluster_balance(address).await
    }

    async fn code_exists(
        &self,
        cert: &QueryCertificate,
        code_hash: &CodeHash,
    ) -> TransportResult<bool> {
        (**self).code_exists(cert, code_hash).await
    }

    async fn estimate_instantiate(
        &self,
        cert: &QueryCertificate,
        query: &InstantiateQuery,
    ) -> TransportResult<DryRunResponse> {
        (**self).estimate_instantiate(cert, query).await
    }

    async fn submit(&self, tx: &SignedTransaction) -> TransportResult<TxHash> {
        (**self).submit(tx).await
    }

    async fn wait_finalized(&self, tx_hash: &TxHash) -> TransportResult<FinalizedTx> {
        (**self).wait_finalized(tx_hash).await
    }

    fn close(&self) {
        (**self).close()
    }

    fn is_closed(&self) -> bool {
        (**self).is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_outcome_wire_shape() {
        let ok: CallOutcome = serde_json::from_str(r#"{"status":"success"}"#).unwrap();
        assert_eq!(ok, CallOutcome::Success);
        let reverted: CallOutcome =
            serde_json::from_str(r#"{"status":"reverted","reason":"ContractTrapped"}"#).unwrap();
        assert_eq!(
            reverted,
            CallOutcome::Reverted {
                reason: "ContractTrapped".into()
            }
        );
    }

    #[test]
    fn test_finalized_success_flag() {
        let tx = FinalizedTx {
            tx_hash: [1; 32],
            block_number: 3,
            block_hash: [2; 32],
            contract_address: None,
            dispatch_error: Some("OutOfGas".into()),
        };
        assert!(!tx.is_success());
    }
}
