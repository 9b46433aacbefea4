//! In-memory chain and cluster ledger for testing.
//!
//! `MemChain` implements `ChainTransport` over `BTreeMap` ledgers. It
//! accepts real signed transactions, checks nonces and balances the way a
//! node would, and applies transfers, cluster deposits, and
//! instantiations. Submissions go through the binary envelope: the chain
//! decodes `tx.encode()` and applies what it decoded. Tests script its
//! behaviour: fixed dry-run results, one-shot submission rejections,
//! failing queries (from the start or once a transaction lands), and a
//! finality mode that never reports a block.
//!
//! Included transactions take effect immediately at submission. Finality
//! is only what `wait_finalized` reports, so with [`Finality::Never`] a
//! balance read can observe a transaction the caller gave up on.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use deploykit_primitives::crypto::{hash_blake3, hash_sha256};
use deploykit_primitives::{
    Address, Balance, ClusterPricing, CodeHash, ComputationUnits, GasLimit, QueryCertificate,
    SignedTransaction, StorageDeposit, TransactionPayload, TxHash,
};

use crate::error::{QueryKind, RejectReason, TransportError, TransportResult};
use crate::traits::{
    CallOutcome, ChainTransport, DryRunResponse, FinalizedTx, InstantiateQuery, OnChainAccount,
};

/// Computation units charged for any instantiation.
pub const INSTANTIATE_BASE_UNITS: ComputationUnits = 1_000_000;

/// Computation units charged per byte of constructor call data.
pub const UNITS_PER_BYTE: ComputationUnits = 2_000;

/// How `wait_finalized` behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Finality {
    /// Included transactions are reported final immediately.
    #[default]
    Instant,
    /// `wait_finalized` never resolves.
    Never,
}

/// Number of calls that reached each method (after the closed check).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CallCounts {
    pub cluster_pricing: usize,
    pub on_chain_account: usize,
    pub cluster_balance: usize,
    pub code_exists: usize,
    pub dry_run: usize,
    pub submit: usize,
    pub wait_finalized: usize,
}

impl CallCounts {
    fn record(&mut self, kind: QueryKind) {
        let slot = match kind {
            QueryKind::ClusterPricing => &mut self.cluster_pricing,
            QueryKind::OnChainAccount => &mut self.on_chain_account,
            QueryKind::ClusterBalance => &mut self.cluster_balance,
            QueryKind::CodeExists => &mut self.code_exists,
            QueryKind::DryRun => &mut self.dry_run,
            QueryKind::Submit => &mut self.submit,
            QueryKind::Finality => &mut self.wait_finalized,
        };
        *slot += 1;
    }

    /// Total calls to balance-reading methods.
    pub fn balance_reads(&self) -> usize {
        self.on_chain_account + self.cluster_balance
    }
}

#[derive(Debug)]
struct ChainState {
    pricing: ClusterPricing,
    accounts: BTreeMap<Address, OnChainAccount>,
    cluster: BTreeMap<Address, Balance>,
    code: BTreeSet<CodeHash>,
    contracts: BTreeMap<Address, CodeHash>,
    included: BTreeMap<TxHash, FinalizedTx>,
    submitted: Vec<SignedTransaction>,
    block_number: u64,
    scripted_dry_run: Option<DryRunResponse>,
    scripted_rejection: Option<RejectReason>,
    failures: BTreeMap<QueryKind, String>,
    armed_failures: BTreeMap<QueryKind, String>,
    finality: Finality,
    calls: CallCounts,
}

/// In-memory `ChainTransport`.
#[derive(Debug)]
pub struct MemChain {
    state: Mutex<ChainState>,
    closed: AtomicBool,
    close_calls: AtomicUsize,
}

impl MemChain {
    /// Create an empty chain with the given cluster pricing.
    pub fn new(pricing: ClusterPricing) -> Self {
        Self {
            state: Mutex::new(ChainState {
                pricing,
                accounts: BTreeMap::new(),
                cluster: BTreeMap::new(),
                code: BTreeSet::new(),
                contracts: BTreeMap::new(),
                included: BTreeMap::new(),
                submitted: Vec::new(),
                block_number: 0,
                scripted_dry_run: None,
                scripted_rejection: None,
                failures: BTreeMap::new(),
                armed_failures: BTreeMap::new(),
                finality: Finality::Instant,
                calls: CallCounts::default(),
            }),
            closed: AtomicBool::new(false),
            close_calls: AtomicUsize::new(0),
        }
    }

    // ── Builders ──

    pub fn with_account(self, address: Address, free: Balance) -> Self {
        self.fund(&address, free);
        self
    }

    pub fn with_cluster_balance(self, address: Address, amount: Balance) -> Self {
        self.lock().cluster.insert(address, amount);
        self
    }

    pub fn with_code(self, code_hash: CodeHash) -> Self {
        self.lock().code.insert(code_hash);
        self
    }

    pub fn with_finality(self, finality: Finality) -> Self {
        self.set_finality(finality);
        self
    }

    // ── Scripting ──

    /// Credit `amount` to an on-chain account, creating it if needed.
    pub fn fund(&self, address: &Address, amount: Balance) {
        let mut state = self.lock();
        let account = state.accounts.entry(*address).or_default();
        account.free = account.free.saturating_add(amount);
    }

    pub fn set_pricing(&self, pricing: ClusterPricing) {
        self.lock().pricing = pricing;
    }

    pub fn set_finality(&self, finality: Finality) {
        self.lock().finality = finality;
    }

    /// Return `response` from every dry run and use it when applying
    /// instantiations.
    pub fn script_dry_run(&self, response: DryRunResponse) {
        self.lock().scripted_dry_run = Some(response);
    }

    /// Reject the next submitted transaction with `reason`.
    pub fn script_rejection(&self, reason: RejectReason) {
        self.lock().scripted_rejection = Some(reason);
    }

    /// Fail every call of `kind` until cleared.
    pub fn fail_query(&self, kind: QueryKind, message: impl Into<String>) {
        self.lock().failures.insert(kind, message.into());
    }

    /// Fail every call of `kind` once the next transaction is accepted.
    pub fn fail_after_submit(&self, kind: QueryKind, message: impl Into<String>) {
        self.lock().armed_failures.insert(kind, message.into());
    }

    pub fn clear_failure(&self, kind: QueryKind) {
        let mut state = self.lock();
        state.failures.remove(&kind);
        state.armed_failures.remove(&kind);
    }

    // ── Inspection ──

    pub fn on_chain_free(&self, address: &Address) -> Balance {
        self.lock().accounts.get(address).map_or(0, |a| a.free)
    }

    pub fn nonce(&self, address: &Address) -> u64 {
        self.lock().accounts.get(address).map_or(0, |a| a.nonce)
    }

    pub fn cluster_free(&self, address: &Address) -> Balance {
        self.lock().cluster.get(address).copied().unwrap_or(0)
    }

    /// Code hash behind an instantiated contract.
    pub fn contract_code(&self, address: &Address) -> Option<CodeHash> {
        self.lock().contracts.get(address).copied()
    }

    /// Every transaction accepted so far, in submission order.
    pub fn submitted(&self) -> Vec<SignedTransaction> {
        self.lock().submitted.clone()
    }

    pub fn calls(&self) -> CallCounts {
        self.lock().calls
    }

    /// How many times `close` was called.
    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    // ── Internals ──

    fn lock(&self) -> MutexGuard<'_, ChainState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Closed check, call accounting, and scripted failures for one call.
    fn enter(&self, kind: QueryKind) -> TransportResult<MutexGuard<'_, ChainState>> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        let mut state = self.lock();
        state.calls.record(kind);
        if let Some(message) = state.failures.get(&kind) {
            return Err(TransportError::query(kind, message.clone()));
        }
        Ok(state)
    }
}

impl ChainState {
    /// Run an instantiation against current state without committing it.
    fn simulate(
        &self,
        origin: &Address,
        code_hash: &CodeHash,
        call_data: &[u8],
        extra_deposit: Balance,
    ) -> DryRunResponse {
        if let Some(scripted) = &self.scripted_dry_run {
            return scripted.clone();
        }
        if !self.code.contains(code_hash) {
            return DryRunResponse {
                gas_consumed: 0,
                gas_required: 0,
                storage_deposit: StorageDeposit::None,
                outcome: CallOutcome::Reverted {
                    reason: "CodeNotFound".into(),
                },
            };
        }

        let len = call_data.len() as u64;
        let gas_consumed = INSTANTIATE_BASE_UNITS.saturating_add(UNITS_PER_BYTE.saturating_mul(len));
        let gas_required = gas_consumed.saturating_add(gas_consumed / 10);
        let charge = self
            .pricing
            .deposit_per_byte
            .saturating_mul(u128::from(len))
            .saturating_add(self.pricing.deposit_per_item);

        let available = self
            .cluster
            .get(origin)
            .copied()
            .unwrap_or(0)
            .saturating_add(extra_deposit);
        let outcome = if available < charge {
            CallOutcome::Reverted {
                reason: "StorageDepositNotEnoughFunds".into(),
            }
        } else {
            CallOutcome::Success
        };

        DryRunResponse {
            gas_consumed,
            gas_required,
            storage_deposit: StorageDeposit::Charge(charge),
            outcome,
        }
    }

    /// Apply an accepted transaction. Returns the created contract, or the
    /// dispatch error if the transaction was included but failed.
    ///
    /// The nonce is consumed either way. A failed instantiation moves no
    /// funds: its value stays on chain and nothing is charged.
    fn apply(&mut self, tx: &SignedTransaction) -> Result<Option<Address>, String> {
        self.accounts.entry(tx.sender).or_default().nonce += 1;

        match &tx.payload {
            TransactionPayload::Transfer { to, amount } => {
                self.debit(&tx.sender, *amount);
                let dest = self.accounts.entry(*to).or_default();
                dest.free = dest.free.saturating_add(*amount);
                Ok(None)
            }
            TransactionPayload::TransferToCluster { amount } => {
                self.debit(&tx.sender, *amount);
                let cluster = self.cluster.entry(tx.sender).or_default();
                *cluster = cluster.saturating_add(*amount);
                Ok(None)
            }
            TransactionPayload::Instantiate {
                code_hash,
                salt,
                call_data,
                gas_limit,
                storage_deposit_limit,
                value,
            } => {
                let run = self.simulate(&tx.sender, code_hash, call_data, *value);
                if let CallOutcome::Reverted { reason } = run.outcome {
                    return Err(reason);
                }

                let price = self.pricing.gas_price;
                let out_of_gas = match gas_limit {
                    GasLimit::Value(v) => {
                        *v < u128::from(run.gas_required).saturating_mul(price)
                    }
                    GasLimit::Units(u) => *u < run.gas_required,
                };
                if out_of_gas {
                    return Err("OutOfGas".into());
                }
                let storage = run.storage_deposit.charged();
                if storage > *storage_deposit_limit {
                    return Err("StorageDepositLimitExhausted".into());
                }

                let fee = u128::from(run.gas_consumed)
                    .saturating_mul(price)
                    .saturating_add(storage);
                let available = self
                    .cluster
                    .get(&tx.sender)
                    .copied()
                    .unwrap_or(0)
                    .saturating_add(*value);
                if available < fee {
                    return Err("InsufficientClusterBalance".into());
                }

                let mut preimage = Vec::with_capacity(64 + salt.len());
                preimage.extend_from_slice(&tx.sender);
                preimage.extend_from_slice(code_hash);
                preimage.extend_from_slice(salt);
                let address = hash_blake3(&preimage);
                if self.contracts.contains_key(&address) {
                    return Err("DuplicateContract".into());
                }

                self.debit(&tx.sender, *value);
                self.cluster.insert(tx.sender, available - fee);
                self.contracts.insert(address, *code_hash);
                Ok(Some(address))
            }
        }
    }

    /// Take `amount` from an on-chain account already checked to hold it.
    fn debit(&mut self, address: &Address, amount: Balance) {
        let account = self.accounts.entry(*address).or_default();
        account.free = account.free.saturating_sub(amount);
    }
}

fn check_certificate(
    cert: &QueryCertificate,
    origin: Option<&Address>,
    kind: QueryKind,
) -> TransportResult<()> {
    if !cert.verify() {
        return Err(TransportError::query(kind, "invalid query certificate"));
    }
    if let Some(origin) = origin {
        if cert.address != *origin {
            return Err(TransportError::query(
                kind,
                "query certificate does not match the call origin",
            ));
        }
    }
    Ok(())
}

fn spend_of(payload: &TransactionPayload) -> Balance {
    match payload {
        TransactionPayload::Transfer { amount, .. }
        | TransactionPayload::TransferToCluster { amount } => *amount,
        TransactionPayload::Instantiate { value, .. } => *value,
    }
}

#[async_trait]
impl ChainTransport for MemChain {
    fn endpoint(&self) -> &str {
        "mem://chain"
    }

    async fn cluster_pricing(&self) -> TransportResult<ClusterPricing> {
        let state = self.enter(QueryKind::ClusterPricing)?;
        Ok(state.pricing)
    }

    async fn on_chain_account(&self, address: &Address) -> TransportResult<OnChainAccount> {
        let state = self.enter(QueryKind::OnChainAccount)?;
        Ok(state.accounts.get(address).copied().unwrap_or_default())
    }

    async fn cluster_balance(&self, address: &Address) -> TransportResult<Balance> {
        let state = self.enter(QueryKind::ClusterBalance)?;
        Ok(state.cluster.get(address).copied().unwrap_or(0))
    }

    async fn code_exists(
        &self,
        cert: &QueryCertificate,
        code_hash: &CodeHash,
    ) -> TransportResult<bool> {
        let state = self.enter(QueryKind::CodeExists)?;
        check_certificate(cert, None, QueryKind::CodeExists)?;
        Ok(state.code.contains(code_hash))
    }

    async fn estimate_instantiate(
        &self,
        cert: &QueryCertificate,
        query: &InstantiateQuery,
    ) -> TransportResult<DryRunResponse> {
        let state = self.enter(QueryKind::DryRun)?;
        check_certificate(cert, Some(&query.origin), QueryKind::DryRun)?;
        Ok(state.simulate(&query.origin, &query.code_hash, &query.call_data, query.deposit))
    }

    async fn submit(&self, tx: &SignedTransaction) -> TransportResult<TxHash> {
        let kind = QueryKind::Submit;
        let mut state = self.enter(kind)?;
        if let Some(reason) = state.scripted_rejection.take() {
            return Err(TransportError::Rejected(reason));
        }

        // Work from the wire bytes a node would receive.
        let raw = tx
            .encode()
            .map_err(|e| TransportError::malformed(kind, e.to_string()))?;
        let tx = SignedTransaction::decode(&raw).map_err(|e| {
            TransportError::Rejected(RejectReason::Other(format!("undecodable transaction: {}", e)))
        })?;
        if !tx.verify() {
            return Err(TransportError::Rejected(RejectReason::Other(
                "bad signature".into(),
            )));
        }

        let account = state.accounts.get(&tx.sender).copied().unwrap_or_default();
        if tx.nonce != account.nonce {
            return Err(TransportError::Rejected(RejectReason::NonceConflict));
        }
        let spend = spend_of(&tx.payload);
        if spend > account.free {
            return Err(TransportError::Rejected(RejectReason::InsufficientBalance {
                needed: Some(spend),
                available: Some(account.free),
            }));
        }

        let tx_hash = hash_sha256(&raw);
        let outcome = state.apply(&tx);
        state.block_number += 1;
        let block_number = state.block_number;
        let mut block_preimage = block_number.to_le_bytes().to_vec();
        block_preimage.extend_from_slice(&tx_hash);

        let (contract_address, dispatch_error) = match outcome {
            Ok(address) => (address, None),
            Err(reason) => (None, Some(reason)),
        };
        state.included.insert(
            tx_hash,
            FinalizedTx {
                tx_hash,
                block_number,
                block_hash: hash_blake3(&block_preimage),
                contract_address,
                dispatch_error,
            },
        );
        state.submitted.push(tx);
        let armed = std::mem::take(&mut state.armed_failures);
        state.failures.extend(armed);
        Ok(tx_hash)
    }

    async fn wait_finalized(&self, tx_hash: &TxHash) -> TransportResult<FinalizedTx> {
        let found = {
            let state = self.enter(QueryKind::Finality)?;
            match state.finality {
                Finality::Instant => Some(
                    state
                        .included
                        .get(tx_hash)
                        .cloned()
                        .ok_or_else(|| TransportError::query(QueryKind::Finality, "unknown transaction"))?,
                ),
                Finality::Never => None,
            }
        };
        match found {
            Some(tx) => Ok(tx),
            None => std::future::pending::<TransportResult<FinalizedTx>>().await,
        }
    }

    fn close(&self) {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deploykit_primitives::Account;

    const PRICING: ClusterPricing = ClusterPricing {
        gas_price: 1,
        deposit_per_byte: 1_000,
        deposit_per_item: 10_000,
    };

    fn cert_for(account: &Account) -> QueryCertificate {
        QueryCertificate::sign(account, 1_000, 3_600)
    }

    fn query_for(account: &Account, code_hash: CodeHash, len: usize) -> InstantiateQuery {
        InstantiateQuery {
            origin: account.address(),
            code_hash,
            salt: vec![7],
            call_data: vec![0xAB; len],
            deposit: 0,
        }
    }

    #[tokio::test]
    async fn test_default_dry_run_model() {
        let alice = Account::from_seed_phrase("//Alice");
        let chain = MemChain::new(PRICING)
            .with_code([1; 32])
            .with_cluster_balance(alice.address(), 1_000_000_000);
        let resp = chain
            .estimate_instantiate(&cert_for(&alice), &query_for(&alice, [1; 32], 100))
            .await
            .unwrap();
        assert_eq!(resp.outcome, CallOutcome::Success);
        assert_eq!(resp.gas_consumed, INSTANTIATE_BASE_UNITS + 100 * UNITS_PER_BYTE);
        assert!(resp.gas_required >= resp.gas_consumed);
        assert_eq!(resp.storage_deposit, StorageDeposit::Charge(100 * 1_000 + 10_000));
    }

    #[tokio::test]
    async fn test_dry_run_unknown_code_reverts() {
        let alice = Account::from_seed_phrase("//Alice");
        let chain = MemChain::new(PRICING);
        let resp = chain
            .estimate_instantiate(&cert_for(&alice), &query_for(&alice, [9; 32], 10))
            .await
            .unwrap();
        assert!(matches!(resp.outcome, CallOutcome::Reverted { ref reason } if reason == "CodeNotFound"));
    }

    #[tokio::test]
    async fn test_dry_run_uses_prefund_deposit() {
        let alice = Account::from_seed_phrase("//Alice");
        let chain = MemChain::new(PRICING).with_code([1; 32]);
        let mut query = query_for(&alice, [1; 32], 10);
        let resp = chain
            .estimate_instantiate(&cert_for(&alice), &query)
            .await
            .unwrap();
        assert!(matches!(resp.outcome, CallOutcome::Reverted { .. }));

        query.deposit = 20_000;
        let resp = chain
            .estimate_instantiate(&cert_for(&alice), &query)
            .await
            .unwrap();
        assert_eq!(resp.outcome, CallOutcome::Success);
    }

    #[tokio::test]
    async fn test_dry_run_rejects_foreign_certificate() {
        let alice = Account::from_seed_phrase("//Alice");
        let bob = Account::from_seed_phrase("//Bob");
        let chain = MemChain::new(PRICING).with_code([1; 32]);
        let err = chain
            .estimate_instantiate(&cert_for(&bob), &query_for(&alice, [1; 32], 10))
            .await
            .unwrap_err();
        assert_eq!(err.query_kind(), Some(QueryKind::DryRun));
    }

    #[tokio::test]
    async fn test_transfer_moves_funds_and_bumps_nonce() {
        let alice = Account::from_seed_phrase("//Alice");
        let bob = Account::from_seed_phrase("//Bob");
        let chain = MemChain::new(PRICING).with_account(alice.address(), 100);
        let tx = SignedTransaction::sign(
            &alice,
            0,
            TransactionPayload::Transfer {
                to: bob.address(),
                amount: 40,
            },
        )
        .unwrap();
        let hash = chain.submit(&tx).await.unwrap();
        assert_eq!(chain.on_chain_free(&alice.address()), 60);
        assert_eq!(chain.on_chain_free(&bob.address()), 40);
        assert_eq!(chain.nonce(&alice.address()), 1);

        let finalized = chain.wait_finalized(&hash).await.unwrap();
        assert!(finalized.is_success());
        assert_eq!(finalized.block_number, 1);
    }

    #[tokio::test]
    async fn test_stale_nonce_rejected() {
        let alice = Account::from_seed_phrase("//Alice");
        let chain = MemChain::new(PRICING).with_account(alice.address(), 100);
        let tx = SignedTransaction::sign(&alice, 5, TransactionPayload::TransferToCluster { amount: 1 }).unwrap();
        assert_eq!(
            chain.submit(&tx).await.unwrap_err(),
            TransportError::Rejected(RejectReason::NonceConflict)
        );
    }

    #[tokio::test]
    async fn test_overspend_rejected() {
        let alice = Account::from_seed_phrase("//Alice");
        let chain = MemChain::new(PRICING).with_account(alice.address(), 100);
        let tx = SignedTransaction::sign(&alice, 0, TransactionPayload::TransferToCluster { amount: 101 }).unwrap();
        assert_eq!(
            chain.submit(&tx).await.unwrap_err(),
            TransportError::Rejected(RejectReason::InsufficientBalance {
                needed: Some(101),
                available: Some(100),
            })
        );
        assert!(chain.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_instantiate_charges_cluster() {
        let alice = Account::from_seed_phrase("//Alice");
        let chain = MemChain::new(PRICING)
            .with_account(alice.address(), 10_000_000)
            .with_code([1; 32]);
        let call_data = vec![0u8; 10];
        let gas_required = 1_122_000u128;
        let tx = SignedTransaction::sign(
            &alice,
            0,
            TransactionPayload::Instantiate {
                code_hash: [1; 32],
                salt: vec![1],
                call_data,
                gas_limit: GasLimit::Value(gas_required),
                storage_deposit_limit: 20_000,
                value: 5_000_000,
            },
        )
        .unwrap();
        let hash = chain.submit(&tx).await.unwrap();
        let finalized = chain.wait_finalized(&hash).await.unwrap();
        assert!(finalized.is_success(), "{:?}", finalized.dispatch_error);
        let contract = finalized.contract_address.unwrap();
        assert_eq!(chain.contract_code(&contract), Some([1; 32]));

        // value in, gas consumed (1_020_000) and storage (20_000) out
        assert_eq!(chain.cluster_free(&alice.address()), 5_000_000 - 1_020_000 - 20_000);
        assert_eq!(chain.on_chain_free(&alice.address()), 5_000_000);
    }

    #[tokio::test]
    async fn test_instantiate_out_of_gas_is_dispatch_error() {
        let alice = Account::from_seed_phrase("//Alice");
        let chain = MemChain::new(PRICING)
            .with_account(alice.address(), 10_000_000)
            .with_code([1; 32]);
        let tx = SignedTransaction::sign(
            &alice,
            0,
            TransactionPayload::Instantiate {
                code_hash: [1; 32],
                salt: vec![],
                call_data: vec![],
                gas_limit: GasLimit::Units(10),
                storage_deposit_limit: 1_000_000,
                value: 5_000_000,
            },
        )
        .unwrap();
        let hash = chain.submit(&tx).await.unwrap();
        let finalized = chain.wait_finalized(&hash).await.unwrap();
        assert_eq!(finalized.dispatch_error.as_deref(), Some("OutOfGas"));
        assert_eq!(finalized.contract_address, None);

        // The call's value is not transferred; only the nonce moves.
        assert_eq!(chain.on_chain_free(&alice.address()), 10_000_000);
        assert_eq!(chain.cluster_free(&alice.address()), 0);
        assert_eq!(chain.nonce(&alice.address()), 1);
    }

    #[tokio::test]
    async fn test_duplicate_instantiation_keeps_value_on_chain() {
        let alice = Account::from_seed_phrase("//Alice");
        let chain = MemChain::new(PRICING)
            .with_account(alice.address(), 10_000_000)
            .with_code([1; 32]);
        let payload = TransactionPayload::Instantiate {
            code_hash: [1; 32],
            salt: vec![4],
            call_data: vec![],
            gas_limit: GasLimit::Units(2_000_000),
            storage_deposit_limit: 1_000_000,
            value: 2_000_000,
        };
        let first = SignedTransaction::sign(&alice, 0, payload.clone()).unwrap();
        chain.submit(&first).await.unwrap();
        let after_first = (
            chain.on_chain_free(&alice.address()),
            chain.cluster_free(&alice.address()),
        );

        let second = SignedTransaction::sign(&alice, 1, payload).unwrap();
        let hash = chain.submit(&second).await.unwrap();
        let finalized = chain.wait_finalized(&hash).await.unwrap();
        assert_eq!(finalized.dispatch_error.as_deref(), Some("DuplicateContract"));
        assert_eq!(
            (
                chain.on_chain_free(&alice.address()),
                chain.cluster_free(&alice.address()),
            ),
            after_first
        );
    }

    #[tokio::test]
    async fn test_submission_applies_decoded_envelope() {
        let alice = Account::from_seed_phrase("//Alice");
        let chain = MemChain::new(PRICING).with_account(alice.address(), 100);
        let tx = SignedTransaction::sign(&alice, 0, TransactionPayload::TransferToCluster { amount: 7 })
            .unwrap();
        let hash = chain.submit(&tx).await.unwrap();
        assert_eq!(hash, tx.hash().unwrap());
        assert_eq!(chain.submitted(), vec![tx]);
        assert_eq!(chain.cluster_free(&alice.address()), 7);
    }

    #[tokio::test]
    async fn test_unverifiable_envelope_rejected() {
        let alice = Account::from_seed_phrase("//Alice");
        let chain = MemChain::new(PRICING).with_account(alice.address(), 100);
        let mut tx = SignedTransaction::sign(&alice, 0, TransactionPayload::TransferToCluster { amount: 7 })
            .unwrap();
        tx.signature[0] ^= 0xFF;
        assert!(matches!(
            chain.submit(&tx).await.unwrap_err(),
            TransportError::Rejected(RejectReason::Other(_))
        ));
        assert!(chain.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_failure_armed_until_submission() {
        let alice = Account::from_seed_phrase("//Alice");
        let chain = MemChain::new(PRICING).with_account(alice.address(), 100);
        chain.fail_after_submit(QueryKind::ClusterBalance, "worker lost");
        assert!(chain.cluster_balance(&alice.address()).await.is_ok());

        let tx = SignedTransaction::sign(&alice, 0, TransactionPayload::TransferToCluster { amount: 1 })
            .unwrap();
        chain.submit(&tx).await.unwrap();
        let err = chain.cluster_balance(&alice.address()).await.unwrap_err();
        assert_eq!(err.query_kind(), Some(QueryKind::ClusterBalance));
        assert!(chain.on_chain_account(&alice.address()).await.is_ok());
    }

    #[tokio::test]
    async fn test_scripted_rejection_is_one_shot() {
        let alice = Account::from_seed_phrase("//Alice");
        let chain = MemChain::new(PRICING).with_account(alice.address(), 100);
        chain.script_rejection(RejectReason::Other("pool full".into()));
        let tx = SignedTransaction::sign(&alice, 0, TransactionPayload::TransferToCluster { amount: 1 }).unwrap();
        assert!(chain.submit(&tx).await.is_err());
        assert!(chain.submit(&tx).await.is_ok());
    }

    #[tokio::test]
    async fn test_scripted_query_failure() {
        let chain = MemChain::new(PRICING);
        chain.fail_query(QueryKind::ClusterBalance, "cluster worker offline");
        let err = chain.cluster_balance(&[0; 32]).await.unwrap_err();
        assert_eq!(err.query_kind(), Some(QueryKind::ClusterBalance));
        assert!(chain.on_chain_account(&[0; 32]).await.is_ok());

        chain.clear_failure(QueryKind::ClusterBalance);
        assert!(chain.cluster_balance(&[0; 32]).await.is_ok());
    }

    #[tokio::test]
    async fn test_never_finality_blocks() {
        let alice = Account::from_seed_phrase("//Alice");
        let chain = MemChain::new(PRICING)
            .with_account(alice.address(), 100)
            .with_finality(Finality::Never);
        let tx = SignedTransaction::sign(&alice, 0, TransactionPayload::TransferToCluster { amount: 10 }).unwrap();
        let hash = chain.submit(&tx).await.unwrap();
        let waited = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            chain.wait_finalized(&hash),
        )
        .await;
        assert!(waited.is_err());
        // Included all the same.
        assert_eq!(chain.cluster_free(&alice.address()), 10);
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_blocks_calls() {
        let chain = MemChain::new(PRICING);
        chain.close();
        chain.close();
        assert!(chain.is_closed());
        assert_eq!(chain.close_calls(), 2);
        assert_eq!(chain.cluster_pricing().await.unwrap_err(), TransportError::Closed);
        assert_eq!(chain.calls().cluster_pricing, 0);
    }
}
