//! Deployment orchestrator: the estimate-then-commit state machine.
//!
//! `Deployer::deploy` runs one attempt:
//!
//! 1. Read the "before" balance snapshot
//! 2. `Init -> CertificateAcquired`: issue a query certificate, then check
//!    the code is uploaded
//! 3. `-> PrefundGuardComputed`: predict the storage deposit and scale it
//!    by the guard margin
//! 4. `-> EstimateObtained`: dry-run the instantiation, pre-funded with the
//!    guard deposit
//! 5. `-> LimitsComputed`: derive gas limit, storage deposit limit, and value
//! 6. `-> Submitted`: sign and broadcast the instantiation
//! 7. `-> Finalized`: wait for finality under the configured bound
//! 8. Read the "after" snapshot and reconcile it against the attached value
//!
//! Every failure is terminal for the attempt. Nothing is retried: a stale
//! estimate must never be replayed, and the caller decides whether to run
//! a fresh attempt.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use deploykit_primitives::{
    format_balance, to_hex, Account, Address, Balance, BalanceSnapshot, ClusterPricing, CodeHash,
    CostEstimate, Hash, SignedTransaction, TransactionLimits, TransactionPayload, TxHash,
};
use deploykit_transport::{ChainTransport, FinalizedTx};

use crate::balance::BalanceReader;
use crate::blueprint::{BlueprintError, ConstructorEncoder};
use crate::certificate::{CertificateIssuer, LocalCertificateIssuer};
use crate::config::{DeployConfig, ValueMode};
use crate::error::{DeployErrorKind, DeployResult};
use crate::estimator::{DryRunEstimator, InstantiateCall};
use crate::limits::LimitCalculator;
use crate::oracle::CostOracle;
use crate::session::Session;
use crate::state::{DeployState, StateMachine};

/// What to instantiate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployRequest {
    pub code_hash: CodeHash,
    /// Encoded constructor selector and arguments.
    pub call_data: Vec<u8>,
    /// Instantiation salt. A fresh random salt is drawn per attempt when unset.
    pub salt: Option<Vec<u8>>,
}

impl DeployRequest {
    pub fn new(code_hash: CodeHash, call_data: Vec<u8>) -> Self {
        Self {
            code_hash,
            call_data,
            salt: None,
        }
    }

    /// Encode `label(args)` with `encoder` and target its code hash.
    pub fn from_encoder(
        encoder: &dyn ConstructorEncoder,
        label: &str,
        args: &[Vec<u8>],
    ) -> Result<Self, BlueprintError> {
        Ok(Self::new(
            encoder.code_hash(),
            encoder.encode_constructor(label, args)?,
        ))
    }

    pub fn with_salt(mut self, salt: Vec<u8>) -> Self {
        self.salt = Some(salt);
        self
    }
}

/// Before/after comparison of a successful attempt. Diagnostic only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    /// `before.cluster_free - after.cluster_free`.
    pub cluster_delta: i128,
    /// `before.on_chain_free - after.on_chain_free`.
    pub on_chain_delta: i128,
    /// Net funds that left the account across both ledgers.
    pub realized_cost: i128,
    /// Value attached to the transaction.
    pub attached: Balance,
}

impl Reconciliation {
    pub fn new(before: &BalanceSnapshot, after: &BalanceSnapshot, attached: Balance) -> Self {
        let cluster_delta = before.cluster_delta(after);
        let on_chain_delta = before.on_chain_delta(after);
        Self {
            cluster_delta,
            on_chain_delta,
            realized_cost: cluster_delta.saturating_add(on_chain_delta),
            attached,
        }
    }

    /// Neither the cluster-side charge nor the net cost exceeds the
    /// attached value.
    pub fn within_attached(&self) -> bool {
        let attached = i128::try_from(self.attached).unwrap_or(i128::MAX);
        self.cluster_delta <= attached && self.realized_cost <= attached
    }
}

/// Outcome of a finalized deployment.
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentReport {
    pub contract_address: Address,
    pub tx_hash: TxHash,
    pub block_number: u64,
    pub block_hash: Hash,
    pub pricing: ClusterPricing,
    pub predicted_deposit: Balance,
    pub guard_deposit: Balance,
    pub estimate: CostEstimate,
    pub limits: TransactionLimits,
    pub before: BalanceSnapshot,
    /// `None` when the post-finalization read failed.
    pub after: Option<BalanceSnapshot>,
    pub reconciliation: Option<Reconciliation>,
    /// States visited, `Init` through `Finalized`.
    pub transitions: Vec<DeployState>,
}

/// Runs deployment attempts within one session.
pub struct Deployer<'s> {
    session: &'s Session,
    config: DeployConfig,
    issuer: Box<dyn CertificateIssuer>,
}

impl<'s> Deployer<'s> {
    /// A deployer that signs certificates locally.
    pub fn new(session: &'s Session, config: DeployConfig) -> Self {
        let issuer = LocalCertificateIssuer::new(config.certificate_ttl);
        Self {
            session,
            config,
            issuer: Box::new(issuer),
        }
    }

    pub fn with_issuer(mut self, issuer: impl CertificateIssuer + 'static) -> Self {
        self.issuer = Box::new(issuer);
        self
    }

    pub fn config(&self) -> &DeployConfig {
        &self.config
    }

    /// Run one deployment attempt for `account`.
    pub async fn deploy(
        &self,
        account: &Account,
        request: &DeployRequest,
    ) -> DeployResult<DeploymentReport> {
        let transport = self.session.transport();
        let pricing = *self.session.pricing();
        let address = account.address();
        let reader = BalanceReader::new(transport);
        let mut machine = StateMachine::new();

        info!(
            account = %to_hex(&address),
            code_hash = %to_hex(&request.code_hash),
            call_data_len = request.call_data.len(),
            "starting deployment"
        );

        let before = reader
            .read(&address)
            .await
            .map_err(|e| machine.fail(e.into()))?;

        // ── Init -> CertificateAcquired ──

        let cert = self
            .issuer
            .issue(account)
            .await
            .map_err(|e| machine.fail(DeployErrorKind::Certificate(e)))?;
        machine.advance(DeployState::CertificateAcquired)?;

        if self.config.check_code_exists {
            let exists = transport
                .code_exists(&cert, &request.code_hash)
                .await
                .map_err(|e| machine.fail(e.into()))?;
            if !exists {
                return Err(machine.fail(DeployErrorKind::CodeNotUploaded(request.code_hash)));
            }
        }

        // ── -> PrefundGuardComputed ──

        let predicted_deposit = CostOracle::predict_storage_deposit(&request.call_data, &pricing);
        let guard_deposit = CostOracle::guard_deposit(predicted_deposit, &self.config.guard_margin);
        debug!(
            predicted = %predicted_deposit,
            guard = %guard_deposit,
            guard_margin = %self.config.guard_margin,
            "storage deposit guard"
        );
        machine.advance(DeployState::PrefundGuardComputed)?;

        // ── -> EstimateObtained ──

        let call = InstantiateCall {
            code_hash: request.code_hash,
            salt: request.salt.clone().unwrap_or_else(random_salt),
            call_data: request.call_data.clone(),
        };
        let estimate = DryRunEstimator::new(transport)
            .estimate(&cert, account, &call, guard_deposit)
            .await
            .map_err(|kind| machine.fail(kind))?;
        self.check_deposit_drift(predicted_deposit, &estimate)
            .map_err(|kind| machine.fail(kind))?;
        info!(
            gas_required = estimate.gas_required,
            storage_deposit = %estimate.storage_deposit.amount(),
            direction = %estimate.storage_deposit.direction(),
            "dry run estimate obtained"
        );
        machine.advance(DeployState::EstimateObtained)?;

        // ── -> LimitsComputed ──

        let mut limits = LimitCalculator::compute(
            &estimate,
            &pricing,
            &self.config.limit_margin,
            self.config.gas_limit_mode,
        )
        .map_err(|kind| machine.fail(kind))?;
        if let ValueMode::Fixed(value) = self.config.value_mode {
            limits = LimitCalculator::with_fixed_value(limits, value)
                .map_err(|kind| machine.fail(kind))?;
        }
        info!(
            gas_limit = %limits.gas_limit,
            storage_deposit_limit = %limits.storage_deposit_limit,
            total_value = %format_balance(limits.total_value),
            "transaction limits computed"
        );
        machine.advance(DeployState::LimitsComputed)?;

        // ── -> Submitted ──

        let nonce = transport
            .on_chain_account(&address)
            .await
            .map_err(|e| machine.fail(e.into()))?
            .nonce;
        let tx = SignedTransaction::sign(
            account,
            nonce,
            TransactionPayload::Instantiate {
                code_hash: call.code_hash,
                salt: call.salt,
                call_data: call.call_data,
                gas_limit: limits.gas_limit,
                storage_deposit_limit: limits.storage_deposit_limit,
                value: limits.total_value,
            },
        )
        .map_err(|e| machine.fail(e.into()))?;
        let tx_hash = transport
            .submit(&tx)
            .await
            .map_err(|e| machine.fail(e.into()))?;
        info!(tx = %to_hex(&tx_hash), nonce, "instantiation submitted");
        machine.advance(DeployState::Submitted)?;

        // ── -> Finalized ──

        let finalized = await_finality(transport, &tx_hash, self.config.finalize_timeout)
            .await
            .map_err(|kind| machine.fail(kind))?;
        let contract_address = finalized.contract_address.ok_or_else(|| {
            machine.fail(DeployErrorKind::InvariantViolation(
                "finalized instantiation reports no contract address".into(),
            ))
        })?;
        machine.advance(DeployState::Finalized)?;

        // ── Reconciliation ──

        let after = match reader.read(&address).await {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!(error = %e, "post-finalization balance read failed");
                None
            }
        };
        let reconciliation = after.map(|after| {
            let r = Reconciliation::new(&before, &after, limits.total_value);
            log_reconciliation(&r);
            r
        });

        info!(
            contract = %to_hex(&contract_address),
            block = finalized.block_number,
            "deployment finalized"
        );

        Ok(DeploymentReport {
            contract_address,
            tx_hash,
            block_number: finalized.block_number,
            block_hash: finalized.block_hash,
            pricing,
            predicted_deposit,
            guard_deposit,
            estimate,
            limits,
            before,
            after,
            reconciliation,
            transitions: machine.history().to_vec(),
        })
    }

    /// Compare the oracle's prediction with the dry run's charge.
    fn check_deposit_drift(
        &self,
        predicted: Balance,
        estimate: &CostEstimate,
    ) -> Result<(), DeployErrorKind> {
        let estimated = estimate.storage_deposit.charged();
        if let Some(limit) = self.config.deposit_drift_limit {
            if limit.is_exceeded(predicted, estimated) {
                return Err(DeployErrorKind::DepositDrift {
                    predicted,
                    estimated,
                    limit,
                });
            }
        }
        if self.config.guard_margin.is_exceeded(predicted, estimated) {
            warn!(
                predicted = %predicted,
                estimated = %estimated,
                "dry-run storage deposit exceeds the guarded prediction"
            );
        }
        Ok(())
    }
}

/// Wait for finality under `limit`. On timeout the wait is dropped and
/// never resumed.
pub(crate) async fn await_finality(
    transport: &dyn ChainTransport,
    tx_hash: &TxHash,
    limit: Duration,
) -> Result<FinalizedTx, DeployErrorKind> {
    let finalized = match tokio::time::timeout(limit, transport.wait_finalized(tx_hash)).await {
        Ok(result) => result?,
        Err(_) => {
            warn!(
                tx = %to_hex(tx_hash),
                after = ?limit,
                "gave up waiting for finality; the transaction may still land"
            );
            return Err(DeployErrorKind::Timeout {
                tx_hash: *tx_hash,
                after: limit,
            });
        }
    };
    if let Some(reason) = &finalized.dispatch_error {
        return Err(DeployErrorKind::TransactionFailed {
            reason: reason.clone(),
        });
    }
    debug!(
        tx = %to_hex(tx_hash),
        block = finalized.block_number,
        "transaction finalized"
    );
    Ok(finalized)
}

fn log_reconciliation(r: &Reconciliation) {
    if r.within_attached() {
        info!(
            cluster_delta = %r.cluster_delta,
            on_chain_delta = %r.on_chain_delta,
            realized_cost = %r.realized_cost,
            attached = %r.attached,
            "balances reconciled"
        );
    } else {
        warn!(
            cluster_delta = %r.cluster_delta,
            on_chain_delta = %r.on_chain_delta,
            realized_cost = %r.realized_cost,
            attached = %r.attached,
            "realized cost exceeds attached value; pricing drift or estimate error"
        );
    }
}

fn random_salt() -> Vec<u8> {
    rand::random::<[u8; 32]>().to_vec()
}
