//! Funding pre-steps: on-chain transfers and deposits into the cluster.
//!
//! These run before a deployment, never inside one. Each transfer is a
//! single signed transaction waited on under the same finality bound as
//! the instantiation.

use std::time::Duration;

use tracing::info;

use deploykit_primitives::{
    format_balance, to_hex, Account, Address, Balance, SignedTransaction, TransactionPayload,
};
use deploykit_transport::{ChainTransport, FinalizedTx};

use crate::error::{DeployError, DeployErrorKind, DeployResult, DeployStage};
use crate::orchestrator::await_finality;
use crate::session::Session;

pub struct Funder<'a> {
    transport: &'a dyn ChainTransport,
    timeout: Duration,
}

impl<'a> Funder<'a> {
    pub fn new(session: &'a Session, timeout: Duration) -> Self {
        Self {
            transport: session.transport(),
            timeout,
        }
    }

    /// Move `amount` from `from` to `to` on the base chain.
    pub async fn transfer_on_chain(
        &self,
        from: &Account,
        to: &Address,
        amount: Balance,
    ) -> DeployResult<FinalizedTx> {
        info!(
            from = %to_hex(&from.address()),
            to = %to_hex(to),
            amount = %format_balance(amount),
            "on-chain transfer"
        );
        self.send(from, TransactionPayload::Transfer { to: *to, amount })
            .await
    }

    /// Move `amount` of `account`'s on-chain balance into its cluster balance.
    pub async fn transfer_to_cluster(
        &self,
        account: &Account,
        amount: Balance,
    ) -> DeployResult<FinalizedTx> {
        info!(
            account = %to_hex(&account.address()),
            amount = %format_balance(amount),
            "deposit to cluster"
        );
        self.send(account, TransactionPayload::TransferToCluster { amount })
            .await
    }

    async fn send(
        &self,
        account: &Account,
        payload: TransactionPayload,
    ) -> DeployResult<FinalizedTx> {
        self.try_send(account, payload)
            .await
            .map_err(|kind| DeployError::new(DeployStage::Funding, kind))
    }

    async fn try_send(
        &self,
        account: &Account,
        payload: TransactionPayload,
    ) -> Result<FinalizedTx, DeployErrorKind> {
        let nonce = self
            .transport
            .on_chain_account(&account.address())
            .await?
            .nonce;
        let tx = SignedTransaction::sign(account, nonce, payload)?;
        let tx_hash = self.transport.submit(&tx).await?;
        await_finality(self.transport, &tx_hash, self.timeout).await
    }
}
