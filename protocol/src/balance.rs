//! Balance reader: spendable balance on the base chain and in the cluster.

use tracing::debug;

use deploykit_primitives::{format_balance, to_hex, Address, BalanceSnapshot};
use deploykit_transport::{ChainTransport, TransportError, TransportResult};

/// Reads a [`BalanceSnapshot`] for an account. Pure read, no retries.
pub struct BalanceReader<'a> {
    transport: &'a dyn ChainTransport,
}

impl<'a> BalanceReader<'a> {
    pub fn new(transport: &'a dyn ChainTransport) -> Self {
        Self { transport }
    }

    /// Read both balances.
    ///
    /// The two queries are independent and both are always issued. A
    /// single failure is returned as-is; its `QueryKind` tells which side
    /// could not be read. If both fail, `TransportError::BalanceRead`
    /// carries the two errors.
    pub async fn read(&self, address: &Address) -> TransportResult<BalanceSnapshot> {
        let (account, cluster_free) = tokio::join!(
            self.transport.on_chain_account(address),
            self.transport.cluster_balance(address),
        );
        let (account, cluster_free) = match (account, cluster_free) {
            (Ok(account), Ok(cluster_free)) => (account, cluster_free),
            (Err(on_chain), Err(cluster)) => {
                return Err(TransportError::BalanceRead {
                    on_chain: Box::new(on_chain),
                    cluster: Box::new(cluster),
                })
            }
            (Err(e), Ok(_)) | (Ok(_), Err(e)) => return Err(e),
        };
        debug!(
            address = %to_hex(address),
            on_chain_free = %format_balance(account.free),
            cluster_free = %format_balance(cluster_free),
            "balances read"
        );
        Ok(BalanceSnapshot {
            on_chain_free: account.free,
            cluster_free,
        })
    }
}
