//! JSON-RPC 2.0 over HTTP transport.
//!
//! Amounts travel as decimal strings so `u128` balances survive JSON
//! intact; byte strings travel as `0x` hex. Methods used:
//!
//! | method | params | result |
//! |--------|--------|--------|
//! | `system_chain` | `[]` | chain name |
//! | `cluster_info` | `[]` | `{gasPrice, depositPerByte, depositPerItem}` |
//! | `system_account` | `[address]` | `{free, nonce}` |
//! | `cluster_balance` | `[address]` | `{free}` |
//! | `cluster_codeExists` | `[cert, codeHash]` | `bool` |
//! | `cluster_estimateInstantiate` | `[cert, query]` | dry-run result |
//! | `author_submitTransaction` | `[envelope]` | tx hash |
//! | `author_transactionStatus` | `[txHash]` | status record |

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use deploykit_primitives::{
    hash_from_hex, to_hex, Address, Balance, ClusterPricing, CodeHash, ComputationUnits, Hash,
    QueryCertificate, SignedTransaction, StorageDeposit, TxHash,
};

use crate::error::{QueryKind, RejectReason, TransportError, TransportResult};
use crate::traits::{
    CallOutcome, ChainTransport, DryRunResponse, FinalizedTx, InstantiateQuery, OnChainAccount,
};

/// Tunables for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Interval between `author_transactionStatus` polls.
    pub poll_interval: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(500),
        }
    }
}

/// `ChainTransport` speaking JSON-RPC to a single node endpoint.
#[derive(Debug)]
pub struct HttpTransport {
    endpoint: String,
    client: reqwest::Client,
    config: HttpConfig,
    next_id: AtomicU64,
    closed: AtomicBool,
}

// ── Wire types ──

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClusterInfoWire {
    gas_price: String,
    deposit_per_byte: String,
    deposit_per_item: String,
}

#[derive(Debug, Deserialize)]
struct AccountWire {
    free: String,
    nonce: u64,
}

#[derive(Debug, Deserialize)]
struct ClusterBalanceWire {
    free: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InstantiateQueryWire {
    origin: String,
    code_hash: String,
    salt: String,
    call_data: String,
    deposit: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StorageDepositWire {
    kind: String,
    #[serde(default)]
    amount: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DryRunWire {
    gas_consumed: ComputationUnits,
    gas_required: ComputationUnits,
    storage_deposit: StorageDepositWire,
    outcome: CallOutcome,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
enum TxStatusWire {
    Pending,
    InBlock,
    #[serde(rename_all = "camelCase")]
    Finalized {
        block_number: u64,
        block_hash: String,
        #[serde(default)]
        contract_address: Option<String>,
        #[serde(default)]
        dispatch_error: Option<String>,
    },
    Dropped,
    Invalid {
        #[serde(default)]
        reason: Option<String>,
    },
}

impl HttpTransport {
    /// Connect with default settings.
    pub async fn connect(endpoint: &str) -> TransportResult<Self> {
        Self::connect_with(endpoint, HttpConfig::default()).await
    }

    /// Validate the endpoint URL, build the client, and ping the node.
    pub async fn connect_with(endpoint: &str, config: HttpConfig) -> TransportResult<Self> {
        let connect_err = |message: String| TransportError::Connect {
            endpoint: endpoint.to_string(),
            message,
        };

        let url = reqwest::Url::parse(endpoint).map_err(|e| connect_err(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(connect_err(format!(
                "unsupported scheme '{}', expected http or https",
                url.scheme()
            )));
        }
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| connect_err(e.to_string()))?;

        let transport = Self {
            endpoint: endpoint.to_string(),
            client,
            config,
            next_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
        };

        let chain: String = transport
            .rpc("system_chain", json!([]))
            .await
            .map_err(|e| connect_err(e.to_string()))?
            .map_err(|e| connect_err(e.message))?;
        info!(endpoint, chain = %chain, "connected to chain node");
        Ok(transport)
    }

    /// One JSON-RPC round trip. The outer error is transport-level; the
    /// inner one is the node's JSON-RPC error object.
    async fn rpc<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<Result<T, RpcError>, reqwest::Error> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        debug!(method, id, "rpc request");
        let response: RpcResponse<T> = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(match (response.result, response.error) {
            (_, Some(error)) => Err(error),
            (Some(result), None) => Ok(result),
            (None, None) => Err(RpcError {
                code: 0,
                message: "response carries neither result nor error".into(),
                data: None,
            }),
        })
    }

    /// A read-style call: every failure is attributed to `kind`.
    async fn call<T: DeserializeOwned>(
        &self,
        kind: QueryKind,
        method: &str,
        params: Value,
    ) -> TransportResult<T> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        match self.rpc(method, params).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(error)) => Err(TransportError::query(
                kind,
                format!("{} (code {})", error.message, error.code),
            )),
            Err(e) if e.is_decode() => Err(TransportError::malformed(kind, e.to_string())),
            Err(e) => Err(TransportError::query(kind, e.to_string())),
        }
    }
}

/// Map a node's submission error onto a rejection reason.
fn classify_rejection(message: &str, data: Option<&Value>) -> RejectReason {
    let lower = message.to_ascii_lowercase();
    if lower.contains("balance") || lower.contains("to pay") || lower.contains("funds") {
        let field = |name: &str| {
            data.and_then(|d| d.get(name))
                .and_then(Value::as_str)
                .and_then(|s| s.parse::<Balance>().ok())
        };
        return RejectReason::InsufficientBalance {
            needed: field("needed"),
            available: field("available"),
        };
    }
    if lower.contains("nonce") || lower.contains("stale") || lower.contains("future") {
        return RejectReason::NonceConflict;
    }
    RejectReason::Other(message.to_string())
}

fn parse_balance(kind: QueryKind, field: &str, s: &str) -> TransportResult<Balance> {
    s.parse::<Balance>()
        .map_err(|_| TransportError::malformed(kind, format!("{}: '{}' is not an amount", field, s)))
}

fn parse_hash(kind: QueryKind, field: &str, s: &str) -> TransportResult<Hash> {
    hash_from_hex(s).map_err(|e| TransportError::malformed(kind, format!("{}: {}", field, e)))
}

fn parse_storage_deposit(wire: &StorageDepositWire) -> TransportResult<StorageDeposit> {
    let amount = || -> TransportResult<Balance> {
        let raw = wire.amount.as_deref().ok_or_else(|| {
            TransportError::malformed(QueryKind::DryRun, "storage deposit amount missing")
        })?;
        parse_balance(QueryKind::DryRun, "storageDeposit.amount", raw)
    };
    match wire.kind.as_str() {
        "charge" => Ok(StorageDeposit::Charge(amount()?)),
        "refund" => Ok(StorageDeposit::Refund(amount()?)),
        "none" => Ok(StorageDeposit::None),
        other => Err(TransportError::malformed(
            QueryKind::DryRun,
            format!("unknown storage deposit kind '{}'", other),
        )),
    }
}

#[async_trait]
impl ChainTransport for HttpTransport {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn cluster_pricing(&self) -> TransportResult<ClusterPricing> {
        let kind = QueryKind::ClusterPricing;
        let wire: ClusterInfoWire = self.call(kind, "cluster_info", json!([])).await?;
        Ok(ClusterPricing {
            gas_price: parse_balance(kind, "gasPrice", &wire.gas_price)?,
            deposit_per_byte: parse_balance(kind, "depositPerByte", &wire.deposit_per_byte)?,
            deposit_per_item: parse_balance(kind, "depositPerItem", &wire.deposit_per_item)?,
        })
    }

    async fn on_chain_account(&self, address: &Address) -> TransportResult<OnChainAccount> {
        let kind = QueryKind::OnChainAccount;
        let wire: AccountWire = self
            .call(kind, "system_account", json!([to_hex(address)]))
            .await?;
        Ok(OnChainAccount {
            free: parse_balance(kind, "free", &wire.free)?,
            nonce: wire.nonce,
        })
    }

    async fn cluster_balance(&self, address: &Address) -> TransportResult<Balance> {
        let kind = QueryKind::ClusterBalance;
        let wire: ClusterBalanceWire = self
            .call(kind, "cluster_balance", json!([to_hex(address)]))
            .await?;
        parse_balance(kind, "free", &wire.free)
    }

    async fn code_exists(
        &self,
        cert: &QueryCertificate,
        code_hash: &CodeHash,
    ) -> TransportResult<bool> {
        self.call(
            QueryKind::CodeExists,
            "cluster_codeExists",
            json!([cert, to_hex(code_hash)]),
        )
        .await
    }

    async fn estimate_instantiate(
        &self,
        cert: &QueryCertificate,
        query: &InstantiateQuery,
    ) -> TransportResult<DryRunResponse> {
        let params = InstantiateQueryWire {
            origin: to_hex(&query.origin),
            code_hash: to_hex(&query.code_hash),
            salt: to_hex(&query.salt),
            call_data: to_hex(&query.call_data),
            deposit: query.deposit.to_string(),
        };
        let wire: DryRunWire = self
            .call(
                QueryKind::DryRun,
                "cluster_estimateInstantiate",
                json!([cert, params]),
            )
            .await?;
        Ok(DryRunResponse {
            gas_consumed: wire.gas_consumed,
            gas_required: wire.gas_required,
            storage_deposit: parse_storage_deposit(&wire.storage_deposit)?,
            outcome: wire.outcome,
        })
    }

    async fn submit(&self, tx: &SignedTransaction) -> TransportResult<TxHash> {
        let kind = QueryKind::Submit;
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        let raw = tx
            .encode()
            .map_err(|e| TransportError::malformed(kind, e.to_string()))?;
        let envelope = to_hex(&raw);
        let hash: String = match self.rpc("author_submitTransaction", json!([envelope])).await {
            Ok(Ok(hash)) => hash,
            Ok(Err(error)) => {
                return Err(TransportError::Rejected(classify_rejection(
                    &error.message,
                    error.data.as_ref(),
                )))
            }
            Err(e) if e.is_decode() => return Err(TransportError::malformed(kind, e.to_string())),
            Err(e) => return Err(TransportError::query(kind, e.to_string())),
        };
        parse_hash(kind, "txHash", &hash)
    }

    async fn wait_finalized(&self, tx_hash: &TxHash) -> TransportResult<FinalizedTx> {
        let kind = QueryKind::Finality;
        let hex_hash = to_hex(tx_hash);
        loop {
            let status: TxStatusWire = self
                .call(kind, "author_transactionStatus", json!([hex_hash]))
                .await?;
            match status {
                TxStatusWire::Finalized {
                    block_number,
                    block_hash,
                    contract_address,
                    dispatch_error,
                } => {
                    let contract_address = contract_address
                        .as_deref()
                        .map(|a| parse_hash(kind, "contractAddress", a))
                        .transpose()?;
                    return Ok(FinalizedTx {
                        tx_hash: *tx_hash,
                        block_number,
                        block_hash: parse_hash(kind, "blockHash", &block_hash)?,
                        contract_address,
                        dispatch_error,
                    });
                }
                TxStatusWire::Dropped => {
                    return Err(TransportError::query(kind, "transaction dropped from pool"))
                }
                TxStatusWire::Invalid { reason } => {
                    return Err(TransportError::query(
                        kind,
                        format!(
                            "transaction invalid: {}",
                            reason.as_deref().unwrap_or("no reason given")
                        ),
                    ))
                }
                TxStatusWire::Pending | TxStatusWire::InBlock => {
                    debug!(tx = %hex_hash, "not finalized yet");
                    tokio::time::sleep(self.config.poll_interval).await;
                }
            }
        }
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            debug!(endpoint = %self.endpoint, "transport closed");
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
