//! Transport-side error types.
//!
//! `TransportError` is returned by every [`ChainTransport`](crate::ChainTransport)
//! method. Query failures carry a [`QueryKind`] so callers can tell which
//! underlying read failed (for example the on-chain side versus the
//! cluster side of a balance snapshot).

use core::fmt;

use deploykit_primitives::Balance;

/// Which underlying request a transport error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QueryKind {
    ClusterPricing,
    OnChainAccount,
    ClusterBalance,
    CodeExists,
    DryRun,
    Submit,
    Finality,
}

impl QueryKind {
    /// All kinds, in protocol order.
    pub const ALL: [QueryKind; 7] = [
        QueryKind::ClusterPricing,
        QueryKind::OnChainAccount,
        QueryKind::ClusterBalance,
        QueryKind::CodeExists,
        QueryKind::DryRun,
        QueryKind::Submit,
        QueryKind::Finality,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClusterPricing => "cluster pricing",
            Self::OnChainAccount => "on-chain account",
            Self::ClusterBalance => "cluster balance",
            Self::CodeExists => "code exists",
            Self::DryRun => "dry run",
            Self::Submit => "submit",
            Self::Finality => "finality",
        }
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why the chain refused to accept a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// The sender cannot pay for the transaction. Amounts are filled in
    /// when the node reports them.
    InsufficientBalance {
        needed: Option<Balance>,
        available: Option<Balance>,
    },
    /// The nonce is stale or too far in the future.
    NonceConflict,
    Other(String),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientBalance { needed, available } => {
                write!(f, "insufficient balance")?;
                if let Some(needed) = needed {
                    write!(f, " (needed {}", needed)?;
                    match available {
                        Some(available) => write!(f, ", available {})", available)?,
                        None => write!(f, ")")?,
                    }
                }
                Ok(())
            }
            Self::NonceConflict => write!(f, "nonce conflict"),
            Self::Other(msg) => write!(f, "{}", msg),
        }
    }
}

/// Errors raised by a chain transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The endpoint could not be reached or rejected the handshake.
    #[error("cannot connect to {endpoint}: {message}")]
    Connect { endpoint: String, message: String },

    /// A request did not complete.
    #[error("{query} query failed: {message}")]
    Query { query: QueryKind, message: String },

    /// A response arrived but could not be interpreted.
    #[error("malformed {query} response: {message}")]
    Malformed { query: QueryKind, message: String },

    /// The chain refused a submitted transaction.
    #[error("transaction rejected: {0}")]
    Rejected(RejectReason),

    /// The transport was closed before the call.
    #[error("transport is closed")]
    Closed,

    /// Both reads of a balance snapshot failed.
    #[error("{on_chain}; {cluster}")]
    BalanceRead {
        on_chain: Box<TransportError>,
        cluster: Box<TransportError>,
    },
}

impl TransportError {
    pub fn query(query: QueryKind, message: impl Into<String>) -> Self {
        Self::Query {
            query,
            message: message.into(),
        }
    }

    pub fn malformed(query: QueryKind, message: impl Into<String>) -> Self {
        Self::Malformed {
            query,
            message: message.into(),
        }
    }

    /// The query this error is attributed to, if any.
    pub fn query_kind(&self) -> Option<QueryKind> {
        match self {
            Self::Query { query, .. } | Self::Malformed { query, .. } => Some(*query),
            Self::Rejected(_) => Some(QueryKind::Submit),
            Self::Connect { .. } | Self::Closed => None,
            Self::BalanceRead { on_chain, .. } => on_chain.query_kind(),
        }
    }

    /// Every query this error is attributed to.
    pub fn failed_queries(&self) -> Vec<QueryKind> {
        match self {
            Self::BalanceRead { on_chain, cluster } => {
                let mut kinds = on_chain.failed_queries();
                kinds.extend(cluster.failed_queries());
                kinds
            }
            other => other.query_kind().into_iter().collect(),
        }
    }
}

/// Convenience result type for transport calls.
pub type TransportResult<T> = Result<T, TransportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_query() {
        let err = TransportError::query(QueryKind::ClusterBalance, "connection reset");
        let s = err.to_string();
        assert!(s.contains("cluster balance"));
        assert!(s.contains("connection reset"));
    }

    #[test]
    fn test_query_kind_attribution() {
        assert_eq!(
            TransportError::malformed(QueryKind::DryRun, "bad json").query_kind(),
            Some(QueryKind::DryRun)
        );
        assert_eq!(
            TransportError::Rejected(RejectReason::NonceConflict).query_kind(),
            Some(QueryKind::Submit)
        );
        assert_eq!(TransportError::Closed.query_kind(), None);
        assert!(TransportError::Closed.failed_queries().is_empty());
    }

    #[test]
    fn test_balance_read_names_both_sides() {
        let err = TransportError::BalanceRead {
            on_chain: Box::new(TransportError::query(QueryKind::OnChainAccount, "state pruned")),
            cluster: Box::new(TransportError::query(QueryKind::ClusterBalance, "worker offline")),
        };
        assert_eq!(err.query_kind(), Some(QueryKind::OnChainAccount));
        assert_eq!(
            err.failed_queries(),
            vec![QueryKind::OnChainAccount, QueryKind::ClusterBalance]
        );
        let s = err.to_string();
        assert!(s.contains("state pruned"));
        assert!(s.contains("worker offline"));
    }

    #[test]
    fn test_reject_reason_display() {
        let r = RejectReason::InsufficientBalance {
            needed: Some(10),
            available: Some(3),
        };
        assert_eq!(r.to_string(), "insufficient balance (needed 10, available 3)");
        let r = RejectReason::InsufficientBalance {
            needed: None,
            available: None,
        };
        assert_eq!(r.to_string(), "insufficient balance");
        assert_eq!(
            RejectReason::Other("bad origin".into()).to_string(),
            "bad origin"
        );
    }

    #[test]
    fn test_all_kinds_have_distinct_names() {
        let mut names: Vec<&str> = QueryKind::ALL.iter().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), QueryKind::ALL.len());
    }
}
