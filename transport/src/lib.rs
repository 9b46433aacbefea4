//! `deploykit-transport`: the chain collaborator behind a deployment.
//!
//! This crate defines the network-facing seam of the deployment protocol:
//!
//! - `ChainTransport` trait: pricing, ledger reads, certificate-authorized
//!   queries, submission, and finality
//! - `TransportError`: transport error taxonomy, tagged with the failing query
//! - `MemChain`: in-memory chain and cluster ledger for testing
//! - `HttpTransport`: JSON-RPC over HTTP for a real node

pub mod error;
pub mod traits;
pub mod mem_chain;
pub mod http;

// Re-export commonly used types at the crate root.
pub use error::{QueryKind, RejectReason, TransportError, TransportResult};
pub use traits::{
    CallOutcome, ChainTransport, DryRunResponse, FinalizedTx, InstantiateQuery, OnChainAccount,
};
pub use mem_chain::{CallCounts, Finality, MemChain};
pub use http::{HttpConfig, HttpTransport};
