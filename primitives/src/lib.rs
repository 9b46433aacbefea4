//! `deploykit-primitives`: foundational types for estimate-then-commit deployments.
//!
//! This crate provides the balance and hash types, fixed-point safety
//! margins, cost and limit records, account keys, query certificates, and
//! the signed transaction envelope shared by the transport, the deployment
//! protocol, and the command-line driver.

pub mod types;
pub mod error;
pub mod margin;
pub mod cost;
pub mod crypto;
pub mod certificate;
pub mod codec;

// Re-export commonly used types at the crate root for convenience.
pub use types::{
    bytes_from_hex, format_balance, hash_from_hex, to_hex, Address, Balance, CodeHash,
    ComputationUnits, Hash, TxHash, UNIT,
};
pub use error::{PrimitiveError, PrimitiveResult};
pub use margin::Margin;
pub use cost::{
    BalanceSnapshot, ClusterPricing, CostEstimate, DepositDirection, GasLimit, GasLimitMode,
    StorageDeposit, TransactionLimits,
};
pub use crypto::Account;
pub use certificate::QueryCertificate;
pub use codec::{SignedTransaction, TransactionPayload};
