//! Deployment error types.
//!
//! Every failure aborts the attempt where it happens. `DeployError`
//! records which stage failed alongside a tagged `DeployErrorKind`;
//! nothing is converted to a string before it reaches the caller.

use core::fmt;
use std::time::Duration;

use deploykit_primitives::{to_hex, Balance, CodeHash, Margin, PrimitiveError, TxHash};
use deploykit_transport::{RejectReason, TransportError};

use crate::state::DeployState;

/// Where in the run a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployStage {
    /// Opening the session (reading cluster pricing).
    Session,
    /// Funding pre-steps before the deployment proper.
    Funding,
    /// Inside the deployment state machine, in the given state.
    Deploy(DeployState),
}

impl fmt::Display for DeployStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Session => write!(f, "session"),
            Self::Funding => write!(f, "funding"),
            Self::Deploy(state) => write!(f, "deploy[{}]", state),
        }
    }
}

/// What went wrong.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeployErrorKind {
    /// Network or RPC failure. Never retried.
    #[error(transparent)]
    Transport(TransportError),

    /// The simulated call itself failed; `reason` is the cluster's own text.
    #[error("simulation reverted: {reason}")]
    SimulationReverted { reason: String },

    /// Not enough balance to pay for the attempt.
    #[error("insufficient funds{}", funds_detail(.needed, .available))]
    InsufficientFunds {
        needed: Option<Balance>,
        available: Option<Balance>,
    },

    /// Finality was not observed in time. The transaction's fate is unknown.
    #[error("transaction {} not finalized within {:?}", to_hex(.tx_hash), .after)]
    Timeout { tx_hash: TxHash, after: Duration },

    /// An internal contract was broken.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("query certificate: {0}")]
    Certificate(String),

    #[error("code {} has not been uploaded to the cluster", to_hex(.0))]
    CodeNotUploaded(CodeHash),

    /// The dry run's storage deposit exceeds the prediction beyond the limit.
    #[error("storage deposit drift: predicted {predicted}, estimated {estimated}, limit {limit}")]
    DepositDrift {
        predicted: Balance,
        estimated: Balance,
        limit: Margin,
    },

    /// Included in a block but the dispatch failed.
    #[error("transaction failed: {reason}")]
    TransactionFailed { reason: String },

    /// The transaction could not be built, e.g. call data too long for
    /// its length prefix.
    #[error("transaction encoding: {0}")]
    Encoding(#[from] PrimitiveError),
}

fn funds_detail(needed: &Option<Balance>, available: &Option<Balance>) -> String {
    match (needed, available) {
        (Some(n), Some(a)) => format!(": needed {}, available {}", n, a),
        (Some(n), None) => format!(": needed {}", n),
        (None, Some(a)) => format!(": available {}", a),
        (None, None) => String::new(),
    }
}

impl From<TransportError> for DeployErrorKind {
    /// Balance rejections become `InsufficientFunds`; everything else stays
    /// a transport error.
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Rejected(RejectReason::InsufficientBalance { needed, available }) => {
                Self::InsufficientFunds { needed, available }
            }
            other => Self::Transport(other),
        }
    }
}

/// A failed deployment attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("deployment failed at {stage}: {kind}")]
pub struct DeployError {
    pub stage: DeployStage,
    pub kind: DeployErrorKind,
}

impl DeployError {
    pub fn new(stage: DeployStage, kind: impl Into<DeployErrorKind>) -> Self {
        Self {
            stage,
            kind: kind.into(),
        }
    }

    /// Whether re-running the whole protocol after funding could help.
    pub fn is_user_actionable(&self) -> bool {
        matches!(
            self.kind,
            DeployErrorKind::InsufficientFunds { .. } | DeployErrorKind::CodeNotUploaded(_)
        )
    }
}

/// Convenience result type for deployment operations.
pub type DeployResult<T> = Result<T, DeployError>;
