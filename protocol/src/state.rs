//! Deployment state machine.
//!
//! ```text
//! Init -> CertificateAcquired -> PrefundGuardComputed -> EstimateObtained
//!      -> LimitsComputed -> Submitted -> Finalized
//! ```
//!
//! Every non-terminal state may also move to `Failed`. Transitions only
//! ever go one step forward; anything else is a programming error.

use core::fmt;

use serde::Serialize;
use tracing::info;

use crate::error::{DeployError, DeployErrorKind, DeployStage};

/// States of one deployment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeployState {
    Init,
    CertificateAcquired,
    PrefundGuardComputed,
    EstimateObtained,
    LimitsComputed,
    Submitted,
    Finalized,
    Failed,
}

impl DeployState {
    /// The only state this one may advance to on success.
    pub fn successor(&self) -> Option<DeployState> {
        match self {
            Self::Init => Some(Self::CertificateAcquired),
            Self::CertificateAcquired => Some(Self::PrefundGuardComputed),
            Self::PrefundGuardComputed => Some(Self::EstimateObtained),
            Self::EstimateObtained => Some(Self::LimitsComputed),
            Self::LimitsComputed => Some(Self::Submitted),
            Self::Submitted => Some(Self::Finalized),
            Self::Finalized | Self::Failed => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finalized | Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::CertificateAcquired => "certificate-acquired",
            Self::PrefundGuardComputed => "prefund-guard-computed",
            Self::EstimateObtained => "estimate-obtained",
            Self::LimitsComputed => "limits-computed",
            Self::Submitted => "submitted",
            Self::Finalized => "finalized",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for DeployState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks the current state and the path taken through the machine.
#[derive(Debug, Clone)]
pub struct StateMachine {
    state: DeployState,
    history: Vec<DeployState>,
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            state: DeployState::Init,
            history: vec![DeployState::Init],
        }
    }

    pub fn state(&self) -> DeployState {
        self.state
    }

    /// Every state visited so far, in order.
    pub fn history(&self) -> &[DeployState] {
        &self.history
    }

    /// Move to `next`, which must be the successor of the current state.
    pub fn advance(&mut self, next: DeployState) -> Result<(), DeployError> {
        if self.state.successor() != Some(next) {
            let message = format!("illegal transition {} -> {}", self.state, next);
            return Err(self.fail(DeployErrorKind::InvariantViolation(message)));
        }
        info!(from = %self.state, to = %next, "deployment state transition");
        self.state = next;
        self.history.push(next);
        Ok(())
    }

    /// Move to `Failed`, attributing `kind` to the state the machine was in.
    pub fn fail(&mut self, kind: DeployErrorKind) -> DeployError {
        let stage = DeployStage::Deploy(self.state);
        if self.state != DeployState::Failed {
            self.state = DeployState::Failed;
            self.history.push(DeployState::Failed);
        }
        DeployError::new(stage, kind)
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}
