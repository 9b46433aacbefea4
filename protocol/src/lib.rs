//! Estimate-then-commit deployment of contracts onto a metered cluster.
//!
//! A deployment attempt runs inside a [`Session`]: one transport
//! connection and one cluster pricing snapshot. The [`Deployer`] walks the
//! state machine in [`state`], pricing the instantiation with a
//! certificate-authorized dry run before committing funds, and returns a
//! [`DeploymentReport`] or a [`DeployError`] naming the stage that failed.

pub mod balance;
pub mod blueprint;
pub mod certificate;
pub mod config;
pub mod error;
pub mod estimator;
pub mod funding;
pub mod limits;
pub mod oracle;
pub mod orchestrator;
pub mod session;
pub mod state;

pub use balance::BalanceReader;
pub use blueprint::{Blueprint, BlueprintError, Constructor, ConstructorEncoder};
pub use certificate::{unix_now, CertificateIssuer, LocalCertificateIssuer};
pub use config::{DeployConfig, ValueMode};
pub use error::{DeployError, DeployErrorKind, DeployResult, DeployStage};
pub use estimator::{DryRunEstimator, InstantiateCall};
pub use funding::Funder;
pub use limits::LimitCalculator;
pub use oracle::CostOracle;
pub use orchestrator::{DeployRequest, Deployer, DeploymentReport, Reconciliation};
pub use session::Session;
pub use state::{DeployState, StateMachine};
