//! Pricing parameters, cost estimates, transaction limits, and balance snapshots.
//!
//! These are the values that flow through one deployment attempt: the
//! cluster's pricing snapshot, the dry run's [`CostEstimate`], the
//! [`TransactionLimits`] derived from it, and the before/after
//! [`BalanceSnapshot`]s used for reconciliation.

use core::fmt;

use serde::Serialize;

use crate::types::{Balance, ComputationUnits};

/// Cluster-wide pricing parameters.
///
/// Read once per session; governance can change them at any time, so a
/// snapshot must never outlive the session it was read in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClusterPricing {
    /// Price of one computation unit.
    pub gas_price: Balance,
    /// Storage deposit charged per byte persisted.
    pub deposit_per_byte: Balance,
    /// Storage deposit charged per storage item persisted.
    pub deposit_per_item: Balance,
}

/// Direction of the storage deposit reported by a dry run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DepositDirection {
    Charge,
    Refund,
    None,
}

impl fmt::Display for DepositDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Charge => write!(f, "charge"),
            Self::Refund => write!(f, "refund"),
            Self::None => write!(f, "none"),
        }
    }
}

/// Storage deposit charged or refunded by a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageDeposit {
    Charge(Balance),
    Refund(Balance),
    None,
}

impl StorageDeposit {
    pub fn direction(&self) -> DepositDirection {
        match self {
            Self::Charge(_) => DepositDirection::Charge,
            Self::Refund(_) => DepositDirection::Refund,
            Self::None => DepositDirection::None,
        }
    }

    /// The absolute amount, regardless of direction.
    pub fn amount(&self) -> Balance {
        match self {
            Self::Charge(v) | Self::Refund(v) => *v,
            Self::None => 0,
        }
    }

    /// The amount that has to be attached to a transaction: the charge, or
    /// zero for refunds and no-ops.
    pub fn charged(&self) -> Balance {
        match self {
            Self::Charge(v) => *v,
            Self::Refund(_) | Self::None => 0,
        }
    }
}

/// Authoritative cost of a call, as reported by the cluster's dry run.
///
/// Produced once per dry run and consumed once by the limit calculator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CostEstimate {
    /// Computation units actually consumed by the simulated call.
    pub gas_consumed: ComputationUnits,
    /// Computation units the call needs as a limit to succeed.
    pub gas_required: ComputationUnits,
    /// Storage deposit charged or refunded.
    pub storage_deposit: StorageDeposit,
}

/// How the submission API expects the gas limit to be expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GasLimitMode {
    /// Gas limit is a value: `gas_required * gas_price`.
    #[default]
    Value,
    /// Gas limit is raw computation units; the price only feeds the value sum.
    Units,
}

/// Gas limit as submitted with the transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GasLimit {
    Value(Balance),
    Units(ComputationUnits),
}

impl GasLimit {
    /// Raw number carried on the wire.
    pub fn raw(&self) -> u128 {
        match self {
            Self::Value(v) => *v,
            Self::Units(u) => u128::from(*u),
        }
    }
}

impl fmt::Display for GasLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => write!(f, "{} (value)", v),
            Self::Units(u) => write!(f, "{} (units)", u),
        }
    }
}

/// Limits attached to the real (mutating) transaction.
///
/// Invariant: `total_value >= gas_limit_value + storage_deposit_limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransactionLimits {
    /// Gas limit in the form the submission API takes.
    pub gas_limit: GasLimit,
    /// Gas limit converted to value terms.
    pub gas_limit_value: Balance,
    /// Maximum storage deposit the transaction may charge.
    pub storage_deposit_limit: Balance,
    /// Value attached to the transaction.
    pub total_value: Balance,
}

impl TransactionLimits {
    /// `gas_limit_value + storage_deposit_limit`, or `None` on overflow.
    pub fn required_value(&self) -> Option<Balance> {
        self.gas_limit_value.checked_add(self.storage_deposit_limit)
    }

    /// Whether `total_value` covers the worst-case cost.
    pub fn is_covered(&self) -> bool {
        matches!(self.required_value(), Some(required) if self.total_value >= required)
    }
}

/// Spendable balances of one account, on the base chain and in the cluster.
///
/// Diagnostic only; never used for control decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BalanceSnapshot {
    pub on_chain_free: Balance,
    pub cluster_free: Balance,
}

impl BalanceSnapshot {
    /// `self.cluster_free - later.cluster_free` as a signed delta.
    pub fn cluster_delta(&self, later: &BalanceSnapshot) -> i128 {
        signed_delta(self.cluster_free, later.cluster_free)
    }

    /// `self.on_chain_free - later.on_chain_free` as a signed delta.
    pub fn on_chain_delta(&self, later: &BalanceSnapshot) -> i128 {
        signed_delta(self.on_chain_free, later.on_chain_free)
    }
}

/// `before - after`, saturating at the i128 bounds.
fn signed_delta(before: Balance, after: Balance) -> i128 {
    if before >= after {
        i128::try_from(before - after).unwrap_or(i128::MAX)
    } else {
        i128::try_from(after - before).map(|v| -v).unwrap_or(i128::MIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_deposit_accessors() {
        let charge = StorageDeposit::Charge(300);
        assert_eq!(charge.direction(), DepositDirection::Charge);
        assert_eq!(charge.amount(), 300);
        assert_eq!(charge.charged(), 300);

        let refund = StorageDeposit::Refund(120);
        assert_eq!(refund.direction(), DepositDirection::Refund);
        assert_eq!(refund.amount(), 120);
        assert_eq!(refund.charged(), 0);

        assert_eq!(StorageDeposit::None.amount(), 0);
        assert_eq!(StorageDeposit::None.charged(), 0);
    }

    #[test]
    fn test_gas_limit_raw() {
        assert_eq!(GasLimit::Value(2_000_000).raw(), 2_000_000);
        assert_eq!(GasLimit::Units(7).raw(), 7);
    }

    #[test]
    fn test_limits_coverage() {
        let limits = TransactionLimits {
            gas_limit: GasLimit::Value(100),
            gas_limit_value: 100,
            storage_deposit_limit: 50,
            total_value: 150,
        };
        assert!(limits.is_covered());
        let short = TransactionLimits {
            total_value: 149,
            ..limits
        };
        assert!(!short.is_covered());
    }

    #[test]
    fn test_limits_required_value_overflow() {
        let limits = TransactionLimits {
            gas_limit: GasLimit::Value(u128::MAX),
            gas_limit_value: u128::MAX,
            storage_deposit_limit: 1,
            total_value: u128::MAX,
        };
        assert_eq!(limits.required_value(), None);
        assert!(!limits.is_covered());
    }

    #[test]
    fn test_snapshot_deltas() {
        let before = BalanceSnapshot {
            on_chain_free: 1_000,
            cluster_free: 500,
        };
        let after = BalanceSnapshot {
            on_chain_free: 400,
            cluster_free: 700,
        };
        assert_eq!(before.on_chain_delta(&after), 600);
        assert_eq!(before.cluster_delta(&after), -200);
    }

    #[test]
    fn test_signed_delta_saturates() {
        assert_eq!(signed_delta(u128::MAX, 0), i128::MAX);
        assert_eq!(signed_delta(0, u128::MAX), i128::MIN);
    }

    #[test]
    fn test_storage_deposit_serializes_tagged() {
        let json = serde_json::to_string(&StorageDeposit::Charge(5)).unwrap();
        assert_eq!(json, r#"{"charge":5}"#);
    }
}
