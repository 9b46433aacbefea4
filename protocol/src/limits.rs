//! Limit calculator: transaction-safe limits from a dry-run estimate.
//!
//! - `gas_limit_value = gas_required * gas_price`
//! - `storage_deposit_limit = charge`, or 0 for refunds and no-ops
//! - `total_value = ceil((gas_limit_value + storage_deposit_limit) * (1 + margin))`
//!
//! All integer arithmetic; no network interaction, no hidden state.

use deploykit_primitives::{
    Balance, ClusterPricing, CostEstimate, GasLimit, GasLimitMode, Margin, TransactionLimits,
};

use crate::error::DeployErrorKind;

pub struct LimitCalculator;

impl LimitCalculator {
    /// Derive limits from `estimate`.
    ///
    /// Fails only with `InvariantViolation`, when a product or sum does not
    /// fit in a `Balance`.
    pub fn compute(
        estimate: &CostEstimate,
        pricing: &ClusterPricing,
        margin: &Margin,
        mode: GasLimitMode,
    ) -> Result<TransactionLimits, DeployErrorKind> {
        let gas_limit_value = u128::from(estimate.gas_required)
            .checked_mul(pricing.gas_price)
            .ok_or_else(|| {
                overflow(format!(
                    "gas_required {} * gas_price {}",
                    estimate.gas_required, pricing.gas_price
                ))
            })?;
        let storage_deposit_limit = estimate.storage_deposit.charged();
        let worst_case = gas_limit_value
            .checked_add(storage_deposit_limit)
            .ok_or_else(|| {
                overflow(format!(
                    "gas_limit_value {} + storage_deposit_limit {}",
                    gas_limit_value, storage_deposit_limit
                ))
            })?;
        let total_value = margin
            .apply_ceil(worst_case)
            .ok_or_else(|| overflow(format!("{} scaled by margin {}", worst_case, margin)))?;

        let gas_limit = match mode {
            GasLimitMode::Value => GasLimit::Value(gas_limit_value),
            GasLimitMode::Units => GasLimit::Units(estimate.gas_required),
        };

        let limits = TransactionLimits {
            gas_limit,
            gas_limit_value,
            storage_deposit_limit,
            total_value,
        };
        if !limits.is_covered() {
            return Err(DeployErrorKind::InvariantViolation(format!(
                "total_value {} does not cover {}",
                total_value, worst_case
            )));
        }
        Ok(limits)
    }

    /// Replace the computed value with a caller-chosen one.
    ///
    /// Fails with `InsufficientFunds` when `value` does not cover
    /// `gas_limit_value + storage_deposit_limit`.
    pub fn with_fixed_value(
        limits: TransactionLimits,
        value: Balance,
    ) -> Result<TransactionLimits, DeployErrorKind> {
        let fixed = TransactionLimits {
            total_value: value,
            ..limits
        };
        if !fixed.is_covered() {
            return Err(DeployErrorKind::InsufficientFunds {
                needed: limits.required_value(),
                available: Some(value),
            });
        }
        Ok(fixed)
    }
}

fn overflow(what: String) -> DeployErrorKind {
    DeployErrorKind::InvariantViolation(format!("balance overflow: {}", what))
}

#[cfg(test)]
mod tests {
    use super::*;
    use deploykit_primitives::StorageDeposit;

    fn pricing(gas_price: Balance) -> ClusterPricing {
        ClusterPricing {
            gas_price,
            deposit_per_byte: 1_000,
            deposit_per_item: 0,
        }
    }

    fn estimate(gas_required: u64, storage_deposit: StorageDeposit) -> CostEstimate {
        CostEstimate {
            gas_consumed: gas_required,
            gas_required,
            storage_deposit,
        }
    }

    #[test]
    fn test_reference_scenario() {
        let limits = LimitCalculator::compute(
            &estimate(2_000_000, StorageDeposit::Charge(300_000)),
            &pricing(1),
            &Margin::from_percent(5),
            GasLimitMode::Value,
        )
        .unwrap();
        assert_eq!(limits.gas_limit, GasLimit::Value(2_000_000));
        assert_eq!(limits.gas_limit_value, 2_000_000);
        assert_eq!(limits.storage_deposit_limit, 300_000);
        assert_eq!(limits.total_value, 2_415_000);
    }

    #[test]
    fn test_gas_price_scales_value() {
        let limits = LimitCalculator::compute(
            &estimate(2_000_000, StorageDeposit::None),
            &pricing(3),
            &Margin::ZERO,
            GasLimitMode::Value,
        )
        .unwrap();
        assert_eq!(limits.gas_limit_value, 6_000_000);
        assert_eq!(limits.total_value, 6_000_000);
    }

    #[test]
    fn test_units_mode_keeps_raw_units() {
        let limits = LimitCalculator::compute(
            &estimate(2_000_000, StorageDeposit::None),
            &pricing(3),
            &Margin::ZERO,
            GasLimitMode::Units,
        )
        .unwrap();
        assert_eq!(limits.gas_limit, GasLimit::Units(2_000_000));
        assert_eq!(limits.gas_limit_value, 6_000_000);
        assert_eq!(limits.total_value, 6_000_000);
    }

    #[test]
    fn test_refund_never_attaches_deposit() {
        for refund in [0, 1, 300_000, Balance::MAX] {
            let limits = LimitCalculator::compute(
                &estimate(10, StorageDeposit::Refund(refund)),
                &pricing(1),
                &Margin::from_percent(5),
                GasLimitMode::Value,
            )
            .unwrap();
            assert_eq!(limits.storage_deposit_limit, 0);
        }
    }

    #[test]
    fn test_total_covers_worst_case_across_margins() {
        let deposits = [0, 1, 999, 300_000, 1 << 80];
        let gas = [0u64, 1, 2_000_000, u64::MAX];
        for percent in [0u32, 1, 5, 33, 50, 99, 100] {
            let margin = Margin::from_percent(percent);
            for &g in &gas {
                for &d in &deposits {
                    let limits = LimitCalculator::compute(
                        &estimate(g, StorageDeposit::Charge(d)),
                        &pricing(7),
                        &margin,
                        GasLimitMode::Value,
                    )
                    .unwrap();
                    assert!(limits.total_value >= limits.gas_limit_value + limits.storage_deposit_limit);
                }
            }
        }
    }

    #[test]
    fn test_idempotent() {
        let e = estimate(1_234_567, StorageDeposit::Charge(89_000));
        let m: Margin = "0.075".parse().unwrap();
        let a = LimitCalculator::compute(&e, &pricing(11), &m, GasLimitMode::Value).unwrap();
        let b = LimitCalculator::compute(&e, &pricing(11), &m, GasLimitMode::Value).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_overflow_is_invariant_violation() {
        let err = LimitCalculator::compute(
            &estimate(u64::MAX, StorageDeposit::None),
            &pricing(Balance::MAX),
            &Margin::ZERO,
            GasLimitMode::Value,
        )
        .unwrap_err();
        assert!(matches!(err, DeployErrorKind::InvariantViolation(_)));
    }

    #[test]
    fn test_fixed_value_must_cover_limits() {
        let limits = LimitCalculator::compute(
            &estimate(2_000_000, StorageDeposit::Charge(300_000)),
            &pricing(1),
            &Margin::from_percent(5),
            GasLimitMode::Value,
        )
        .unwrap();

        let fixed = LimitCalculator::with_fixed_value(limits, 2_300_000).unwrap();
        assert_eq!(fixed.total_value, 2_300_000);
        assert_eq!(fixed.gas_limit, limits.gas_limit);

        let err = LimitCalculator::with_fixed_value(limits, 2_299_999).unwrap_err();
        assert_eq!(
            err,
            DeployErrorKind::InsufficientFunds {
                needed: Some(2_300_000),
                available: Some(2_299_999)
            }
        );
    }
}
