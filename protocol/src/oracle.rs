//! Cost oracle: expected storage deposit for an encoded call.
//!
//! The prediction only sizes the pre-funding of the dry run. The dry run's
//! own report is the authoritative cost.

use deploykit_primitives::{Balance, ClusterPricing, Margin};

pub struct CostOracle;

impl CostOracle {
    /// `deposit_per_byte * payload.len()`, saturating at `Balance::MAX`.
    pub fn predict_storage_deposit(payload: &[u8], pricing: &ClusterPricing) -> Balance {
        pricing
            .deposit_per_byte
            .saturating_mul(payload.len() as Balance)
    }

    /// Scale a prediction up by `guard_margin`, rounding up, to get the
    /// deposit credited to the dry run. Saturates at `Balance::MAX`.
    pub fn guard_deposit(prediction: Balance, guard_margin: &Margin) -> Balance {
        guard_margin.apply_ceil(prediction).unwrap_or(Balance::MAX)
    }
}
