//! Deployment configuration.

use std::time::Duration;

use deploykit_primitives::{Balance, GasLimitMode, Margin};

/// How the value attached to the instantiation is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueMode {
    /// Derive it from the dry-run estimate and the limit margin.
    #[default]
    Auto,
    /// Attach exactly this amount. It must still cover the computed limits.
    Fixed(Balance),
}

/// Configuration for one deployment attempt.
///
/// Controls safety margins, the finality bound, and which optional checks run.
#[derive(Debug, Clone)]
pub struct DeployConfig {
    /// Margin applied to `gas_limit_value + storage_deposit_limit` to get
    /// the attached value. Default: 5%.
    pub limit_margin: Margin,

    /// Margin applied to the predicted storage deposit to pre-fund the
    /// dry run. Default: 5%.
    pub guard_margin: Margin,

    /// Upper bound on the finality wait. Default: 10 seconds.
    pub finalize_timeout: Duration,

    /// Whether the gas limit is submitted as a value or as raw units.
    pub gas_limit_mode: GasLimitMode,

    pub value_mode: ValueMode,

    /// Check that the code is uploaded before estimating. Default: true.
    pub check_code_exists: bool,

    /// Fail when the estimated storage deposit exceeds the prediction by
    /// more than this margin. `None` only logs the drift.
    pub deposit_drift_limit: Option<Margin>,

    /// Lifetime of the query certificate. Default: 1 hour.
    pub certificate_ttl: Duration,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            limit_margin: Margin::from_percent(5),
            guard_margin: Margin::from_percent(5),
            finalize_timeout: Duration::from_secs(10),
            gas_limit_mode: GasLimitMode::Value,
            value_mode: ValueMode::Auto,
            check_code_exists: true,
            deposit_drift_limit: None,
            certificate_ttl: Duration::from_secs(3600),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DeployConfig::default();
        assert_eq!(config.limit_margin, Margin::from_percent(5));
        assert_eq!(config.guard_margin, Margin::from_percent(5));
        assert_eq!(config.finalize_timeout, Duration::from_secs(10));
        assert_eq!(config.gas_limit_mode, GasLimitMode::Value);
        assert_eq!(config.value_mode, ValueMode::Auto);
        assert!(config.check_code_exists);
        assert!(config.deposit_drift_limit.is_none());
    }
}
