//! Run configuration: command-line arguments resolved against the environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use deploykit_primitives::{bytes_from_hex, Balance, CodeHash};
use deploykit_protocol::{DeployConfig, ValueMode};

use crate::args::Cli;

/// Environment variable holding the chain RPC endpoint.
pub const ENDPOINT_VAR: &str = "RPC_ENDPOINT";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("RPC_ENDPOINT is not set (export it or add it to .env)")]
    MissingEndpoint,

    #[error("either --auto-deposit or --value is required")]
    MissingValue,

    #[error("either --code-hash or --blueprint is required")]
    MissingTarget,

    #[error("cannot read argument file {}: {source}", path.display())]
    ArgFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid hex argument '{arg}': {message}")]
    HexArg { arg: String, message: String },

    #[error("--timeout-secs must be at least 1")]
    ZeroTimeout,
}

/// What the run deploys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    CodeHash {
        code_hash: CodeHash,
        call_data: Vec<u8>,
    },
    Blueprint {
        path: PathBuf,
        constructor: String,
        args: Vec<Vec<u8>>,
    },
}

/// Who funds whom before the deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundingPlan {
    pub faucet_seed: String,
    pub faucet_amount: Balance,
    /// Amount moved into the cluster, if requested.
    pub cluster_deposit: Option<Balance>,
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub endpoint: String,
    pub account_seed: Option<String>,
    pub funding: FundingPlan,
    pub target: Target,
    pub salt: Option<Vec<u8>>,
    pub deploy: DeployConfig,
    pub json: bool,
}

impl RunConfig {
    /// Resolve `cli` with the endpoint from `RPC_ENDPOINT`.
    pub fn from_env(cli: &Cli) -> Result<Self, ConfigError> {
        let endpoint = std::env::var(ENDPOINT_VAR).ok();
        Self::resolve(cli, endpoint)
    }

    pub fn resolve(cli: &Cli, endpoint: Option<String>) -> Result<Self, ConfigError> {
        let endpoint = endpoint
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty())
            .ok_or(ConfigError::MissingEndpoint)?;

        let value_mode = match (cli.auto_deposit, cli.value) {
            (true, _) => ValueMode::Auto,
            (false, Some(value)) => ValueMode::Fixed(value),
            (false, None) => return Err(ConfigError::MissingValue),
        };
        if cli.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        let target = match (&cli.code_hash, &cli.blueprint) {
            (Some(code_hash), _) => Target::CodeHash {
                code_hash: *code_hash,
                call_data: cli.call_data.clone().unwrap_or_default(),
            },
            (None, Some(path)) => Target::Blueprint {
                path: path.clone(),
                constructor: cli.constructor.clone(),
                args: cli
                    .args
                    .iter()
                    .map(|arg| load_arg(arg))
                    .collect::<Result<_, _>>()?,
            },
            (None, None) => return Err(ConfigError::MissingTarget),
        };

        let deploy = DeployConfig {
            limit_margin: cli.margin,
            guard_margin: cli.guard_margin,
            finalize_timeout: Duration::from_secs(cli.timeout_secs),
            gas_limit_mode: cli.gas_limit_mode,
            value_mode,
            check_code_exists: !cli.skip_code_check,
            deposit_drift_limit: cli.max_deposit_drift,
            ..DeployConfig::default()
        };

        Ok(Self {
            endpoint,
            account_seed: cli.account_seed.clone(),
            funding: FundingPlan {
                faucet_seed: cli.faucet_seed.clone(),
                faucet_amount: cli.faucet_amount,
                cluster_deposit: cli.deposit_to_cluster.then_some(cli.cluster_deposit),
            },
            target,
            salt: cli.salt.clone(),
            deploy,
            json: cli.json,
        })
    }
}

/// Constructor argument bytes: `@path` reads a file, `0x…` is hex, anything
/// else is taken as UTF-8 text.
pub fn load_arg(arg: &str) -> Result<Vec<u8>, ConfigError> {
    if let Some(path) = arg.strip_prefix('@') {
        let path = Path::new(path);
        return std::fs::read(path).map_err(|source| ConfigError::ArgFile {
            path: path.to_path_buf(),
            source,
        });
    }
    if arg.starts_with("0x") {
        return bytes_from_hex(arg).map_err(|e| ConfigError::HexArg {
            arg: arg.to_string(),
            message: e.to_string(),
        });
    }
    Ok(arg.as_bytes().to_vec())
}
