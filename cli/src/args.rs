//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;

use deploykit_primitives::{bytes_from_hex, hash_from_hex, Balance, CodeHash, GasLimitMode, Margin};

/// 32 units at 12 decimals.
const DEFAULT_FAUCET_AMOUNT: Balance = 32_000_000_000_000;

/// 30 units at 12 decimals.
const DEFAULT_CLUSTER_DEPOSIT: Balance = 30_000_000_000_000;

/// Raw bytes parsed from hex. Aliased so clap takes one value, not a list.
pub type HexBytes = Vec<u8>;

#[derive(Parser, Debug)]
#[command(
    name = "deploykit",
    version,
    about = "Deploy a contract onto a metered execution cluster",
    long_about = "Prices the instantiation with a certificate-authorized dry run, derives \
                  transaction limits from the estimate, then submits and waits for finality.\n\n\
                  The chain endpoint is read from RPC_ENDPOINT (a .env file is honoured)."
)]
pub struct Cli {
    /// Code hash of an uploaded contract
    #[arg(long, value_parser = parse_code_hash, conflicts_with = "blueprint", required_unless_present = "blueprint")]
    pub code_hash: Option<CodeHash>,

    /// Hex-encoded constructor call data (with --code-hash)
    #[arg(long, value_parser = parse_hex, requires = "code_hash")]
    pub call_data: Option<HexBytes>,

    /// Blueprint artifact (JSON with source.hash and spec.constructors)
    #[arg(long)]
    pub blueprint: Option<PathBuf>,

    /// Constructor label in the blueprint
    #[arg(long, default_value = "default", requires = "blueprint")]
    pub constructor: String,

    /// Constructor argument: 0x-prefixed hex, @path to read a file, or a literal string
    #[arg(long = "arg", requires = "blueprint")]
    pub args: Vec<String>,

    /// Hex-encoded instantiation salt (random per attempt when unset)
    #[arg(long, value_parser = parse_hex)]
    pub salt: Option<HexBytes>,

    /// Seed phrase or 0x-hex secret of the deploying account (ephemeral account when unset)
    #[arg(long)]
    pub account_seed: Option<String>,

    /// Seed phrase of the account funding the deployer
    #[arg(long, default_value = "//Alice")]
    pub faucet_seed: String,

    /// Amount sent from the faucet to the deployer (0 skips the faucet)
    #[arg(long, default_value_t = DEFAULT_FAUCET_AMOUNT)]
    pub faucet_amount: Balance,

    /// Move --cluster-deposit from the deployer's on-chain balance into the cluster first
    #[arg(long)]
    pub deposit_to_cluster: bool,

    /// Amount moved by --deposit-to-cluster
    #[arg(long, default_value_t = DEFAULT_CLUSTER_DEPOSIT)]
    pub cluster_deposit: Balance,

    /// Derive the attached value from the dry-run estimate
    #[arg(long, conflicts_with = "value")]
    pub auto_deposit: bool,

    /// Attach exactly this value (required without --auto-deposit)
    #[arg(long)]
    pub value: Option<Balance>,

    /// Margin on the attached value, as a fraction ("0.05") or percentage ("5%")
    #[arg(long, default_value = "0.05")]
    pub margin: Margin,

    /// Margin on the predicted storage deposit used to pre-fund the dry run
    #[arg(long, default_value = "0.05")]
    pub guard_margin: Margin,

    /// Fail when the dry-run storage deposit exceeds the prediction by more than this margin
    #[arg(long)]
    pub max_deposit_drift: Option<Margin>,

    /// Finality wait bound, in seconds
    #[arg(long, default_value_t = 10)]
    pub timeout_secs: u64,

    /// Submit the gas limit as a value ("value") or in computation units ("units")
    #[arg(long, default_value = "value", value_parser = parse_gas_limit_mode)]
    pub gas_limit_mode: GasLimitMode,

    /// Skip the code-uploaded check before estimating
    #[arg(long)]
    pub skip_code_check: bool,

    /// Print the deployment report as JSON
    #[arg(long)]
    pub json: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: bool,
}

fn parse_code_hash(s: &str) -> Result<CodeHash, String> {
    hash_from_hex(s).map_err(|e| e.to_string())
}

fn parse_hex(s: &str) -> Result<HexBytes, String> {
    bytes_from_hex(s).map_err(|e| e.to_string())
}

fn parse_gas_limit_mode(s: &str) -> Result<GasLimitMode, String> {
    match s.to_ascii_lowercase().as_str() {
        "value" => Ok(GasLimitMode::Value),
        "units" => Ok(GasLimitMode::Units),
        other => Err(format!(
            "invalid gas limit mode '{}', expected 'value' or 'units'",
            other
        )),
    }
}
