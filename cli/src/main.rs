//! deploykit: deploy a contract onto a metered execution cluster.
//!
//! ```bash
//! # Deploy uploaded code, letting the dry run size the attached value
//! RPC_ENDPOINT=http://127.0.0.1:9933 deploykit --code-hash 0x96ca… --auto-deposit
//!
//! # Encode a blueprint constructor, fund the cluster first
//! deploykit --blueprint system.contract --constructor with_core \
//!     --arg @core.js --deposit-to-cluster --auto-deposit
//! ```

use std::process::ExitCode;

use clap::Parser;
use tracing::error;

mod args;
mod config;
mod logging;
mod output;
mod run;

use args::Cli;
use config::RunConfig;

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    if let Err(e) = logging::init_tracing(cli.log_json) {
        eprintln!("cannot initialise logging: {:#}", e);
        return ExitCode::FAILURE;
    }

    // Failures are reported once, through the log.
    match execute(&cli).await {
        Ok(rendered) => {
            println!("{}", rendered);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %format!("{:#}", e), "deployment failed");
            ExitCode::FAILURE
        }
    }
}

/// Resolve the configuration, deploy, and render the report.
async fn execute(cli: &Cli) -> anyhow::Result<String> {
    let config = RunConfig::from_env(cli)?;
    let json = config.json;
    let report = run::run(config).await?;
    output::format_report(&report, json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_execute_surfaces_config_errors() {
        // No --auto-deposit or --value: rejected whatever the endpoint.
        let hash = format!("0x{}", "11".repeat(32));
        let cli = Cli::try_parse_from(["deploykit", "--code-hash", hash.as_str()]).unwrap();
        let err = execute(&cli).await.unwrap_err();
        assert!(err.downcast_ref::<config::ConfigError>().is_some());
    }
}
