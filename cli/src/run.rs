//! One deployment run: connect, fund, deploy, report.

use anyhow::Context;
use tracing::{debug, info};

use deploykit_primitives::{format_balance, to_hex, Account};
use deploykit_protocol::{Blueprint, DeployRequest, Deployer, DeploymentReport, Funder, Session};
use deploykit_transport::HttpTransport;

use crate::config::{FundingPlan, RunConfig, Target};

pub async fn run(config: RunConfig) -> anyhow::Result<DeploymentReport> {
    let request = build_request(&config)?;

    let transport = HttpTransport::connect(&config.endpoint)
        .await
        .with_context(|| format!("cannot connect to {}", config.endpoint))?;
    let session = Session::open(transport).await?;

    let account = load_account(config.account_seed.as_deref())?;
    info!(
        account = %to_hex(&account.address()),
        ephemeral = config.account_seed.is_none(),
        "deploying account"
    );
    if config.account_seed.is_none() {
        debug!(secret = %account.secret_hex(), "ephemeral account secret");
    }

    fund(&session, &config, &account).await?;

    let report = Deployer::new(&session, config.deploy.clone())
        .deploy(&account, &request)
        .await?;
    session.close();
    Ok(report)
}

/// `0x`-prefixed 32-byte secret, a seed phrase, or a fresh ephemeral account.
fn load_account(seed: Option<&str>) -> anyhow::Result<Account> {
    Ok(match seed {
        Some(secret) if secret.starts_with("0x") => {
            Account::from_secret_hex(secret).context("invalid account secret")?
        }
        Some(phrase) => Account::from_seed_phrase(phrase),
        None => Account::generate(),
    })
}

fn build_request(config: &RunConfig) -> anyhow::Result<DeployRequest> {
    let request = match &config.target {
        Target::CodeHash {
            code_hash,
            call_data,
        } => DeployRequest::new(*code_hash, call_data.clone()),
        Target::Blueprint {
            path,
            constructor,
            args,
        } => {
            let blueprint = Blueprint::from_file(path)
                .with_context(|| format!("cannot load blueprint {}", path.display()))?;
            DeployRequest::from_encoder(&blueprint, constructor, args)?
        }
    };
    Ok(match &config.salt {
        Some(salt) => request.with_salt(salt.clone()),
        None => request,
    })
}

async fn fund(session: &Session, config: &RunConfig, account: &Account) -> anyhow::Result<()> {
    let FundingPlan {
        faucet_seed,
        faucet_amount,
        cluster_deposit,
    } = &config.funding;
    let funder = Funder::new(session, config.deploy.finalize_timeout);

    let faucet = Account::from_seed_phrase(faucet_seed);
    if *faucet_amount > 0 && faucet.address() != account.address() {
        funder
            .transfer_on_chain(&faucet, &account.address(), *faucet_amount)
            .await?;
        info!(amount = %format_balance(*faucet_amount), "faucet transfer finalized");
    }

    if let Some(amount) = cluster_deposit {
        funder.transfer_to_cluster(account, *amount).await?;
        info!(amount = %format_balance(*amount), "cluster deposit finalized");
    }
    Ok(())
}
