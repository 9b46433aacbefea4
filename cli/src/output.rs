//! Report rendering for stdout.

use std::fmt::Write;

use deploykit_primitives::{format_balance, to_hex};
use deploykit_protocol::DeploymentReport;

pub fn format_report(report: &DeploymentReport, json: bool) -> anyhow::Result<String> {
    if json {
        return Ok(serde_json::to_string_pretty(report)?);
    }

    let mut out = String::new();
    writeln!(out, "contract      {}", to_hex(&report.contract_address))?;
    writeln!(out, "transaction   {}", to_hex(&report.tx_hash))?;
    writeln!(
        out,
        "block         #{} {}",
        report.block_number,
        to_hex(&report.block_hash)
    )?;
    writeln!(
        out,
        "estimate      {} units required ({} consumed), storage {} {}",
        report.estimate.gas_required,
        report.estimate.gas_consumed,
        report.estimate.storage_deposit.direction(),
        format_balance(report.estimate.storage_deposit.amount())
    )?;
    writeln!(
        out,
        "limits        gas {}, storage deposit {}, value {}",
        report.limits.gas_limit,
        format_balance(report.limits.storage_deposit_limit),
        format_balance(report.limits.total_value)
    )?;
    match &report.reconciliation {
        Some(r) => writeln!(
            out,
            "realized      {} (cluster delta {}, on-chain delta {}){}",
            r.realized_cost,
            r.cluster_delta,
            r.on_chain_delta,
            if r.within_attached() {
                ""
            } else {
                "  EXCEEDS ATTACHED VALUE"
            }
        )?,
        None => writeln!(out, "realized      unknown (post-deployment balance read failed)")?,
    }
    Ok(out)
}
