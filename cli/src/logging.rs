//! Tracing subscriber setup.

use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

/// Install the global subscriber: `RUST_LOG` filter (default `info`),
/// written to stderr so stdout carries only the report.
pub fn init_tracing(json: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        let layer = fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true);
        tracing::subscriber::set_global_default(Registry::default().with(filter).with(layer))?;
    } else {
        let layer = fmt::layer().with_writer(std::io::stderr).with_target(false);
        tracing::subscriber::set_global_default(Registry::default().with(filter).with(layer))?;
    }
    Ok(())
}
