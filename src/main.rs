use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use cidr_gate::{acl, api, config, metrics};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("cidr_gate=info".parse()?)
        )
        .init();

    info!("Starting cidr-gate v{}", env!("CARGO_PKG_VERSION"));

    let cfg = config::load()?;
    info!("Configuration loaded");

    // Policy shared between the gate middleware and the admin API
    let policy = Arc::new(acl::AccessPolicy::from_rules(&cfg.acl.allow, &cfg.acl.deny)?);
    let (white, black) = policy.stats().await;
    info!("Access policy seeded: {} white list rules, {} black list rules", white, black);

    let metrics = Arc::new(metrics::GateMetrics::default());

    api::serve(cfg, policy, metrics).await
}
