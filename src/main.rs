// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use sa_kubeconfig::config::{Args, ProvisionConfig};
use sa_kubeconfig::Provisioner;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing; RUST_LOG overrides --verbose
    let level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("sa_kubeconfig={}", level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = ProvisionConfig::from(args);
    info!(
        "Provisioning service account {}/{} (context: {})",
        config.namespace,
        config.service_account_name,
        config.context()
    );

    let mut provisioner = Provisioner::new(config)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling provisioning");
            on_interrupt.cancel();
        }
    });

    match provisioner.run(&cancel).await {
        Ok(outcome) => {
            for warning in &outcome.warnings {
                warn!("{}", warning);
            }
            println!(
                "Created kubeconfig file at {}",
                outcome.kubeconfig_path.display()
            );
            Ok(())
        }
        Err(e) => {
            error!("Provisioning failed at stage '{}'", e.stage);
            Err(e.into())
        }
    }
}
