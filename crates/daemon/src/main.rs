// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock Entity Daemon (rwld)
//!
//! Hosts the active coordinator and its mirrors for one lock entity.
//! SIGUSR1 drops the active and fails over to a standby.

use std::path::PathBuf;

use rwl_daemon::{setup_logging, startup, Config};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let config_path = if args.len() > 1 {
        PathBuf::from(&args[1])
    } else {
        PathBuf::from("rwld.toml")
    };

    let config = Config::load(&config_path)?;
    let log_guard = setup_logging(&config)?;

    info!("Starting rwld with config: {}", config_path.display());

    let mut host = match startup(&config).await {
        Ok(host) => host,
        Err(e) => {
            error!("Failed to start entity: {}", e);
            drop(log_guard);
            return Err(e.into());
        }
    };

    // Deliver grant notices; no transport is attached, so they are logged
    if let Some(mut grants) = host.take_grants() {
        tokio::spawn(async move {
            while let Some(notice) = grants.recv().await {
                info!(
                    session = %notice.session,
                    lock = %notice.name,
                    mode = %notice.mode,
                    partition = %notice.partition,
                    "grant delivered"
                );
            }
        });
    }

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigusr1 = signal(SignalKind::user_defined1())?;

    info!(
        "Entity ready: {} partitions, {} mirrors",
        config.partitions, config.mirrors
    );

    // Signal ready for parent process
    println!("READY");

    loop {
        tokio::select! {
            _ = sigusr1.recv() => {
                info!("Received SIGUSR1, failing over...");
                match host.fail_active().await {
                    Ok(mirror) => info!("Promoted {}", mirror),
                    Err(e) => error!("Failover failed: {}", e),
                }
            }

            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down...");
                host.shutdown().await;
                break;
            }

            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down...");
                host.shutdown().await;
                break;
            }
        }
    }

    info!("Daemon stopped");
    Ok(())
}
