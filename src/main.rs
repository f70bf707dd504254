// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use chain_recorder::{config, server, service};

#[derive(Parser, Debug)]
#[command(name = "chain-recorder")]
struct Args {
    /// Listen address, e.g. 127.0.0.1:3000 (overrides config)
    #[arg(long)]
    listen: Option<String>,

    /// Path of the saved chains JSON document (overrides config)
    #[arg(long)]
    storage: Option<String>,

    /// Optional config TOML path
    #[arg(long)]
    config: Option<String>,
}

async fn resolve_config(args: &Args) -> config::Config {
    let mut cfg = if let Some(ref p) = args.config {
        config::Config::load_from_path(p).await.unwrap_or_else(|e| {
            warn!(%p, %e, "failed to load config, using defaults");
            config::Config::default()
        })
    } else {
        config::Config::default()
    };

    if let Some(ref listen) = args.listen {
        cfg.general.listen = listen.clone();
    }
    if let Some(ref storage) = args.storage {
        cfg.general.storage = storage.clone();
    }
    cfg
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    let cfg = resolve_config(&args).await;
    let addr = cfg.listen_addr()?;

    let svc = Arc::new(service::ChainService::from_config(&cfg).await);
    info!(storage = %cfg.general.storage, "chain store ready");

    let server = server::run_server(addr, svc);

    tokio::select! {
        res = server => {
            if let Err(e) = res {
                error!(%e, "server error");
            }
        }
        _ = signal::ctrl_c() => {
            info!("shutting down");
        }
    }

    Ok(())
}
