//! drossel-server — one server+queue+strategy instance.
//!
//! Two-phase startup: load configuration, then build the processing graph
//! (registry → strategy → queue → router) and serve it. Run standalone, or
//! as a worker under `drossel-supervisor`, which passes `--bind` and probes
//! the port for readiness. SIGTERM drains the queue within the configured
//! grace period before exit.

use std::sync::Arc;

use clap::Parser;
use tracing::info;

use drossel_core::DrosselConfig;
use drossel_server::{build_state, router};

/// Task-offload HTTP server.
#[derive(Parser, Debug)]
#[command(name = "drossel-server", version, about)]
struct Cli {
    /// Path to drossel.toml. Defaults apply when absent.
    #[arg(long, env = "DROSSEL_CONFIG")]
    config: Option<String>,

    /// Override the listen address.
    #[arg(long, env = "DROSSEL_BIND")]
    bind: Option<String>,

    /// Override the execution strategy
    /// (in_process | thread_pool | process_pool | null).
    #[arg(long, env = "DROSSEL_STRATEGY")]
    strategy: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => DrosselConfig::from_file(path)?,
        None => DrosselConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }
    if let Some(strategy) = &cli.strategy {
        config.engine.strategy = strategy.parse()?;
    }
    config.validate()?;

    let state = build_state(&config)?;
    let app = router(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!(
        addr = %listener.local_addr()?,
        strategy = state.queue.strategy_name(),
        "drossel-server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("draining task queue");
    let drained = state.queue.drain(config.server.drain_timeout()).await;
    if !drained {
        tracing::warn!("drain grace expired, remaining tasks cancelled");
    }
    info!("drossel-server exited");
    Ok(())
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(signal) => signal,
            Err(e) => {
                tracing::error!(error = %e, "failed to register SIGTERM handler");
                let _ = ctrl_c.await;
                return;
            }
        };
        tokio::select! {
            _ = ctrl_c => {},
            _ = sigterm.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }
}
