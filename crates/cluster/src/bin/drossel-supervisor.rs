//! drossel-supervisor — runs N sibling server processes behind one endpoint.
//!
//! Spawns `drossel-server` once per configured worker, each bound to
//! `base_port + i`, restarts crashed workers with bounded backoff, and
//! round-robins inbound connections across the ready set. Ctrl+C or SIGTERM
//! drains and stops everything.

use clap::Parser;
use tracing::info;

use drossel_cluster::{ClusterSupervisor, WorkerSpec};
use drossel_core::DrosselConfig;

/// Cluster supervisor for drossel server processes.
#[derive(Parser, Debug)]
#[command(name = "drossel-supervisor", version, about)]
struct Cli {
    /// Path to drossel.toml. Defaults apply when absent.
    #[arg(long, env = "DROSSEL_CONFIG")]
    config: Option<String>,

    /// Override the number of worker processes.
    #[arg(long, env = "DROSSEL_CLUSTER_WORKERS")]
    workers: Option<usize>,

    /// Override the public bind address.
    #[arg(long, env = "DROSSEL_CLUSTER_BIND")]
    bind: Option<String>,

    /// Path to the server binary. Defaults to a sibling of this executable.
    #[arg(long, env = "DROSSEL_SERVER_BINARY")]
    server_binary: Option<String>,
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
    if let Some(workers) = cli.workers {
        config.cluster.workers = workers;
    }
    if let Some(bind) = cli.bind {
        config.cluster.bind = bind;
    }

    let server_binary = match cli.server_binary {
        Some(path) => path,
        None => sibling_binary("drossel-server")?,
    };

    let spec = WorkerSpec::server(
        server_binary,
        vec!["--bind".into(), "127.0.0.1:{port}".into()],
    );

    let supervisor = ClusterSupervisor::new(config.cluster.clone(), spec);
    supervisor.start();

    tokio::select! {
        result = supervisor.serve_proxy() => result?,
        _ = shutdown_signal() => {
            info!("shutdown signal received");
        }
    }

    supervisor.shutdown().await;
    info!("drossel-supervisor exited");
    Ok(())
}

/// Resolve a binary living next to the current executable.
fn sibling_binary(name: &str) -> anyhow::Result<String> {
    let exe = std::env::current_exe()?;
    let dir = exe
        .parent()
        .ok_or_else(|| anyhow::anyhow!("current executable has no parent directory"))?;
    Ok(dir.join(name).to_string_lossy().into_owned())
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
