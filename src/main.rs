//! Outpost Agent
//!
//! A remote-execution agent: registers itself with a shared backing
//! store, then polls for jobs addressed to it, executes each job's script,
//! and records the results. Runs unattended; all communication goes
//! through the store.

use anyhow::Context;
use tokio::sync::watch;
use tracing::info;

use outpost_agent::config::Config;
use outpost_agent::registrar;
use outpost_agent::runner::ShellRunner;
use outpost_agent::scheduler::Scheduler;
use outpost_agent::store::HttpStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A .env file can stand in for real environment variables.
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env().context("configuration error")?;
    info!(
        store_url = %config.store.url,
        agent_name = %config.agent.name,
        poll_interval_secs = config.poll.interval_secs,
        script_timeout_secs = config.execution.script_timeout_secs,
        "configuration loaded"
    );
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let store = HttpStore::new(&config.store).context("failed to build store client")?;

    let agent = registrar::register(&store, &config.retry_policy(), &config.agent.name).await?;

    // Flip the shutdown flag on Ctrl+C / SIGTERM; the sender stays alive
    // inside the signal task until it fires.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let scheduler = Scheduler::new(store, ShellRunner::new(), agent, &config);
    scheduler.run(shutdown_rx).await?;

    info!("agent shutdown complete");
    Ok(())
}

/// Handle graceful shutdown signals (Ctrl+C, SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        },
    }
}
