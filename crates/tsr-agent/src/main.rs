//! tsr-agent - Reports the local tmux session inventory to tsrd
//!
//! Collects the session tree from the local tmux server and pushes it
//! to the registry daemon on a fixed interval.
//!
//! # Usage
//!
//! ```bash
//! # Development, no authentication
//! SKIP_AUTH=true SERVER_URL=http://localhost:8080 \
//! SSH_HOST=10.0.0.5 SSH_USER=dev tsr-agent
//!
//! # Production
//! SERVER_URL=https://tsr.example.com \
//! SSH_HOST=10.0.0.5 SSH_USER=dev \
//! OIDC_ISSUER=https://auth.example.com/application/o/tsr/ \
//! OIDC_CLIENT_ID=agent-push OIDC_CLIENT_SECRET=... tsr-agent
//!
//! # Single push (for cron-style scheduling)
//! tsr-agent --once
//! ```
//!
//! # Signal Handling
//!
//! SIGTERM/SIGINT stop the push loop promptly.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use tsr_agent::config::AgentConfig;
use tsr_agent::oidc::TokenSource;
use tsr_agent::push::Pusher;
use tsr_core::PushRequest;
use tsr_tmux::{SessionCollector, TmuxCli};

/// tsr agent - pushes tmux session inventories to the registry
#[derive(Parser, Debug)]
#[command(name = "tsr-agent", version, about)]
struct Args {
    /// Push once and exit instead of looping
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("tsr_agent=info".parse()?)
                .add_directive("tsr_tmux=info".parse()?)
                .add_directive("tsr_core=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let config = AgentConfig::from_env().context("invalid configuration")?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        machine_name = %config.machine_name,
        server_url = %config.server_url,
        push_interval = ?config.push_interval,
        skip_auth = config.oidc.is_none(),
        "tsr-agent starting"
    );

    let cancel_token = CancellationToken::new();

    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown_signal().await {
            error!(error = %e, "Error waiting for shutdown signal");
        }
        info!("Shutdown signal received");
        shutdown_token.cancel();
    });

    let tokens = match &config.oidc {
        Some(oidc) => {
            let source = TokenSource::discover(&oidc.issuer, &oidc.client_id, &oidc.client_secret)
                .await
                .context("failed to initialise OIDC token source")?;
            Some(Arc::new(source))
        }
        None => {
            warn!("SKIP_AUTH is enabled, pushing without credentials (dev mode)");
            None
        }
    };

    let collector = SessionCollector::new();
    let pusher = Pusher::new(config.server_url.clone(), tokens);

    // First push immediately, then on the interval.
    push_once(&collector, &pusher, &config).await;

    if args.once {
        return Ok(());
    }

    // interval() panics on a zero period.
    let period = config.push_interval.max(Duration::from_millis(1));
    let mut ticker = tokio::time::interval(period);
    ticker.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => {
                info!("shutting down");
                break;
            }
            _ = ticker.tick() => {
                push_once(&collector, &pusher, &config).await;
            }
        }
    }

    Ok(())
}

/// One collect-and-push cycle. Failures are logged, never fatal.
async fn push_once(collector: &SessionCollector<TmuxCli>, pusher: &Pusher, config: &AgentConfig) {
    let sessions = match collector.collect().await {
        Ok(sessions) => sessions,
        Err(error) => {
            error!(%error, "failed to list tmux sessions");
            return;
        }
    };

    let count = sessions.len();
    let req = PushRequest {
        machine_name: config.machine_name.clone(),
        ssh_host: config.ssh_host.clone(),
        ssh_user: config.ssh_user.clone(),
        sessions,
    };

    if let Err(error) = pusher.push(&req).await {
        error!(%error, "failed to push sessions");
        return;
    }

    info!(count, "pushed sessions");
}

/// Waits for a shutdown signal (SIGTERM or SIGINT).
async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C");
    }

    Ok(())
}
