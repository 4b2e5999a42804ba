//! tsrd - Central registry daemon for tmux session inventories
//!
//! Agents across the fleet push their tmux session trees here; clients
//! poll the aggregate over HTTP.
//!
//! # Usage
//!
//! ```bash
//! # Development, no authentication
//! SKIP_AUTH=true tsrd
//!
//! # Production
//! OIDC_ISSUER=https://auth.example.com/application/o/tsr/ \
//! OIDC_CLIENT_IDS=agent-push,dashboard \
//! OIDC_CLIENT_ID=tsrd OIDC_CLIENT_SECRET=... \
//! SESSION_TTL=60s tsrd
//!
//! # Enable debug logging
//! RUST_LOG=tsrd=debug tsrd
//! ```
//!
//! # Signal Handling
//!
//! SIGTERM/SIGINT trigger a graceful shutdown: in-flight requests
//! finish, the eviction task exits, the process stops.

use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use tsrd::api::{self, AppState};
use tsrd::auth::{AuthContext, OidcVerifier};
use tsrd::config::ServerConfig;
use tsrd::registry::{spawn_eviction_task, Registry};

/// tsr daemon - aggregates tmux session inventories from the fleet
#[derive(Parser, Debug)]
#[command(name = "tsrd", version, about)]
struct Args {
    /// Listen address, overriding LISTEN_ADDR
    #[arg(long)]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("tsrd=info".parse()?)
                .add_directive("tsr_core=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let mut config = ServerConfig::from_env().context("invalid configuration")?;
    if let Some(listen) = args.listen {
        config.listen_addr = listen;
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        pid = process::id(),
        listen_addr = %config.listen_addr,
        session_ttl = ?config.session_ttl,
        skip_auth = config.oidc.is_none(),
        "tsrd starting"
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

    let auth = match &config.oidc {
        Some(oidc) => {
            let verifier =
                OidcVerifier::discover(&oidc.issuer, &oidc.client_id, &oidc.client_secret)
                    .await
                    .context("failed to initialise OIDC verifier")?;
            info!(
                issuer = %oidc.issuer,
                accepted = ?oidc.accepted_client_ids,
                "OIDC authentication enabled"
            );
            Some(Arc::new(AuthContext {
                verifier: Arc::new(verifier),
                accepted_client_ids: oidc.accepted_client_ids.clone(),
            }))
        }
        None => {
            warn!("SKIP_AUTH is enabled, authentication is disabled (dev mode)");
            None
        }
    };

    let registry = Arc::new(Registry::new(config.session_ttl));
    let eviction_handle = spawn_eviction_task(
        registry.clone(),
        config.session_ttl / 2,
        cancel_token.clone(),
    );

    let app = api::router(AppState { registry, auth });

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;

    info!(listen_addr = %config.listen_addr, "listening");

    let shutdown = cancel_token.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("server error")?;

    // Stop the eviction task if the server exited on its own.
    cancel_token.cancel();
    let _ = eviction_handle.await;

    info!("tsrd stopped");
    Ok(())
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
