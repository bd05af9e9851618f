//! govrelay - Governance Proposal Notification Relay
//!
//! Watches an external governance service for proposals entering their
//! active epoch and pushes notifications to subscribed chats. Subscribers
//! sign up with /start and can ask "what's active right now" with
//! /proposals; a background poll cycle does the rest.

mod batcher;
mod config;
mod delivery;
mod error;
mod persist;
mod poller;
mod registry;
mod routes;
mod source;
mod state;
mod subscribers;
mod telegram;

use crate::config::Settings;
use crate::persist::StateFile;
use crate::poller::Poller;
use crate::routes::create_router;
use crate::source::HttpGovernanceSource;
use crate::state::AppState;
use crate::telegram::TelegramClient;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber for structured logging
    init_tracing();

    info!("🚀 Starting govrelay - Governance Proposal Notification Relay...");

    // Load configuration; a missing bot token or source URL is fatal
    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            error!("❌ FATAL: {}", e);
            return Err(e.into());
        }
    };
    info!("📋 Configuration loaded successfully");

    let source = Arc::new(HttpGovernanceSource::new(&settings.source)?);
    let messenger = Arc::new(TelegramClient::new(&settings.telegram)?);

    // Restore durable state, if any
    let state_file = StateFile::new(settings.persistence.path.clone());
    let restored = match state_file.load().await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            error!("❌ FATAL: Failed to load relay state: {}", e);
            return Err(anyhow::anyhow!("unreadable state file: {}", e));
        }
    };
    if restored.is_none() {
        info!("No saved state found, starting cold");
    }

    let state = Arc::new(AppState::new(
        source,
        messenger,
        state_file,
        settings.telegram.max_message_len,
        restored,
    ));

    // Background poll cycle
    let poller = Poller::new(state.clone(), &settings.poll);
    let poller_handle = tokio::spawn(poller.run());

    // Webhook + health server
    let app = create_router(state.clone());
    let addr = SocketAddr::from((settings.server.host, settings.server.port));

    info!("🌐 Relay listening on http://{}", addr);
    info!("   POST /webhook - chat platform updates (/start, /proposals)");
    info!("   GET  /health  - liveness and counters");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop polling before the final snapshot so no cycle races the save
    poller_handle.abort();
    if let Err(e) = state.persist().await {
        error!("Failed to save relay state on shutdown: {}", e);
    }

    info!("👋 Relay shutdown complete");
    Ok(())
}

/// Initialize tracing with structured logging
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,govrelay=debug,tower_http=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .compact(),
        )
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("📴 Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            info!("📴 Received terminate signal, initiating graceful shutdown...");
        },
    }
}
