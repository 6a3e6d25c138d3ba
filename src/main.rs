//! Account Service
//! Mission: Register, authenticate, and manage user accounts over HTTP

use account_service::{
    auth::{AccountsState, PasswordHasher, SqliteAccountStore, TokenService},
    config::Config,
    routes::build_router,
};
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    init_tracing();

    info!("🚀 Account service starting");

    let tokens = TokenService::new(
        &config.jwt_secret,
        chrono::Duration::hours(config.jwt_expiration_hours),
    )
    .context("Failed to initialize token service")?;

    let store = SqliteAccountStore::open(&config.database_url)
        .context("Failed to open account store")?;
    info!("🔐 Account store connected");

    let state = AccountsState::new(
        Arc::new(store),
        Arc::new(tokens),
        PasswordHasher::new(config.bcrypt_cost),
    );

    let app = build_router(state);

    let addr = config.listen_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("🎯 API server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("👋 Account service stopped");
    Ok(())
}

/// Initialize tracing
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "account_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
