//! taskboard-hub server entry point.
//!
//! Starts the hub task, the optional mutation listener and the Axum server.

use anyhow::Context;
use axum::http::HeaderName;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use taskboard_hub::api;
use taskboard_hub::app_state::AppState;
use taskboard_hub::config::ServiceConfig;
use taskboard_hub::hub::{DenyAll, Hub};
use taskboard_hub::persistence::{self, MutationListener, PostgresBoardAccess};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = ServiceConfig::from_env().context("loading configuration")?;
    tracing::info!(addr = %config.listen_addr, "starting taskboard-hub");

    let user_header = HeaderName::try_from(config.auth_user_header.as_str())
        .context("AUTH_USER_HEADER is not a valid header name")?;
    let shutdown = CancellationToken::new();

    // Build the hub and its collaborators
    let (hub_task, listener_task, hub) = match &config.database {
        Some(database) => {
            let pool = persistence::connect(database)
                .await
                .context("connecting to PostgreSQL")?;
            let (hub, handle) = Hub::new(PostgresBoardAccess::new(pool.clone()), config.hub.clone());
            let listener = MutationListener::new(
                pool,
                config.mutation_notify_channel.clone(),
                handle.clone(),
            );
            (
                tokio::spawn(hub.run(shutdown.clone())),
                Some(tokio::spawn(listener.run(shutdown.clone()))),
                handle,
            )
        }
        None => {
            tracing::warn!("DATABASE_URL not set, every join will be denied");
            let (hub, handle) = Hub::new(DenyAll, config.hub.clone());
            (tokio::spawn(hub.run(shutdown.clone())), None, handle)
        }
    };

    // Build application state
    let app_state = AppState {
        hub,
        connection: config.connection,
        shutdown: shutdown.clone(),
        user_header,
    };
    let app = api::build_router(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    let signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => tracing::info!("shutdown signal received"),
                () = signal.cancelled() => {}
            }
            signal.cancel();
        })
        .await
        .context("serving HTTP")?;

    // Connections closed with the shutdown token; let the hub drain.
    shutdown.cancel();
    if let Some(task) = listener_task {
        task.await.context("mutation listener panicked")?;
    }
    hub_task.await.context("hub task panicked")?;

    tracing::info!("taskboard-hub stopped");
    Ok(())
}
