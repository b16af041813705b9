//! Axum WebSocket upgrade handler.

use axum::Extension;
use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::response::IntoResponse;

use super::connection::run_connection;
use crate::app_state::AppState;
use crate::domain::{SessionId, UserId};

/// `GET /ws` — Upgrade an authenticated HTTP request to a WebSocket.
///
/// The user and session come from the authentication middleware; nothing
/// is registered with the hub until the upgrade succeeds.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Extension(user): Extension<UserId>,
    Extension(session): Extension<SessionId>,
) -> impl IntoResponse {
    let AppState {
        hub,
        connection,
        shutdown,
        ..
    } = state;

    ws.on_failed_upgrade(move |err| {
        tracing::warn!(%session, %user, error = %err, "websocket upgrade failed");
    })
    .on_upgrade(move |socket| run_connection(socket, session, user, hub, connection, shutdown))
}
