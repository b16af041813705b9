//! Shared application state injected into all Axum handlers.

use axum::http::HeaderName;
use tokio_util::sync::CancellationToken;

use crate::config::ConnectionConfig;
use crate::hub::HubHandle;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Producer side of the hub queue.
    pub hub: HubHandle,
    /// Per-connection queue and heartbeat settings.
    pub connection: ConnectionConfig,
    /// Server-wide shutdown signal; connections hang child tokens off it.
    pub shutdown: CancellationToken,
    /// Header carrying the user id set by the upstream auth proxy.
    pub user_header: HeaderName,
}
