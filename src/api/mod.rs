//! HTTP surface: router composition, authentication and system endpoints.
//!
//! `/health` is public. `/ws` sits behind [`auth::authenticate`], which
//! resolves the caller before the upgrade handler runs.

pub mod auth;
pub mod handlers;

use axum::Router;
use axum::middleware;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;
use crate::ws::handler::ws_handler;

/// Builds the complete application router, state included.
pub fn build_router(state: AppState) -> Router {
    let ws = Router::new()
        .route("/ws", get(ws_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::authenticate,
        ));

    Router::new()
        .merge(handlers::system::routes())
        .merge(ws)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
