//! System endpoints: health check.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::app_state::AppState;
use crate::error::HubError;
use crate::hub::HubStats;

/// Health check response.
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: String,
    version: &'static str,
    #[serde(flatten)]
    stats: HubStats,
}

/// `GET /health` — Service health and hub counters.
///
/// # Errors
///
/// Returns [`HubError::HubClosed`] (503) once the hub has stopped.
pub async fn health_handler(State(state): State<AppState>) -> Result<impl IntoResponse, HubError> {
    let stats = state.hub.stats().await?;
    Ok((
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy",
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION"),
            stats,
        }),
    ))
}

/// System routes mounted at the root level.
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_handler))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use axum::body::Body;
    use axum::http::{HeaderName, Request};
    use tokio_util::sync::CancellationToken;
    use tower::ServiceExt;

    use super::*;
    use crate::config::{ConnectionConfig, HubConfig};
    use crate::hub::{Hub, HubHandle, MemoryBoardAccess};

    fn app(hub: HubHandle) -> Router {
        routes().with_state(AppState {
            hub,
            connection: ConnectionConfig::default(),
            shutdown: CancellationToken::new(),
            user_header: HeaderName::from_static("x-user-id"),
        })
    }

    fn health_request() -> Request<Body> {
        Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn reports_hub_counters() {
        let (hub, handle) = Hub::new(MemoryBoardAccess::new(), HubConfig::default());
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(hub.run(shutdown.clone()));

        let Ok(response) = app(handle).oneshot(health_request()).await else {
            panic!("router is infallible");
        };
        assert_eq!(response.status(), StatusCode::OK);
        let Ok(body) = axum::body::to_bytes(response.into_body(), 1024).await else {
            panic!("body not readable");
        };
        let Ok(json) = serde_json::from_slice::<serde_json::Value>(&body) else {
            panic!("body is not json");
        };
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["connections"], 0);
        assert_eq!(json["channels"], 0);
        assert_eq!(json["subscriptions"], 0);

        shutdown.cancel();
        assert!(task.await.is_ok());
    }

    #[tokio::test]
    async fn stopped_hub_is_unavailable() {
        let (handle, rx) = HubHandle::channel(4);
        drop(rx);

        let Ok(response) = app(handle).oneshot(health_request()).await else {
            panic!("router is infallible");
        };
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
