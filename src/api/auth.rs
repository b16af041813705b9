//! Identity hand-off from the upstream auth proxy.
//!
//! Token validation happens before traffic reaches this service. The proxy
//! forwards the authenticated user id in a trusted header, configured by
//! `AUTH_USER_HEADER`.

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;

use crate::app_state::AppState;
use crate::domain::{SessionId, UserId};
use crate::error::HubError;

/// Resolves the caller and mints a session for the request.
///
/// Inserts a [`UserId`] and a fresh [`SessionId`] as request extensions.
///
/// # Errors
///
/// Returns [`HubError::Unauthorized`] when the header is missing or does
/// not hold a user id.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, HubError> {
    let user = user_from_headers(request.headers(), &state.user_header)?;
    let extensions = request.extensions_mut();
    extensions.insert(user);
    extensions.insert(SessionId::new());
    Ok(next.run(request).await)
}

fn user_from_headers(
    headers: &HeaderMap,
    name: &axum::http::HeaderName,
) -> Result<UserId, HubError> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
        .ok_or(HubError::Unauthorized)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{HeaderName, StatusCode};
    use axum::routing::get;
    use axum::{Extension, Router, middleware};
    use tokio_util::sync::CancellationToken;
    use tower::ServiceExt;

    use super::*;
    use crate::config::ConnectionConfig;
    use crate::hub::HubHandle;

    async fn whoami(Extension(user): Extension<UserId>, Extension(_): Extension<SessionId>) -> String {
        user.to_string()
    }

    fn app() -> Router {
        let (hub, _rx) = HubHandle::channel(4);
        let state = AppState {
            hub,
            connection: ConnectionConfig::default(),
            shutdown: CancellationToken::new(),
            user_header: HeaderName::from_static("x-user-id"),
        };
        Router::new()
            .route("/whoami", get(whoami))
            .route_layer(middleware::from_fn_with_state(state.clone(), authenticate))
            .with_state(state)
    }

    fn request(user: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder().uri("/whoami");
        if let Some(user) = user {
            builder = builder.header("x-user-id", user);
        }
        builder.body(Body::empty()).unwrap_or_default()
    }

    #[tokio::test]
    async fn valid_header_passes_user_through() {
        let response = app().oneshot(request(Some("7"))).await;
        let Ok(response) = response else {
            unreachable!("router is infallible");
        };
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), 64).await;
        assert_eq!(body.ok().as_deref(), Some(&b"7"[..]));
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let Ok(response) = app().oneshot(request(None)).await else {
            unreachable!("router is infallible");
        };
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn non_numeric_header_is_unauthorized() {
        let Ok(response) = app().oneshot(request(Some("alice"))).await else {
            unreachable!("router is infallible");
        };
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
