//! Session and admin-guard middleware
//!
//! `session_middleware` runs on every panel route. It resolves the session
//! cookie (opening a fresh anonymous session when there is none), injects a
//! [`CurrentSession`] into the request extensions and sets the cookie on the
//! response when the session is new.
//!
//! `require_admin` wraps the dashboard and export routes. Anonymous requests
//! are redirected to `/login` and never reach the handler; authenticated
//! ones get an [`AdminSession`] injected.
//!
//! ```rust,ignore
//! let protected = Router::new()
//!     .route("/dashboard", get(show))
//!     .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));
//!
//! let app = Router::new()
//!     .merge(protected)
//!     .layer(middleware::from_fn_with_state(state.clone(), session_middleware));
//! ```

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::error::ApiError;
use crate::session::{session_cookie, session_id_from_headers, SessionId, SessionState};
use crate::state::AppState;

// ============================================================================
// MIDDLEWARE
// ============================================================================

pub async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let presented = session_id_from_headers(request.headers());
    let (session, created) = state.sessions.open(presented);
    request.extensions_mut().insert(CurrentSession(session));

    let mut response = next.run(request).await;

    // Handlers that rotate the session set their own cookie.
    if created && !response.headers().contains_key(header::SET_COOKIE) {
        let cookie = session_cookie(session, state.sessions.ttl(), state.config.cookie_secure);
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().insert(header::SET_COOKIE, value);
            }
            Err(e) => tracing::error!(error = %e, "Failed to encode session cookie"),
        }
    }
    response
}

pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(CurrentSession(session)) = request.extensions().get::<CurrentSession>().copied()
    else {
        tracing::error!("require_admin applied without session_middleware");
        return ApiError::internal_error("Session not available").into_response();
    };

    match state.sessions.state(session) {
        SessionState::Authenticated { username } => {
            request
                .extensions_mut()
                .insert(AdminSession { session, username });
            next.run(request).await
        }
        SessionState::Anonymous => {
            tracing::debug!(path = %request.uri().path(), "Anonymous request redirected to login");
            Redirect::to("/login").into_response()
        }
    }
}

// ============================================================================
// TYPED EXTRACTORS
// ============================================================================

/// The request's session, logged in or not.
///
/// Requires `session_middleware`; without it extraction fails with a 500.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentSession(pub SessionId);

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentSession>()
            .copied()
            .ok_or_else(|| {
                ApiError::internal_error(
                    "Session not found in request extensions. \
                     Ensure session_middleware is applied to this route.",
                )
            })
    }
}

/// An authenticated session. Only present behind `require_admin`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminSession {
    pub session: SessionId,
    pub username: String,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AdminSession
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AdminSession>()
            .cloned()
            .ok_or_else(|| {
                ApiError::internal_error(
                    "AdminSession not found in request extensions. \
                     Ensure require_admin is applied to this route.",
                )
            })
    }
}
