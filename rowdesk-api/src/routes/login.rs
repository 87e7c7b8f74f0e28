//! Login and logout.

use axum::{
    extract::State,
    http::header,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use rowdesk_core::PanelError;
use serde::Deserialize;

use crate::flash::Flash;
use crate::middleware::CurrentSession;
use crate::session::session_cookie;
use crate::state::AppState;
use crate::views;

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// GET /login
pub async fn show(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Response {
    if state.sessions.is_authenticated(session) {
        return Redirect::to("/dashboard").into_response();
    }
    let flashes = state.sessions.take_flashes(session);
    Html(views::render_login(&flashes)).into_response()
}

/// POST /login
pub async fn submit(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Form(form): Form<LoginForm>,
) -> Response {
    if !state.config.credentials.verify(&form.username, &form.password) {
        tracing::warn!(username = form.username.as_str(), "Failed login attempt");
        state
            .sessions
            .push_flash(session, Flash::danger(PanelError::InvalidCredentials.to_string()));
        return Redirect::to("/login").into_response();
    }

    let session = state
        .sessions
        .login(Some(session), state.config.credentials.username());
    state
        .sessions
        .push_flash(session, Flash::success("Logged in successfully!"));
    tracing::info!(username = form.username.as_str(), "Admin logged in");

    let cookie = session_cookie(session, state.sessions.ttl(), state.config.cookie_secure);
    ([(header::SET_COOKIE, cookie)], Redirect::to("/dashboard")).into_response()
}

/// GET /logout
pub async fn logout(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Response {
    state.sessions.logout(session);
    state
        .sessions
        .push_flash(session, Flash::success("Logged out successfully!"));
    tracing::info!("Admin logged out");
    Redirect::to("/login").into_response()
}
