//! Shared harness for HTTP-level tests.
//!
//! Drives the full router with `oneshot` over an in-memory gateway. Cookies
//! are threaded by hand: callers pass the `name=value` pair returned by
//! [`session_cookie`].

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use rowdesk_api::{create_router, AppState, PanelConfig, SESSION_COOKIE};
use rowdesk_test_utils::{InMemoryGateway, TEST_ADMIN_PASSWORD, TEST_ADMIN_USERNAME};
use tower::ServiceExt;

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub gateway: Arc<InMemoryGateway>,
}

impl TestApp {
    pub fn new(gateway: InMemoryGateway) -> Self {
        Self::with_config(gateway, PanelConfig::default())
    }

    pub fn with_config(gateway: InMemoryGateway, config: PanelConfig) -> Self {
        let gateway = Arc::new(gateway);
        let state = AppState::new(gateway.clone(), config);
        Self {
            app: create_router(state.clone()),
            state,
            gateway,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Result<Response<Body>, String> {
        self.app
            .clone()
            .oneshot(request)
            .await
            .map_err(|e| format!("Request failed: {:?}", e))
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Result<Response<Body>, String> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).map_err(|e| e.to_string())?)
            .await
    }

    pub async fn post_form(
        &self,
        uri: &str,
        cookie: Option<&str>,
        pairs: &[(&str, &str)],
    ) -> Result<Response<Body>, String> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let body = form_body(pairs);
        self.send(builder.body(Body::from(body)).map_err(|e| e.to_string())?)
            .await
    }

    /// Submit the login form. Returns the response and the cookie it set.
    pub async fn login_as(
        &self,
        username: &str,
        password: &str,
    ) -> Result<(Response<Body>, Option<String>), String> {
        let response = self
            .post_form(
                "/login",
                None,
                &[("username", username), ("password", password)],
            )
            .await?;
        let cookie = session_cookie(&response);
        Ok((response, cookie))
    }

    /// Log in with the fixture credentials and return the session cookie.
    pub async fn login(&self) -> Result<String, String> {
        let (response, cookie) = self.login_as(TEST_ADMIN_USERNAME, TEST_ADMIN_PASSWORD).await?;
        if response.status() != StatusCode::SEE_OTHER {
            return Err(format!("login returned {}", response.status()));
        }
        cookie.ok_or_else(|| "login set no session cookie".to_string())
    }
}

pub fn form_body(pairs: &[(&str, &str)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// The `rowdesk_session=...` pair from a response's `Set-Cookie`.
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(';').next())
        .find(|pair| pair.starts_with(&format!("{}=", SESSION_COOKIE)))
        .map(str::to_string)
}

pub fn location(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

pub fn header_value(response: &Response<Body>, name: header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

pub async fn body_bytes(response: Response<Body>) -> Result<Vec<u8>, String> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .map(|bytes| bytes.to_vec())
        .map_err(|e| e.to_string())
}

pub async fn body_text(response: Response<Body>) -> Result<String, String> {
    let bytes = body_bytes(response).await?;
    String::from_utf8(bytes).map_err(|e| e.to_string())
}
