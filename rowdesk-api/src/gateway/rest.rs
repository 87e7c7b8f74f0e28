//! PostgREST client
//!
//! Talks to a PostgREST-compatible service (Supabase exposes one under
//! `/rest/v1`). Rows are addressed by table path segment and an `id=eq.N`
//! filter; table names are listed through the `get_tables` procedure.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::{RequestBuilder, Response};
use rowdesk_core::{
    FieldMap, GatewayError, GatewayResult, PanelError, PanelResult, RowId, RowSet, TableGateway,
    TableName, PRIMARY_KEY,
};
use secrecy::ExposeSecret;
use serde_json::Value;

use crate::config::RemoteConfig;

const REST_PREFIX: &str = "/rest/v1";
const LIST_TABLES_PROCEDURE: &str = "get_tables";

/// Longest error body quoted back to the user.
const MAX_ERROR_CHARS: usize = 200;

#[derive(Debug, Clone)]
pub struct RestGateway {
    client: reqwest::Client,
    base_url: String,
    auth_headers: HeaderMap,
}

impl RestGateway {
    pub fn new(config: &RemoteConfig) -> PanelResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| PanelError::invalid_configuration("ROWDESK_REMOTE_URL", e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_headers: build_auth_headers(config.api_key.expose_secret())?,
        })
    }

    fn table_url(&self, table: &TableName) -> String {
        format!("{}{}/{}", self.base_url, REST_PREFIX, table)
    }

    fn rpc_url(&self, procedure: &str) -> String {
        format!("{}{}/rpc/{}", self.base_url, REST_PREFIX, procedure)
    }

    async fn send(&self, request: RequestBuilder) -> GatewayResult<Response> {
        let response = request
            .headers(self.auth_headers.clone())
            .send()
            .await
            .map_err(|e| GatewayError::Unreachable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(GatewayError::Rejected {
            status: status.as_u16(),
            message: error_message(&body, status.canonical_reason().unwrap_or("error")),
        })
    }

    async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> GatewayResult<T> {
        let bytes = response
            .bytes()
            .await
            .map_err(|e| GatewayError::Unreachable(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| GatewayError::Decode(e.to_string()))
    }
}

#[async_trait]
impl TableGateway for RestGateway {
    async fn list_tables(&self) -> GatewayResult<Vec<String>> {
        let request = self
            .client
            .post(self.rpc_url(LIST_TABLES_PROCEDURE))
            .json(&serde_json::json!({}));
        let response = self.send(request).await?;
        let listing: Vec<Value> = Self::decode(response).await?;
        Ok(table_names(listing))
    }

    async fn fetch_all(&self, table: &TableName) -> GatewayResult<RowSet> {
        let request = self
            .client
            .get(self.table_url(table))
            .query(&[("select", "*")]);
        let response = self.send(request).await?;
        Self::decode(response).await
    }

    async fn insert(&self, table: &TableName, fields: &FieldMap) -> GatewayResult<()> {
        let request = self
            .client
            .post(self.table_url(table))
            .header("Prefer", "return=minimal")
            .json(fields.as_json());
        self.send(request).await?;
        tracing::debug!(table = %table, columns = fields.len(), "Inserted row");
        Ok(())
    }

    async fn update(&self, table: &TableName, id: RowId, fields: &FieldMap) -> GatewayResult<()> {
        let request = self
            .client
            .patch(self.table_url(table))
            .query(&[row_filter(id)])
            .header("Prefer", "return=minimal")
            .json(fields.as_json());
        self.send(request).await?;
        tracing::debug!(table = %table, id = %id, "Updated row");
        Ok(())
    }

    async fn delete(&self, table: &TableName, id: RowId) -> GatewayResult<()> {
        let request = self
            .client
            .delete(self.table_url(table))
            .query(&[row_filter(id)])
            .header("Prefer", "return=minimal");
        self.send(request).await?;
        tracing::debug!(table = %table, id = %id, "Deleted row");
        Ok(())
    }
}

fn build_auth_headers(api_key: &str) -> PanelResult<HeaderMap> {
    let invalid = |e: reqwest::header::InvalidHeaderValue| {
        PanelError::invalid_configuration("ROWDESK_REMOTE_KEY", e.to_string())
    };

    let mut apikey = HeaderValue::from_str(api_key).map_err(invalid)?;
    apikey.set_sensitive(true);
    let mut bearer = HeaderValue::from_str(&format!("Bearer {}", api_key)).map_err(invalid)?;
    bearer.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(HeaderName::from_static("apikey"), apikey);
    headers.insert(AUTHORIZATION, bearer);
    Ok(headers)
}

/// `id=eq.N` query pair.
fn row_filter(id: RowId) -> (&'static str, String) {
    (PRIMARY_KEY, format!("eq.{}", id))
}

/// Names from a `get_tables` result: `[{"table_name": ...}]`, or plain strings.
fn table_names(listing: Vec<Value>) -> Vec<String> {
    listing
        .into_iter()
        .filter_map(|entry| match entry {
            Value::String(name) => Some(name),
            Value::Object(mut map) => match map.remove("table_name") {
                Some(Value::String(name)) => Some(name),
                _ => None,
            },
            _ => None,
        })
        .collect()
}

/// Human-readable reason from an error body. PostgREST sends `{"message": ...}`.
fn error_message(body: &str, fallback: &str) -> String {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| value.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string());

    if message.is_empty() {
        fallback.to_string()
    } else {
        message.chars().take(MAX_ERROR_CHARS).collect()
    }
}
