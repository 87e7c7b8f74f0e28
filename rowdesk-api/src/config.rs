//! Panel Configuration Module
//!
//! Configuration is read once at startup from environment variables. Values
//! that are present but malformed are fatal, as are missing remote settings
//! when the real gateway is used.

use std::time::Duration;

use rowdesk_core::{PanelError, PanelResult, TableName, TablePolicy};
use secrecy::SecretString;

use crate::auth::{AdminCredentials, DEFAULT_ADMIN_PASSWORD, DEFAULT_ADMIN_USERNAME};

pub const DEFAULT_TABLE: &str = "users";
pub const DEFAULT_SESSION_TTL_SECS: u64 = 86_400;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// FILTER POLICY
// ============================================================================

/// What to do when a filter names a column the table does not have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutOfRangePolicy {
    /// Show the unfiltered rows silently.
    Ignore,
    /// Show the unfiltered rows with a warning flash.
    #[default]
    Warn,
}

impl std::str::FromStr for OutOfRangePolicy {
    type Err = PanelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ignore" => Ok(OutOfRangePolicy::Ignore),
            "warn" => Ok(OutOfRangePolicy::Warn),
            other => Err(PanelError::invalid_configuration(
                "ROWDESK_FILTER_OUT_OF_RANGE",
                format!("expected 'ignore' or 'warn', got '{}'", other),
            )),
        }
    }
}

// ============================================================================
// PANEL CONFIGURATION
// ============================================================================

/// Everything the HTTP layer needs apart from the gateway.
#[derive(Debug, Clone)]
pub struct PanelConfig {
    /// The single admin account.
    pub credentials: AdminCredentials,

    /// Table shown when none is requested and the remote listing is empty or fails.
    pub default_table: TableName,

    /// Identifier rules plus the optional allowlist.
    pub table_policy: TablePolicy,

    pub out_of_range: OutOfRangePolicy,

    /// Session lifetime, counted from login.
    pub session_ttl: Duration,

    /// Whether the session cookie carries `Secure`.
    pub cookie_secure: bool,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            credentials: AdminCredentials::default(),
            default_table: TableName::parse(DEFAULT_TABLE).expect("Invalid default table name"),
            table_policy: TablePolicy::allow_all(),
            out_of_range: OutOfRangePolicy::default(),
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
            cookie_secure: false,
        }
    }
}

impl PanelConfig {
    /// Load from the process environment.
    ///
    /// Environment variables:
    /// - `ROWDESK_ADMIN_USERNAME`: admin username (default: admin)
    /// - `ROWDESK_ADMIN_PASSWORD`: admin password (default: admin123)
    /// - `ROWDESK_ADMIN_PASSWORD_SHA256`: hex password digest, wins over the plaintext
    /// - `ROWDESK_DEFAULT_TABLE`: fallback table (default: users)
    /// - `ROWDESK_TABLE_ALLOWLIST`: comma-separated table names (empty = any identifier)
    /// - `ROWDESK_FILTER_OUT_OF_RANGE`: "ignore" or "warn" (default: warn)
    /// - `ROWDESK_SESSION_TTL_SECS`: session lifetime (default: 86400)
    /// - `ROWDESK_COOKIE_SECURE`: "true" or "false" (default: false)
    pub fn from_env() -> PanelResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` to resolve variable names.
    pub fn from_lookup<F>(lookup: F) -> PanelResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let username = non_empty(&lookup, "ROWDESK_ADMIN_USERNAME")
            .unwrap_or_else(|| DEFAULT_ADMIN_USERNAME.to_string());
        let credentials = match non_empty(&lookup, "ROWDESK_ADMIN_PASSWORD_SHA256") {
            Some(digest) => AdminCredentials::from_digest_hex(username, &digest)?,
            None => {
                let password = lookup("ROWDESK_ADMIN_PASSWORD")
                    .unwrap_or_else(|| DEFAULT_ADMIN_PASSWORD.to_string());
                AdminCredentials::from_plaintext(username, &SecretString::from(password))
            }
        };

        let allowlist = match non_empty(&lookup, "ROWDESK_TABLE_ALLOWLIST") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(|name| {
                    TableName::parse(name).map_err(|e| {
                        PanelError::invalid_configuration("ROWDESK_TABLE_ALLOWLIST", e.to_string())
                    })
                })
                .collect::<PanelResult<Vec<_>>>()?,
            None => Vec::new(),
        };
        let table_policy = TablePolicy::with_allowlist(allowlist);

        let default_table_raw = non_empty(&lookup, "ROWDESK_DEFAULT_TABLE")
            .unwrap_or_else(|| DEFAULT_TABLE.to_string());
        let default_table = table_policy.resolve(&default_table_raw).map_err(|e| {
            PanelError::invalid_configuration("ROWDESK_DEFAULT_TABLE", e.to_string())
        })?;

        let out_of_range = match non_empty(&lookup, "ROWDESK_FILTER_OUT_OF_RANGE") {
            Some(raw) => raw.parse()?,
            None => OutOfRangePolicy::default(),
        };

        let session_ttl_secs =
            parse_or(&lookup, "ROWDESK_SESSION_TTL_SECS", DEFAULT_SESSION_TTL_SECS)?;
        if session_ttl_secs == 0 {
            return Err(PanelError::invalid_configuration(
                "ROWDESK_SESSION_TTL_SECS",
                "must be greater than zero",
            ));
        }

        let cookie_secure = parse_bool(&lookup, "ROWDESK_COOKIE_SECURE", false)?;

        Ok(Self {
            credentials,
            default_table,
            table_policy,
            out_of_range,
            session_ttl: Duration::from_secs(session_ttl_secs),
            cookie_secure,
        })
    }
}

// ============================================================================
// REMOTE CONFIGURATION
// ============================================================================

/// Connection settings for the remote REST service.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Service base URL, without trailing slash.
    pub base_url: String,

    /// Access key sent as `apikey` and bearer token.
    pub api_key: SecretString,

    pub request_timeout: Duration,
}

impl RemoteConfig {
    /// Load from the process environment.
    ///
    /// Environment variables:
    /// - `ROWDESK_REMOTE_URL` or `SUPABASE_URL`: base URL (required)
    /// - `ROWDESK_REMOTE_KEY` or `SUPABASE_KEY`: access key (required)
    /// - `ROWDESK_REQUEST_TIMEOUT_SECS`: per-request timeout (default: 30)
    pub fn from_env() -> PanelResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> PanelResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = non_empty(&lookup, "ROWDESK_REMOTE_URL")
            .or_else(|| non_empty(&lookup, "SUPABASE_URL"))
            .ok_or_else(|| PanelError::missing_configuration("ROWDESK_REMOTE_URL"))?;
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(PanelError::invalid_configuration(
                "ROWDESK_REMOTE_URL",
                "expected an http:// or https:// URL",
            ));
        }

        let api_key = non_empty(&lookup, "ROWDESK_REMOTE_KEY")
            .or_else(|| non_empty(&lookup, "SUPABASE_KEY"))
            .ok_or_else(|| PanelError::missing_configuration("ROWDESK_REMOTE_KEY"))?;

        let timeout_secs = parse_or(
            &lookup,
            "ROWDESK_REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: SecretString::from(api_key),
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

// ============================================================================
// HELPERS
// ============================================================================

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_or<F>(lookup: &F, key: &str, default: u64) -> PanelResult<u64>
where
    F: Fn(&str) -> Option<String>,
{
    match non_empty(lookup, key) {
        Some(raw) => raw
            .parse::<u64>()
            .map_err(|e| PanelError::invalid_configuration(key, format!("'{}': {}", raw, e))),
        None => Ok(default),
    }
}

fn parse_bool<F>(lookup: &F, key: &str, default: bool) -> PanelResult<bool>
where
    F: Fn(&str) -> Option<String>,
{
    match non_empty(lookup, key).map(|raw| raw.to_lowercase()) {
        Some(raw) if raw == "true" || raw == "1" => Ok(true),
        Some(raw) if raw == "false" || raw == "0" => Ok(false),
        Some(raw) => Err(PanelError::invalid_configuration(
            key,
            format!("expected true or false, got '{}'", raw),
        )),
        None => Ok(default),
    }
}
