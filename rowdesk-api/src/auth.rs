//! Admin credential check
//!
//! The panel has exactly one account. Its password is kept only as a SHA-256
//! digest and submitted credentials are compared digest-to-digest in
//! constant time, so neither field leaks through timing and "unknown user"
//! looks the same as "wrong password".

use rowdesk_core::{PanelError, PanelResult};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};

pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

type Sha256Digest = [u8; 32];

/// The configured admin account.
#[derive(Clone)]
pub struct AdminCredentials {
    username: String,
    username_digest: Sha256Digest,
    password_digest: Sha256Digest,
}

impl AdminCredentials {
    /// Build from a plaintext password, which is hashed immediately.
    pub fn from_plaintext(username: impl Into<String>, password: &SecretString) -> Self {
        let username = username.into();
        Self {
            username_digest: sha256(username.as_bytes()),
            password_digest: sha256(password.expose_secret().as_bytes()),
            username,
        }
    }

    /// Build from a hex-encoded SHA-256 password digest.
    pub fn from_digest_hex(username: impl Into<String>, digest_hex: &str) -> PanelResult<Self> {
        let field = "ROWDESK_ADMIN_PASSWORD_SHA256";
        let bytes = hex::decode(digest_hex.trim())
            .map_err(|e| PanelError::invalid_configuration(field, e.to_string()))?;
        let password_digest: Sha256Digest = bytes.try_into().map_err(|bytes: Vec<u8>| {
            PanelError::invalid_configuration(
                field,
                format!("expected 32 bytes, got {}", bytes.len()),
            )
        })?;

        let username = username.into();
        Ok(Self {
            username_digest: sha256(username.as_bytes()),
            password_digest,
            username,
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Check a submitted pair. Exact, case-sensitive match on both fields.
    pub fn verify(&self, username: &str, password: &str) -> bool {
        let user_ok = constant_time_eq(&self.username_digest, &sha256(username.as_bytes()));
        let pass_ok = constant_time_eq(&self.password_digest, &sha256(password.as_bytes()));
        user_ok & pass_ok
    }

    /// Check if these are the well-known defaults.
    pub fn is_insecure_default(&self) -> bool {
        self.verify(DEFAULT_ADMIN_USERNAME, DEFAULT_ADMIN_PASSWORD)
    }
}

impl Default for AdminCredentials {
    fn default() -> Self {
        Self::from_plaintext(
            DEFAULT_ADMIN_USERNAME,
            &SecretString::from(DEFAULT_ADMIN_PASSWORD.to_string()),
        )
    }
}

impl std::fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AdminCredentials({}, [REDACTED])", self.username)
    }
}

fn sha256(bytes: &[u8]) -> Sha256Digest {
    Sha256::digest(bytes).into()
}

fn constant_time_eq(a: &Sha256Digest, b: &Sha256Digest) -> bool {
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
