//! Authorization code issuance and redemption.
//!
//! An authorization code is a one-time credential binding a client, a
//! principal, the granted scopes, and (for public clients) the PKCE
//! challenge recorded at authorization time.
//!
//! # Lifecycle
//!
//! `ISSUED -> REDEEMED` (terminal, record destroyed by the take-once read)
//! or `ISSUED -> EXPIRED` (terminal, via store TTL). There is no revoked
//! state; revocation is deletion.
//!
//! # Security
//!
//! - Code values are 256-bit random, hex-encoded
//! - The lifetime is a fixed ten-minute window, not per-request data
//! - Redemption is atomic: a second redeem of the same value fails even
//!   when the first exchange ultimately failed after consumption

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::AuthResult;
use crate::error::{AuthError, log_prefix};
use crate::oauth::pkce::{ChallengeMethod, CodeChallenge};
use crate::store::EphemeralStore;

/// Key prefix for authorization code records.
pub const CODE_KEY_PREFIX: &str = "oauth2:code:";

/// Fixed authorization code lifetime (OAuth 2.0 recommends at most ten
/// minutes; this window is not configurable per request).
pub const CODE_LIFETIME: Duration = Duration::from_secs(600);

/// A one-time authorization code record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationCode {
    /// The opaque code value handed to the client.
    pub value: String,

    /// Client the code was issued to.
    pub client_id: String,

    /// Authenticated principal the code represents.
    pub principal_id: String,

    /// Granted scopes.
    pub scopes: Vec<String>,

    /// PKCE challenge recorded at authorization time, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_challenge: Option<String>,

    /// Challenge method (present iff `code_challenge` is).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub challenge_method: Option<ChallengeMethod>,

    /// When the code was issued.
    #[serde(with = "time::serde::rfc3339")]
    pub issued_at: OffsetDateTime,

    /// When the code expires.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl AuthorizationCode {
    /// Generates a new opaque code value.
    ///
    /// 32 random bytes, hex-encoded (64 characters, 256 bits of entropy).
    #[must_use]
    pub fn generate_value() -> String {
        use rand::Rng;
        let bytes: [u8; 32] = rand::thread_rng().r#gen();
        hex::encode(bytes)
    }

    /// Returns `true` if the code has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc() > self.expires_at
    }

    /// Returns `true` if the code carries a PKCE challenge.
    #[must_use]
    pub fn has_challenge(&self) -> bool {
        self.code_challenge.is_some()
    }

    /// Returns the granted scopes as a space-separated string.
    #[must_use]
    pub fn scope_string(&self) -> String {
        self.scopes.join(" ")
    }
}

/// Issues and redeems one-time authorization codes.
pub struct AuthorizationCodeIssuer {
    store: Arc<dyn EphemeralStore>,
}

impl AuthorizationCodeIssuer {
    /// Creates a new issuer.
    #[must_use]
    pub fn new(store: Arc<dyn EphemeralStore>) -> Self {
        Self { store }
    }

    /// Issues a new authorization code bound to a client, principal, and
    /// scope set, optionally carrying a PKCE challenge.
    ///
    /// The record is persisted with a TTL equal to [`CODE_LIFETIME`] and
    /// returned so the caller can embed the value in the redirect.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the record cannot be persisted, or
    /// `Internal` if it fails to serialize.
    pub async fn issue(
        &self,
        client_id: &str,
        principal_id: &str,
        scopes: Vec<String>,
        challenge: Option<&CodeChallenge>,
    ) -> AuthResult<AuthorizationCode> {
        let now = OffsetDateTime::now_utc();
        let code = AuthorizationCode {
            value: AuthorizationCode::generate_value(),
            client_id: client_id.to_string(),
            principal_id: principal_id.to_string(),
            scopes,
            code_challenge: challenge.map(|c| c.as_str().to_string()),
            challenge_method: challenge.map(|_| ChallengeMethod::S256),
            issued_at: now,
            expires_at: now + CODE_LIFETIME,
        };

        let json = serde_json::to_string(&code).map_err(|e| {
            AuthError::internal(format!("failed to serialize authorization code: {e}"))
        })?;
        self.store
            .put(&format!("{CODE_KEY_PREFIX}{}", code.value), &json, CODE_LIFETIME)
            .await?;

        tracing::debug!(
            client_id,
            code = log_prefix(&code.value),
            pkce = code.has_challenge(),
            "issued authorization code"
        );
        Ok(code)
    }

    /// Atomically redeems a code, destroying it.
    ///
    /// Returns `None` for unknown, expired, or already-redeemed values.
    /// Under concurrent redemption of the same value exactly one caller
    /// receives the record.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the store cannot be reached, or
    /// `Internal` if the stored record is corrupt.
    pub async fn redeem(&self, value: &str) -> AuthResult<Option<AuthorizationCode>> {
        let Some(json) = self
            .store
            .take_once(&format!("{CODE_KEY_PREFIX}{value}"))
            .await?
        else {
            tracing::warn!(code = log_prefix(value), "authorization code miss");
            return Ok(None);
        };

        let code: AuthorizationCode = serde_json::from_str(&json)
            .map_err(|e| AuthError::internal(format!("corrupt authorization code record: {e}")))?;

        // The store TTL normally enforces this; the record check covers
        // backends with coarser expiry.
        if code.is_expired() {
            return Ok(None);
        }

        Ok(Some(code))
    }

    /// Deletes a code without redeeming it.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the store cannot be reached.
    pub async fn revoke(&self, value: &str) -> AuthResult<()> {
        self.store
            .delete(&format!("{CODE_KEY_PREFIX}{value}"))
            .await
    }
}
