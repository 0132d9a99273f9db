//! Third-party identity binding bridge.
//!
//! Converts a third-party identity-provider callback into one of two
//! handoffs:
//!
//! - the external identity is already linked to an internal user: the
//!   caller mints tokens for that user and parks them behind a one-time
//!   [token handoff code](ThirdPartyBindingBridge::issue_handoff) so no
//!   bearer token ever appears in a redirect URL;
//! - the identity is unknown: a one-time bind code is issued, carrying the
//!   external identifier encrypted at rest, and the frontend drives a
//!   bind-or-create flow against it.
//!
//! Bind codes and handoff codes are single-use: redemption goes through
//! the ephemeral store's atomic take-once, so a replayed code observes a
//! miss even under concurrent submission. A bind code is consumed the
//! moment it is presented; failed credentials afterwards do not revive it.

pub mod cipher;
pub mod users;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::AuthResult;
use crate::config::BridgeConfig;
use crate::error::{AuthError, log_prefix};
use crate::oauth::token::TokenPair;
use crate::store::EphemeralStore;

pub use cipher::ExternalIdCipher;
pub use users::{
    BindCredentials, ExternalProfile, NewAccountDetails, PasswordVerifier, UserAccount,
    UserRepository,
};

/// Key prefix for bind code records.
pub const BIND_CODE_PREFIX: &str = "oauth2:code:bind:";

/// Key prefix for token handoff records.
pub const HANDOFF_CODE_PREFIX: &str = "oauth2:token:";

/// Length of generated bind and handoff codes.
const CODE_LENGTH: usize = 32;

// =============================================================================
// Platform
// =============================================================================

/// Supported third-party identity platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    /// WeChat OAuth2.
    Wechat,
    /// Alipay OAuth2.
    Alipay,
    /// GitHub OAuth2.
    Github,
}

impl Platform {
    /// Parses a platform from its wire form.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` for unknown platforms.
    pub fn parse(value: &str) -> AuthResult<Self> {
        match value {
            "wechat" => Ok(Self::Wechat),
            "alipay" => Ok(Self::Alipay),
            "github" => Ok(Self::Github),
            other => Err(AuthError::invalid_request(format!(
                "Unknown platform: {other}"
            ))),
        }
    }

    /// Returns the wire form of the platform.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wechat => "wechat",
            Self::Alipay => "alipay",
            Self::Github => "github",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Callback Outcome
// =============================================================================

/// Result of processing a third-party identity callback.
#[derive(Debug, Clone)]
pub enum CallbackOutcome {
    /// The external identity maps to an internal user. The caller mints
    /// tokens for the user and parks them behind a handoff code.
    LinkedUser {
        /// The linked internal user id.
        user_id: String,
    },

    /// No internal user is linked. The frontend drives a bind-or-create
    /// flow against the returned code.
    UnlinkedIdentity {
        /// One-time bind code.
        bind_code: String,
    },
}

/// A pending bind code record, stored encrypted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BindCodeRecord {
    /// External identifier, sealed by [`ExternalIdCipher`]; never stored
    /// or transmitted in plaintext.
    encrypted_external_id: String,

    /// Platform the identity came from.
    platform: Platform,

    /// Profile relayed from the provider, reused when linking.
    #[serde(default)]
    profile: ExternalProfile,

    /// When the bind code was issued.
    #[serde(with = "time::serde::rfc3339")]
    issued_at: OffsetDateTime,
}

// =============================================================================
// Bridge
// =============================================================================

/// Bridges third-party identity callbacks into token or bind handoffs.
pub struct ThirdPartyBindingBridge {
    store: Arc<dyn EphemeralStore>,
    users: Arc<dyn UserRepository>,
    passwords: Arc<dyn PasswordVerifier>,
    cipher: ExternalIdCipher,
    config: BridgeConfig,
}

impl ThirdPartyBindingBridge {
    /// Creates a new bridge.
    #[must_use]
    pub fn new(
        store: Arc<dyn EphemeralStore>,
        users: Arc<dyn UserRepository>,
        passwords: Arc<dyn PasswordVerifier>,
        cipher: ExternalIdCipher,
        config: BridgeConfig,
    ) -> Self {
        Self {
            store,
            users,
            passwords,
            cipher,
            config,
        }
    }

    /// Generates a one-time code value (32 alphanumeric characters).
    #[must_use]
    fn generate_code() -> String {
        use rand::Rng;
        use rand::distributions::Alphanumeric;
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(CODE_LENGTH)
            .map(char::from)
            .collect()
    }

    /// Processes an identity-provider callback.
    ///
    /// Looks up the external identity; when linked, returns the internal
    /// user id. Otherwise seals the external id, persists a bind record,
    /// and returns a one-time bind code.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` for store failures and `Internal` for
    /// encryption or lookup failures.
    pub async fn on_callback(
        &self,
        external_id: &str,
        platform: Platform,
        profile: &ExternalProfile,
    ) -> AuthResult<CallbackOutcome> {
        if let Some(user_id) = self.users.find_by_external_id(platform, external_id).await? {
            tracing::debug!(%platform, user_id, "external identity already linked");
            return Ok(CallbackOutcome::LinkedUser { user_id });
        }

        let record = BindCodeRecord {
            encrypted_external_id: self.cipher.encrypt(external_id)?,
            platform,
            profile: profile.clone(),
            issued_at: OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_string(&record)
            .map_err(|e| AuthError::internal(format!("failed to serialize bind record: {e}")))?;

        let bind_code = Self::generate_code();
        self.store
            .put(
                &format!("{BIND_CODE_PREFIX}{bind_code}"),
                &json,
                self.config.bind_code_ttl,
            )
            .await?;

        tracing::info!(
            %platform,
            bind_code = log_prefix(&bind_code),
            "issued bind code for unlinked identity"
        );
        Ok(CallbackOutcome::UnlinkedIdentity { bind_code })
    }

    /// Binds the external identity to an existing account.
    ///
    /// The bind code is consumed the moment it is presented; a credential
    /// failure afterwards does not revive it.
    ///
    /// # Errors
    ///
    /// - `InvalidGrant` for unknown/expired/replayed bind codes and for
    ///   credential failures
    /// - `StoreUnavailable` / `Internal` for collaborator failures
    pub async fn complete_bind(
        &self,
        bind_code: &str,
        credentials: &BindCredentials,
    ) -> AuthResult<String> {
        let record = self.take_bind_record(bind_code).await?;
        let external_id = self.cipher.decrypt(&record.encrypted_external_id)?;

        let account = self
            .users
            .find_by_username(&credentials.username)
            .await?
            .ok_or_else(|| AuthError::invalid_grant("Unknown username or wrong password"))?;

        if !self
            .passwords
            .verify(&credentials.password, &account.password_hash)
            .await?
        {
            return Err(AuthError::invalid_grant("Unknown username or wrong password"));
        }

        self.users
            .link_external_id(&account.user_id, record.platform, &external_id, &record.profile)
            .await?;

        tracing::info!(
            platform = %record.platform,
            user_id = %account.user_id,
            "bound external identity to existing account"
        );
        Ok(account.user_id)
    }

    /// Creates a new account and binds the external identity to it.
    ///
    /// # Errors
    ///
    /// - `InvalidGrant` for unknown/expired/replayed bind codes
    /// - `StoreUnavailable` / `Internal` for collaborator failures
    pub async fn complete_create(
        &self,
        bind_code: &str,
        details: &NewAccountDetails,
    ) -> AuthResult<String> {
        let record = self.take_bind_record(bind_code).await?;
        let external_id = self.cipher.decrypt(&record.encrypted_external_id)?;

        let user_id = self.users.create(details).await?;
        self.users
            .link_external_id(&user_id, record.platform, &external_id, &record.profile)
            .await?;

        tracing::info!(
            platform = %record.platform,
            user_id,
            "created account for external identity"
        );
        Ok(user_id)
    }

    /// Parks a minted token pair behind a one-time pickup code.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the record cannot be persisted, or
    /// `Internal` if it fails to serialize.
    pub async fn issue_handoff(&self, tokens: &TokenPair) -> AuthResult<String> {
        let json = serde_json::to_string(tokens)
            .map_err(|e| AuthError::internal(format!("failed to serialize token pair: {e}")))?;

        let code = Self::generate_code();
        self.store
            .put(
                &format!("{HANDOFF_CODE_PREFIX}{code}"),
                &json,
                self.config.handoff_code_ttl,
            )
            .await?;

        tracing::debug!(handoff = log_prefix(&code), "issued token handoff code");
        Ok(code)
    }

    /// Redeems a token handoff code, destroying it.
    ///
    /// # Errors
    ///
    /// - `InvalidGrant` for unknown/expired/replayed codes
    /// - `StoreUnavailable` / `Internal` for store failures
    pub async fn redeem_handoff(&self, code: &str) -> AuthResult<TokenPair> {
        let Some(json) = self
            .store
            .take_once(&format!("{HANDOFF_CODE_PREFIX}{code}"))
            .await?
        else {
            tracing::warn!(handoff = log_prefix(code), "handoff code miss");
            return Err(AuthError::invalid_grant(
                "Handoff code is unknown, expired, or already used",
            ));
        };

        serde_json::from_str(&json)
            .map_err(|e| AuthError::internal(format!("corrupt token handoff record: {e}")))
    }

    async fn take_bind_record(&self, bind_code: &str) -> AuthResult<BindCodeRecord> {
        let Some(json) = self
            .store
            .take_once(&format!("{BIND_CODE_PREFIX}{bind_code}"))
            .await?
        else {
            tracing::warn!(bind_code = log_prefix(bind_code), "bind code miss");
            return Err(AuthError::invalid_grant(
                "Bind code is unknown, expired, or already used",
            ));
        };

        serde_json::from_str(&json)
            .map_err(|e| AuthError::internal(format!("corrupt bind code record: {e}")))
    }
}
