//! User-facing collaborator traits for the binding bridge.
//!
//! Account storage and password hashing are external capabilities; the
//! bridge only drives lookups, creation, credential verification, and
//! identity linking through these traits.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::AuthResult;
use crate::bridge::Platform;

/// A local account as the bridge sees it.
#[derive(Debug, Clone)]
pub struct UserAccount {
    /// Internal user identifier.
    pub user_id: String,

    /// Login name.
    pub username: String,

    /// Hashed password, opaque to this crate; only ever handed to the
    /// [`PasswordVerifier`].
    pub password_hash: String,
}

/// Credentials presented to bind an existing account.
#[derive(Debug, Clone, Deserialize)]
pub struct BindCredentials {
    /// Login name of the account to bind.
    pub username: String,

    /// Plaintext password, verified against the stored hash.
    pub password: String,
}

/// Details for creating a new account during a bind-or-create flow.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAccountDetails {
    /// Login name for the new account.
    pub username: String,

    /// Plaintext password; hashing is the repository's concern.
    pub password: String,

    /// Display name, typically seeded from the third-party profile.
    #[serde(default)]
    pub nickname: Option<String>,
}

/// Profile data relayed from the third-party provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExternalProfile {
    /// Display name at the provider.
    #[serde(default)]
    pub nickname: Option<String>,

    /// Avatar URL at the provider.
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Account storage capability.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Resolves the internal user linked to an external identity.
    ///
    /// Returns `None` when no mapping exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    async fn find_by_external_id(
        &self,
        platform: Platform,
        external_id: &str,
    ) -> AuthResult<Option<String>>;

    /// Finds an account by login name.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    async fn find_by_username(&self, username: &str) -> AuthResult<Option<UserAccount>>;

    /// Creates a new account and returns its user id.
    ///
    /// # Errors
    ///
    /// Returns an error if the account cannot be created (e.g. the
    /// username is taken).
    async fn create(&self, details: &NewAccountDetails) -> AuthResult<String>;

    /// Links an external identity to an existing account.
    ///
    /// # Errors
    ///
    /// Returns an error if the link cannot be recorded.
    async fn link_external_id(
        &self,
        user_id: &str,
        platform: Platform,
        external_id: &str,
        profile: &ExternalProfile,
    ) -> AuthResult<()>;
}

/// Password verification capability.
#[async_trait]
pub trait PasswordVerifier: Send + Sync {
    /// Returns `true` if `raw` matches the stored `hashed` credential.
    ///
    /// # Errors
    ///
    /// Returns an error only if verification itself cannot run (e.g. a
    /// corrupt hash); a plain mismatch is `Ok(false)`.
    async fn verify(&self, raw: &str, hashed: &str) -> AuthResult<bool>;
}
