//! Anti-CSRF state management and state-keyed PKCE grants.
//!
//! Two cooperating pieces live here:
//!
//! - [`StateManager`] issues and validates bare anti-CSRF `state` tokens
//!   carried through an authorization redirect round-trip. A state is valid
//!   exactly once; replayed or browser-duplicated callbacks observe a miss.
//! - [`PkceChallengeManager`] persists the `(verifier, challenge)` pair
//!   generated for a pending authorization under its state, and validates
//!   the verifier at redemption time.
//!
//! Both write exclusively through the [`EphemeralStore`], so consumption is
//! atomic across process instances.

use std::sync::Arc;
use std::time::Duration;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::AuthResult;
use crate::error::{AuthError, log_prefix};
use crate::oauth::pkce::{
    ChallengeMethod, CodeChallenge, CodeVerifier, generate_challenge_pair,
};
use crate::oauth::token::PkceParams;
use crate::store::EphemeralStore;

/// Key prefix for state-keyed PKCE grants.
pub const PKCE_STATE_PREFIX: &str = "pkce:state:";

// =============================================================================
// State Manager
// =============================================================================

/// Issues and validates single-use anti-CSRF state tokens.
pub struct StateManager {
    store: Arc<dyn EphemeralStore>,
}

impl StateManager {
    /// Creates a new state manager.
    #[must_use]
    pub fn new(store: Arc<dyn EphemeralStore>) -> Self {
        Self { store }
    }

    /// Generates a high-entropy opaque state token.
    ///
    /// 32 random bytes encoded as base64url without padding (43 characters,
    /// well above the 122-bit entropy floor for CSRF tokens).
    #[must_use]
    pub fn generate_state() -> String {
        use rand::Rng;
        let bytes: [u8; 32] = rand::thread_rng().r#gen();
        URL_SAFE_NO_PAD.encode(bytes)
    }

    /// Issues a new state token and persists it under `{prefix}{state}`.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the state cannot be persisted.
    pub async fn issue_state(&self, prefix: &str, ttl: Duration) -> AuthResult<String> {
        let state = Self::generate_state();
        self.store
            .put(&format!("{prefix}{state}"), "1", ttl)
            .await?;
        tracing::debug!(state = log_prefix(&state), "issued anti-CSRF state");
        Ok(state)
    }

    /// Consumes a state token, returning whether it was still pending.
    ///
    /// The first call for a given state returns `true` and deletes it;
    /// every subsequent call returns `false`, even if the original callback
    /// was duplicated by the browser.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the store cannot be reached.
    pub async fn validate_and_consume(&self, prefix: &str, state: &str) -> AuthResult<bool> {
        let found = self
            .store
            .take_once(&format!("{prefix}{state}"))
            .await?
            .is_some();
        if !found {
            tracing::warn!(state = log_prefix(state), "unknown or replayed state");
        }
        Ok(found)
    }
}

// =============================================================================
// PKCE Grants
// =============================================================================

/// A pending PKCE grant, keyed by its state.
///
/// Created when PKCE parameters are generated; consumed exactly once by the
/// redemption path that needs the verifier, or left to expire via TTL.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateEntry {
    /// The code verifier handed to the client.
    pub code_verifier: String,

    /// The S256 challenge derived from the verifier.
    pub code_challenge: String,

    /// Challenge method (always S256).
    pub challenge_method: ChallengeMethod,

    /// When the grant was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Generates, persists, and validates PKCE verifier/challenge pairs.
pub struct PkceChallengeManager {
    store: Arc<dyn EphemeralStore>,
}

impl PkceChallengeManager {
    /// Creates a new PKCE challenge manager.
    #[must_use]
    pub fn new(store: Arc<dyn EphemeralStore>) -> Self {
        Self { store }
    }

    /// Generates a full PKCE parameter set and persists it under the state.
    ///
    /// This is the one-call operation behind the PKCE param endpoint: it
    /// issues a state, generates the verifier/challenge pair, stores the
    /// grant, and returns everything the client needs to start the
    /// authorization redirect.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the grant cannot be persisted.
    pub async fn generate_params(&self, ttl: Duration) -> AuthResult<PkceParams> {
        let state = StateManager::generate_state();
        let (verifier, challenge) = generate_challenge_pair();

        self.store_for_state(&state, &verifier, &challenge, ttl)
            .await?;

        tracing::debug!(state = log_prefix(&state), "generated PKCE params");
        Ok(PkceParams {
            state,
            code_verifier: verifier.into_inner(),
            code_challenge: challenge.into_inner(),
            code_challenge_method: ChallengeMethod::S256.as_str().to_string(),
        })
    }

    /// Persists a verifier/challenge pair under `pkce:state:{state}`.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the grant cannot be persisted, or
    /// `Internal` if the record fails to serialize.
    pub async fn store_for_state(
        &self,
        state: &str,
        verifier: &CodeVerifier,
        challenge: &CodeChallenge,
        ttl: Duration,
    ) -> AuthResult<()> {
        let entry = StateEntry {
            code_verifier: verifier.as_str().to_string(),
            code_challenge: challenge.as_str().to_string(),
            challenge_method: ChallengeMethod::S256,
            created_at: OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_string(&entry)
            .map_err(|e| AuthError::internal(format!("failed to serialize PKCE grant: {e}")))?;

        self.store
            .put(&format!("{PKCE_STATE_PREFIX}{state}"), &json, ttl)
            .await
    }

    /// Consumes the grant stored under a state, if still pending.
    ///
    /// Exactly one caller observes the entry; replays and expired grants
    /// return `None`.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the store cannot be reached, or
    /// `Internal` if the stored record is corrupt.
    pub async fn take_for_state(&self, state: &str) -> AuthResult<Option<StateEntry>> {
        let Some(json) = self
            .store
            .take_once(&format!("{PKCE_STATE_PREFIX}{state}"))
            .await?
        else {
            return Ok(None);
        };

        let entry: StateEntry = serde_json::from_str(&json)
            .map_err(|e| AuthError::internal(format!("corrupt PKCE grant record: {e}")))?;
        Ok(Some(entry))
    }

    /// Returns whether a grant is still pending for the state, without
    /// consuming it.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the store cannot be reached.
    pub async fn peek_state(&self, state: &str) -> AuthResult<bool> {
        Ok(self
            .store
            .peek(&format!("{PKCE_STATE_PREFIX}{state}"))
            .await?
            .is_some())
    }

    /// Validates a supplied verifier against a stored challenge.
    ///
    /// Recomputes the challenge from the supplied verifier and compares in
    /// constant time. A mismatch is a hard `invalid_grant` failure, never
    /// downgraded.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` if the verifier is malformed or the stored
    ///   challenge is not base64url
    /// - `InvalidGrant` if the verifier does not hash to the challenge
    pub fn validate_verifier(
        stored_challenge: &str,
        method: ChallengeMethod,
        supplied_verifier: &str,
    ) -> AuthResult<()> {
        let verifier = CodeVerifier::new(supplied_verifier.to_string())?;
        let challenge = CodeChallenge::new(stored_challenge.to_string())?;
        match method {
            ChallengeMethod::S256 => challenge.verify(&verifier)?,
        }
        Ok(())
    }
}
