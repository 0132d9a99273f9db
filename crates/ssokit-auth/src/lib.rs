//! # ssokit-auth
//!
//! Core of an OAuth 2.0 Authorization Code exchange engine with PKCE
//! support, anti-CSRF state management, and a bridge for third-party
//! identity providers.
//!
//! The crate coordinates short-lived, single-use cryptographic artifacts
//! (states, verifier/challenge pairs, authorization codes, bind codes,
//! token handoff codes) across multiple HTTP round-trips. All cross-request
//! coordination happens through an [`EphemeralStore`] whose atomic
//! take-once primitive guarantees at-most-once redemption under concurrent
//! load; the engines themselves are stateless and safe to share across a
//! worker pool.
//!
//! ## Modules
//!
//! - [`config`] - engine configuration
//! - [`error`] - error taxonomy mapped to the OAuth 2.0 vocabulary
//! - [`store`] - the ephemeral TTL store trait
//! - [`oauth`] - PKCE, states, authorization codes, and the exchange engine
//! - [`clients`] - client registration lookup
//! - [`mint`] - delegated token minting
//! - [`bridge`] - third-party identity binding and token handoff
//!
//! ## Collaborators
//!
//! HTTP routing, client persistence, user storage, password hashing, and
//! token signing are external: the engine consumes them behind the
//! [`ClientRegistry`], [`UserRepository`], [`PasswordVerifier`], and
//! [`TokenMinter`] traits, injected once at construction.

pub mod bridge;
pub mod clients;
pub mod config;
pub mod error;
pub mod mint;
pub mod oauth;
pub mod store;

pub use bridge::{
    BindCredentials, CallbackOutcome, ExternalIdCipher, ExternalProfile, NewAccountDetails,
    PasswordVerifier, Platform, ThirdPartyBindingBridge, UserAccount, UserRepository,
};
pub use clients::{ClientRecord, ClientRegistry, GrantType, verify_client_secret};
pub use config::{AuthConfig, BridgeConfig, PkceConfig, PkceFallbackPolicy};
pub use error::{AuthError, ErrorCategory, log_prefix};
pub use mint::TokenMinter;
pub use oauth::{
    AuthorizationCode, AuthorizationCodeIssuer, ChallengeMethod, CodeChallenge, CodeVerifier,
    PkceChallengeManager, PkceError, PkceParams, StateEntry, StateManager, TokenExchangeEngine,
    TokenPair, TokenRequest, generate_challenge_pair,
};
pub use store::EphemeralStore;

/// Type alias for results in this crate.
pub type AuthResult<T> = Result<T, AuthError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use ssokit_auth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::AuthResult;
    pub use crate::bridge::{
        BindCredentials, CallbackOutcome, ExternalIdCipher, ExternalProfile, NewAccountDetails,
        PasswordVerifier, Platform, ThirdPartyBindingBridge, UserRepository,
    };
    pub use crate::clients::{ClientRecord, ClientRegistry, GrantType};
    pub use crate::config::{AuthConfig, BridgeConfig, PkceConfig, PkceFallbackPolicy};
    pub use crate::error::{AuthError, ErrorCategory};
    pub use crate::mint::TokenMinter;
    pub use crate::oauth::{
        AuthorizationCode, AuthorizationCodeIssuer, ChallengeMethod, CodeChallenge, CodeVerifier,
        PkceChallengeManager, PkceParams, StateManager, TokenExchangeEngine, TokenPair,
        TokenRequest,
    };
    pub use crate::store::EphemeralStore;
}
