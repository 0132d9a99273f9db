//! OAuth 2.0 authorization code flow.
//!
//! The flow is implemented across several submodules:
//!
//! - [`pkce`] - PKCE verifier/challenge generation and validation
//! - [`state`] - anti-CSRF states and state-keyed PKCE grants
//! - [`code`] - authorization code issuance and one-time redemption
//! - [`token`] - token endpoint wire types
//! - [`exchange`] - the token exchange engine
//!
//! # Flow
//!
//! ```ignore
//! use ssokit_auth::oauth::{
//!     AuthorizationCodeIssuer, PkceChallengeManager, TokenExchangeEngine, TokenRequest,
//! };
//!
//! // 1. Hand PKCE params to the client before the redirect
//! let params = pkce.generate_params(config.state_ttl).await?;
//!
//! // 2. Provider redirects back with (code, state); consume the grant and
//! //    issue an authorization code bound to the stored challenge
//! let grant = pkce.take_for_state(&state).await?.ok_or(...)?;
//! let challenge = CodeChallenge::new(grant.code_challenge)?;
//! let code = codes.issue(client_id, principal_id, scopes, Some(&challenge)).await?;
//!
//! // 3. Client redeems the code with its verifier
//! let tokens = engine.exchange(&TokenRequest { .. }).await?;
//! ```

pub mod code;
pub mod exchange;
pub mod pkce;
pub mod state;
pub mod token;

// PKCE types
pub use pkce::{ChallengeMethod, CodeChallenge, CodeVerifier, PkceError, generate_challenge_pair};

// State management
pub use state::{PKCE_STATE_PREFIX, PkceChallengeManager, StateEntry, StateManager};

// Authorization codes
pub use code::{AuthorizationCode, AuthorizationCodeIssuer, CODE_KEY_PREFIX, CODE_LIFETIME};

// Wire types
pub use token::{PkceParams, TokenPair, TokenRequest};

// Exchange engine
pub use exchange::TokenExchangeEngine;
