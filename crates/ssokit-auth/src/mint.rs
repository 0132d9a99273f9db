//! Token minting capability.
//!
//! Signing and issuing the long-lived tokens is delegated: the exchange
//! engine hands an authenticated principal, the client, and the granted
//! scopes to a [`TokenMinter`] and embeds whatever it returns in the token
//! response. Signature algorithms, key management, and claim layout live
//! behind this trait.

use async_trait::async_trait;

use crate::AuthResult;
use crate::clients::{ClientRecord, GrantType};
use crate::oauth::token::TokenPair;

/// Turns an authenticated principal into a signed token set.
#[async_trait]
pub trait TokenMinter: Send + Sync {
    /// Mints access/refresh/id tokens for a principal.
    ///
    /// # Arguments
    ///
    /// * `principal_id` - The authenticated principal
    /// * `client` - The client the tokens are issued to
    /// * `scopes` - The granted scopes
    /// * `grant_type` - The grant that produced this mint
    ///
    /// # Errors
    ///
    /// Returns an error if the tokens cannot be produced; the engine
    /// surfaces this as `Internal`.
    async fn mint(
        &self,
        principal_id: &str,
        client: &ClientRecord,
        scopes: &[String],
        grant_type: GrantType,
    ) -> AuthResult<TokenPair>;
}
