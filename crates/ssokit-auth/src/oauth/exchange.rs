//! Token exchange engine.
//!
//! Redeems authorization codes for tokens over the two supported paths:
//!
//! - **PKCE path** (public clients): the request carries a `code_verifier`
//!   that must hash to the challenge recorded on the code. No fallback to
//!   secret authentication.
//! - **Confidential path**: the request carries the client's shared secret,
//!   compared in constant time against the registration.
//!
//! Client resolution and authentication happen before redemption, so an
//! authentication failure never consumes a code. Redemption itself is the
//! point of consumption: any validation that fails after it still leaves
//! the code destroyed, and a second exchange attempt fails regardless of
//! how the first one ended.

use std::sync::Arc;

use tokio::time::timeout;

use crate::AuthResult;
use crate::clients::{ClientRecord, ClientRegistry, GrantType, verify_client_secret};
use crate::config::{AuthConfig, PkceFallbackPolicy};
use crate::error::{AuthError, log_prefix};
use crate::mint::TokenMinter;
use crate::oauth::code::{AuthorizationCode, AuthorizationCodeIssuer};
use crate::oauth::pkce::ChallengeMethod;
use crate::oauth::state::PkceChallengeManager;
use crate::oauth::token::{TokenPair, TokenRequest};

/// Orchestrates authorization code redemption and token minting.
pub struct TokenExchangeEngine {
    codes: AuthorizationCodeIssuer,
    clients: Arc<dyn ClientRegistry>,
    minter: Arc<dyn TokenMinter>,
    config: AuthConfig,
}

impl TokenExchangeEngine {
    /// Creates a new exchange engine.
    ///
    /// # Arguments
    ///
    /// * `codes` - Issuer over the shared ephemeral store
    /// * `clients` - Client registration lookup
    /// * `minter` - Token minting capability
    /// * `config` - PKCE policy and operation timeouts
    #[must_use]
    pub fn new(
        codes: AuthorizationCodeIssuer,
        clients: Arc<dyn ClientRegistry>,
        minter: Arc<dyn TokenMinter>,
        config: AuthConfig,
    ) -> Self {
        Self {
            codes,
            clients,
            minter,
            config,
        }
    }

    /// Exchanges an authorization code for a token pair.
    ///
    /// # Errors
    ///
    /// - `UnsupportedGrantType` for any grant other than `authorization_code`
    /// - `InvalidRequest` for missing parameters, or when PKCE is required
    ///   and the fallback policy is [`PkceFallbackPolicy::Reject`]
    /// - `InvalidClient` for unknown clients, bad secrets, or public
    ///   clients on the secret path
    /// - `InvalidGrant` for unknown/expired/replayed codes, client-binding
    ///   mismatches, and verifier mismatches
    /// - `StoreUnavailable` for transient store failures (retried once
    ///   internally before surfacing)
    /// - `Internal` when minting fails (the code is already consumed)
    pub async fn exchange(&self, request: &TokenRequest) -> AuthResult<TokenPair> {
        if request.grant_type != GrantType::AuthorizationCode.as_str() {
            return Err(AuthError::unsupported_grant_type(&request.grant_type));
        }

        let code_value = request
            .code
            .as_deref()
            .ok_or_else(|| AuthError::invalid_request("code is required"))?;
        let client_id = request
            .client_id
            .as_deref()
            .ok_or_else(|| AuthError::invalid_request("client_id is required"))?;

        let client = self
            .lookup_client(client_id)
            .await?
            .ok_or_else(|| AuthError::invalid_client("Unknown client"))?;

        if !client.is_grant_type_allowed(GrantType::AuthorizationCode) {
            return Err(AuthError::invalid_client(
                "Client is not authorized for the authorization_code grant",
            ));
        }

        match request.code_verifier.as_deref() {
            Some(verifier) => self.exchange_pkce(&client, code_value, verifier).await,
            None if self.config.pkce.required => match self.config.pkce.fallback {
                PkceFallbackPolicy::Reject => Err(AuthError::invalid_request(
                    "code_verifier is required by this deployment",
                )),
                PkceFallbackPolicy::ClientSecret => {
                    tracing::warn!(
                        client_id,
                        "PKCE required but no code_verifier supplied; \
                         falling back to client secret authentication"
                    );
                    self.exchange_confidential(&client, code_value, request.client_secret.as_deref())
                        .await
                }
            },
            None => {
                self.exchange_confidential(&client, code_value, request.client_secret.as_deref())
                    .await
            }
        }
    }

    /// PKCE redemption path. The verifier is the client's proof of
    /// possession; secrets play no role here.
    async fn exchange_pkce(
        &self,
        client: &ClientRecord,
        code_value: &str,
        verifier: &str,
    ) -> AuthResult<TokenPair> {
        let code = self.redeem(code_value).await?;
        self.check_client_binding(&code, client)?;

        match code.code_challenge.as_deref() {
            Some(challenge) => {
                let method = code.challenge_method.unwrap_or(ChallengeMethod::S256);
                PkceChallengeManager::validate_verifier(challenge, method, verifier)?;
            }
            // A verifier against a code with no recorded challenge cannot
            // be verified; refusing it keeps interception off this path.
            None => {
                return Err(AuthError::invalid_grant(
                    "Authorization code was not issued with a PKCE challenge",
                ));
            }
        }

        self.mint(&code, client).await
    }

    /// Confidential-client redemption path. A code issued with a PKCE
    /// challenge is accepted here only because the secret was validated
    /// first.
    async fn exchange_confidential(
        &self,
        client: &ClientRecord,
        code_value: &str,
        supplied_secret: Option<&str>,
    ) -> AuthResult<TokenPair> {
        if !client.is_confidential() {
            return Err(AuthError::invalid_client("Public clients must use PKCE"));
        }
        let secret = supplied_secret
            .ok_or_else(|| AuthError::invalid_client("client_secret is required"))?;
        verify_client_secret(client, secret)?;

        let code = self.redeem(code_value).await?;
        self.check_client_binding(&code, client)?;

        self.mint(&code, client).await
    }

    fn check_client_binding(
        &self,
        code: &AuthorizationCode,
        client: &ClientRecord,
    ) -> AuthResult<()> {
        if code.client_id != client.client_id {
            tracing::warn!(
                client_id = %client.client_id,
                code = log_prefix(&code.value),
                "authorization code was issued to a different client"
            );
            return Err(AuthError::invalid_grant(
                "Authorization code was not issued to this client",
            ));
        }
        Ok(())
    }

    /// Redeems the code, retrying once on a transient store failure.
    /// The successful `take_once` inside is the single point of
    /// consumption for the whole exchange.
    async fn redeem(&self, code_value: &str) -> AuthResult<AuthorizationCode> {
        let attempt = timeout(self.config.op_timeout, self.codes.redeem(code_value)).await;

        let redeemed = match attempt {
            Ok(Ok(redeemed)) => Ok(redeemed),
            Ok(Err(e)) if e.is_retryable() => {
                tracing::warn!(error = %e, "store failure during redemption, retrying once");
                match timeout(self.config.op_timeout, self.codes.redeem(code_value)).await {
                    Ok(result) => result,
                    Err(_) => Err(AuthError::store_unavailable("code redemption timed out")),
                }
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(AuthError::store_unavailable("code redemption timed out")),
        }?;

        redeemed.ok_or_else(|| {
            AuthError::invalid_grant("Authorization code is unknown, expired, or already used")
        })
    }

    async fn lookup_client(&self, client_id: &str) -> AuthResult<Option<ClientRecord>> {
        let attempt = timeout(self.config.op_timeout, self.clients.lookup_client(client_id)).await;

        match attempt {
            Ok(Ok(client)) => Ok(client),
            Ok(Err(e)) if e.is_retryable() => {
                tracing::warn!(error = %e, "client lookup failed, retrying once");
                match timeout(self.config.op_timeout, self.clients.lookup_client(client_id)).await {
                    Ok(result) => result,
                    Err(_) => Err(AuthError::store_unavailable("client lookup timed out")),
                }
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(AuthError::store_unavailable("client lookup timed out")),
        }
    }

    async fn mint(
        &self,
        code: &AuthorizationCode,
        client: &ClientRecord,
    ) -> AuthResult<TokenPair> {
        let minted = timeout(
            self.config.op_timeout,
            self.minter.mint(
                &code.principal_id,
                client,
                &code.scopes,
                GrantType::AuthorizationCode,
            ),
        )
        .await;

        match minted {
            Ok(Ok(pair)) => {
                tracing::debug!(
                    client_id = %client.client_id,
                    principal_id = %code.principal_id,
                    "exchanged authorization code"
                );
                Ok(pair)
            }
            // The code is already consumed at this point; the failure is
            // terminal for this grant.
            Ok(Err(e)) => {
                tracing::error!(
                    client_id = %client.client_id,
                    code = log_prefix(&code.value),
                    error = %e,
                    "token minting failed after code redemption"
                );
                Err(AuthError::internal(format!("token minting failed: {e}")))
            }
            Err(_) => Err(AuthError::internal("token minting timed out")),
        }
    }
}
