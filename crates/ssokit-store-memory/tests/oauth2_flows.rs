//! End-to-end authorization code flows over the in-memory store.
//!
//! Walks the full control flow: PKCE param generation, the provider
//! callback consuming the state grant, code issuance bound to the stored
//! challenge, and both redemption paths of the exchange engine.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use ssokit_auth::{
    AuthConfig, AuthResult, AuthorizationCodeIssuer, ClientRecord, ClientRegistry, CodeChallenge,
    CodeVerifier, GrantType, PkceChallengeManager, PkceConfig, PkceFallbackPolicy,
    TokenExchangeEngine, TokenMinter, TokenPair, TokenRequest,
};
use ssokit_store_memory::MemoryEphemeralStore;

struct StaticRegistry {
    clients: HashMap<String, ClientRecord>,
}

impl StaticRegistry {
    fn new() -> Self {
        let mut clients = HashMap::new();
        clients.insert(
            "spa-client".to_string(),
            ClientRecord {
                client_id: "spa-client".to_string(),
                client_secret: None,
                token_endpoint: "https://sso.example.com/oauth2/token".to_string(),
                allowed_grant_types: vec![GrantType::AuthorizationCode],
                scopes: vec!["openid".to_string(), "profile".to_string()],
            },
        );
        clients.insert(
            "web-client".to_string(),
            ClientRecord {
                client_id: "web-client".to_string(),
                client_secret: Some("s3cret".to_string()),
                token_endpoint: "https://sso.example.com/oauth2/token".to_string(),
                allowed_grant_types: vec![GrantType::AuthorizationCode, GrantType::RefreshToken],
                scopes: vec!["openid".to_string()],
            },
        );
        Self { clients }
    }
}

#[async_trait]
impl ClientRegistry for StaticRegistry {
    async fn lookup_client(&self, client_id: &str) -> AuthResult<Option<ClientRecord>> {
        Ok(self.clients.get(client_id).cloned())
    }
}

struct StaticMinter;

#[async_trait]
impl TokenMinter for StaticMinter {
    async fn mint(
        &self,
        principal_id: &str,
        _client: &ClientRecord,
        scopes: &[String],
        _grant_type: GrantType,
    ) -> AuthResult<TokenPair> {
        Ok(
            TokenPair::new(format!("at-{principal_id}"), 3600, scopes.join(" "))
                .with_refresh_token(format!("rt-{principal_id}")),
        )
    }
}

struct Harness {
    store: Arc<MemoryEphemeralStore>,
    config: AuthConfig,
}

impl Harness {
    fn new(config: AuthConfig) -> Self {
        Self {
            store: Arc::new(MemoryEphemeralStore::new()),
            config,
        }
    }

    fn pkce(&self) -> PkceChallengeManager {
        PkceChallengeManager::new(self.store.clone())
    }

    fn issuer(&self) -> AuthorizationCodeIssuer {
        AuthorizationCodeIssuer::new(self.store.clone())
    }

    fn engine(&self) -> TokenExchangeEngine {
        TokenExchangeEngine::new(
            self.issuer(),
            Arc::new(StaticRegistry::new()),
            Arc::new(StaticMinter),
            self.config.clone(),
        )
    }
}

fn pkce_disabled() -> AuthConfig {
    AuthConfig {
        pkce: PkceConfig {
            required: false,
            fallback: PkceFallbackPolicy::Reject,
        },
        ..AuthConfig::default()
    }
}

#[tokio::test]
async fn full_pkce_round_trip() {
    let harness = Harness::new(AuthConfig::default());
    let pkce = harness.pkce();

    // 1. Client asks for PKCE params before the redirect.
    let params = pkce
        .generate_params(harness.config.state_ttl)
        .await
        .unwrap();
    assert_eq!(params.code_challenge_method, "S256");

    // 2. Provider redirects back with (code, state); the callback consumes
    //    the grant and issues a code bound to the stored challenge.
    let grant = pkce.take_for_state(&params.state).await.unwrap().unwrap();
    assert_eq!(grant.code_verifier, params.code_verifier);

    let challenge = CodeChallenge::new(grant.code_challenge).unwrap();
    let code = harness
        .issuer()
        .issue(
            "spa-client",
            "user-1",
            vec!["openid".to_string(), "profile".to_string()],
            Some(&challenge),
        )
        .await
        .unwrap();

    // A duplicated callback cannot consume the state again.
    assert!(pkce.take_for_state(&params.state).await.unwrap().is_none());

    // 3. Client redeems the code with its verifier.
    let engine = harness.engine();
    let request = TokenRequest::authorization_code(&code.value, "spa-client")
        .with_code_verifier(&params.code_verifier);
    let tokens = engine.exchange(&request).await.unwrap();

    assert!(!tokens.access_token.is_empty());
    assert!(tokens.expires_in > 0);
    assert_eq!(tokens.scope, "openid profile");

    // 4. The code is single-use.
    let err = engine.exchange(&request).await.unwrap_err();
    assert_eq!(err.oauth_error_code(), "invalid_grant");
}

#[tokio::test]
async fn verifier_mismatch_consumes_the_code() {
    let harness = Harness::new(AuthConfig::default());
    let (verifier, challenge) = ssokit_auth::generate_challenge_pair();
    let code = harness
        .issuer()
        .issue("spa-client", "user-1", vec!["openid".to_string()], Some(&challenge))
        .await
        .unwrap();

    let engine = harness.engine();
    let wrong = CodeVerifier::generate();
    let request = TokenRequest::authorization_code(&code.value, "spa-client")
        .with_code_verifier(wrong.as_str());
    let err = engine.exchange(&request).await.unwrap_err();
    assert_eq!(err.oauth_error_code(), "invalid_grant");

    // Not retryable even with the right verifier: consumption happened at
    // redemption, before validation.
    let request = TokenRequest::authorization_code(&code.value, "spa-client")
        .with_code_verifier(verifier.as_str());
    let err = engine.exchange(&request).await.unwrap_err();
    assert_eq!(err.oauth_error_code(), "invalid_grant");
}

#[tokio::test]
async fn confidential_client_exchange() {
    let harness = Harness::new(pkce_disabled());
    let code = harness
        .issuer()
        .issue("web-client", "user-2", vec!["openid".to_string()], None)
        .await
        .unwrap();

    let engine = harness.engine();
    let request = TokenRequest::authorization_code(&code.value, "web-client")
        .with_client_secret("s3cret");
    let tokens = engine.exchange(&request).await.unwrap();

    assert!(!tokens.access_token.is_empty());
    assert!(tokens.expires_in > 0);
    assert_eq!(tokens.refresh_token.as_deref(), Some("rt-user-2"));
}

#[tokio::test]
async fn confidential_client_bad_secret_rejected() {
    let harness = Harness::new(pkce_disabled());
    let code = harness
        .issuer()
        .issue("web-client", "user-2", vec!["openid".to_string()], None)
        .await
        .unwrap();

    let engine = harness.engine();
    let request = TokenRequest::authorization_code(&code.value, "web-client")
        .with_client_secret("wrong");
    let err = engine.exchange(&request).await.unwrap_err();

    assert_eq!(err.oauth_error_code(), "invalid_client");
    assert_eq!(err.http_status(), 401);
}

#[tokio::test]
async fn pkce_grant_expires_with_its_ttl() {
    let harness = Harness::new(AuthConfig::default());
    let pkce = harness.pkce();

    let params = pkce
        .generate_params(std::time::Duration::from_millis(10))
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(30)).await;

    assert!(pkce.take_for_state(&params.state).await.unwrap().is_none());
}

#[tokio::test]
async fn required_pkce_rejects_secret_only_request_by_default() {
    let harness = Harness::new(AuthConfig::default());
    let code = harness
        .issuer()
        .issue("web-client", "user-2", vec!["openid".to_string()], None)
        .await
        .unwrap();

    let engine = harness.engine();
    let request = TokenRequest::authorization_code(&code.value, "web-client")
        .with_client_secret("s3cret");
    let err = engine.exchange(&request).await.unwrap_err();
    assert_eq!(err.oauth_error_code(), "invalid_request");
}

#[tokio::test]
async fn required_pkce_with_fallback_accepts_secret_path() {
    let config = AuthConfig {
        pkce: PkceConfig {
            required: true,
            fallback: PkceFallbackPolicy::ClientSecret,
        },
        ..AuthConfig::default()
    };
    let harness = Harness::new(config);
    let code = harness
        .issuer()
        .issue("web-client", "user-2", vec!["openid".to_string()], None)
        .await
        .unwrap();

    let engine = harness.engine();
    let request = TokenRequest::authorization_code(&code.value, "web-client")
        .with_client_secret("s3cret");
    assert!(engine.exchange(&request).await.is_ok());
}
