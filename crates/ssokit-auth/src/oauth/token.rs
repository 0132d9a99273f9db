//! Token endpoint wire types.
//!
//! These types mirror the token endpoint contract: the form-encoded
//! [`TokenRequest`], the JSON [`TokenPair`] success body, and the
//! [`PkceParams`] returned by the PKCE parameter operation.
//!
//! Error bodies are built by the embedding server from
//! [`AuthError::oauth_error_code`](crate::AuthError::oauth_error_code) and
//! [`AuthError::http_status`](crate::AuthError::http_status).

use serde::{Deserialize, Serialize};

/// Token request parameters.
///
/// Clients authenticate either with PKCE (`code_verifier`, public clients)
/// or with a shared secret (`client_secret`, confidential clients). The
/// engine dispatches on which of the two is present.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenRequest {
    /// OAuth 2.0 grant type. Must be "authorization_code".
    pub grant_type: String,

    /// The authorization code being redeemed.
    #[serde(default)]
    pub code: Option<String>,

    /// Redirect URI from the authorization request.
    /// Accepted on the wire; redirect binding is enforced by the
    /// authorization endpoint, not by the exchange engine.
    #[serde(default)]
    pub redirect_uri: Option<String>,

    /// Client identifier.
    #[serde(default)]
    pub client_id: Option<String>,

    /// Client secret (confidential clients).
    #[serde(default)]
    pub client_secret: Option<String>,

    /// PKCE code verifier (public clients).
    #[serde(default)]
    pub code_verifier: Option<String>,

    /// Anti-CSRF state echoed by some clients.
    #[serde(default)]
    pub state: Option<String>,
}

impl TokenRequest {
    /// Creates an authorization-code request with only the required fields.
    ///
    /// Mostly useful in tests and embedding code; wire requests are
    /// deserialized from the form body.
    #[must_use]
    pub fn authorization_code(code: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            grant_type: "authorization_code".to_string(),
            code: Some(code.into()),
            redirect_uri: None,
            client_id: Some(client_id.into()),
            client_secret: None,
            code_verifier: None,
            state: None,
        }
    }

    /// Sets the PKCE code verifier.
    #[must_use]
    pub fn with_code_verifier(mut self, verifier: impl Into<String>) -> Self {
        self.code_verifier = Some(verifier.into());
        self
    }

    /// Sets the client secret.
    #[must_use]
    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }
}

/// A minted token set, as returned by the token endpoint.
///
/// # Example Response
///
/// ```json
/// {
///   "access_token": "eyJhbG...",
///   "token_type": "Bearer",
///   "expires_in": 3600,
///   "scope": "openid profile",
///   "refresh_token": "abc123..."
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    /// The access token.
    pub access_token: String,

    /// Token type, always "Bearer".
    pub token_type: String,

    /// Access token lifetime in seconds.
    pub expires_in: u64,

    /// Granted scopes (space-separated).
    pub scope: String,

    /// Refresh token, if the client is allowed one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// ID token, if the openid scope was granted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
}

impl TokenPair {
    /// Creates a token pair with the required fields.
    #[must_use]
    pub fn new(access_token: String, expires_in: u64, scope: String) -> Self {
        Self {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in,
            scope,
            refresh_token: None,
            id_token: None,
        }
    }

    /// Sets the refresh token.
    #[must_use]
    pub fn with_refresh_token(mut self, token: String) -> Self {
        self.refresh_token = Some(token);
        self
    }

    /// Sets the ID token.
    #[must_use]
    pub fn with_id_token(mut self, token: String) -> Self {
        self.id_token = Some(token);
        self
    }
}

/// PKCE parameters handed to a client before the authorization redirect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PkceParams {
    /// Anti-CSRF state the client carries through the redirect.
    pub state: String,

    /// The code verifier the client presents at redemption.
    pub code_verifier: String,

    /// The challenge the client sends to the authorization endpoint.
    pub code_challenge: String,

    /// Challenge method, always "S256".
    pub code_challenge_method: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_request_builder() {
        let request = TokenRequest::authorization_code("code-1", "client-1")
            .with_code_verifier("verifier-1");

        assert_eq!(request.grant_type, "authorization_code");
        assert_eq!(request.code.as_deref(), Some("code-1"));
        assert_eq!(request.client_id.as_deref(), Some("client-1"));
        assert_eq!(request.code_verifier.as_deref(), Some("verifier-1"));
        assert!(request.client_secret.is_none());
    }

    #[test]
    fn test_token_request_deserializes_sparse_form() {
        let request: TokenRequest = serde_json::from_str(
            r#"{"grant_type":"authorization_code","code":"abc","client_id":"web"}"#,
        )
        .unwrap();

        assert_eq!(request.code.as_deref(), Some("abc"));
        assert!(request.code_verifier.is_none());
        assert!(request.redirect_uri.is_none());
    }

    #[test]
    fn test_token_pair_serialization_skips_absent_options() {
        let pair = TokenPair::new("at".to_string(), 3600, "openid".to_string());
        let json = serde_json::to_value(&pair).unwrap();

        assert_eq!(json["access_token"], "at");
        assert_eq!(json["token_type"], "Bearer");
        assert_eq!(json["expires_in"], 3600);
        assert!(json.get("refresh_token").is_none());
        assert!(json.get("id_token").is_none());
    }

    #[test]
    fn test_token_pair_with_refresh_token() {
        let pair = TokenPair::new("at".to_string(), 3600, "openid".to_string())
            .with_refresh_token("rt".to_string());
        let json = serde_json::to_value(&pair).unwrap();

        assert_eq!(json["refresh_token"], "rt");
    }

    #[test]
    fn test_token_pair_round_trip() {
        let pair = TokenPair::new("at".to_string(), 900, "openid profile".to_string())
            .with_refresh_token("rt".to_string())
            .with_id_token("idt".to_string());

        let json = serde_json::to_string(&pair).unwrap();
        let back: TokenPair = serde_json::from_str(&json).unwrap();
        assert_eq!(back.access_token, "at");
        assert_eq!(back.refresh_token.as_deref(), Some("rt"));
        assert_eq!(back.id_token.as_deref(), Some("idt"));
    }
}
