//! Client registration types and lookup.
//!
//! Client persistence is an external collaborator: the engine only needs
//! [`ClientRegistry::lookup_client`] and the registration data it returns.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use subtle::ConstantTimeEq;

use crate::AuthResult;
use crate::error::AuthError;

/// OAuth 2.0 grant types a client may be allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    /// Authorization code grant (the only grant this engine redeems).
    AuthorizationCode,
    /// Refresh token grant.
    RefreshToken,
    /// Client credentials grant.
    ClientCredentials,
}

impl GrantType {
    /// Returns the wire form of the grant type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthorizationCode => "authorization_code",
            Self::RefreshToken => "refresh_token",
            Self::ClientCredentials => "client_credentials",
        }
    }
}

impl fmt::Display for GrantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A registered OAuth client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientRecord {
    /// The OAuth client identifier.
    pub client_id: String,

    /// Shared secret for confidential clients. Public clients have none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    /// Token endpoint this client exchanges codes at.
    pub token_endpoint: String,

    /// Grant types the client may use.
    pub allowed_grant_types: Vec<GrantType>,

    /// Scopes the client may be granted.
    pub scopes: Vec<String>,
}

impl ClientRecord {
    /// Returns `true` if the client holds a shared secret.
    #[must_use]
    pub fn is_confidential(&self) -> bool {
        self.client_secret.is_some()
    }

    /// Returns `true` if the client may use the given grant type.
    #[must_use]
    pub fn is_grant_type_allowed(&self, grant_type: GrantType) -> bool {
        self.allowed_grant_types.contains(&grant_type)
    }

    /// Returns `true` if the client may be granted the given scope.
    #[must_use]
    pub fn is_scope_allowed(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }
}

/// Lookup capability over the client registration store.
///
/// Implementations are external to this crate (database, config file,
/// remote service).
#[async_trait]
pub trait ClientRegistry: Send + Sync {
    /// Finds a client by its OAuth client_id.
    ///
    /// Returns `None` if the client does not exist or is not active.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    async fn lookup_client(&self, client_id: &str) -> AuthResult<Option<ClientRecord>>;
}

/// Verifies a supplied client secret against the registered one.
///
/// The comparison is constant-time. A public client (no registered secret)
/// never verifies.
///
/// # Errors
///
/// Returns `InvalidClient` if the client has no secret or the secrets do
/// not match.
pub fn verify_client_secret(client: &ClientRecord, supplied: &str) -> AuthResult<()> {
    let Some(registered) = client.client_secret.as_deref() else {
        return Err(AuthError::invalid_client(
            "Client has no registered secret",
        ));
    };

    let matches: bool = registered.as_bytes().ct_eq(supplied.as_bytes()).into();
    if matches {
        Ok(())
    } else {
        Err(AuthError::invalid_client("Invalid client secret"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn confidential() -> ClientRecord {
        ClientRecord {
            client_id: "web-client".to_string(),
            client_secret: Some("s3cret".to_string()),
            token_endpoint: "https://sso.example.com/oauth2/token".to_string(),
            allowed_grant_types: vec![GrantType::AuthorizationCode, GrantType::RefreshToken],
            scopes: vec!["openid".to_string(), "profile".to_string()],
        }
    }

    fn public() -> ClientRecord {
        ClientRecord {
            client_id: "spa-client".to_string(),
            client_secret: None,
            token_endpoint: "https://sso.example.com/oauth2/token".to_string(),
            allowed_grant_types: vec![GrantType::AuthorizationCode],
            scopes: vec!["openid".to_string()],
        }
    }

    #[test]
    fn test_confidential_predicate() {
        assert!(confidential().is_confidential());
        assert!(!public().is_confidential());
    }

    #[test]
    fn test_grant_type_checks() {
        let client = confidential();
        assert!(client.is_grant_type_allowed(GrantType::AuthorizationCode));
        assert!(!client.is_grant_type_allowed(GrantType::ClientCredentials));
        assert_eq!(GrantType::AuthorizationCode.as_str(), "authorization_code");
    }

    #[test]
    fn test_scope_checks() {
        let client = confidential();
        assert!(client.is_scope_allowed("openid"));
        assert!(!client.is_scope_allowed("admin"));
    }

    #[test]
    fn test_verify_secret_match() {
        assert!(verify_client_secret(&confidential(), "s3cret").is_ok());
    }

    #[test]
    fn test_verify_secret_mismatch() {
        let err = verify_client_secret(&confidential(), "wrong").unwrap_err();
        assert_eq!(err.oauth_error_code(), "invalid_client");
        assert_eq!(err.http_status(), 401);
    }

    #[test]
    fn test_verify_secret_public_client() {
        let err = verify_client_secret(&public(), "anything").unwrap_err();
        assert_eq!(err.oauth_error_code(), "invalid_client");
    }

    #[test]
    fn test_record_serialization() {
        let json = serde_json::to_value(public()).unwrap();
        assert_eq!(json["client_id"], "spa-client");
        assert!(json.get("client_secret").is_none());
        assert_eq!(json["allowed_grant_types"][0], "authorization_code");
    }
}
