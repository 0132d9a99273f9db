//! PKCE (Proof Key for Code Exchange) verifier and challenge handling.
//!
//! Implements RFC 7636 with the S256 method only. The "plain" method is
//! rejected as a matter of policy, never silently accepted.
//!
//! # Example
//!
//! ```
//! use ssokit_auth::oauth::pkce::{CodeChallenge, CodeVerifier};
//!
//! let verifier = CodeVerifier::generate();
//! let challenge = CodeChallenge::from_verifier(&verifier);
//!
//! // Server stores the challenge, later verifies with the verifier from
//! // the token request.
//! assert!(challenge.verify(&verifier).is_ok());
//! ```

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::AuthError;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during PKCE operations.
#[derive(Debug, thiserror::Error)]
pub enum PkceError {
    /// Verifier length is outside the RFC 7636 range (43-128 characters).
    #[error("Invalid verifier length: must be 43-128 characters, got {0}")]
    InvalidVerifierLength(usize),

    /// Verifier contains characters outside `[A-Za-z0-9-._~]`.
    #[error("Invalid verifier characters: must be URL-safe base64 ([A-Za-z0-9-._~])")]
    InvalidVerifierCharacters,

    /// Challenge is not valid base64url.
    #[error("Invalid challenge format: must be valid base64url")]
    InvalidChallengeFormat,

    /// Unsupported challenge method (only S256 is supported).
    #[error("Unsupported challenge method: {0}. Only S256 is supported.")]
    UnsupportedMethod(String),

    /// The verifier does not hash to the stored challenge.
    #[error("PKCE verification failed: verifier does not match challenge")]
    VerificationFailed,
}

impl From<PkceError> for AuthError {
    fn from(err: PkceError) -> Self {
        match err {
            PkceError::VerificationFailed => AuthError::invalid_grant(err.to_string()),
            other => AuthError::invalid_request(other.to_string()),
        }
    }
}

// =============================================================================
// Challenge Method
// =============================================================================

/// PKCE challenge method.
///
/// Only S256 (SHA-256) is supported. The "plain" method is explicitly
/// rejected: it would let a code interceptor replay the challenge as the
/// verifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChallengeMethod {
    /// SHA-256 hash (the only supported method).
    S256,
}

impl ChallengeMethod {
    /// Parses a challenge method from its wire form.
    ///
    /// # Errors
    ///
    /// Returns `PkceError::UnsupportedMethod` for anything other than
    /// "S256", including "plain".
    pub fn parse(method: &str) -> Result<Self, PkceError> {
        match method {
            "S256" => Ok(Self::S256),
            other => Err(PkceError::UnsupportedMethod(other.to_string())),
        }
    }

    /// Returns the wire form of the method.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::S256 => "S256",
        }
    }
}

impl std::fmt::Display for ChallengeMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Default for ChallengeMethod {
    fn default() -> Self {
        Self::S256
    }
}

// =============================================================================
// Code Verifier
// =============================================================================

/// PKCE code verifier.
///
/// A high-entropy random string using the unreserved characters
/// `[A-Za-z0-9-._~]`, 43 to 128 characters long (RFC 7636 Section 4.1).
#[derive(Debug, Clone)]
pub struct CodeVerifier(String);

impl CodeVerifier {
    /// Validates and wraps a verifier received from a client.
    ///
    /// # Errors
    ///
    /// Returns an error if the length is outside 43-128 characters or the
    /// string contains characters outside `[A-Za-z0-9-._~]`.
    pub fn new(verifier: String) -> Result<Self, PkceError> {
        let len = verifier.len();
        if !(43..=128).contains(&len) {
            return Err(PkceError::InvalidVerifierLength(len));
        }

        if !verifier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '_' || c == '~')
        {
            return Err(PkceError::InvalidVerifierCharacters);
        }

        Ok(Self(verifier))
    }

    /// Generates a cryptographically random verifier.
    ///
    /// 32 random bytes encoded as base64url without padding (43 characters).
    #[must_use]
    pub fn generate() -> Self {
        use rand::Rng;
        let bytes: [u8; 32] = rand::thread_rng().r#gen();
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Returns the verifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the verifier and returns the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl AsRef<str> for CodeVerifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// Code Challenge
// =============================================================================

/// PKCE code challenge: `BASE64URL(SHA256(ASCII(code_verifier)))`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeChallenge(String);

impl CodeChallenge {
    /// Derives the S256 challenge from a verifier.
    #[must_use]
    pub fn from_verifier(verifier: &CodeVerifier) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(verifier.0.as_bytes());
        Self(URL_SAFE_NO_PAD.encode(hasher.finalize()))
    }

    /// Validates and wraps a challenge received from a client.
    ///
    /// # Errors
    ///
    /// Returns `PkceError::InvalidChallengeFormat` if the string is not
    /// valid base64url.
    pub fn new(challenge: String) -> Result<Self, PkceError> {
        if URL_SAFE_NO_PAD.decode(&challenge).is_err() {
            return Err(PkceError::InvalidChallengeFormat);
        }
        Ok(Self(challenge))
    }

    /// Verifies that a verifier hashes to this challenge.
    ///
    /// The comparison is constant-time; a mismatch is a hard failure that
    /// callers surface as `invalid_grant`.
    ///
    /// # Errors
    ///
    /// Returns `PkceError::VerificationFailed` on mismatch.
    pub fn verify(&self, verifier: &CodeVerifier) -> Result<(), PkceError> {
        let expected = Self::from_verifier(verifier);
        let matches: bool = self.0.as_bytes().ct_eq(expected.0.as_bytes()).into();
        if matches {
            Ok(())
        } else {
            Err(PkceError::VerificationFailed)
        }
    }

    /// Returns the challenge as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the challenge and returns the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl AsRef<str> for CodeChallenge {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Generates a fresh `(verifier, challenge)` pair.
///
/// The challenge is always derived with S256.
#[must_use]
pub fn generate_challenge_pair() -> (CodeVerifier, CodeChallenge) {
    let verifier = CodeVerifier::generate();
    let challenge = CodeChallenge::from_verifier(&verifier);
    (verifier, challenge)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verifier_generation() {
        let verifier = CodeVerifier::generate();
        assert_eq!(verifier.as_str().len(), 43);
        assert!(
            verifier
                .as_str()
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn test_verifier_generation_uniqueness() {
        let v1 = CodeVerifier::generate();
        let v2 = CodeVerifier::generate();
        assert_ne!(v1.as_str(), v2.as_str());
    }

    #[test]
    fn test_verifier_length_bounds() {
        assert!(CodeVerifier::new("a".repeat(42)).is_err());
        assert!(CodeVerifier::new("a".repeat(43)).is_ok());
        assert!(CodeVerifier::new("a".repeat(128)).is_ok());
        assert!(CodeVerifier::new("a".repeat(129)).is_err());
    }

    #[test]
    fn test_verifier_invalid_characters() {
        let invalid = "abcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*()".to_string();
        let result = CodeVerifier::new(invalid);
        assert!(matches!(
            result.unwrap_err(),
            PkceError::InvalidVerifierCharacters
        ));
    }

    #[test]
    fn test_challenge_pair() {
        let (verifier, challenge) = generate_challenge_pair();
        // SHA-256 output is 32 bytes, 43 characters as base64url
        assert_eq!(challenge.as_str().len(), 43);
        assert!(challenge.verify(&verifier).is_ok());
    }

    #[test]
    fn test_challenge_verification_failure() {
        let (_, challenge) = generate_challenge_pair();
        let other = CodeVerifier::generate();

        let result = challenge.verify(&other);
        assert!(matches!(result.unwrap_err(), PkceError::VerificationFailed));
    }

    #[test]
    fn test_challenge_new_rejects_bad_base64url() {
        let result = CodeChallenge::new("not valid base64url!!!".to_string());
        assert!(matches!(
            result.unwrap_err(),
            PkceError::InvalidChallengeFormat
        ));
    }

    #[test]
    fn test_method_s256_accepted() {
        assert_eq!(ChallengeMethod::parse("S256").unwrap(), ChallengeMethod::S256);
        assert_eq!(ChallengeMethod::S256.as_str(), "S256");
        assert_eq!(ChallengeMethod::default(), ChallengeMethod::S256);
    }

    #[test]
    fn test_method_plain_rejected() {
        let result = ChallengeMethod::parse("plain");
        assert!(matches!(result.unwrap_err(), PkceError::UnsupportedMethod(_)));
    }

    #[test]
    fn test_method_unknown_rejected() {
        assert!(ChallengeMethod::parse("S512").is_err());
        assert!(ChallengeMethod::parse("").is_err());
    }

    #[test]
    fn test_rfc7636_appendix_b_vector() {
        // https://tools.ietf.org/html/rfc7636#appendix-B
        let verifier =
            CodeVerifier::new("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk".to_string()).unwrap();
        let challenge = CodeChallenge::from_verifier(&verifier);

        assert_eq!(
            challenge.as_str(),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );

        let stored =
            CodeChallenge::new("E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM".to_string()).unwrap();
        assert!(stored.verify(&verifier).is_ok());
    }

    #[test]
    fn test_error_conversion() {
        let err: AuthError = PkceError::VerificationFailed.into();
        assert_eq!(err.oauth_error_code(), "invalid_grant");

        let err: AuthError = PkceError::UnsupportedMethod("plain".to_string()).into();
        assert_eq!(err.oauth_error_code(), "invalid_request");
    }
}
