//! Engine configuration.
//!
//! All knobs the deployment can turn live here. Durations deserialize from
//! humantime strings.
//!
//! # Example (TOML)
//!
//! ```toml
//! [auth]
//! state_ttl = "10m"
//! op_timeout = "5s"
//!
//! [auth.pkce]
//! required = true
//! fallback = "reject"
//!
//! [auth.bridge]
//! bind_code_ttl = "5m"
//! handoff_code_ttl = "5m"
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the exchange engine and binding bridge.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Lifetime of anti-CSRF states and pending PKCE grants.
    #[serde(with = "humantime_serde")]
    pub state_ttl: Duration,

    /// Upper bound on a single store or minter call. A collaborator that
    /// exceeds it surfaces as a transient failure instead of holding the
    /// worker.
    #[serde(with = "humantime_serde")]
    pub op_timeout: Duration,

    /// PKCE enforcement policy.
    pub pkce: PkceConfig,

    /// Third-party binding bridge settings.
    pub bridge: BridgeConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            state_ttl: Duration::from_secs(600),
            op_timeout: Duration::from_secs(5),
            pkce: PkceConfig::default(),
            bridge: BridgeConfig::default(),
        }
    }
}

/// PKCE enforcement policy for the token endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PkceConfig {
    /// Whether the deployment requires PKCE on code exchanges.
    pub required: bool,

    /// What happens when PKCE is required but a request arrives without a
    /// verifier.
    pub fallback: PkceFallbackPolicy,
}

impl Default for PkceConfig {
    fn default() -> Self {
        Self {
            required: true,
            fallback: PkceFallbackPolicy::Reject,
        }
    }
}

/// Behavior when PKCE is required but no `code_verifier` was supplied.
///
/// `ClientSecret` reproduces deployments that accept confidential clients
/// on the same endpoint: the request is logged as a policy downgrade and
/// handled on the shared-secret path. `Reject` (the default) refuses the
/// request outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PkceFallbackPolicy {
    /// Fail the exchange with `invalid_request`.
    Reject,
    /// Log a downgrade and continue on the confidential-client path.
    ClientSecret,
}

/// Third-party binding bridge settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Lifetime of bind codes issued for unlinked identities.
    #[serde(with = "humantime_serde")]
    pub bind_code_ttl: Duration,

    /// Lifetime of token handoff codes awaiting frontend pickup.
    #[serde(with = "humantime_serde")]
    pub handoff_code_ttl: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            bind_code_ttl: Duration::from_secs(300),
            handoff_code_ttl: Duration::from_secs(300),
        }
    }
}
