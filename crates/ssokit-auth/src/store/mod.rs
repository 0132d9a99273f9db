//! Ephemeral key/value storage for short-lived, single-use artifacts.
//!
//! Every cryptographic artifact this engine coordinates (anti-CSRF states,
//! PKCE grants, authorization codes, bind codes, token handoff codes) lives
//! in an [`EphemeralStore`]: a TTL-bound key/value store with an atomic
//! take-once primitive. The store is the single shared mutable resource;
//! the engines themselves hold no cross-request state.
//!
//! # Implementations
//!
//! Backends are provided in separate crates:
//!
//! - `ssokit-store-memory` - process-local store for tests and single-node
//!   deployments
//!
//! A production deployment backs this trait with a network store (Redis or
//! equivalent) whose delete-returning-value operation implements
//! `take_once`.
//!
//! # Security Considerations
//!
//! - Entries must become unreadable once their TTL elapses
//! - `take_once` must be atomic across all callers of the store, including
//!   other process instances sharing the same backend

use async_trait::async_trait;
use std::time::Duration;

use crate::AuthResult;

/// TTL-bound key/value store with atomic take-once redemption.
///
/// # Atomicity
///
/// `take_once` is the redemption primitive for one-time codes. When N
/// callers race on the same key, exactly one receives the value and the
/// other N-1 observe `None`. Implementations backed by a network store
/// typically use an atomic get-and-delete:
///
/// ```text
/// GETDEL key          -- Redis >= 6.2
/// ```
///
/// or a transaction that reads and deletes in one round trip.
#[async_trait]
pub trait EphemeralStore: Send + Sync {
    /// Stores `value` under `key` for at most `ttl`.
    ///
    /// Overwrites any existing entry, resetting its TTL.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::StoreUnavailable`](crate::AuthError::StoreUnavailable)
    /// if the backend cannot be reached.
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> AuthResult<()>;

    /// Returns the value under `key` without consuming it.
    ///
    /// Used for non-consuming existence checks (e.g. validating that a
    /// state is still pending). Expired entries are reported as absent.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the backend cannot be reached.
    async fn peek(&self, key: &str) -> AuthResult<Option<String>>;

    /// Atomically removes and returns the value under `key`.
    ///
    /// Under concurrent calls for the same key exactly one caller receives
    /// `Some`; every other caller receives `None`. Expired entries are
    /// reported as absent.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the backend cannot be reached.
    async fn take_once(&self, key: &str) -> AuthResult<Option<String>>;

    /// Removes the entry under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the backend cannot be reached.
    async fn delete(&self, key: &str) -> AuthResult<()>;
}
