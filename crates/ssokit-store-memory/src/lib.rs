//! In-memory [`EphemeralStore`] backend.
//!
//! A process-local store for tests and single-node deployments, backed by
//! a concurrent map. TTLs are enforced lazily on access; a periodic
//! [`purge_expired`](MemoryEphemeralStore::purge_expired) sweep reclaims
//! entries nobody touches again.
//!
//! The take-once guarantee comes straight from the map: removal of a key
//! hands the entry to exactly one caller, so racing redeemers observe the
//! required one-winner semantics without any additional locking.

use async_trait::async_trait;
use dashmap::DashMap;
use std::time::Duration;
use time::OffsetDateTime;

use ssokit_auth::{AuthResult, EphemeralStore};

/// A stored value and its deadline.
#[derive(Debug, Clone)]
struct StoredEntry {
    value: String,
    expires_at: OffsetDateTime,
}

impl StoredEntry {
    fn is_live(&self) -> bool {
        OffsetDateTime::now_utc() < self.expires_at
    }
}

/// Process-local ephemeral store.
#[derive(Debug, Default)]
pub struct MemoryEphemeralStore {
    entries: DashMap<String, StoredEntry>,
}

impl MemoryEphemeralStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes every expired entry and returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_live());
        before - self.entries.len()
    }

    /// Number of entries currently held, including expired entries that
    /// have not been swept yet.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl EphemeralStore for MemoryEphemeralStore {
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> AuthResult<()> {
        self.entries.insert(
            key.to_string(),
            StoredEntry {
                value: value.to_string(),
                expires_at: OffsetDateTime::now_utc() + ttl,
            },
        );
        Ok(())
    }

    async fn peek(&self, key: &str) -> AuthResult<Option<String>> {
        if let Some(entry) = self.entries.get(key) {
            if entry.is_live() {
                return Ok(Some(entry.value.clone()));
            }
        }
        // Lazily reclaim the dead entry, if it is still the dead one.
        self.entries.remove_if(key, |_, entry| !entry.is_live());
        Ok(None)
    }

    async fn take_once(&self, key: &str) -> AuthResult<Option<String>> {
        match self.entries.remove(key) {
            Some((_, entry)) if entry.is_live() => Ok(Some(entry.value)),
            _ => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> AuthResult<()> {
        self.entries.remove(key);
        Ok(())
    }
}
