//! Narrow interface over the ephemeral key-value store.
//!
//! The ledger only needs `put`/`get`/`delete` with TTL semantics, so that is
//! all the trait asks for. Production backends wrap whatever the host
//! deployment uses; tests run against [`crate::challenge::MemoryStore`].

use std::future::Future;
use std::time::Duration;

/// Transport or backend failure talking to the ephemeral store.
///
/// Deliberately distinct from "key not found" so the sign-in flow can retry
/// or fail the request instead of treating an outage as an expired
/// challenge.
#[derive(Debug, thiserror::Error)]
#[error("ephemeral store unavailable: {0}")]
pub struct StoreError(pub String);

pub trait ChallengeStore: Send + Sync {
    /// Store `value` under `key`, expiring after `ttl`.
    fn put(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Fetch the value under `key`; `None` when absent or expired.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, StoreError>> + Send;

    /// Remove `key`. Removing an absent key is not an error.
    fn delete(&self, key: &str) -> impl Future<Output = Result<(), StoreError>> + Send;
}
