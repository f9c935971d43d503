//! Short-lived, single-use ledger for pending second-factor challenges.
//!
//! Flow overview:
//! 1) Password success: the sign-in flow calls [`ChallengeLedger::create`].
//! 2) The browser posts back a code together with the challenge id.
//! 3) The flow calls [`ChallengeLedger::read`], verifies the code, and calls
//!    [`ChallengeLedger::delete`] on any terminal outcome.
//!
//! A challenge has exactly two states: pending (present in the store) and
//! resolved/expired (absent). The TTL is a safety net for abandoned sign-in
//! attempts, not the primary cleanup path; callers delete explicitly. A
//! record that no longer deserializes is deleted and reported as absent, so
//! an attacker (or a stale client) cannot distinguish corruption from
//! expiry.

pub mod memory;
pub mod store;

pub use memory::MemoryStore;
pub use store::{ChallengeStore, StoreError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;
use uuid::Uuid;

/// Default challenge lifetime: long enough to find a phone, short enough to
/// bound replay exposure.
pub const DEFAULT_CHALLENGE_TTL: Duration = Duration::from_secs(600);

const KEY_NAMESPACE: &str = "totp:challenge";

#[derive(Debug, thiserror::Error)]
pub enum ChallengeError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("failed to serialize challenge payload: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Everything the sign-in flow needs to finish a handshake it started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengePayload {
    pub challenge_id: Uuid,
    pub admin_id: String,
    pub email: String,
    pub remember_session: bool,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Caller-supplied fields for a fresh challenge.
#[derive(Debug, Clone)]
pub struct NewChallenge {
    pub admin_id: String,
    pub email: String,
    pub remember_session: bool,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ChallengeLedger<S> {
    store: S,
    ttl: Duration,
}

impl<S: ChallengeStore> ChallengeLedger<S> {
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            store,
            ttl: DEFAULT_CHALLENGE_TTL,
        }
    }

    /// Override the challenge TTL (policy, not protocol).
    #[must_use]
    pub fn with_ttl(self, ttl: Duration) -> Self {
        Self { ttl, ..self }
    }

    /// Open a challenge: absent → pending.
    ///
    /// # Errors
    /// Returns an error if the payload cannot be serialized or the store is
    /// unreachable.
    pub async fn create(&self, new: NewChallenge) -> Result<ChallengePayload, ChallengeError> {
        let payload = ChallengePayload {
            challenge_id: Uuid::new_v4(),
            admin_id: new.admin_id,
            email: new.email,
            remember_session: new.remember_session,
            ip_address: new.ip_address,
            user_agent: new.user_agent,
            created_at: Utc::now(),
        };

        let value = serde_json::to_string(&payload)?;
        self.store
            .put(&key_for(payload.challenge_id), &value, self.ttl)
            .await?;

        Ok(payload)
    }

    /// Fetch a pending challenge.
    ///
    /// Absent, expired, and corrupt records all come back as `Ok(None)`; a
    /// corrupt record is additionally deleted so it cannot be retried. Only
    /// store outages surface as errors.
    ///
    /// # Errors
    /// Returns an error if the store is unreachable.
    pub async fn read(
        &self,
        challenge_id: Uuid,
    ) -> Result<Option<ChallengePayload>, ChallengeError> {
        let key = key_for(challenge_id);
        let Some(raw) = self.store.get(&key).await? else {
            return Ok(None);
        };

        match serde_json::from_str::<ChallengePayload>(&raw) {
            Ok(payload) => Ok(Some(payload)),
            Err(err) => {
                // Likely a serialization-format migration; worth surfacing
                // in logs even though the caller just sees an expired
                // challenge.
                warn!(%challenge_id, "dropping undecodable challenge record: {err}");
                self.store.delete(&key).await?;
                Ok(None)
            }
        }
    }

    /// Close a challenge: pending → absent. Called exactly once per
    /// terminal outcome (verified or abandoned).
    ///
    /// # Errors
    /// Returns an error if the store is unreachable.
    pub async fn delete(&self, challenge_id: Uuid) -> Result<(), ChallengeError> {
        self.store.delete(&key_for(challenge_id)).await?;
        Ok(())
    }
}

fn key_for(challenge_id: Uuid) -> String {
    format!("{KEY_NAMESPACE}:{challenge_id}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::{
        ChallengeError, ChallengeLedger, ChallengeStore, MemoryStore, NewChallenge, StoreError,
    };
    use std::time::Duration;
    use uuid::Uuid;

    fn new_challenge() -> NewChallenge {
        NewChallenge {
            admin_id: "adm_123".to_string(),
            email: "admin@example.com".to_string(),
            remember_session: true,
            ip_address: Some("198.51.100.7".to_string()),
            user_agent: Some("Mozilla/5.0".to_string()),
        }
    }

    #[tokio::test]
    async fn create_then_read_round_trip() {
        let ledger = ChallengeLedger::new(MemoryStore::new());
        let created = ledger.create(new_challenge()).await.unwrap();

        let read = ledger.read(created.challenge_id).await.unwrap().unwrap();
        assert_eq!(read, created);
        assert_eq!(read.admin_id, "adm_123");
        assert!(read.remember_session);
    }

    #[tokio::test]
    async fn read_after_delete_is_none() {
        let ledger = ChallengeLedger::new(MemoryStore::new());
        let created = ledger.create(new_challenge()).await.unwrap();

        ledger.delete(created.challenge_id).await.unwrap();
        assert!(ledger.read(created.challenge_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn read_of_unknown_id_is_none() {
        let ledger = ChallengeLedger::new(MemoryStore::new());
        assert!(ledger.read(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn challenge_expires_at_ttl() {
        let ledger =
            ChallengeLedger::new(MemoryStore::new()).with_ttl(Duration::from_millis(20));
        let created = ledger.create(new_challenge()).await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(ledger.read(created.challenge_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupt_record_reads_as_none_and_is_removed() {
        let store = MemoryStore::new();
        let ledger = ChallengeLedger::new(store.clone());
        let challenge_id = Uuid::new_v4();

        store
            .put(
                &format!("totp:challenge:{challenge_id}"),
                "{not json",
                Duration::from_secs(60),
            )
            .await
            .unwrap();

        assert!(ledger.read(challenge_id).await.unwrap().is_none());
        assert!(store.is_empty());
    }

    /// Store stub whose every call fails, for outage propagation.
    #[derive(Clone)]
    struct DownStore;

    impl ChallengeStore for DownStore {
        async fn put(&self, _: &str, _: &str, _: Duration) -> Result<(), StoreError> {
            Err(StoreError("connection refused".to_string()))
        }

        async fn get(&self, _: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError("connection refused".to_string()))
        }

        async fn delete(&self, _: &str) -> Result<(), StoreError> {
            Err(StoreError("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn store_outage_is_a_distinct_error() {
        let ledger = ChallengeLedger::new(DownStore);

        let err = ledger.create(new_challenge()).await.unwrap_err();
        assert!(matches!(err, ChallengeError::Store(_)));

        let err = ledger.read(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ChallengeError::Store(_)));
    }
}
