#![allow(dead_code)]

//! Challenge storage backends.
//!
//! At most one live challenge exists per identity; a new `put` overwrites the
//! prior entry. The Redis backend carries a TTL so expired entries are
//! reclaimed without a sweep; the in-memory backend relies on the service's
//! expiry check plus eviction-on-read.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::models::candidate::CandidateRef;
use crate::storage::StorageError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredChallenge {
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

/// Keyed challenge mapping with per-key put/get/remove. No cross-key
/// coordination is needed; the service layer owns the verify semantics.
#[async_trait]
pub trait ChallengeStore: Send + Sync {
    async fn put(
        &self,
        candidate: &CandidateRef,
        challenge: StoredChallenge,
    ) -> Result<(), StorageError>;

    async fn get(&self, candidate: &CandidateRef) -> Result<Option<StoredChallenge>, StorageError>;

    /// Removes and returns the entry in one step. Of two racing consumers,
    /// at most one observes the challenge.
    async fn take(
        &self,
        candidate: &CandidateRef,
    ) -> Result<Option<StoredChallenge>, StorageError>;
}

/// Mutexed map backend for tests and single-node deploys.
#[derive(Default)]
pub struct InMemoryChallengeStore {
    entries: Mutex<HashMap<CandidateRef, StoredChallenge>>,
}

impl InMemoryChallengeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChallengeStore for InMemoryChallengeStore {
    async fn put(
        &self,
        candidate: &CandidateRef,
        challenge: StoredChallenge,
    ) -> Result<(), StorageError> {
        self.entries
            .lock()
            .expect("challenge store lock poisoned")
            .insert(candidate.clone(), challenge);
        Ok(())
    }

    async fn get(&self, candidate: &CandidateRef) -> Result<Option<StoredChallenge>, StorageError> {
        Ok(self
            .entries
            .lock()
            .expect("challenge store lock poisoned")
            .get(candidate)
            .cloned())
    }

    async fn take(
        &self,
        candidate: &CandidateRef,
    ) -> Result<Option<StoredChallenge>, StorageError> {
        Ok(self
            .entries
            .lock()
            .expect("challenge store lock poisoned")
            .remove(candidate))
    }
}

/// Redis backend. Entries are stored with an `EX` TTL matching the challenge
/// expiry so the keyspace reclaims itself.
pub struct RedisChallengeStore {
    client: redis::Client,
}

impl RedisChallengeStore {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }

    fn key(candidate: &CandidateRef) -> String {
        format!("challenge:{}", candidate.as_str())
    }
}

#[async_trait]
impl ChallengeStore for RedisChallengeStore {
    async fn put(
        &self,
        candidate: &CandidateRef,
        challenge: StoredChallenge,
    ) -> Result<(), StorageError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload = serde_json::to_string(&challenge)?;
        let ttl_secs = (challenge.expires_at - Utc::now()).num_seconds().max(1) as u64;
        let _: () = conn.set_ex(Self::key(candidate), payload, ttl_secs).await?;
        Ok(())
    }

    async fn get(&self, candidate: &CandidateRef) -> Result<Option<StoredChallenge>, StorageError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload: Option<String> = conn.get(Self::key(candidate)).await?;
        match payload {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn take(
        &self,
        candidate: &CandidateRef,
    ) -> Result<Option<StoredChallenge>, StorageError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload: Option<String> = conn.get_del(Self::key(candidate)).await?;
        match payload {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }
}
