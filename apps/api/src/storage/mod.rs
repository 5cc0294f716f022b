#![allow(dead_code)]

// Storage ports. The core pipelines depend on these traits only; Postgres
// implementations live in `postgres.rs`, test/in-memory implementations in
// `memory.rs`, and the Redis-backed challenge store in `challenge::store`.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::exam::session::{AssessmentKind, Session};
use crate::exam::CodingSubmission;
use crate::models::candidate::CandidateRef;
use crate::screening::ScoredArtifact;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("query failed: {0}")]
    Query(#[from] sqlx::Error),

    #[error("cache failed: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Durable store for exam/interview sessions. One logical write per state
/// transition; no partial state is left visible on failure.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn save(&self, session: &Session) -> Result<(), StorageError>;

    async fn load(&self, id: uuid::Uuid) -> Result<Option<Session>, StorageError>;

    /// Latest session for (candidate, kind) regardless of status. Backs both
    /// idempotent resume and idempotent re-submission.
    async fn find_latest(
        &self,
        candidate: &CandidateRef,
        kind: AssessmentKind,
    ) -> Result<Option<Session>, StorageError>;
}

/// Durable store for screening artifacts, keyed by document fingerprint and
/// role to enforce the anti-duplicate-screening invariant.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn save(&self, artifact: &ScoredArtifact) -> Result<(), StorageError>;

    async fn find(
        &self,
        fingerprint: &str,
        role: &str,
    ) -> Result<Option<ScoredArtifact>, StorageError>;

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<ScoredArtifact>, StorageError>;
}

/// Durable store for coding-exam submissions.
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    async fn save(&self, submission: &CodingSubmission) -> Result<(), StorageError>;

    async fn count_successful(&self, candidate: &CandidateRef) -> Result<i64, StorageError>;
}
