#![allow(dead_code)]

//! In-memory store implementations. Used by unit tests and available for
//! single-node demo deploys; production wiring uses the Postgres stores.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::exam::session::{AssessmentKind, Session};
use crate::exam::CodingSubmission;
use crate::models::candidate::CandidateRef;
use crate::screening::ScoredArtifact;
use crate::storage::{ArtifactStore, SessionStore, StorageError, SubmissionStore};

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<Uuid, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn save(&self, session: &Session) -> Result<(), StorageError> {
        self.sessions
            .lock()
            .expect("session store lock poisoned")
            .insert(session.id, session.clone());
        Ok(())
    }

    async fn load(&self, id: Uuid) -> Result<Option<Session>, StorageError> {
        Ok(self
            .sessions
            .lock()
            .expect("session store lock poisoned")
            .get(&id)
            .cloned())
    }

    async fn find_latest(
        &self,
        candidate: &CandidateRef,
        kind: AssessmentKind,
    ) -> Result<Option<Session>, StorageError> {
        Ok(self
            .sessions
            .lock()
            .expect("session store lock poisoned")
            .values()
            .filter(|s| &s.candidate == candidate && s.kind == kind)
            .max_by_key(|s| s.created_at)
            .cloned())
    }
}

#[derive(Default)]
pub struct InMemoryArtifactStore {
    artifacts: Mutex<Vec<ScoredArtifact>>,
}

impl InMemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ArtifactStore for InMemoryArtifactStore {
    async fn save(&self, artifact: &ScoredArtifact) -> Result<(), StorageError> {
        self.artifacts
            .lock()
            .expect("artifact store lock poisoned")
            .push(artifact.clone());
        Ok(())
    }

    async fn find(
        &self,
        fingerprint: &str,
        role: &str,
    ) -> Result<Option<ScoredArtifact>, StorageError> {
        Ok(self
            .artifacts
            .lock()
            .expect("artifact store lock poisoned")
            .iter()
            .find(|a| a.fingerprint == fingerprint && a.role == role)
            .cloned())
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<ScoredArtifact>, StorageError> {
        let mut all = self
            .artifacts
            .lock()
            .expect("artifact store lock poisoned")
            .clone();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }
}

#[derive(Default)]
pub struct InMemorySubmissionStore {
    submissions: Mutex<Vec<CodingSubmission>>,
}

impl InMemorySubmissionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubmissionStore for InMemorySubmissionStore {
    async fn save(&self, submission: &CodingSubmission) -> Result<(), StorageError> {
        self.submissions
            .lock()
            .expect("submission store lock poisoned")
            .push(submission.clone());
        Ok(())
    }

    async fn count_successful(&self, candidate: &CandidateRef) -> Result<i64, StorageError> {
        Ok(self
            .submissions
            .lock()
            .expect("submission store lock poisoned")
            .iter()
            .filter(|s| &s.candidate == candidate && s.success)
            .count() as i64)
    }
}
