//! Postgres-backed stores. Question/response/score maps are persisted as
//! JSONB snapshots on the session row; one upsert per state transition.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::exam::question::QuestionUnit;
use crate::exam::session::{AssessmentKind, Session, SessionStatus};
use crate::exam::CodingSubmission;
use crate::models::candidate::CandidateRef;
use crate::screening::pipeline::ScreeningDecision;
use crate::screening::ScoredArtifact;
use crate::storage::{ArtifactStore, SessionStore, StorageError, SubmissionStore};

/// Creates the tables this service owns if they do not exist yet.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), StorageError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS exam_sessions (
            id UUID PRIMARY KEY,
            candidate_email TEXT NOT NULL,
            candidate_name TEXT NOT NULL,
            kind TEXT NOT NULL,
            questions JSONB NOT NULL,
            responses JSONB NOT NULL,
            unit_scores JSONB NOT NULL,
            total_score INT NOT NULL,
            status TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            completed_at TIMESTAMPTZ
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS screening_artifacts (
            id UUID PRIMARY KEY,
            fingerprint TEXT NOT NULL,
            role TEXT NOT NULL,
            experience_level TEXT NOT NULL,
            candidate_name TEXT NOT NULL,
            candidate_email TEXT NOT NULL,
            skills JSONB NOT NULL,
            experience_summary TEXT NOT NULL,
            resume_text TEXT NOT NULL,
            jd_text TEXT NOT NULL,
            score DOUBLE PRECISION NOT NULL,
            decision TEXT NOT NULL,
            mail_status TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            UNIQUE (fingerprint, role)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS coding_submissions (
            id UUID PRIMARY KEY,
            candidate_email TEXT NOT NULL,
            candidate_name TEXT NOT NULL,
            question_title TEXT NOT NULL,
            language TEXT NOT NULL,
            code TEXT NOT NULL,
            output TEXT NOT NULL,
            success BOOLEAN NOT NULL,
            created_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS aptitude_questions (
            id SERIAL PRIMARY KEY,
            question TEXT NOT NULL,
            options JSONB NOT NULL,
            answer TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Loads the aptitude question bank in insertion order. Ordinals are assigned
/// later, at partition time.
pub async fn load_aptitude_bank(pool: &PgPool) -> Result<Vec<QuestionUnit>, StorageError> {
    #[derive(FromRow)]
    struct BankRow {
        question: String,
        options: Value,
        answer: String,
    }

    let rows = sqlx::query_as::<_, BankRow>(
        "SELECT question, options, answer FROM aptitude_questions ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            let options: Vec<String> = serde_json::from_value(row.options)?;
            Ok(QuestionUnit::closed(0, row.question, options, row.answer))
        })
        .collect()
}

#[derive(FromRow)]
struct SessionRow {
    id: Uuid,
    candidate_email: String,
    candidate_name: String,
    kind: String,
    questions: Value,
    responses: Value,
    unit_scores: Value,
    total_score: i32,
    status: String,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl SessionRow {
    fn into_session(self) -> Result<Session, StorageError> {
        Ok(Session {
            id: self.id,
            candidate: serde_json::from_value(Value::String(self.candidate_email))?,
            candidate_name: self.candidate_name,
            kind: serde_json::from_value(Value::String(self.kind))?,
            questions: serde_json::from_value(self.questions)?,
            responses: serde_json::from_value(self.responses)?,
            unit_scores: serde_json::from_value(self.unit_scores)?,
            total_score: self.total_score as u32,
            status: serde_json::from_value(Value::String(self.status))?,
            created_at: self.created_at,
            completed_at: self.completed_at,
        })
    }
}

fn status_text(status: SessionStatus) -> &'static str {
    match status {
        SessionStatus::InProgress => "in_progress",
        SessionStatus::Qualified => "qualified",
        SessionStatus::Regret => "regret",
    }
}

pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn save(&self, session: &Session) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO exam_sessions
                (id, candidate_email, candidate_name, kind, questions, responses,
                 unit_scores, total_score, status, created_at, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (id) DO UPDATE SET
                responses = EXCLUDED.responses,
                unit_scores = EXCLUDED.unit_scores,
                total_score = EXCLUDED.total_score,
                status = EXCLUDED.status,
                completed_at = EXCLUDED.completed_at
            "#,
        )
        .bind(session.id)
        .bind(session.candidate.as_str())
        .bind(&session.candidate_name)
        .bind(session.kind.as_str())
        .bind(serde_json::to_value(&session.questions)?)
        .bind(serde_json::to_value(&session.responses)?)
        .bind(serde_json::to_value(&session.unit_scores)?)
        .bind(session.total_score as i32)
        .bind(status_text(session.status))
        .bind(session.created_at)
        .bind(session.completed_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load(&self, id: Uuid) -> Result<Option<Session>, StorageError> {
        let row = sqlx::query_as::<_, SessionRow>("SELECT * FROM exam_sessions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(SessionRow::into_session).transpose()
    }

    async fn find_latest(
        &self,
        candidate: &CandidateRef,
        kind: AssessmentKind,
    ) -> Result<Option<Session>, StorageError> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT * FROM exam_sessions
            WHERE candidate_email = $1 AND kind = $2
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(candidate.as_str())
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(SessionRow::into_session).transpose()
    }
}

#[derive(FromRow)]
struct ArtifactRow {
    id: Uuid,
    fingerprint: String,
    role: String,
    experience_level: String,
    candidate_name: String,
    candidate_email: String,
    skills: Value,
    experience_summary: String,
    resume_text: String,
    jd_text: String,
    score: f64,
    decision: String,
    mail_status: String,
    created_at: DateTime<Utc>,
}

impl ArtifactRow {
    fn into_artifact(self) -> Result<ScoredArtifact, StorageError> {
        let decision: ScreeningDecision = serde_json::from_value(Value::String(self.decision))?;
        Ok(ScoredArtifact {
            id: self.id,
            fingerprint: self.fingerprint,
            role: self.role,
            experience_level: self.experience_level,
            candidate_name: self.candidate_name,
            candidate_email: self.candidate_email,
            skills: serde_json::from_value(self.skills)?,
            experience_summary: self.experience_summary,
            resume_text: self.resume_text,
            jd_text: self.jd_text,
            score: self.score,
            decision,
            mail_status: self.mail_status,
            created_at: self.created_at,
        })
    }
}

pub struct PgArtifactStore {
    pool: PgPool,
}

impl PgArtifactStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ArtifactStore for PgArtifactStore {
    async fn save(&self, artifact: &ScoredArtifact) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO screening_artifacts
                (id, fingerprint, role, experience_level, candidate_name,
                 candidate_email, skills, experience_summary, resume_text,
                 jd_text, score, decision, mail_status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(artifact.id)
        .bind(&artifact.fingerprint)
        .bind(&artifact.role)
        .bind(&artifact.experience_level)
        .bind(&artifact.candidate_name)
        .bind(&artifact.candidate_email)
        .bind(serde_json::to_value(&artifact.skills)?)
        .bind(&artifact.experience_summary)
        .bind(&artifact.resume_text)
        .bind(&artifact.jd_text)
        .bind(artifact.score)
        .bind(artifact.decision.as_str())
        .bind(&artifact.mail_status)
        .bind(artifact.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find(
        &self,
        fingerprint: &str,
        role: &str,
    ) -> Result<Option<ScoredArtifact>, StorageError> {
        let row = sqlx::query_as::<_, ArtifactRow>(
            "SELECT * FROM screening_artifacts WHERE fingerprint = $1 AND role = $2",
        )
        .bind(fingerprint)
        .bind(role)
        .fetch_optional(&self.pool)
        .await?;
        row.map(ArtifactRow::into_artifact).transpose()
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<ScoredArtifact>, StorageError> {
        let rows = sqlx::query_as::<_, ArtifactRow>(
            "SELECT * FROM screening_artifacts ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(ArtifactRow::into_artifact).collect()
    }
}

pub struct PgSubmissionStore {
    pool: PgPool,
}

impl PgSubmissionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubmissionStore for PgSubmissionStore {
    async fn save(&self, submission: &CodingSubmission) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO coding_submissions
                (id, candidate_email, candidate_name, question_title, language,
                 code, output, success, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(submission.id)
        .bind(submission.candidate.as_str())
        .bind(&submission.candidate_name)
        .bind(&submission.question_title)
        .bind(&submission.language)
        .bind(&submission.code)
        .bind(&submission.output)
        .bind(submission.success)
        .bind(submission.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn count_successful(&self, candidate: &CandidateRef) -> Result<i64, StorageError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM coding_submissions WHERE candidate_email = $1 AND success = TRUE",
        )
        .bind(candidate.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
