//! The resume screening pipeline: fingerprint, extract fields, generate a
//! comparison target, score similarity, decide, record, notify.
//!
//! An artifact is recorded for every processed document regardless of
//! outcome. A document+role pair is never silently rescored: re-processing
//! returns the recorded artifact and sends no second notification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::judge::Judgment;
use crate::notify::{DeliveryResult, NotificationDispatcher, Outcome};
use crate::screening::fields::extract_fields;
use crate::screening::prompts::{fallback_jd, jd_prompt};
use crate::screening::similarity::SimilarityScorer;
use crate::storage::ArtifactStore;

/// Stored text is truncated to this many characters.
const STORED_TEXT_LIMIT: usize = 25_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreeningDecision {
    Shortlisted,
    Rejected,
}

impl ScreeningDecision {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Shortlisted => "shortlisted",
            Self::Rejected => "rejected",
        }
    }
}

/// The durable record of one screening run. Never re-scored in place; a new
/// upload produces a new artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredArtifact {
    pub id: Uuid,
    pub fingerprint: String,
    pub role: String,
    pub experience_level: String,
    pub candidate_name: String,
    pub candidate_email: String,
    pub skills: Vec<String>,
    pub experience_summary: String,
    pub resume_text: String,
    pub jd_text: String,
    pub score: f64,
    pub decision: ScreeningDecision,
    pub mail_status: String,
    pub created_at: DateTime<Utc>,
}

/// Result handed back to the caller, flagging whether the artifact was newly
/// created or recalled from a previous run of the same document+role.
#[derive(Debug, Clone)]
pub struct ScreeningOutcome {
    pub artifact: ScoredArtifact,
    pub reused: bool,
    pub threshold: f64,
}

pub struct ScreeningPipeline {
    judge: Arc<dyn Judgment>,
    similarity: SimilarityScorer,
    artifacts: Arc<dyn ArtifactStore>,
    dispatcher: Arc<NotificationDispatcher>,
    threshold: f64,
    notify_rejected: bool,
}

impl ScreeningPipeline {
    pub fn new(
        judge: Arc<dyn Judgment>,
        similarity: SimilarityScorer,
        artifacts: Arc<dyn ArtifactStore>,
        dispatcher: Arc<NotificationDispatcher>,
        threshold: f64,
        notify_rejected: bool,
    ) -> Self {
        Self {
            judge,
            similarity,
            artifacts,
            dispatcher,
            threshold,
            notify_rejected,
        }
    }

    /// Runs the full pipeline over extracted document text.
    pub async fn process(
        &self,
        document_text: &str,
        role: &str,
        experience_level: &str,
    ) -> Result<ScreeningOutcome, AppError> {
        if document_text.trim().is_empty() {
            return Err(AppError::Extraction(
                "document contained no extractable text".to_string(),
            ));
        }

        let fingerprint = fingerprint(document_text);

        if let Some(existing) = self.artifacts.find(&fingerprint, role).await? {
            info!(
                "Document {} already screened for '{role}' ({}); returning recorded artifact",
                &fingerprint[..12],
                existing.decision.as_str()
            );
            return Ok(ScreeningOutcome {
                artifact: existing,
                reused: true,
                threshold: self.threshold,
            });
        }

        let fields = extract_fields(self.judge.as_ref(), document_text).await?;

        let jd_text = match self
            .judge
            .complete(&jd_prompt(role, experience_level), 0.4)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!("JD generation unavailable ({e}); using templated JD");
                fallback_jd(role, experience_level)
            }
        };

        let score = self.similarity.score(document_text, &jd_text).await;
        let decision = if score >= self.threshold {
            ScreeningDecision::Shortlisted
        } else {
            ScreeningDecision::Rejected
        };

        let mail_status = self
            .dispatch_outcome(&fields.name, &fields.email, role, score, decision)
            .await;

        let artifact = ScoredArtifact {
            id: Uuid::new_v4(),
            fingerprint,
            role: role.to_string(),
            experience_level: experience_level.to_string(),
            candidate_name: fields.name,
            candidate_email: fields.email,
            skills: fields.skills,
            experience_summary: fields.experience_summary,
            resume_text: truncate(document_text, STORED_TEXT_LIMIT),
            jd_text: truncate(&jd_text, STORED_TEXT_LIMIT),
            score,
            decision,
            mail_status,
            created_at: Utc::now(),
        };

        self.artifacts.save(&artifact).await?;
        info!(
            "Screened document {} for '{role}': {:.2} -> {}",
            &artifact.fingerprint[..12],
            score,
            decision.as_str()
        );

        Ok(ScreeningOutcome {
            artifact,
            reused: false,
            threshold: self.threshold,
        })
    }

    async fn dispatch_outcome(
        &self,
        name: &str,
        email: &str,
        role: &str,
        score: f64,
        decision: ScreeningDecision,
    ) -> String {
        if email.is_empty() {
            return "no_email_provided".to_string();
        }
        let outcome = match decision {
            ScreeningDecision::Shortlisted => Outcome::Shortlisted {
                name: name.to_string(),
                role: role.to_string(),
                score,
            },
            ScreeningDecision::Rejected if self.notify_rejected => Outcome::Rejected {
                name: name.to_string(),
                role: role.to_string(),
            },
            ScreeningDecision::Rejected => return "not_sent_rejected".to_string(),
        };
        let delivery: DeliveryResult = self.dispatcher.notify(email, &outcome).await;
        delivery.detail
    }
}

/// Stable identity of a document's content.
pub fn fingerprint(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

fn truncate(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::judge::{Embedder, JudgeError};
    use crate::notify::{MailError, MailTransport};
    use crate::storage::memory::InMemoryArtifactStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Judge returning candidate fields for extraction prompts and a fixed
    /// JD otherwise.
    struct StubJudge;

    #[async_trait]
    impl Judgment for StubJudge {
        async fn complete(&self, prompt: &str, _temperature: f32) -> Result<String, JudgeError> {
            if prompt.contains("Extract the following") {
                Ok(r#"{"name":"Ada","email":"ada@x.com","skills":["Rust"],
                    "experience_summary":"Systems work."}"#
                    .to_string())
            } else {
                Ok("Backend Engineer job description".to_string())
            }
        }
    }

    /// Embeds every text to the same vector: similarity is always 100.
    struct MatchEverything;

    #[async_trait]
    impl Embedder for MatchEverything {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, JudgeError> {
            Ok(vec![1.0, 0.0])
        }
    }

    /// Resume and JD land on orthogonal axes: similarity is always 0.
    struct MatchNothing;

    #[async_trait]
    impl Embedder for MatchNothing {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, JudgeError> {
            if text.contains("job description") {
                Ok(vec![0.0, 1.0])
            } else {
                Ok(vec![1.0, 0.0])
            }
        }
    }

    struct CountingMailer {
        count: AtomicUsize,
    }

    #[async_trait]
    impl MailTransport for CountingMailer {
        async fn send(&self, _to: &str, _subject: &str, _body: &str) -> Result<(), MailError> {
            self.count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn pipeline_with(
        embedder: Arc<dyn Embedder>,
        mailer: Arc<CountingMailer>,
        notify_rejected: bool,
    ) -> (ScreeningPipeline, Arc<InMemoryArtifactStore>) {
        let artifacts = Arc::new(InMemoryArtifactStore::new());
        let pipeline = ScreeningPipeline::new(
            Arc::new(StubJudge),
            SimilarityScorer::new(embedder),
            artifacts.clone(),
            Arc::new(NotificationDispatcher::new(mailer)),
            60.0,
            notify_rejected,
        );
        (pipeline, artifacts)
    }

    fn mailer() -> Arc<CountingMailer> {
        Arc::new(CountingMailer {
            count: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn test_high_similarity_shortlists_and_notifies_once() {
        let mail = mailer();
        let (pipeline, artifacts) = pipeline_with(Arc::new(MatchEverything), mail.clone(), false);
        let outcome = pipeline
            .process("resume text", "Backend Engineer", "Senior")
            .await
            .unwrap();
        assert_eq!(outcome.artifact.decision, ScreeningDecision::Shortlisted);
        assert_eq!(outcome.artifact.score, 100.0);
        assert!(!outcome.reused);
        assert_eq!(mail.count.load(Ordering::SeqCst), 1);
        assert_eq!(artifacts.list(10, 0).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_low_similarity_rejects_without_mail() {
        let mail = mailer();
        let (pipeline, _) = pipeline_with(Arc::new(MatchNothing), mail.clone(), false);
        let outcome = pipeline
            .process("resume text", "Backend Engineer", "Senior")
            .await
            .unwrap();
        assert_eq!(outcome.artifact.decision, ScreeningDecision::Rejected);
        assert_eq!(outcome.artifact.score, 0.0);
        assert_eq!(outcome.artifact.mail_status, "not_sent_rejected");
        assert_eq!(mail.count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rejection_notice_when_configured() {
        let mail = mailer();
        let (pipeline, _) = pipeline_with(Arc::new(MatchNothing), mail.clone(), true);
        pipeline
            .process("resume text", "Backend Engineer", "Senior")
            .await
            .unwrap();
        assert_eq!(mail.count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_same_document_and_role_is_not_rescreened() {
        let mail = mailer();
        let (pipeline, artifacts) = pipeline_with(Arc::new(MatchEverything), mail.clone(), false);
        let first = pipeline
            .process("resume text", "Backend Engineer", "Senior")
            .await
            .unwrap();
        let second = pipeline
            .process("resume text", "Backend Engineer", "Senior")
            .await
            .unwrap();
        assert!(second.reused);
        assert_eq!(second.artifact.id, first.artifact.id);
        // No second shortlisted notification, no second artifact.
        assert_eq!(mail.count.load(Ordering::SeqCst), 1);
        assert_eq!(artifacts.list(10, 0).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_same_document_different_role_is_screened_again() {
        let mail = mailer();
        let (pipeline, artifacts) = pipeline_with(Arc::new(MatchEverything), mail.clone(), false);
        pipeline
            .process("resume text", "Backend Engineer", "Senior")
            .await
            .unwrap();
        let outcome = pipeline
            .process("resume text", "Data Engineer", "Senior")
            .await
            .unwrap();
        assert!(!outcome.reused);
        assert_eq!(artifacts.list(10, 0).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_document_is_extraction_error() {
        let (pipeline, _) = pipeline_with(Arc::new(MatchEverything), mailer(), false);
        let err = pipeline
            .process("   ", "Backend Engineer", "Senior")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Extraction(_)));
    }

    #[test]
    fn test_fingerprint_is_stable_and_content_sensitive() {
        assert_eq!(fingerprint("abc"), fingerprint("abc"));
        assert_ne!(fingerprint("abc"), fingerprint("abd"));
        assert_eq!(fingerprint("abc").len(), 64);
    }
}
