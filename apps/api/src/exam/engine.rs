//! Generic exam session engine: start, submit, aggregate, decide, notify.
//!
//! State machine per session: `InProgress` until all submitted responses are
//! scored, then `Qualified` or `Regret` against the configured pass mark.
//! Both transitions are one-shot: `start` resumes an open session instead of
//! reassigning questions, and `submit` on a terminal session returns the
//! recorded result without rescoring.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::errors::AppError;
use crate::exam::question::{QuestionUnit, Rubric};
use crate::exam::session::{AssessmentKind, ScoreResult, Session, SessionStatus};
use crate::models::candidate::CandidateRef;
use crate::notify::{NotificationDispatcher, Outcome};
use crate::scoring::ScoringOracle;
use crate::storage::SessionStore;

/// Pass marks per assessment kind. Configuration, not business logic.
#[derive(Debug, Clone, Copy)]
pub struct PassMarks {
    pub aptitude: u32,
    pub communication: u32,
    pub interview: u32,
}

impl PassMarks {
    pub fn for_kind(&self, kind: AssessmentKind) -> u32 {
        match kind {
            AssessmentKind::Aptitude => self.aptitude,
            AssessmentKind::Communication => self.communication,
            AssessmentKind::Interview => self.interview,
        }
    }
}

pub struct ExamEngine {
    sessions: Arc<dyn SessionStore>,
    oracle: Arc<dyn ScoringOracle>,
    dispatcher: Arc<NotificationDispatcher>,
    pass_marks: PassMarks,
}

impl ExamEngine {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        oracle: Arc<dyn ScoringOracle>,
        dispatcher: Arc<NotificationDispatcher>,
        pass_marks: PassMarks,
    ) -> Self {
        Self {
            sessions,
            oracle,
            dispatcher,
            pass_marks,
        }
    }

    /// Returns the candidate's open session for `kind`, if any.
    pub async fn resume(
        &self,
        kind: AssessmentKind,
        candidate: &CandidateRef,
    ) -> Result<Option<Session>, AppError> {
        Ok(self
            .sessions
            .find_latest(candidate, kind)
            .await?
            .filter(|s| s.status == SessionStatus::InProgress))
    }

    /// Starts a session with the supplied question assignment. If an open
    /// session already exists it is returned unchanged — idempotent resume,
    /// never a silent reassignment.
    pub async fn start(
        &self,
        kind: AssessmentKind,
        candidate: CandidateRef,
        candidate_name: String,
        questions: Vec<QuestionUnit>,
    ) -> Result<Session, AppError> {
        if let Some(open) = self.resume(kind, &candidate).await? {
            info!(
                "Resuming open {} session {} for {}",
                kind.as_str(),
                open.id,
                candidate
            );
            return Ok(open);
        }

        if questions.is_empty() {
            return Err(AppError::PoolMissing(format!(
                "no questions available for the {} assessment",
                kind.as_str()
            )));
        }

        let session = Session::new(candidate, candidate_name, kind, questions);
        self.sessions.save(&session).await?;
        info!(
            "Started {} session {} for {} ({} units)",
            kind.as_str(),
            session.id,
            session.candidate,
            session.questions.len()
        );
        Ok(session)
    }

    /// Scores the submitted responses and fixes the terminal status.
    ///
    /// Closed-form units score their full marks on an exact reference match;
    /// open-form units delegate to the scoring oracle. The aggregate and the
    /// pass/fail decision are computed only after every submitted response
    /// has been scored. Responses for unknown ordinals are ignored. A second
    /// submission returns the recorded result.
    pub async fn submit(
        &self,
        kind: AssessmentKind,
        candidate: &CandidateRef,
        responses: BTreeMap<u32, String>,
    ) -> Result<ScoreResult, AppError> {
        let Some(mut session) = self.sessions.find_latest(candidate, kind).await? else {
            return Err(AppError::NotFound(format!(
                "no {} session for {candidate}; start the exam first",
                kind.as_str()
            )));
        };

        if session.status.is_terminal() {
            info!(
                "Ignoring re-submission for terminal session {}; returning recorded result",
                session.id
            );
            return Ok(session.result());
        }

        if responses.is_empty() {
            return Err(AppError::Validation("responses cannot be empty".to_string()));
        }

        let mut unit_scores = BTreeMap::new();
        for (ordinal, response) in &responses {
            let Some(unit) = session.unit(*ordinal) else {
                continue;
            };
            let score = match &unit.rubric {
                Rubric::ClosedForm { answer, .. } => {
                    if response.trim() == answer.trim() {
                        unit.marks
                    } else {
                        0
                    }
                }
                Rubric::OpenForm => self.oracle.score(&unit.prompt, response, unit.marks).await,
            };
            unit_scores.insert(*ordinal, score);
        }

        // All submitted responses are scored; now aggregate and decide.
        let total: u32 = unit_scores.values().sum();
        let pass_mark = self.pass_marks.for_kind(kind);

        session.responses = responses;
        session.unit_scores = unit_scores;
        session.total_score = total;
        session.status = if total >= pass_mark {
            SessionStatus::Qualified
        } else {
            SessionStatus::Regret
        };
        session.completed_at = Some(Utc::now());
        self.sessions.save(&session).await?;

        info!(
            "Session {} finalized: {}/{} ({:?})",
            session.id,
            total,
            session.max_total(),
            session.status
        );

        // One best-effort notification per terminal decision. Delivery
        // failure is recorded by the dispatcher and never unwinds the score.
        let outcome = match session.status {
            SessionStatus::Qualified => Outcome::ExamQualified {
                name: session.candidate_name.clone(),
            },
            _ => Outcome::ExamRegret {
                name: session.candidate_name.clone(),
            },
        };
        self.dispatcher
            .notify(session.candidate.as_str(), &outcome)
            .await;

        Ok(session.result())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{MailError, MailTransport};
    use crate::storage::memory::InMemorySessionStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FixedOracle(u32);

    #[async_trait]
    impl ScoringOracle for FixedOracle {
        async fn score(&self, _prompt: &str, _response: &str, max_score: u32) -> u32 {
            self.0.min(max_score)
        }
    }

    struct CountingMailer {
        count: AtomicUsize,
        subjects: Mutex<Vec<String>>,
    }

    impl CountingMailer {
        fn new() -> Self {
            Self {
                count: AtomicUsize::new(0),
                subjects: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl MailTransport for CountingMailer {
        async fn send(&self, _to: &str, subject: &str, _body: &str) -> Result<(), MailError> {
            self.count.fetch_add(1, Ordering::SeqCst);
            self.subjects.lock().unwrap().push(subject.to_string());
            Ok(())
        }
    }

    struct FailingMailer;

    #[async_trait]
    impl MailTransport for FailingMailer {
        async fn send(&self, _to: &str, _subject: &str, _body: &str) -> Result<(), MailError> {
            Err(MailError::Api {
                status: 500,
                message: "smtp down".to_string(),
            })
        }
    }

    fn closed_bank(n: u32) -> Vec<QuestionUnit> {
        (1..=n)
            .map(|i| {
                QuestionUnit::closed(
                    i,
                    format!("Question {i}"),
                    vec!["A".to_string(), "B".to_string(), "C".to_string(), "D".to_string()],
                    "A".to_string(),
                )
            })
            .collect()
    }

    fn engine_with(
        mailer: Arc<dyn MailTransport>,
        oracle: Arc<dyn ScoringOracle>,
    ) -> (ExamEngine, Arc<InMemorySessionStore>) {
        let store = Arc::new(InMemorySessionStore::new());
        let engine = ExamEngine::new(
            store.clone(),
            oracle,
            Arc::new(NotificationDispatcher::new(mailer)),
            PassMarks {
                aptitude: 15,
                communication: 9,
                interview: 25,
            },
        );
        (engine, store)
    }

    fn candidate() -> CandidateRef {
        CandidateRef::parse("a@x.com").unwrap()
    }

    /// `correct` right answers, the rest wrong, across a 25-unit set.
    fn aptitude_responses(correct: u32) -> BTreeMap<u32, String> {
        (1..=25)
            .map(|i| {
                let choice = if i <= correct { "A" } else { "B" };
                (i, choice.to_string())
            })
            .collect()
    }

    #[tokio::test]
    async fn test_fifteen_of_twenty_five_qualifies() {
        let (engine, _) = engine_with(Arc::new(CountingMailer::new()), Arc::new(FixedOracle(0)));
        engine
            .start(AssessmentKind::Aptitude, candidate(), "Ada".into(), closed_bank(25))
            .await
            .unwrap();
        let result = engine
            .submit(AssessmentKind::Aptitude, &candidate(), aptitude_responses(15))
            .await
            .unwrap();
        assert_eq!(result.total_score, 15);
        assert_eq!(result.status, SessionStatus::Qualified);
    }

    #[tokio::test]
    async fn test_fourteen_of_twenty_five_regrets() {
        let (engine, _) = engine_with(Arc::new(CountingMailer::new()), Arc::new(FixedOracle(0)));
        engine
            .start(AssessmentKind::Aptitude, candidate(), "Ada".into(), closed_bank(25))
            .await
            .unwrap();
        let result = engine
            .submit(AssessmentKind::Aptitude, &candidate(), aptitude_responses(14))
            .await
            .unwrap();
        assert_eq!(result.total_score, 14);
        assert_eq!(result.status, SessionStatus::Regret);
    }

    #[tokio::test]
    async fn test_start_is_idempotent_for_open_session() {
        let (engine, _) = engine_with(Arc::new(CountingMailer::new()), Arc::new(FixedOracle(0)));
        let first = engine
            .start(AssessmentKind::Aptitude, candidate(), "Ada".into(), closed_bank(25))
            .await
            .unwrap();
        // A different assignment offered on re-start must not displace the
        // original one.
        let second = engine
            .start(AssessmentKind::Aptitude, candidate(), "Ada".into(), closed_bank(5))
            .await
            .unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.questions.len(), 25);
    }

    #[tokio::test]
    async fn test_second_submission_returns_recorded_result() {
        let mailer = Arc::new(CountingMailer::new());
        let (engine, _) = engine_with(mailer.clone(), Arc::new(FixedOracle(0)));
        engine
            .start(AssessmentKind::Aptitude, candidate(), "Ada".into(), closed_bank(25))
            .await
            .unwrap();
        let first = engine
            .submit(AssessmentKind::Aptitude, &candidate(), aptitude_responses(14))
            .await
            .unwrap();
        // A perfect second submission changes nothing.
        let second = engine
            .submit(AssessmentKind::Aptitude, &candidate(), aptitude_responses(25))
            .await
            .unwrap();
        assert_eq!(second.total_score, first.total_score);
        assert_eq!(second.status, SessionStatus::Regret);
        // And only the first terminal transition notified.
        assert_eq!(mailer.count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_submit_without_start_is_not_found() {
        let (engine, _) = engine_with(Arc::new(CountingMailer::new()), Arc::new(FixedOracle(0)));
        let err = engine
            .submit(AssessmentKind::Aptitude, &candidate(), aptitude_responses(10))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_empty_question_assignment_is_pool_missing() {
        let (engine, _) = engine_with(Arc::new(CountingMailer::new()), Arc::new(FixedOracle(0)));
        let err = engine
            .start(AssessmentKind::Aptitude, candidate(), "Ada".into(), Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PoolMissing(_)));
    }

    #[tokio::test]
    async fn test_unknown_ordinals_are_ignored() {
        let (engine, _) = engine_with(Arc::new(CountingMailer::new()), Arc::new(FixedOracle(0)));
        engine
            .start(AssessmentKind::Aptitude, candidate(), "Ada".into(), closed_bank(25))
            .await
            .unwrap();
        let mut responses = aptitude_responses(15);
        responses.insert(99, "A".to_string());
        let result = engine
            .submit(AssessmentKind::Aptitude, &candidate(), responses)
            .await
            .unwrap();
        assert_eq!(result.total_score, 15);
        assert!(!result.unit_scores.contains_key(&99));
    }

    #[tokio::test]
    async fn test_open_form_units_delegate_to_oracle() {
        let (engine, _) = engine_with(Arc::new(CountingMailer::new()), Arc::new(FixedOracle(7)));
        let units = vec![
            QuestionUnit::open(1, "Essay".to_string(), 10),
            QuestionUnit::open(2, "Summary".to_string(), 5),
        ];
        engine
            .start(AssessmentKind::Communication, candidate(), "Ada".into(), units)
            .await
            .unwrap();
        let responses: BTreeMap<u32, String> = [
            (1, "a long enough essay answer".to_string()),
            (2, "a summary".to_string()),
        ]
        .into_iter()
        .collect();
        let result = engine
            .submit(AssessmentKind::Communication, &candidate(), responses)
            .await
            .unwrap();
        // Oracle returns 7 clamped to each unit's marks: 7 + 5.
        assert_eq!(result.total_score, 12);
        assert_eq!(result.status, SessionStatus::Qualified);
    }

    #[tokio::test]
    async fn test_dominating_responses_never_rank_worse() {
        for (low, high) in [(0u32, 5u32), (5, 14), (14, 15), (15, 25)] {
            let (engine, _) =
                engine_with(Arc::new(CountingMailer::new()), Arc::new(FixedOracle(0)));
            let low_candidate = CandidateRef::parse("low@x.com").unwrap();
            let high_candidate = CandidateRef::parse("high@x.com").unwrap();
            engine
                .start(AssessmentKind::Aptitude, low_candidate.clone(), "L".into(), closed_bank(25))
                .await
                .unwrap();
            engine
                .start(AssessmentKind::Aptitude, high_candidate.clone(), "H".into(), closed_bank(25))
                .await
                .unwrap();
            let low_result = engine
                .submit(AssessmentKind::Aptitude, &low_candidate, aptitude_responses(low))
                .await
                .unwrap();
            let high_result = engine
                .submit(AssessmentKind::Aptitude, &high_candidate, aptitude_responses(high))
                .await
                .unwrap();
            let rank = |s: SessionStatus| match s {
                SessionStatus::Qualified => 1,
                _ => 0,
            };
            assert!(rank(high_result.status) >= rank(low_result.status));
        }
    }

    #[tokio::test]
    async fn test_mail_failure_leaves_terminal_state_intact() {
        let (engine, store) = engine_with(Arc::new(FailingMailer), Arc::new(FixedOracle(0)));
        engine
            .start(AssessmentKind::Aptitude, candidate(), "Ada".into(), closed_bank(25))
            .await
            .unwrap();
        let result = engine
            .submit(AssessmentKind::Aptitude, &candidate(), aptitude_responses(20))
            .await
            .unwrap();
        assert_eq!(result.status, SessionStatus::Qualified);

        let stored = store
            .find_latest(&candidate(), AssessmentKind::Aptitude)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, SessionStatus::Qualified);
        assert_eq!(stored.total_score, 20);
    }

    #[tokio::test]
    async fn test_qualified_and_regret_send_distinct_mail() {
        let mailer = Arc::new(CountingMailer::new());
        let (engine, _) = engine_with(mailer.clone(), Arc::new(FixedOracle(0)));
        for (email, correct) in [("pass@x.com", 20u32), ("fail@x.com", 3u32)] {
            let c = CandidateRef::parse(email).unwrap();
            engine
                .start(AssessmentKind::Aptitude, c.clone(), "N".into(), closed_bank(25))
                .await
                .unwrap();
            engine
                .submit(AssessmentKind::Aptitude, &c, aptitude_responses(correct))
                .await
                .unwrap();
        }
        let subjects = mailer.subjects.lock().unwrap();
        assert_eq!(subjects.len(), 2);
        assert_ne!(subjects[0], subjects[1]);
    }
}
