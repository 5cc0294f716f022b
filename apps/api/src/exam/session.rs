use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::exam::question::QuestionUnit;
use crate::models::candidate::CandidateRef;

/// The assessment variants driven by the generic session engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentKind {
    Aptitude,
    Communication,
    Interview,
}

impl AssessmentKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "aptitude" => Some(Self::Aptitude),
            "communication" => Some(Self::Communication),
            "interview" => Some(Self::Interview),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Aptitude => "aptitude",
            Self::Communication => "communication",
            Self::Interview => "interview",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Qualified,
    Regret,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, SessionStatus::InProgress)
    }
}

/// One exam attempt: an identity bound to an immutable question assignment
/// plus the submitted responses and per-unit scores.
///
/// The question list is assigned exactly once at session start and never
/// reassigned; scoring fixes the terminal status, after which the session is
/// read-only (re-submission returns the recorded result).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub candidate: CandidateRef,
    pub candidate_name: String,
    pub kind: AssessmentKind,
    pub questions: Vec<QuestionUnit>,
    pub responses: BTreeMap<u32, String>,
    pub unit_scores: BTreeMap<u32, u32>,
    pub total_score: u32,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(
        candidate: CandidateRef,
        candidate_name: String,
        kind: AssessmentKind,
        questions: Vec<QuestionUnit>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            candidate,
            candidate_name,
            kind,
            questions,
            responses: BTreeMap::new(),
            unit_scores: BTreeMap::new(),
            total_score: 0,
            status: SessionStatus::InProgress,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn unit(&self, ordinal: u32) -> Option<&QuestionUnit> {
        self.questions.iter().find(|q| q.ordinal == ordinal)
    }

    /// Maximum attainable total for the assigned question set.
    pub fn max_total(&self) -> u32 {
        self.questions.iter().map(|q| q.marks).sum()
    }

    pub fn result(&self) -> ScoreResult {
        ScoreResult {
            session_id: self.id,
            total_score: self.total_score,
            max_total: self.max_total(),
            status: self.status,
            unit_scores: self.unit_scores.clone(),
        }
    }
}

/// Outcome of the aggregate-scoring step, also returned verbatim for
/// idempotent re-submission.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreResult {
    pub session_id: Uuid,
    pub total_score: u32,
    pub max_total: u32,
    pub status: SessionStatus,
    pub unit_scores: BTreeMap<u32, u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exam::question::QuestionUnit;

    #[test]
    fn test_kind_round_trips_through_parse() {
        for kind in [
            AssessmentKind::Aptitude,
            AssessmentKind::Communication,
            AssessmentKind::Interview,
        ] {
            assert_eq!(AssessmentKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(AssessmentKind::parse("coding"), None);
    }

    #[test]
    fn test_max_total_sums_unit_marks() {
        let session = Session::new(
            CandidateRef::parse("a@x.com").unwrap(),
            "Ada".to_string(),
            AssessmentKind::Communication,
            vec![
                QuestionUnit::open(1, "Essay".to_string(), 10),
                QuestionUnit::open(2, "Summary".to_string(), 5),
            ],
        );
        assert_eq!(session.max_total(), 15);
    }

    #[test]
    fn test_session_serde_round_trip() {
        let mut session = Session::new(
            CandidateRef::parse("a@x.com").unwrap(),
            "Ada".to_string(),
            AssessmentKind::Aptitude,
            vec![QuestionUnit::closed(
                1,
                "2+2?".to_string(),
                vec!["3".to_string(), "4".to_string()],
                "4".to_string(),
            )],
        );
        session.responses.insert(1, "4".to_string());
        session.unit_scores.insert(1, 1);

        let json = serde_json::to_string(&session).unwrap();
        let back: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, session.id);
        assert_eq!(back.responses.get(&1).map(String::as_str), Some("4"));
        assert_eq!(back.unit_scores.get(&1), Some(&1));
    }
}
