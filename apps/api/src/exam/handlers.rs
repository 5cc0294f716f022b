//! Axum route handlers for the assessment APIs: the engine-driven exams
//! (aptitude, communication, interview) and the coding exam.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use rand::distr::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::errors::AppError;
use crate::exam::generate;
use crate::exam::question::QuestionView;
use crate::exam::runner::{run_code, CodingSubmission};
use crate::exam::session::{AssessmentKind, ScoreResult};
use crate::models::candidate::CandidateRef;
use crate::notify::Outcome;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StartExamRequest {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct StartExamResponse {
    pub session_id: Uuid,
    pub kind: &'static str,
    pub questions: Vec<QuestionView>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitExamRequest {
    pub email: String,
    pub responses: BTreeMap<u32, String>,
}

#[derive(Debug, Deserialize)]
pub struct RunCodeRequest {
    pub language: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct CodingSubmitRequest {
    pub name: String,
    pub email: String,
    pub question_title: String,
    pub language: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct FinalizeRequest {
    pub name: String,
    pub email: String,
}

fn parse_kind(raw: &str) -> Result<AssessmentKind, AppError> {
    AssessmentKind::parse(raw)
        .ok_or_else(|| AppError::NotFound(format!("unknown assessment kind '{raw}'")))
}

fn parse_candidate(email: &str) -> Result<CandidateRef, AppError> {
    CandidateRef::parse(email)
        .ok_or_else(|| AppError::Validation("a valid email address is required".to_string()))
}

/// GET /api/v1/exams/:kind/instructions
pub async fn handle_instructions(Path(kind): Path<String>) -> Result<Json<Value>, AppError> {
    let kind = parse_kind(&kind)?;
    let body = match kind {
        AssessmentKind::Aptitude => json!({
            "round_name": "Aptitude Test",
            "time_limit_seconds": 1800,
            "total_questions": 25,
            "instructions": "Answer all 25 MCQs in 30 minutes. Do not refresh the page."
        }),
        AssessmentKind::Communication => json!({
            "round_name": "Communication Assessment",
            "time_limit_seconds": 2400,
            "sections": ["reading", "writing", "listening"],
            "instructions": "Complete the reading questions, the writing prompt, and the listening transcription."
        }),
        AssessmentKind::Interview => json!({
            "round_name": "AI Interview",
            "time_limit_seconds": 1800,
            "instructions": "Answer each interview question in your own words. Depth and clarity matter more than length."
        }),
    };
    Ok(Json(body))
}

/// POST /api/v1/exams/:kind/start
///
/// Starts or resumes the candidate's session. The question assignment is
/// sourced per kind and fixed for the session's lifetime.
pub async fn handle_start_exam(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Json(request): Json<StartExamRequest>,
) -> Result<Json<StartExamResponse>, AppError> {
    if request.name.trim().is_empty() {
        return Err(AppError::Validation("name cannot be empty".to_string()));
    }
    let kind = parse_kind(&kind)?;
    let candidate = parse_candidate(&request.email)?;

    let session = match state.engine.resume(kind, &candidate).await? {
        Some(open) => open,
        None => {
            let questions = match kind {
                AssessmentKind::Aptitude => state
                    .aptitude_sets
                    .as_ref()
                    .ok_or_else(|| {
                        AppError::PoolMissing(
                            "aptitude question bank is not loaded; seed aptitude_questions first"
                                .to_string(),
                        )
                    })?
                    .assign(&candidate)
                    .to_vec(),
                AssessmentKind::Communication => {
                    generate::communication_units(state.judge.as_ref(), request.name.trim()).await
                }
                AssessmentKind::Interview => generate::interview_units(),
            };
            state
                .engine
                .start(kind, candidate, request.name.trim().to_string(), questions)
                .await?
        }
    };

    Ok(Json(StartExamResponse {
        session_id: session.id,
        kind: kind.as_str(),
        questions: session.questions.iter().map(QuestionView::of).collect(),
    }))
}

/// POST /api/v1/exams/:kind/submit
pub async fn handle_submit_exam(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Json(request): Json<SubmitExamRequest>,
) -> Result<Json<ScoreResult>, AppError> {
    let kind = parse_kind(&kind)?;
    let candidate = parse_candidate(&request.email)?;

    let result = state
        .engine
        .submit(kind, &candidate, request.responses)
        .await?;

    Ok(Json(result))
}

/// GET /api/v1/coding/questions
pub async fn handle_coding_questions(State(state): State<AppState>) -> Json<Value> {
    let questions = generate::coding_questions(state.judge.as_ref()).await;
    Json(json!({ "questions": questions }))
}

/// POST /api/v1/coding/run
///
/// Dry run without recording a submission.
pub async fn handle_coding_run(
    State(state): State<AppState>,
    Json(request): Json<RunCodeRequest>,
) -> Result<Json<Value>, AppError> {
    let outcome = run_code(
        &request.language,
        &request.code,
        state.config.code_run_timeout_secs,
    )
    .await?;
    Ok(Json(json!({
        "success": outcome.success,
        "output": if outcome.output.is_empty() { "No output".to_string() } else { outcome.output }
    })))
}

/// POST /api/v1/coding/submit
pub async fn handle_coding_submit(
    State(state): State<AppState>,
    Json(request): Json<CodingSubmitRequest>,
) -> Result<Json<Value>, AppError> {
    if request.name.trim().is_empty() {
        return Err(AppError::Validation("name cannot be empty".to_string()));
    }
    let candidate = parse_candidate(&request.email)?;

    let outcome = run_code(
        &request.language,
        &request.code,
        state.config.code_run_timeout_secs,
    )
    .await?;

    let submission = CodingSubmission {
        id: Uuid::new_v4(),
        candidate,
        candidate_name: request.name.trim().to_string(),
        question_title: request.question_title,
        language: request.language,
        code: request.code,
        output: outcome.output.clone(),
        success: outcome.success,
        created_at: Utc::now(),
    };
    state.submissions.save(&submission).await?;

    Ok(Json(json!({
        "message": "Submission saved",
        "success": outcome.success,
        "output": outcome.output
    })))
}

/// POST /api/v1/coding/finalize
///
/// At least one successful submission qualifies the candidate for the
/// manager round; the outcome mail is best-effort either way.
pub async fn handle_coding_finalize(
    State(state): State<AppState>,
    Json(request): Json<FinalizeRequest>,
) -> Result<Json<Value>, AppError> {
    let candidate = parse_candidate(&request.email)?;
    let name = request.name.trim().to_string();

    let successful = state.submissions.count_successful(&candidate).await?;

    if successful >= 1 {
        let link = manager_link();
        state
            .dispatcher
            .notify(
                candidate.as_str(),
                &Outcome::ManagerRound {
                    name,
                    link: link.clone(),
                },
            )
            .await;
        Ok(Json(json!({ "status": "manager_round", "link": link })))
    } else {
        state
            .dispatcher
            .notify(candidate.as_str(), &Outcome::ExamRegret { name })
            .await;
        Ok(Json(json!({ "status": "regret" })))
    }
}

fn manager_link() -> String {
    let token: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .collect();
    format!("https://schedule.talentgate.example/meet/{token}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manager_link_embeds_random_token() {
        let a = manager_link();
        let b = manager_link();
        assert!(a.starts_with("https://schedule.talentgate.example/meet/"));
        assert_eq!(a.len(), b.len());
        assert_ne!(a, b);
    }

    #[test]
    fn test_parse_kind_rejects_unknown() {
        assert!(parse_kind("aptitude").is_ok());
        assert!(parse_kind("astrology").is_err());
    }
}
