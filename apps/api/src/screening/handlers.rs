//! Axum route handlers for the resume screening API.

use axum::{
    extract::{Multipart, Query, State},
    Json,
};
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::errors::AppError;
use crate::screening::extract::extract_text;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// POST /api/v1/screening/process
///
/// Multipart upload: `file` (PDF or DOCX), `role`, `experience_level`.
/// Runs the screening pipeline and archives the raw document for new
/// artifacts.
pub async fn handle_process_resume(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Value>, AppError> {
    let mut file: Option<(String, Bytes)> = None;
    let mut role: Option<String> = None;
    let mut experience_level: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("invalid multipart payload: {e}")))?
    {
        let name = field.name().map(|s| s.to_string());
        match name.as_deref() {
            Some("file") => {
                let filename = field
                    .file_name()
                    .map(|s| s.to_string())
                    .ok_or_else(|| AppError::Validation("file field needs a filename".to_string()))?;
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("failed to read upload: {e}")))?;
                file = Some((filename, bytes));
            }
            Some("role") => {
                role = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| AppError::Validation(format!("invalid role field: {e}")))?,
                );
            }
            Some("experience_level") => {
                experience_level = Some(field.text().await.map_err(|e| {
                    AppError::Validation(format!("invalid experience_level field: {e}"))
                })?);
            }
            _ => {}
        }
    }

    let (filename, bytes) =
        file.ok_or_else(|| AppError::Validation("file is required".to_string()))?;
    let role = role
        .filter(|r| !r.trim().is_empty())
        .ok_or_else(|| AppError::Validation("role is required".to_string()))?;
    let experience_level = experience_level
        .filter(|l| !l.trim().is_empty())
        .ok_or_else(|| AppError::Validation("experience_level is required".to_string()))?;

    let document_text = extract_text(&bytes, &filename)?;

    let outcome = state
        .screening
        .process(&document_text, role.trim(), experience_level.trim())
        .await?;

    // Archive the raw document for newly screened artifacts only; a reused
    // artifact means this document is already on file.
    if !outcome.reused {
        let key = format!("resumes/{}-{}", outcome.artifact.fingerprint, filename);
        state
            .s3
            .put_object()
            .bucket(&state.config.s3_bucket)
            .key(&key)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| AppError::S3(format!("resume upload failed: {e}")))?;
        info!("Archived resume to s3://{}/{}", state.config.s3_bucket, key);
    }

    let artifact = &outcome.artifact;
    Ok(Json(json!({
        "id": artifact.id,
        "role": artifact.role,
        "experience_level": artifact.experience_level,
        "candidate": {
            "name": artifact.candidate_name,
            "email": artifact.candidate_email,
            "skills": artifact.skills,
            "experience_summary": artifact.experience_summary,
        },
        "jd_preview": artifact.jd_text.chars().take(600).collect::<String>(),
        "score": artifact.score,
        "threshold": outcome.threshold,
        "status": artifact.decision.as_str(),
        "email_status": artifact.mail_status,
        "already_screened": outcome.reused,
    })))
}

/// GET /api/v1/screening/candidates
pub async fn handle_list_candidates(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Value>, AppError> {
    let limit = params.limit.unwrap_or(50).clamp(1, 200);
    let offset = params.offset.unwrap_or(0).max(0);

    let artifacts = state.artifacts.list(limit, offset).await?;

    let rows: Vec<Value> = artifacts
        .iter()
        .map(|a| {
            json!({
                "id": a.id,
                "candidate_name": a.candidate_name,
                "candidate_email": a.candidate_email,
                "candidate_skills": a.skills,
                "role": a.role,
                "experience_level": a.experience_level,
                "score": a.score,
                "status": a.decision.as_str(),
                "email_status": a.mail_status,
                "created_at": a.created_at.to_rfc3339(),
            })
        })
        .collect();

    Ok(Json(json!(rows)))
}
