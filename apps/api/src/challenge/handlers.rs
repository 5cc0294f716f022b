//! Axum route handlers for the OTP challenge API.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::candidate::CandidateRef;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SendOtpRequest {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct SendOtpResponse {
    pub message: String,
    pub delivered: bool,
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyOtpResponse {
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
}

fn parse_candidate(email: &str) -> Result<CandidateRef, AppError> {
    CandidateRef::parse(email)
        .ok_or_else(|| AppError::Validation("a valid email address is required".to_string()))
}

/// POST /api/v1/otp/send
///
/// Issues a fresh code. Delivery failure is reported in the response; the
/// stored code stays valid either way.
pub async fn handle_send_otp(
    State(state): State<AppState>,
    Json(request): Json<SendOtpRequest>,
) -> Result<Json<SendOtpResponse>, AppError> {
    if request.name.trim().is_empty() {
        return Err(AppError::Validation("name cannot be empty".to_string()));
    }
    let candidate = parse_candidate(&request.email)?;

    let delivery = state.otp.request(&candidate, request.name.trim()).await?;

    Ok(Json(SendOtpResponse {
        message: if delivery.ok {
            format!("Code sent to {candidate}")
        } else {
            "Code issued; delivery failed".to_string()
        },
        delivered: delivery.ok,
    }))
}

/// POST /api/v1/otp/verify
pub async fn handle_verify_otp(
    State(state): State<AppState>,
    Json(request): Json<VerifyOtpRequest>,
) -> Result<Json<VerifyOtpResponse>, AppError> {
    let candidate = parse_candidate(&request.email)?;

    let outcome = state.otp.verify(&candidate, request.code.trim()).await?;

    Ok(Json(VerifyOtpResponse {
        verified: outcome.verified(),
        reason: outcome.reason(),
    }))
}
