pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::challenge::handlers as otp;
use crate::exam::handlers as exams;
use crate::screening::handlers as screening;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // OTP challenge
        .route("/api/v1/otp/send", post(otp::handle_send_otp))
        .route("/api/v1/otp/verify", post(otp::handle_verify_otp))
        // Engine-driven assessments (aptitude, communication, interview)
        .route(
            "/api/v1/exams/:kind/instructions",
            get(exams::handle_instructions),
        )
        .route("/api/v1/exams/:kind/start", post(exams::handle_start_exam))
        .route(
            "/api/v1/exams/:kind/submit",
            post(exams::handle_submit_exam),
        )
        // Coding exam
        .route(
            "/api/v1/coding/questions",
            get(exams::handle_coding_questions),
        )
        .route("/api/v1/coding/run", post(exams::handle_coding_run))
        .route("/api/v1/coding/submit", post(exams::handle_coding_submit))
        .route(
            "/api/v1/coding/finalize",
            post(exams::handle_coding_finalize),
        )
        // Resume screening
        .route(
            "/api/v1/screening/process",
            post(screening::handle_process_resume),
        )
        .route(
            "/api/v1/screening/candidates",
            get(screening::handle_list_candidates),
        )
        .with_state(state)
}
