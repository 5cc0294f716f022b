use std::sync::Arc;

use aws_sdk_s3::Client as S3Client;
use sqlx::PgPool;

use crate::challenge::OtpService;
use crate::config::Config;
use crate::exam::engine::ExamEngine;
use crate::exam::question::QuestionSets;
use crate::judge::Judgment;
use crate::notify::NotificationDispatcher;
use crate::screening::ScreeningPipeline;
use crate::storage::{ArtifactStore, SubmissionStore};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Connection pool held for handlers that need ad hoc queries; the
    /// domain pipelines go through the store traits instead.
    #[allow(dead_code)]
    pub db: PgPool,
    pub s3: S3Client,
    pub judge: Arc<dyn Judgment>,
    pub otp: Arc<OtpService>,
    pub engine: Arc<ExamEngine>,
    pub screening: Arc<ScreeningPipeline>,
    pub artifacts: Arc<dyn ArtifactStore>,
    pub submissions: Arc<dyn SubmissionStore>,
    pub dispatcher: Arc<NotificationDispatcher>,
    /// Partitioned aptitude bank. `None` when the bank is not loaded, which
    /// surfaces as `PoolMissing` on exam start.
    pub aptitude_sets: Option<Arc<QuestionSets>>,
    pub config: Config,
}
