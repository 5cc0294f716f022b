mod challenge;
mod config;
mod db;
mod errors;
mod exam;
mod judge;
mod models;
mod notify;
mod routes;
mod scoring;
mod screening;
mod state;
mod storage;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::challenge::{OtpService, RedisChallengeStore};
use crate::config::Config;
use crate::db::create_pool;
use crate::exam::engine::{ExamEngine, PassMarks};
use crate::exam::question::QuestionSets;
use crate::judge::OpenAiJudge;
use crate::notify::{DisabledMailer, HttpMailer, MailTransport, NotificationDispatcher};
use crate::routes::build_router;
use crate::scoring::JudgeOracle;
use crate::screening::similarity::SimilarityScorer;
use crate::screening::ScreeningPipeline;
use crate::state::AppState;
use crate::storage::postgres::{
    ensure_schema, load_aptitude_bank, PgArtifactStore, PgSessionStore, PgSubmissionStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (panics on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Talentgate API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL and the tables this service owns
    let pool = create_pool(&config.database_url).await?;
    ensure_schema(&pool).await?;

    // Initialize Redis (production challenge store)
    let redis = redis::Client::open(config.redis_url.clone())?;
    info!("Redis client initialized");

    // Initialize S3 / MinIO
    let s3 = build_s3_client(&config).await;
    info!("S3 client initialized");

    // Initialize the judgment capability. A missing key routes every scorer
    // to its deterministic fallback for the lifetime of the process.
    let judge = Arc::new(OpenAiJudge::new(
        config.openai_api_key.clone(),
        config.judge_model.clone(),
        config.embed_model.clone(),
        config.judge_timeout_secs,
    ));
    info!(
        "Judge client initialized (model: {}, enabled: {})",
        config.judge_model,
        judge.is_enabled()
    );

    // Outbound mail: HTTP mail API when configured, disabled otherwise
    let transport: Arc<dyn MailTransport> =
        match (config.mail_api_url.clone(), config.mail_api_key.clone()) {
            (Some(url), Some(key)) => {
                Arc::new(HttpMailer::new(url, key, config.mail_from.clone()))
            }
            _ => {
                warn!("No mail API configured; outbound notifications will be reported as failed");
                Arc::new(DisabledMailer)
            }
        };
    let dispatcher = Arc::new(NotificationDispatcher::new(transport));

    // OTP challenges live in Redis with a TTL backstop
    let otp = Arc::new(OtpService::new(
        Arc::new(RedisChallengeStore::new(redis)),
        dispatcher.clone(),
        config.otp_code_length,
        config.otp_ttl_secs,
    ));

    // Aptitude bank, partitioned into disjoint per-candidate sets
    let aptitude_sets = match load_aptitude_bank(&pool).await {
        Ok(bank) => {
            match QuestionSets::partition(bank, config.aptitude_set_size, config.aptitude_set_count)
            {
                Ok(sets) => {
                    info!("Aptitude bank partitioned into {} sets", sets.set_count());
                    Some(Arc::new(sets))
                }
                Err(e) => {
                    warn!("Aptitude bank unusable: {e}");
                    None
                }
            }
        }
        Err(e) => {
            warn!("Failed to load aptitude bank: {e}");
            None
        }
    };

    // Assessment engine over the generic scoring pipeline
    let sessions = Arc::new(PgSessionStore::new(pool.clone()));
    let engine = Arc::new(ExamEngine::new(
        sessions,
        Arc::new(JudgeOracle::new(judge.clone())),
        dispatcher.clone(),
        PassMarks {
            aptitude: config.aptitude_pass_mark,
            communication: config.communication_pass_mark,
            interview: config.interview_pass_mark,
        },
    ));

    // Resume screening pipeline
    let artifacts = Arc::new(PgArtifactStore::new(pool.clone()));
    let screening = Arc::new(ScreeningPipeline::new(
        judge.clone(),
        SimilarityScorer::new(judge.clone()),
        artifacts.clone(),
        dispatcher.clone(),
        config.screening_threshold,
        config.notify_rejected,
    ));

    let submissions = Arc::new(PgSubmissionStore::new(pool.clone()));

    // Build app state
    let state = AppState {
        db: pool,
        s3,
        judge,
        otp,
        engine,
        screening,
        artifacts,
        submissions,
        dispatcher,
        aptitude_sets,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "talentgate-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}
