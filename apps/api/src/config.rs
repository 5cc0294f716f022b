use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Infrastructure settings are required; assessment tunables carry defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    /// Judgment capability key. Absent means the judge is disabled for the
    /// lifetime of the process and every scorer routes to its fallback.
    pub openai_api_key: Option<String>,
    pub judge_model: String,
    pub embed_model: String,
    pub judge_timeout_secs: u64,
    /// HTTP mail API. Absent means outbound mail is disabled (reported as
    /// failed delivery, never an error).
    pub mail_api_url: Option<String>,
    pub mail_api_key: Option<String>,
    pub mail_from: String,
    pub port: u16,
    pub rust_log: String,
    pub otp_code_length: usize,
    pub otp_ttl_secs: i64,
    pub aptitude_set_size: usize,
    pub aptitude_set_count: usize,
    pub aptitude_pass_mark: u32,
    pub communication_pass_mark: u32,
    pub interview_pass_mark: u32,
    pub screening_threshold: f64,
    pub notify_rejected: bool,
    pub code_run_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: require_env("REDIS_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            openai_api_key: optional_env("OPENAI_API_KEY"),
            judge_model: std::env::var("JUDGE_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            embed_model: std::env::var("EMBED_MODEL")
                .unwrap_or_else(|_| "text-embedding-3-large".to_string()),
            judge_timeout_secs: parse_env("JUDGE_TIMEOUT_SECS", 30)?,
            mail_api_url: optional_env("MAIL_API_URL"),
            mail_api_key: optional_env("MAIL_API_KEY"),
            mail_from: std::env::var("MAIL_FROM")
                .unwrap_or_else(|_| "talent@talentgate.example".to_string()),
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            otp_code_length: parse_env("OTP_CODE_LENGTH", 6)?,
            otp_ttl_secs: parse_env("OTP_TTL_SECS", 300)?,
            aptitude_set_size: parse_env("APTITUDE_SET_SIZE", 25)?,
            aptitude_set_count: parse_env("APTITUDE_SET_COUNT", 10)?,
            aptitude_pass_mark: parse_env("APTITUDE_PASS_MARK", 15)?,
            communication_pass_mark: parse_env("COMMUNICATION_PASS_MARK", 9)?,
            interview_pass_mark: parse_env("INTERVIEW_PASS_MARK", 25)?,
            screening_threshold: parse_env("SCREENING_THRESHOLD", 60.0)?,
            notify_rejected: parse_env("NOTIFY_REJECTED", false)?,
            code_run_timeout_secs: parse_env("CODE_RUN_TIMEOUT_SECS", 5)?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_defaults_when_unset() {
        std::env::remove_var("CONFIG_TEST_UNSET");
        let value: u32 = parse_env("CONFIG_TEST_UNSET", 15).unwrap();
        assert_eq!(value, 15);
    }

    #[test]
    fn test_parse_env_reads_override() {
        std::env::set_var("CONFIG_TEST_OVERRIDE", "42");
        let value: u32 = parse_env("CONFIG_TEST_OVERRIDE", 15).unwrap();
        assert_eq!(value, 42);
        std::env::remove_var("CONFIG_TEST_OVERRIDE");
    }

    #[test]
    fn test_optional_env_filters_blank() {
        std::env::set_var("CONFIG_TEST_BLANK", "   ");
        assert!(optional_env("CONFIG_TEST_BLANK").is_none());
        std::env::remove_var("CONFIG_TEST_BLANK");
    }
}
