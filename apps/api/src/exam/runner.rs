//! Sandboxed execution for coding-exam submissions.
//!
//! Every attempt runs in its own temporary directory under a hard wall-clock
//! timeout; nothing is shared between concurrent submissions. Toolchain and
//! runtime failures are captured in the outcome, never raised: only an
//! unsupported language is a caller error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::candidate::CandidateRef;

/// Result of one compile-and-run attempt.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub success: bool,
    pub output: String,
}

/// A recorded coding-exam submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodingSubmission {
    pub id: Uuid,
    pub candidate: CandidateRef,
    pub candidate_name: String,
    pub question_title: String,
    pub language: String,
    pub code: String,
    pub output: String,
    pub success: bool,
    pub created_at: DateTime<Utc>,
}

/// Compiles (where applicable) and runs `code` in an isolated scratch
/// directory, bounded by `timeout_secs` of wall-clock time per step.
pub async fn run_code(language: &str, code: &str, timeout_secs: u64) -> Result<RunOutcome, AppError> {
    let dir = tempfile::tempdir()
        .map_err(|e| AppError::Internal(anyhow::anyhow!("scratch dir: {e}")))?;
    let timeout = Duration::from_secs(timeout_secs);

    let outcome = match language {
        "python" => {
            let source = dir.path().join("main.py");
            write_source(&source, code).await?;
            run_step("python3", &[source.as_os_str().to_os_string()], dir.path(), timeout).await
        }
        "cpp" => {
            let source = dir.path().join("main.cpp");
            let binary = dir.path().join("a.out");
            write_source(&source, code).await?;
            let compile = run_step(
                "g++",
                &[
                    source.as_os_str().to_os_string(),
                    "-o".into(),
                    binary.as_os_str().to_os_string(),
                ],
                dir.path(),
                timeout,
            )
            .await;
            if !compile.success {
                compile
            } else {
                run_step(
                    binary.to_str().unwrap_or("./a.out"),
                    &[],
                    dir.path(),
                    timeout,
                )
                .await
            }
        }
        "java" => {
            let source = dir.path().join("Main.java");
            write_source(&source, code).await?;
            let compile =
                run_step("javac", &[source.as_os_str().to_os_string()], dir.path(), timeout).await;
            if !compile.success {
                compile
            } else {
                run_step(
                    "java",
                    &["-cp".into(), dir.path().as_os_str().to_os_string(), "Main".into()],
                    dir.path(),
                    timeout,
                )
                .await
            }
        }
        other => {
            return Err(AppError::Validation(format!(
                "unsupported language '{other}'; use python, cpp, or java"
            )))
        }
    };

    Ok(outcome)
}

async fn write_source(path: &Path, code: &str) -> Result<(), AppError> {
    tokio::fs::write(path, code)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("write source: {e}")))
}

async fn run_step(
    program: &str,
    args: &[std::ffi::OsString],
    workdir: &Path,
    timeout: Duration,
) -> RunOutcome {
    let mut command = Command::new(program);
    command.args(args).current_dir(workdir).kill_on_drop(true);

    match tokio::time::timeout(timeout, command.output()).await {
        Ok(Ok(output)) => {
            let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
            text.push_str(&String::from_utf8_lossy(&output.stderr));
            RunOutcome {
                success: output.status.success(),
                output: text,
            }
        }
        Ok(Err(e)) => RunOutcome {
            success: false,
            output: format!("failed to run {program}: {e}"),
        },
        Err(_) => RunOutcome {
            success: false,
            output: format!("execution timed out after {}s", timeout.as_secs()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unsupported_language_is_rejected() {
        let err = run_code("brainfuck", "+++", 5).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_run_never_errors_for_supported_language() {
        // Whether or not a python3 toolchain exists, the attempt resolves to
        // an outcome rather than an error.
        let outcome = run_code("python", "print('ok')", 5).await;
        assert!(outcome.is_ok());
    }

    #[tokio::test]
    async fn test_infinite_loop_is_cut_off() {
        let outcome = run_code("python", "while True:\n    pass\n", 1)
            .await
            .unwrap();
        assert!(!outcome.success);
    }
}
