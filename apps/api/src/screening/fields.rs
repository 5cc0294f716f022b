//! Structured field extraction from resume text.
//!
//! The judgment capability is asked for a strict JSON object. A decode
//! failure gets exactly one bounded recovery attempt (the first `{ ... }`
//! span); after that the document is reported unparseable. When the
//! capability itself is unavailable, a local heuristic stands in so
//! screening stays available at reduced fidelity.

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::AppError;
use crate::judge::{strip_json_fences, JudgeError, Judgment};
use crate::screening::prompts::fields_prompt;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandidateFields {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub experience_summary: String,
}

pub async fn extract_fields(
    judge: &dyn Judgment,
    resume_text: &str,
) -> Result<CandidateFields, AppError> {
    let reply = match judge.complete(&fields_prompt(resume_text), 0.2).await {
        Ok(reply) => reply,
        Err(JudgeError::Disabled) => {
            warn!("Judge disabled; using heuristic field extraction");
            return Ok(heuristic_fields(resume_text));
        }
        Err(e) => {
            warn!("Judge field extraction unavailable ({e}); using heuristic extraction");
            return Ok(heuristic_fields(resume_text));
        }
    };

    decode_fields(&reply).ok_or_else(|| {
        AppError::Extraction("judgment payload was not parseable candidate data".to_string())
    })
}

/// Strict decode, then one bounded substring recovery.
fn decode_fields(reply: &str) -> Option<CandidateFields> {
    let text = strip_json_fences(reply);
    if let Ok(fields) = serde_json::from_str::<CandidateFields>(text) {
        return Some(fields);
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

/// Capability-free extraction: first non-blank line as the name, the first
/// email-shaped token, and a leading slice of the text as the summary.
fn heuristic_fields(resume_text: &str) -> CandidateFields {
    let name = resume_text
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default()
        .chars()
        .take(80)
        .collect();

    let email = Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}")
        .expect("valid email pattern")
        .find(resume_text)
        .map(|m| m.as_str().to_lowercase())
        .unwrap_or_default();

    let experience_summary: String = resume_text.chars().take(300).collect();

    CandidateFields {
        name,
        email,
        skills: Vec::new(),
        experience_summary,
    }
}
