//! Scoring oracle for open-form responses.
//!
//! Primary path asks the judgment capability for an integer grade; the reply
//! is parsed by taking the first numeric token and clamping it to range.
//! Whenever the capability is disabled, errors, or returns nothing numeric,
//! a deterministic length heuristic takes over. The oracle is infallible:
//! every call returns an integer in `[0, max_score]`.

use async_trait::async_trait;
use regex::Regex;
use std::sync::Arc;
use tracing::warn;

use crate::judge::prompts::SCORE_PROMPT_TEMPLATE;
use crate::judge::Judgment;

/// Pluggable scorer for open-form units. Carried as `Arc<dyn ScoringOracle>`
/// in the exam engine so tests can swap in a stub.
#[async_trait]
pub trait ScoringOracle: Send + Sync {
    /// Scores `response` against `prompt`. Never fails; always returns a
    /// value in `[0, max_score]` inclusive.
    async fn score(&self, prompt: &str, response: &str, max_score: u32) -> u32;
}

/// Judge-backed oracle with the length-heuristic fallback.
pub struct JudgeOracle {
    judge: Arc<dyn Judgment>,
    number: Regex,
}

impl JudgeOracle {
    pub fn new(judge: Arc<dyn Judgment>) -> Self {
        Self {
            judge,
            number: Regex::new(r"\d+(\.\d+)?").expect("valid number pattern"),
        }
    }

    fn parse_score(&self, text: &str, max_score: u32) -> Option<u32> {
        let token = self.number.find(text)?.as_str();
        let value: f64 = token.parse().ok()?;
        Some((value.round() as i64).clamp(0, max_score as i64) as u32)
    }
}

#[async_trait]
impl ScoringOracle for JudgeOracle {
    async fn score(&self, prompt: &str, response: &str, max_score: u32) -> u32 {
        if response.trim().is_empty() {
            return 0;
        }

        let scoring_prompt = SCORE_PROMPT_TEMPLATE
            .replace("{prompt}", prompt)
            .replace("{response}", response)
            .replace("{max}", &max_score.to_string());

        match self.judge.complete(&scoring_prompt, 0.0).await {
            Ok(reply) => match self.parse_score(&reply, max_score) {
                Some(score) => score,
                None => {
                    warn!("Judge reply had no numeric token; using fallback score");
                    fallback_score(response, max_score)
                }
            },
            Err(e) => {
                warn!("Judge scoring unavailable ({e}); using fallback score");
                fallback_score(response, max_score)
            }
        }
    }
}

/// Deterministic length heuristic: a monotonic step function over the trimmed
/// response length. With `max_score = 10` the steps are 0 / 5 / 7 / 8.
pub fn fallback_score(response: &str, max_score: u32) -> u32 {
    let len = response.trim().len();
    let fraction = if len < 10 {
        0.0
    } else if len < 50 {
        0.5
    } else if len < 150 {
        0.7
    } else {
        0.8
    };
    ((max_score as f64 * fraction).round() as u32).min(max_score)
}
