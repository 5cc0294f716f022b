//! Semantic similarity between resume and job description.
//!
//! Primary path embeds both texts with the configured embedding capability;
//! when that is unavailable both texts are embedded with a deterministic
//! hashed bag-of-words model instead, so a score is always produced. The two
//! texts are always embedded in the same space.

use regex::Regex;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tracing::warn;

use crate::judge::Embedder;

const TF_DIMENSIONS: usize = 256;

/// Cosine similarity rescaled to a 0-100 score, rounded to 2 decimals.
/// A zero-norm embedding yields 0 (no division by zero).
pub fn similarity_score(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += (*x as f64) * (*y as f64);
        norm_a += (*x as f64) * (*x as f64);
        norm_b += (*y as f64) * (*y as f64);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let cosine = dot / (norm_a.sqrt() * norm_b.sqrt());
    round2(cosine * 100.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Deterministic fallback embedder: lowercase word tokens hashed into a
/// fixed-dimension count vector. Lexical rather than semantic, but monotone
/// in shared vocabulary and entirely capability-free.
pub struct TermFrequencyEmbedder {
    token: Regex,
}

impl TermFrequencyEmbedder {
    pub fn new() -> Self {
        Self {
            token: Regex::new(r"[a-z0-9]+").expect("valid token pattern"),
        }
    }

    pub fn embed_local(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; TF_DIMENSIONS];
        let lower = text.to_lowercase();
        for token in self.token.find_iter(&lower) {
            let mut hasher = DefaultHasher::new();
            token.as_str().hash(&mut hasher);
            let index = (hasher.finish() % TF_DIMENSIONS as u64) as usize;
            vector[index] += 1.0;
        }
        vector
    }
}

impl Default for TermFrequencyEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

/// Scores two texts, preferring the primary embedder and degrading to the
/// term-frequency model when either embedding fails.
pub struct SimilarityScorer {
    primary: Arc<dyn Embedder>,
    fallback: TermFrequencyEmbedder,
}

impl SimilarityScorer {
    pub fn new(primary: Arc<dyn Embedder>) -> Self {
        Self {
            primary,
            fallback: TermFrequencyEmbedder::new(),
        }
    }

    pub async fn score(&self, a: &str, b: &str) -> f64 {
        match (self.primary.embed(a).await, self.primary.embed(b).await) {
            (Ok(e1), Ok(e2)) => similarity_score(&e1, &e2),
            (Err(e), _) | (_, Err(e)) => {
                warn!("Embedding capability unavailable ({e}); using term-frequency similarity");
                similarity_score(&self.fallback.embed_local(a), &self.fallback.embed_local(b))
            }
        }
    }
}
