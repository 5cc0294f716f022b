// Resume screening: extract text, pull structured fields, generate a
// comparison job description, score similarity, decide against a threshold.

pub mod extract;
pub mod fields;
pub mod handlers;
pub mod pipeline;
pub mod prompts;
pub mod similarity;

pub use pipeline::{ScoredArtifact, ScreeningDecision, ScreeningPipeline};
