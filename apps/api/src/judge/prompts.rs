// Cross-cutting prompt fragments. Each pipeline that needs judge calls
// defines its own prompts.rs alongside it; this file holds the shared pieces.

/// System-style preamble that enforces JSON-only output, prepended by
/// pipelines that strictly decode the reply.
pub const JSON_ONLY_PREAMBLE: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Scoring prompt template. Replace `{prompt}`, `{response}`, and `{max}`
/// before sending. The reply must be a bare integer.
pub const SCORE_PROMPT_TEMPLATE: &str = "You are an expert assessor. \
Evaluate this response for relevance, completeness, clarity, and depth.\n\
Prompt: {prompt}\n\
Response: {response}\n\
Reply with ONLY an integer between 0 and {max}.";
