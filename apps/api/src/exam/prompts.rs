// Prompt constants for exam content generation.

/// Communication exam generation. Replace `{name}` before sending.
/// The `answer` fields stay server-side; candidates only ever see the
/// projected `QuestionView`.
pub const COMM_EXAM_PROMPT_TEMPLATE: &str = r#"Generate a professional communication exam for candidate {name}.

Return a JSON object with this EXACT schema (no extra fields):
{
  "reading_paragraph": "a unique 150-200 word paragraph",
  "reading_mcqs": [
    {
      "question": "comprehension question about the paragraph",
      "options": ["option A", "option B", "option C", "option D"],
      "answer": "the exact text of the correct option"
    }
  ],
  "writing_prompt": "a unique writing topic for a ~150 word response",
  "listening_paragraph": "1-2 unique sentences to be transcribed"
}

Rules:
- Provide exactly 5 reading_mcqs.
- Each answer MUST be one of that question's options, copied verbatim.
- Respond with valid JSON only, no code fences, no commentary."#;

/// Coding question generation. The reply must be a bare JSON array of two
/// objects.
pub const CODING_QUESTIONS_PROMPT: &str = r#"Generate 2 advanced coding questions in JSON format strictly as a JSON array:
[{"title":"...","description":"...","test_cases":["Input: ...","Output: ..."]},
 {"title":"...","description":"...","test_cases":["Input: ...","Output: ..."]}]
Respond with the JSON array only."#;
