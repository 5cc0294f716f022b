//! Generated exam content with deterministic fallbacks.
//!
//! The communication exam and the coding question pair come from the
//! judgment capability when it is available; a static exam and a static
//! question pair stand in when it is not. Generation failure is therefore
//! never a caller-visible error.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::exam::prompts::{CODING_QUESTIONS_PROMPT, COMM_EXAM_PROMPT_TEMPLATE};
use crate::exam::question::QuestionUnit;
use crate::judge::{complete_json, strip_json_fences, Judgment};

const COMM_MCQ_COUNT: usize = 5;
const WRITING_MARKS: u32 = 10;
const LISTENING_MARKS: u32 = 5;

#[derive(Debug, Deserialize)]
struct GeneratedMcq {
    question: String,
    options: Vec<String>,
    answer: String,
}

#[derive(Debug, Deserialize)]
struct GeneratedCommExam {
    reading_paragraph: String,
    reading_mcqs: Vec<GeneratedMcq>,
    writing_prompt: String,
    listening_paragraph: String,
}

/// A coding-exam problem statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodingQuestion {
    pub title: String,
    pub description: String,
    pub test_cases: Vec<String>,
}

/// Builds the communication exam question set: five reading MCQs (1 mark
/// each), one writing unit (10 marks), one listening unit (5 marks).
pub async fn communication_units(judge: &dyn Judgment, candidate_name: &str) -> Vec<QuestionUnit> {
    let prompt = COMM_EXAM_PROMPT_TEMPLATE.replace("{name}", candidate_name);
    let exam = match complete_json::<GeneratedCommExam>(judge, &prompt, 0.8).await {
        Ok(exam) => exam,
        Err(e) => {
            warn!("Communication exam generation unavailable ({e}); using static exam");
            fallback_communication_exam()
        }
    };
    units_from_exam(exam)
}

fn units_from_exam(exam: GeneratedCommExam) -> Vec<QuestionUnit> {
    let mut units = Vec::new();
    for (i, mcq) in exam.reading_mcqs.into_iter().take(COMM_MCQ_COUNT).enumerate() {
        units.push(QuestionUnit::closed(
            i as u32 + 1,
            format!(
                "Read the passage and answer.\n\n{}\n\n{}",
                exam.reading_paragraph, mcq.question
            ),
            mcq.options,
            mcq.answer,
        ));
    }
    let next = units.len() as u32 + 1;
    units.push(QuestionUnit::open(next, exam.writing_prompt, WRITING_MARKS));
    units.push(QuestionUnit::open(
        next + 1,
        format!(
            "Listen to the passage and transcribe it as accurately as you can:\n\n{}",
            exam.listening_paragraph
        ),
        LISTENING_MARKS,
    ));
    units
}

fn fallback_communication_exam() -> GeneratedCommExam {
    let paragraph = "Remote collaboration has reshaped how teams communicate. Written \
        updates now carry much of the weight that hallway conversations once did, \
        which rewards people who can state a problem, its impact, and a proposed \
        next step in a few clear sentences. Teams that write well spend less time \
        in meetings, because decisions and their reasoning are already captured \
        where everyone can read them. The cost is that tone is easy to misread in \
        text, so careful writers make requests explicit and assume good intent \
        when reading. Over time, a team's written record becomes its institutional \
        memory: new members can trace why choices were made without interrupting \
        anyone. Clear writing is therefore not a nicety but an operational skill, \
        one that compounds as organizations grow and spread across time zones.";

    let mcq = |question: &str, options: [&str; 4], answer: usize| GeneratedMcq {
        question: question.to_string(),
        options: options.iter().map(|o| o.to_string()).collect(),
        answer: options[answer].to_string(),
    };

    GeneratedCommExam {
        reading_paragraph: paragraph.to_string(),
        reading_mcqs: vec![
            mcq(
                "According to the passage, what now carries much of the weight of hallway conversations?",
                ["Video calls", "Written updates", "Daily meetings", "Shared dashboards"],
                1,
            ),
            mcq(
                "Why do teams that write well spend less time in meetings?",
                [
                    "They have fewer decisions to make",
                    "Their managers forbid meetings",
                    "Decisions and reasoning are already captured in writing",
                    "They work in a single time zone",
                ],
                2,
            ),
            mcq(
                "What risk of written communication does the passage mention?",
                [
                    "Tone is easy to misread",
                    "Messages are often lost",
                    "Writing takes no effort",
                    "Records cannot be searched",
                ],
                0,
            ),
            mcq(
                "What does a team's written record become over time?",
                [
                    "A legal liability",
                    "Its institutional memory",
                    "An archive nobody reads",
                    "A replacement for code review",
                ],
                1,
            ),
            mcq(
                "How does the passage characterize clear writing?",
                [
                    "A nicety",
                    "A hiring filter",
                    "An operational skill",
                    "A management fad",
                ],
                2,
            ),
        ],
        writing_prompt: "Describe a time a miscommunication caused a problem at work or \
            school. What happened, and what would you change about how the information \
            was shared? Aim for roughly 150 words."
            .to_string(),
        listening_paragraph: "The deployment was postponed to Thursday because the final \
            review uncovered two unresolved defects."
            .to_string(),
    }
}

/// Default interview question set: five open-form units, 10 marks each.
/// Interview templates in storage override this list when configured.
pub fn interview_units() -> Vec<QuestionUnit> {
    [
        "Tell me about a project you are proud of. What was your specific contribution?",
        "Describe a technical disagreement you had with a colleague and how it was resolved.",
        "Walk me through how you debug a problem you have never seen before.",
        "Tell me about a time you missed a deadline. What did you do?",
        "What would your previous team say is your biggest area for growth?",
    ]
    .iter()
    .enumerate()
    .map(|(i, q)| QuestionUnit::open(i as u32 + 1, q.to_string(), 10))
    .collect()
}

/// Fetches two coding questions from the judgment capability, recovering a
/// JSON array from chatter if needed, with a static fallback pair.
pub async fn coding_questions(judge: &dyn Judgment) -> Vec<CodingQuestion> {
    match judge.complete(CODING_QUESTIONS_PROMPT, 0.7).await {
        Ok(reply) => match parse_question_array(&reply) {
            Some(questions) if !questions.is_empty() => questions,
            _ => {
                warn!("Coding question reply was not a parseable array; using static questions");
                fallback_coding_questions()
            }
        },
        Err(e) => {
            warn!("Coding question generation unavailable ({e}); using static questions");
            fallback_coding_questions()
        }
    }
}

fn parse_question_array(reply: &str) -> Option<Vec<CodingQuestion>> {
    let text = strip_json_fences(reply);
    if let Ok(questions) = serde_json::from_str::<Vec<CodingQuestion>>(text) {
        return Some(questions);
    }
    // One bounded recovery attempt: the first [ ... ] span.
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

fn fallback_coding_questions() -> Vec<CodingQuestion> {
    vec![
        CodingQuestion {
            title: "Longest Substring Without Repeating Characters".to_string(),
            description: "Given a string s, return the length of the longest substring \
                without repeating characters."
                .to_string(),
            test_cases: vec![
                "Input: 'abcabcbb'".to_string(),
                "Output: 3".to_string(),
                "Input: 'bbbbb'".to_string(),
                "Output: 1".to_string(),
            ],
        },
        CodingQuestion {
            title: "Merge Intervals".to_string(),
            description: "Given a collection of intervals, merge all overlapping intervals."
                .to_string(),
            test_cases: vec![
                "Input: [[1,3],[2,6],[8,10],[15,18]]".to_string(),
                "Output: [[1,6],[8,10],[15,18]]".to_string(),
            ],
        },
    ]
}
