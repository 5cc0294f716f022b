// Prompt constants for the screening pipeline.

use crate::judge::prompts::JSON_ONLY_PREAMBLE;

/// Field extraction. Replace `{resume_text}` before sending.
pub fn fields_prompt(resume_text: &str) -> String {
    format!(
        "{JSON_ONLY_PREAMBLE}\n\n\
         Extract the following from this resume:\n\
         - name (string)\n\
         - email (string)\n\
         - skills (array of strings)\n\
         - experience_summary (string)\n\n\
         Return a single JSON object with exactly those keys.\n\n\
         Resume:\n\"\"\"{resume_text}\"\"\""
    )
}

/// Synthetic job description generation for the comparison target.
pub fn jd_prompt(role: &str, experience_level: &str) -> String {
    format!(
        "Write a job description for '{role}' at '{experience_level}' level.\n\
         Include overview, responsibilities, required skills, and preferred \
         qualifications. Keep under 350 words."
    )
}

/// Deterministic comparison target used when the judgment capability is
/// unavailable. Keeps the similarity computation meaningful: the role and
/// level terms still anchor the lexical overlap.
pub fn fallback_jd(role: &str, experience_level: &str) -> String {
    format!(
        "Job Description: {role} ({experience_level})\n\n\
         Overview: We are hiring a {experience_level} {role} to design, build, \
         and operate production systems with our engineering team.\n\n\
         Responsibilities: own features end to end, review code, collaborate \
         with product and design, improve reliability and performance, mentor \
         where appropriate for a {experience_level} position.\n\n\
         Required skills: professional experience relevant to the {role} role, \
         strong communication, testing discipline, and familiarity with modern \
         development workflows.\n\n\
         Preferred qualifications: prior experience at the {experience_level} \
         level, open source contributions, and production operations exposure."
    )
}
