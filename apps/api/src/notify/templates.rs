//! Outcome mail templates, keyed by decision kind.

/// Every terminal decision (and the OTP challenge) maps to exactly one of
/// these variants.
#[derive(Debug, Clone)]
pub enum Outcome {
    OtpCode {
        name: String,
        code: String,
        ttl_minutes: i64,
    },
    ExamQualified {
        name: String,
    },
    ExamRegret {
        name: String,
    },
    Shortlisted {
        name: String,
        role: String,
        score: f64,
    },
    Rejected {
        name: String,
        role: String,
    },
    ManagerRound {
        name: String,
        link: String,
    },
}

impl Outcome {
    /// Renders (subject, body) for the outcome.
    pub fn render(&self) -> (String, String) {
        match self {
            Outcome::OtpCode {
                name,
                code,
                ttl_minutes,
            } => (
                "Your Talentgate verification code".to_string(),
                format!(
                    "Hello {name},\n\nYour verification code is: {code}\n\
                     It is valid for {ttl_minutes} minutes.\n\nTalent Team"
                ),
            ),
            Outcome::ExamQualified { name } => (
                "Congratulations - Talentgate".to_string(),
                format!(
                    "Dear {name},\n\nCongratulations! You have qualified for the \
                     next round of interviews.\nOur team will contact you with \
                     scheduling details shortly.\n\nBest regards,\nHR Team"
                ),
            ),
            Outcome::ExamRegret { name } => (
                "Assessment Result - Talentgate".to_string(),
                format!(
                    "Dear {name},\n\nThank you for participating in the assessment. \
                     Unfortunately, you did not qualify this time.\nWe encourage you \
                     to reapply in the future.\n\nBest regards,\nHR Team"
                ),
            ),
            Outcome::Shortlisted { name, role, score } => (
                format!("Your Resume Screening Result for {role}"),
                format!(
                    "Hi {name},\n\nYour resume scored {score:.1} for the {role} \
                     position in our screening and you have been shortlisted.\n\n\
                     Best regards,\nTalent Team"
                ),
            ),
            Outcome::Rejected { name, role } => (
                format!("Your Resume Screening Result for {role}"),
                format!(
                    "Hi {name},\n\nThank you for applying to the {role} position. \
                     After screening, we will not be moving forward at this time.\n\n\
                     Best regards,\nTalent Team"
                ),
            ),
            Outcome::ManagerRound { name, link } => (
                "Manager Round Scheduled - Talentgate".to_string(),
                format!(
                    "Hello {name},\n\nYou are eligible for the manager round.\n\
                     Scheduling link: {link}\n\nBest regards,\nHR Team"
                ),
            ),
        }
    }
}
