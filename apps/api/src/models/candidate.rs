use std::fmt;

use serde::{Deserialize, Serialize};

/// Canonical candidate join key: a trimmed, lowercased email address.
///
/// Every assessment subsystem is keyed by this value. Constructing one is the
/// only sanctioned way to match a candidate across OTP challenges, exam
/// sessions, coding submissions, and screening artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateRef(String);

impl CandidateRef {
    /// Normalizes and validates an email-shaped string.
    /// Returns `None` for blank input or input without an `@`.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_lowercase();
        if normalized.is_empty() || !normalized.contains('@') {
            return None;
        }
        Some(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CandidateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes_case_and_whitespace() {
        let c = CandidateRef::parse("  A@X.Com ").unwrap();
        assert_eq!(c.as_str(), "a@x.com");
    }

    #[test]
    fn test_parse_rejects_blank_and_non_email() {
        assert!(CandidateRef::parse("   ").is_none());
        assert!(CandidateRef::parse("not-an-email").is_none());
    }

    #[test]
    fn test_equal_after_normalization() {
        let a = CandidateRef::parse("a@x.com").unwrap();
        let b = CandidateRef::parse("A@X.COM").unwrap();
        assert_eq!(a, b);
    }
}
