//! Question units and the partitioned aptitude question pool.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::models::candidate::CandidateRef;

/// Scoring policy for a unit: exact-match against a reference answer, or
/// delegated judgment for open-form responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rubric {
    ClosedForm {
        options: Vec<String>,
        answer: String,
    },
    OpenForm,
}

/// A single prompt requiring a response. Immutable once assigned to a
/// session; reassignment constructs new units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionUnit {
    pub ordinal: u32,
    pub prompt: String,
    pub marks: u32,
    pub rubric: Rubric,
}

impl QuestionUnit {
    pub fn closed(ordinal: u32, prompt: String, options: Vec<String>, answer: String) -> Self {
        Self {
            ordinal,
            prompt,
            marks: 1,
            rubric: Rubric::ClosedForm { options, answer },
        }
    }

    pub fn open(ordinal: u32, prompt: String, marks: u32) -> Self {
        Self {
            ordinal,
            prompt,
            marks,
            rubric: Rubric::OpenForm,
        }
    }
}

/// Candidate-facing projection of a unit. Reference answers never leave the
/// server.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionView {
    pub no: u32,
    pub prompt: String,
    pub options: Option<Vec<String>>,
    pub marks: u32,
}

impl QuestionView {
    pub fn of(unit: &QuestionUnit) -> Self {
        let options = match &unit.rubric {
            Rubric::ClosedForm { options, .. } => Some(options.clone()),
            Rubric::OpenForm => None,
        };
        Self {
            no: unit.ordinal,
            prompt: unit.prompt.clone(),
            options,
            marks: unit.marks,
        }
    }
}

/// The aptitude bank partitioned into equal-size disjoint sets.
///
/// Assignment is `hash(candidate) mod set_count`: repeatable for a given
/// identity, and any one candidate only ever sees one set of the bank.
pub struct QuestionSets {
    sets: Vec<Vec<QuestionUnit>>,
}

impl QuestionSets {
    /// Partitions `bank` into `set_count` sets of `set_size`. Units beyond
    /// `set_size * set_count` are ignored; a smaller bank is an error (the
    /// reference deployment needs 250 questions for 10 sets of 25).
    pub fn partition(bank: Vec<QuestionUnit>, set_size: usize, set_count: usize) -> Result<Self> {
        if set_size == 0 || set_count == 0 {
            bail!("set_size and set_count must be positive");
        }
        if bank.len() < set_size * set_count {
            bail!(
                "need at least {} questions to create {set_count} sets of {set_size}, have {}",
                set_size * set_count,
                bank.len()
            );
        }

        let sets = bank
            .chunks(set_size)
            .take(set_count)
            .map(|chunk| {
                chunk
                    .iter()
                    .enumerate()
                    .map(|(i, unit)| {
                        let mut unit = unit.clone();
                        unit.ordinal = i as u32 + 1;
                        unit
                    })
                    .collect()
            })
            .collect();

        Ok(Self { sets })
    }

    pub fn set_count(&self) -> usize {
        self.sets.len()
    }

    /// Deterministic set assignment for an identity.
    pub fn assign(&self, candidate: &CandidateRef) -> &[QuestionUnit] {
        let set_no = (stable_hash(candidate.as_str()) % self.sets.len() as u64) as usize;
        &self.sets[set_no]
    }
}

fn stable_hash(value: &str) -> u64 {
    // DefaultHasher::new() uses fixed keys, so assignment is repeatable
    // across process restarts.
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bank(n: usize) -> Vec<QuestionUnit> {
        (0..n)
            .map(|i| {
                QuestionUnit::closed(
                    0,
                    format!("Question {i}"),
                    vec!["A".to_string(), "B".to_string()],
                    "A".to_string(),
                )
            })
            .collect()
    }

    #[test]
    fn test_partition_requires_full_bank() {
        assert!(QuestionSets::partition(bank(249), 25, 10).is_err());
        assert!(QuestionSets::partition(bank(250), 25, 10).is_ok());
    }

    #[test]
    fn test_partition_produces_disjoint_sets() {
        let sets = QuestionSets::partition(bank(250), 25, 10).unwrap();
        assert_eq!(sets.set_count(), 10);
        let mut seen = std::collections::HashSet::new();
        for set in &sets.sets {
            assert_eq!(set.len(), 25);
            for unit in set {
                // Prompts are unique in the fixture, so they double as ids.
                assert!(seen.insert(unit.prompt.clone()), "unit appeared twice");
            }
        }
    }

    #[test]
    fn test_assignment_is_deterministic_per_identity() {
        let sets = QuestionSets::partition(bank(250), 25, 10).unwrap();
        let candidate = CandidateRef::parse("a@x.com").unwrap();
        let first: Vec<String> = sets.assign(&candidate).iter().map(|q| q.prompt.clone()).collect();
        let second: Vec<String> = sets.assign(&candidate).iter().map(|q| q.prompt.clone()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_ordinals_renumbered_within_each_set() {
        let sets = QuestionSets::partition(bank(250), 25, 10).unwrap();
        for set in &sets.sets {
            let ordinals: Vec<u32> = set.iter().map(|q| q.ordinal).collect();
            assert_eq!(ordinals, (1..=25).collect::<Vec<u32>>());
        }
    }

    #[test]
    fn test_view_hides_reference_answer() {
        let unit = QuestionUnit::closed(
            1,
            "2+2?".to_string(),
            vec!["3".to_string(), "4".to_string()],
            "4".to_string(),
        );
        let view = QuestionView::of(&unit);
        let json = serde_json::to_string(&view).unwrap();
        assert!(json.contains("2+2?"));
        assert!(!json.contains("answer"));
    }
}
