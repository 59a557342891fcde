//! Pluggable criterion scoring.

use std::collections::HashSet;

/// Turns an analysis text and a dimension's criteria into a 0..=100 score.
///
/// Strategies only see text. They never call the reasoner themselves, so a
/// strategy swap changes how analyses are graded without changing how they
/// are produced.
pub trait ScoringStrategy: Send + Sync {
    fn score(&self, criteria: &[String], analysis: &str) -> u32;
}

/// Default strategy: a criterion is satisfied when strictly more than half
/// of its lowercase word tokens occur as words in the analysis.
///
/// With five criteria per dimension the resulting scores are multiples of
/// 20. Deliberately cheap and deterministic; it grades keyword coverage,
/// not correctness.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordOverlap;

impl ScoringStrategy for KeywordOverlap {
    fn score(&self, criteria: &[String], analysis: &str) -> u32 {
        if criteria.is_empty() {
            return 0;
        }
        let analysis = analysis.to_lowercase();
        let words: HashSet<&str> = analysis.split_whitespace().collect();

        let satisfied = criteria
            .iter()
            .filter(|criterion| {
                let criterion = criterion.to_lowercase();
                let tokens: Vec<&str> = criterion.split_whitespace().collect();
                if tokens.is_empty() {
                    return false;
                }
                let hits = tokens.iter().filter(|t| words.contains(**t)).count();
                hits * 2 > tokens.len()
            })
            .count();

        (satisfied * 100 / criteria.len()) as u32
    }
}
