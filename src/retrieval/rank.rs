//! Candidate ranking and context assembly

use super::{Candidate, CandidateSet};

/// Keys ordered by ascending distance
///
/// The sort is stable, so equal distances keep retrieval order. Duplicated
/// logical units reached through different kinds are ranked separately.
pub fn order(candidates: &CandidateSet) -> Vec<&str> {
    ranked(candidates).into_iter().map(|c| c.key.as_str()).collect()
}

/// The `max_context` closest candidates, closest first
pub fn select_context(candidates: &CandidateSet, max_context: usize) -> Vec<&Candidate> {
    let mut ranked = ranked(candidates);
    ranked.truncate(max_context);
    ranked
}

/// Render the closest candidates into the prompt context block
///
/// Each candidate becomes `[key]: Name - <name>, Summary - <summary>`
/// followed by a blank line. No candidates renders as an empty string.
pub fn build_context(candidates: &CandidateSet, max_context: usize) -> String {
    select_context(candidates, max_context)
        .into_iter()
        .map(|c| format!("[{}]: Name - {}, Summary - {}\n\n", c.key, c.name, c.summary))
        .collect()
}

fn ranked(candidates: &CandidateSet) -> Vec<&Candidate> {
    let mut ranked: Vec<&Candidate> = candidates.iter().collect();
    ranked.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    ranked
}
