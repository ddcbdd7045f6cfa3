//! Retrieval-to-answer pipeline
//!
//! This module turns similarity-search results into an answer prompt and
//! post-processes the generated answer:
//! - Ranking candidates by distance
//! - Building the bounded context block
//! - Rewriting inline keys into numbered citations with a references section

pub mod citation;
pub mod rank;

pub use citation::{Answer, Citation, CitationFormatter, CitationMap};
pub use rank::{build_context, order, select_context};

use crate::extract::UnitKind;
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// A unit returned by similarity search for one question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Key unique within one result set, `<table>_<id>`
    pub key: String,
    /// Row id within the unit's table
    pub id: i64,
    /// Kind of unit
    pub kind: UnitKind,
    /// Unit name
    pub name: String,
    /// Generated summary
    pub summary: String,
    /// Cosine distance to the question (lower is closer)
    pub distance: f64,
}

impl Candidate {
    /// Create a candidate keyed by its table and row id
    pub fn new(kind: UnitKind, id: i64, name: &str, summary: &str, distance: f64) -> Self {
        Self {
            key: stable_key(kind, id),
            id,
            kind,
            name: name.to_string(),
            summary: summary.to_string(),
            distance,
        }
    }
}

/// Build the key identifying a stored unit within a result set
pub fn stable_key(kind: UnitKind, id: i64) -> String {
    format!("{}_{}", kind.table_name(), id)
}

/// Candidates for one question, in retrieval order
///
/// Keys are unique: inserting an existing key replaces that candidate in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateSet {
    candidates: Vec<Candidate>,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a candidate, replacing any candidate with the same key
    pub fn insert(&mut self, candidate: Candidate) {
        match self.candidates.iter_mut().find(|c| c.key == candidate.key) {
            Some(existing) => *existing = candidate,
            None => self.candidates.push(candidate),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.key == key)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Candidate> {
        self.candidates.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.candidates.iter().map(|c| c.key.as_str())
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Keep only the given keys, preserving retrieval order
    pub fn retain_keys(&self, keys: &[&str]) -> CandidateSet {
        self.candidates
            .iter()
            .filter(|c| keys.contains(&c.key.as_str()))
            .cloned()
            .collect()
    }
}

impl FromIterator<Candidate> for CandidateSet {
    fn from_iter<I: IntoIterator<Item = Candidate>>(iter: I) -> Self {
        let mut set = CandidateSet::new();
        for candidate in iter {
            set.insert(candidate);
        }
        set
    }
}

impl<'a> IntoIterator for &'a CandidateSet {
    type Item = &'a Candidate;
    type IntoIter = std::slice::Iter<'a, Candidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.candidates.iter()
    }
}

/// Where a unit lives in the indexed tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// Path of the file as it was indexed
    pub path: String,
    /// Enclosing class, for methods only
    pub class_name: Option<String>,
}

/// Resolves a stored unit to its source location
pub trait LocationLookup {
    /// Look up a unit; `Ok(None)` when no such unit exists
    fn lookup_location(&self, kind: UnitKind, id: i64) -> Result<Option<Location>>;
}

/// Compute cosine similarity between two vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f64 = a.iter().zip(b.iter()).map(|(x, y)| (*x as f64) * (*y as f64)).sum();
    let norm_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Cosine distance, `1 - similarity`; zero vectors sit at distance 1
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    1.0 - cosine_similarity(a, b)
}
