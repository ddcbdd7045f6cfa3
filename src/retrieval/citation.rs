//! Citation rewriting for generated answers
//!
//! The answering model cites units by their candidate keys (`functions_3`).
//! The formatter swaps each cited key for a sequential number and appends a
//! references section pointing at the unit's file.

use super::{CandidateSet, LocationLookup};
use crate::extract::UnitKind;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Header placed between the answer and its references
pub const REFERENCES_HEADER: &str = "\n\nREFERENCES:\n";

/// One resolved citation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    /// Number shown to the reader, starting at 1
    pub number: usize,
    /// Candidate key the number replaced
    pub key: String,
    /// Kind of the cited unit
    pub kind: UnitKind,
    /// Unit name
    pub name: String,
    /// File path, relative to the checkout directory when possible
    pub path: String,
    /// Enclosing class, for methods only
    pub class_name: Option<String>,
}

impl Citation {
    /// Render the references line for this citation
    pub fn reference_line(&self) -> String {
        let label = match (&self.class_name, self.kind) {
            (Some(class_name), UnitKind::Method) => format!("class: {}.{}", class_name, self.name),
            _ => self.name.clone(),
        };
        format!("[{}]: {} - (path: {})", self.number, label, self.path)
    }
}

/// Citations assigned while formatting one answer, by number
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CitationMap {
    entries: Vec<Citation>,
}

impl CitationMap {
    fn push(&mut self, mut citation: Citation) {
        citation.number = self.entries.len() + 1;
        self.entries.push(citation);
    }

    pub fn get(&self, number: usize) -> Option<&Citation> {
        number.checked_sub(1).and_then(|i| self.entries.get(i))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Citation> {
        self.entries.iter()
    }

    fn number_for(&self, key: &str) -> Option<usize> {
        self.entries.iter().find(|c| c.key == key).map(|c| c.number)
    }
}

/// A formatted answer with the citations it carries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub citations: CitationMap,
}

/// Rewrites candidate keys in generated answers into numbered citations
#[derive(Debug, Clone)]
pub struct CitationFormatter {
    /// Prefix stripped from reference paths
    path_prefix: Option<PathBuf>,
    /// Context budget; no more citations than this are assigned
    max_context: usize,
}

impl CitationFormatter {
    /// Create a formatter for a context budget of `max_context`
    pub fn new(max_context: usize) -> Self {
        Self {
            path_prefix: None,
            max_context,
        }
    }

    /// Strip `prefix` from the paths shown in references
    pub fn with_path_prefix<P: Into<PathBuf>>(mut self, prefix: P) -> Self {
        self.path_prefix = Some(prefix.into());
        self
    }

    /// Rewrite `answer`, resolving cited keys through `lookup`
    ///
    /// Keys are numbered in candidate (retrieval) order, each once however
    /// often it is cited. Keys that are not candidates, or whose location
    /// cannot be resolved, stay in the text untouched.
    pub fn reformat(
        &self,
        answer: &str,
        candidates: &CandidateSet,
        lookup: &dyn LocationLookup,
    ) -> Answer {
        let mut citations = CitationMap::default();
        let mut text = answer.to_string();

        if let Some(pattern) = key_pattern(candidates) {
            let cited: HashSet<&str> = pattern.find_iter(answer).map(|m| m.as_str()).collect();

            for candidate in candidates {
                if !cited.contains(candidate.key.as_str()) {
                    continue;
                }
                if citations.len() >= self.max_context {
                    tracing::debug!("Citation budget of {} reached", self.max_context);
                    break;
                }

                match lookup.lookup_location(candidate.kind, candidate.id) {
                    Ok(Some(location)) => {
                        let class_name = match candidate.kind {
                            UnitKind::Method => location.class_name,
                            _ => None,
                        };
                        citations.push(Citation {
                            number: 0,
                            key: candidate.key.clone(),
                            kind: candidate.kind,
                            name: candidate.name.clone(),
                            path: self.relative_path(&location.path),
                            class_name,
                        });
                    }
                    Ok(None) => {
                        tracing::debug!("No location for cited key {}", candidate.key);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to resolve cited key {}: {}", candidate.key, e);
                    }
                }
            }

            text = pattern
                .replace_all(answer, |caps: &regex::Captures| {
                    let key = &caps[0];
                    citations
                        .number_for(key)
                        .map_or_else(|| key.to_string(), |n| n.to_string())
                })
                .into_owned();
        }

        if !citations.is_empty() {
            let lines: Vec<String> = citations.iter().map(Citation::reference_line).collect();
            text.push_str(REFERENCES_HEADER);
            text.push_str(&lines.join("\n"));
        }

        for n in 1..=self.max_context {
            text = text.replace(&format!("([{}])", n), &format!("[{}]", n));
        }

        Answer { text, citations }
    }

    fn relative_path(&self, path: &str) -> String {
        self.path_prefix
            .as_deref()
            .and_then(|prefix| Path::new(path).strip_prefix(prefix).ok())
            .map_or_else(|| path.to_string(), |p| p.to_string_lossy().into_owned())
    }
}

/// Whole-word pattern matching any candidate key, longest keys first
fn key_pattern(candidates: &CandidateSet) -> Option<Regex> {
    let mut keys: Vec<&str> = candidates.keys().filter(|k| !k.is_empty()).collect();
    if keys.is_empty() {
        return None;
    }
    keys.sort_by_key(|k| std::cmp::Reverse(k.len()));

    let alternation = keys
        .iter()
        .map(|k| regex::escape(k))
        .collect::<Vec<_>>()
        .join("|");

    match Regex::new(&format!(r"\b(?:{})\b", alternation)) {
        Ok(pattern) => Some(pattern),
        Err(e) => {
            tracing::warn!("Failed to build citation pattern: {}", e);
            None
        }
    }
}
