//! Structural decomposition of source files
//!
//! This module splits raw source text into named units:
//! - Top-level functions
//! - Classes, each owning the methods declared one indentation level deeper
//!
//! Boundaries come from indentation alone. There is no grammar behind the
//! extractor, so imports, types and call graphs are never resolved.

pub mod scanner;

pub use scanner::{breakdown_source, extract_classes, extract_functions, INDENT_WIDTH};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

/// Compute a stable hash for content
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Kind of structural unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    Function,
    Class,
    Method,
}

impl UnitKind {
    /// All kinds, in the order they are stored and searched
    pub const ALL: [UnitKind; 3] = [UnitKind::Function, UnitKind::Class, UnitKind::Method];

    /// Name of the table holding units of this kind
    pub fn table_name(&self) -> &'static str {
        match self {
            UnitKind::Function => "functions",
            UnitKind::Class => "classes",
            UnitKind::Method => "methods",
        }
    }

    /// Parse a table name back into a kind
    pub fn from_table_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.table_name() == name)
    }
}

impl std::fmt::Display for UnitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnitKind::Function => write!(f, "function"),
            UnitKind::Class => write!(f, "class"),
            UnitKind::Method => write!(f, "method"),
        }
    }
}

/// A named span of source text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceUnit {
    /// Function, class or method name
    pub name: String,
    /// Kind of unit
    pub kind: UnitKind,
    /// Raw text, declaration line included
    pub text: String,
    /// Generated summary (populated during enrichment)
    pub summary: Option<String>,
    /// Embedding vector (populated during enrichment)
    #[serde(skip)]
    pub embedding: Option<Vec<f32>>,
    /// Methods owned by a class; always empty for functions and methods
    #[serde(default, skip_serializing_if = "UnitMap::is_empty")]
    pub methods: UnitMap,
}

impl SourceUnit {
    /// Create a unit with no enrichment data
    pub fn new(name: &str, kind: UnitKind, text: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            text: text.to_string(),
            summary: None,
            embedding: None,
            methods: UnitMap::default(),
        }
    }

    /// Attach the methods of a class
    pub fn with_methods(mut self, methods: UnitMap) -> Self {
        self.methods = methods;
        self
    }

    /// Text used to produce the unit's embedding
    ///
    /// The summary is preferred; the raw code stands in when no summary
    /// could be generated.
    pub fn embedding_text(&self) -> &str {
        match self.summary.as_deref() {
            Some(summary) if !summary.trim().is_empty() => summary,
            _ => &self.text,
        }
    }
}

/// Units keyed by name, in first-declaration order
///
/// Inserting a name that already exists replaces the earlier unit in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitMap(Vec<SourceUnit>);

impl UnitMap {
    /// Insert a unit, replacing any unit with the same name
    pub fn insert(&mut self, unit: SourceUnit) {
        match self.0.iter_mut().find(|existing| existing.name == unit.name) {
            Some(existing) => *existing = unit,
            None => self.0.push(unit),
        }
    }

    pub fn get(&self, name: &str) -> Option<&SourceUnit> {
        self.0.iter().find(|unit| unit.name == name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|unit| unit.name.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SourceUnit> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, SourceUnit> {
        self.0.iter_mut()
    }
}

impl<'a> IntoIterator for &'a UnitMap {
    type Item = &'a SourceUnit;
    type IntoIter = std::slice::Iter<'a, SourceUnit>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// All units found in one source file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileBreakdown {
    /// Path of the file as it was read
    pub path: String,
    /// Top-level functions
    pub functions: UnitMap,
    /// Top-level classes with their methods
    pub classes: UnitMap,
}

impl FileBreakdown {
    /// Read and decompose a file from disk
    pub fn from_file(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read source file: {:?}", path))?;
        Ok(breakdown_source(&path.to_string_lossy(), &source))
    }

    /// Number of units, methods included
    pub fn unit_count(&self) -> usize {
        self.functions.len()
            + self.classes.len()
            + self.classes.iter().map(|c| c.methods.len()).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty() && self.classes.is_empty()
    }
}
