//! SQLite storage layer
//!
//! This module handles persistent storage of:
//! - Indexed files
//! - Functions, classes and methods with their summaries and embeddings
//!
//! and answers similarity searches and location lookups over them.

mod schema;

pub use schema::SCHEMA;

use crate::extract::{FileBreakdown, SourceUnit, UnitKind};
use crate::retrieval::{cosine_distance, Candidate, CandidateSet, Location, LocationLookup};
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use thiserror::Error;

/// Storage errors callers may want to match on
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Database connection wrapper
pub struct Database {
    conn: Connection,
    dimension: usize,
}

impl Database {
    /// Open or create a database at the given path for `dimension`-sized embeddings
    pub fn open<P: AsRef<Path>>(path: P, dimension: usize) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .with_context(|| format!("Failed to open database at {:?}", path.as_ref()))?;

        let db = Self { conn, dimension };
        db.initialize()?;

        Ok(db)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory(dimension: usize) -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;

        let db = Self { conn, dimension };
        db.initialize()?;

        Ok(db)
    }

    /// Initialize the schema and pin the embedding dimension
    fn initialize(&self) -> Result<()> {
        self.conn
            .execute_batch(SCHEMA)
            .context("Failed to initialize database schema")?;

        let stored: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![schema::DIMENSION_KEY],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to read embedding dimension")?;

        match stored {
            Some(value) => {
                let expected: usize = value
                    .parse()
                    .with_context(|| format!("Invalid stored embedding dimension: {}", value))?;
                if expected != self.dimension {
                    return Err(StorageError::DimensionMismatch {
                        expected,
                        actual: self.dimension,
                    }
                    .into());
                }
            }
            None => {
                self.conn
                    .execute(
                        "INSERT INTO settings (key, value) VALUES (?1, ?2)",
                        params![schema::DIMENSION_KEY, self.dimension.to_string()],
                    )
                    .context("Failed to store embedding dimension")?;
            }
        }

        Ok(())
    }

    /// Embedding dimension this database accepts
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Remove every file and unit
    pub fn clear(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "DELETE FROM methods; DELETE FROM classes; DELETE FROM functions; DELETE FROM files;",
            )
            .context("Failed to clear tables")?;
        tracing::info!("All tables cleared");
        Ok(())
    }

    // ==================== Inserts ====================

    /// Add a file row and return its id
    pub fn add_file(&self, path: &str) -> Result<i64> {
        self.conn
            .execute("INSERT INTO files (path) VALUES (?1)", params![path])
            .with_context(|| format!("Failed to insert file {}", path))?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Add a function belonging to `file_id`
    pub fn add_function(&self, file_id: i64, unit: &SourceUnit) -> Result<i64> {
        self.add_unit(UnitKind::Function, file_id, unit)
    }

    /// Add a class belonging to `file_id`, without its methods
    pub fn add_class(&self, file_id: i64, unit: &SourceUnit) -> Result<i64> {
        self.add_unit(UnitKind::Class, file_id, unit)
    }

    /// Add a method belonging to `class_id`
    pub fn add_method(&self, class_id: i64, unit: &SourceUnit) -> Result<i64> {
        self.add_unit(UnitKind::Method, class_id, unit)
    }

    /// Store a whole file breakdown in one transaction, returning the file id
    pub fn add_breakdown(&self, breakdown: &FileBreakdown) -> Result<i64> {
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to start transaction")?;

        let file_id = self.add_file(&breakdown.path)?;
        for function in &breakdown.functions {
            self.add_function(file_id, function)?;
        }
        for class in &breakdown.classes {
            let class_id = self.add_class(file_id, class)?;
            for method in &class.methods {
                self.add_method(class_id, method)?;
            }
        }

        tx.commit().context("Failed to commit file breakdown")?;
        Ok(file_id)
    }

    fn add_unit(&self, kind: UnitKind, parent_id: i64, unit: &SourceUnit) -> Result<i64> {
        let embedding_blob = match unit.embedding.as_deref() {
            Some(embedding) => Some(self.encode_embedding(embedding)?),
            None => None,
        };

        let parent_column = match kind {
            UnitKind::Method => "class_id",
            UnitKind::Function | UnitKind::Class => "file_id",
        };

        self.conn
            .execute(
                &format!(
                    "INSERT INTO {} ({}, name, code, summary, embedding) VALUES (?1, ?2, ?3, ?4, ?5)",
                    kind.table_name(),
                    parent_column
                ),
                params![parent_id, unit.name, unit.text, unit.summary, embedding_blob],
            )
            .with_context(|| format!("Failed to insert {} {}", kind, unit.name))?;

        Ok(self.conn.last_insert_rowid())
    }

    fn encode_embedding(&self, embedding: &[f32]) -> Result<Vec<u8>> {
        self.check_dimension(embedding)?;
        Ok(embedding.iter().flat_map(|f| f.to_le_bytes()).collect())
    }

    fn check_dimension(&self, embedding: &[f32]) -> Result<()> {
        if embedding.len() != self.dimension {
            return Err(StorageError::DimensionMismatch {
                expected: self.dimension,
                actual: embedding.len(),
            }
            .into());
        }
        Ok(())
    }

    // ==================== Search ====================

    /// Find units close to `vector`
    ///
    /// Each kind is searched in turn (functions, classes, methods); within a
    /// kind, rows at cosine distance `<= threshold` are kept, closest first,
    /// at most `limit` of them.
    pub fn similarity_search(
        &self,
        vector: &[f32],
        threshold: f64,
        limit: usize,
    ) -> Result<CandidateSet> {
        self.check_dimension(vector)?;

        let mut results = CandidateSet::new();
        for kind in UnitKind::ALL {
            for candidate in self.search_kind(kind, vector, threshold, limit)? {
                results.insert(candidate);
            }
        }

        Ok(results)
    }

    fn search_kind(
        &self,
        kind: UnitKind,
        vector: &[f32],
        threshold: f64,
        limit: usize,
    ) -> Result<Vec<Candidate>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT id, name, summary, embedding FROM {} WHERE embedding IS NOT NULL",
            kind.table_name()
        ))?;

        let rows = stmt.query_map([], |row| {
            Ok(UnitRow {
                id: row.get(0)?,
                name: row.get(1)?,
                summary: row.get(2)?,
                embedding: row.get(3)?,
            })
        })?;

        let mut matches = Vec::new();
        for row in rows {
            let row = row.with_context(|| format!("Failed to read {} row", kind))?;
            let distance = cosine_distance(vector, &decode_embedding(&row.embedding));
            if distance <= threshold {
                matches.push(row.into_candidate(kind, distance));
            }
        }

        matches.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        matches.truncate(limit);

        tracing::debug!("{} {} match(es) within {}", matches.len(), kind.table_name(), threshold);
        Ok(matches)
    }

    // ==================== Statistics ====================

    /// Get database statistics
    pub fn get_stats(&self) -> Result<DatabaseStats> {
        let count = |table: &str| -> Result<usize> {
            let n: i64 = self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
                .with_context(|| format!("Failed to count {}", table))?;
            Ok(n as usize)
        };

        Ok(DatabaseStats {
            files: count("files")?,
            functions: count("functions")?,
            classes: count("classes")?,
            methods: count("methods")?,
        })
    }
}

impl LocationLookup for Database {
    fn lookup_location(&self, kind: UnitKind, id: i64) -> Result<Option<Location>> {
        let location = match kind {
            UnitKind::Method => self
                .conn
                .query_row(
                    r#"
                    SELECT files.path, classes.name
                    FROM methods
                    JOIN classes ON classes.id = methods.class_id
                    JOIN files ON files.id = classes.file_id
                    WHERE methods.id = ?1
                    "#,
                    params![id],
                    |row| {
                        Ok(Location {
                            path: row.get(0)?,
                            class_name: Some(row.get(1)?),
                        })
                    },
                )
                .optional(),
            UnitKind::Function | UnitKind::Class => self
                .conn
                .query_row(
                    &format!(
                        "SELECT files.path FROM {table} JOIN files ON files.id = {table}.file_id WHERE {table}.id = ?1",
                        table = kind.table_name()
                    ),
                    params![id],
                    |row| {
                        Ok(Location {
                            path: row.get(0)?,
                            class_name: None,
                        })
                    },
                )
                .optional(),
        };

        location.with_context(|| format!("Failed to look up {} {}", kind, id))
    }
}

/// Database statistics
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct DatabaseStats {
    pub files: usize,
    pub functions: usize,
    pub classes: usize,
    pub methods: usize,
}

// Internal row type for database mapping

struct UnitRow {
    id: i64,
    name: String,
    summary: Option<String>,
    embedding: Vec<u8>,
}

impl UnitRow {
    fn into_candidate(self, kind: UnitKind, distance: f64) -> Candidate {
        Candidate::new(
            kind,
            self.id,
            &self.name,
            self.summary.as_deref().unwrap_or_default(),
            distance,
        )
    }
}

fn decode_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks(4)
        .map(|chunk| {
            let arr: [u8; 4] = chunk.try_into().unwrap_or([0; 4]);
            f32::from_le_bytes(arr)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::breakdown_source;

    fn unit(name: &str, kind: UnitKind, embedding: Vec<f32>) -> SourceUnit {
        let mut unit = SourceUnit::new(name, kind, &format!("def {}(): pass", name));
        unit.summary = Some(format!("{} summary", name));
        unit.embedding = Some(embedding);
        unit
    }

    #[test]
    fn test_database_creation() {
        let db = Database::open_in_memory(3).unwrap();
        let stats = db.get_stats().unwrap();
        assert_eq!(
            stats,
            DatabaseStats {
                files: 0,
                functions: 0,
                classes: 0,
                methods: 0
            }
        );
        assert_eq!(db.dimension(), 3);
    }

    #[test]
    fn test_dimension_pinned_per_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("units.db");

        Database::open(&path, 4).unwrap();
        assert!(Database::open(&path, 4).is_ok());

        let err = Database::open(&path, 8).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<StorageError>(),
            Some(StorageError::DimensionMismatch {
                expected: 4,
                actual: 8
            })
        ));
    }

    #[test]
    fn test_wrong_embedding_length_rejected() {
        let db = Database::open_in_memory(3).unwrap();
        let file_id = db.add_file("a.py").unwrap();

        let err = db
            .add_function(file_id, &unit("f", UnitKind::Function, vec![1.0, 0.0]))
            .unwrap_err();
        assert!(err.downcast_ref::<StorageError>().is_some());
        assert!(db.similarity_search(&[1.0], 0.5, 3).is_err());
    }

    #[test]
    fn test_similarity_search_threshold_limit_and_order() {
        let db = Database::open_in_memory(2).unwrap();
        let file_id = db.add_file("/repo/a.py").unwrap();

        db.add_function(file_id, &unit("far", UnitKind::Function, vec![0.0, 1.0])).unwrap();
        db.add_function(file_id, &unit("near", UnitKind::Function, vec![1.0, 0.1])).unwrap();
        db.add_function(file_id, &unit("exact", UnitKind::Function, vec![2.0, 0.0])).unwrap();
        db.add_function(file_id, &unit("zero", UnitKind::Function, vec![0.0, 0.0])).unwrap();
        let class_id = db.add_class(file_id, &unit("Near", UnitKind::Class, vec![1.0, 0.2])).unwrap();
        db.add_method(class_id, &unit("run", UnitKind::Method, vec![1.0, 0.0])).unwrap();

        let results = db.similarity_search(&[1.0, 0.0], 0.5, 3).unwrap();
        let keys: Vec<&str> = results.keys().collect();
        assert_eq!(keys, vec!["functions_3", "functions_2", "classes_1", "methods_1"]);

        let exact = results.get("functions_3").unwrap();
        assert_eq!(exact.name, "exact");
        assert_eq!(exact.summary, "exact summary");
        assert!(exact.distance.abs() < 1e-6);

        let limited = db.similarity_search(&[1.0, 0.0], 0.5, 1).unwrap();
        assert_eq!(limited.keys().collect::<Vec<_>>(), vec!["functions_3", "classes_1", "methods_1"]);
    }

    #[test]
    fn test_units_without_embeddings_are_not_searched() {
        let db = Database::open_in_memory(2).unwrap();
        let file_id = db.add_file("a.py").unwrap();
        db.add_function(file_id, &SourceUnit::new("bare", UnitKind::Function, "def bare(): pass"))
            .unwrap();

        assert!(db.similarity_search(&[1.0, 0.0], 2.0, 3).unwrap().is_empty());
    }

    #[test]
    fn test_lookup_location() {
        let db = Database::open_in_memory(2).unwrap();
        let source = "def helper():\n    pass\n\nclass Client:\n    def send(self):\n        pass\n";
        let breakdown = breakdown_source("/repo/client.py", source);
        db.add_breakdown(&breakdown).unwrap();

        assert_eq!(
            db.lookup_location(UnitKind::Function, 1).unwrap(),
            Some(Location {
                path: "/repo/client.py".to_string(),
                class_name: None
            })
        );
        assert_eq!(
            db.lookup_location(UnitKind::Method, 1).unwrap(),
            Some(Location {
                path: "/repo/client.py".to_string(),
                class_name: Some("Client".to_string())
            })
        );
        assert_eq!(db.lookup_location(UnitKind::Class, 42).unwrap(), None);
    }

    #[test]
    fn test_add_breakdown_and_clear() {
        let db = Database::open_in_memory(2).unwrap();
        let source = "def a():\n    pass\n\nclass B:\n    def c(self):\n        pass\n    def d(self):\n        pass\n";
        db.add_breakdown(&breakdown_source("x.py", source)).unwrap();

        let stats = db.get_stats().unwrap();
        assert_eq!((stats.files, stats.functions, stats.classes, stats.methods), (1, 1, 1, 2));

        db.clear().unwrap();
        let stats = db.get_stats().unwrap();
        assert_eq!((stats.files, stats.functions, stats.classes, stats.methods), (0, 0, 0, 0));
    }

    #[test]
    fn test_embedding_blob_round_trip() {
        let db = Database::open_in_memory(3).unwrap();
        let blob = db.encode_embedding(&[0.5, -1.25, 3.0]).unwrap();
        assert_eq!(decode_embedding(&blob), vec![0.5, -1.25, 3.0]);
    }
}
