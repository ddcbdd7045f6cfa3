//! Database schema definition

/// SQL schema for the unit store
///
/// Embeddings are little-endian `f32` BLOBs. Their length is fixed per
/// database by the `embedding_dimension` setting.
pub const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

-- Store-wide settings
CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

-- Indexed source files
CREATE TABLE IF NOT EXISTS files (
    id INTEGER PRIMARY KEY,
    path TEXT NOT NULL
);

-- Top-level functions
CREATE TABLE IF NOT EXISTS functions (
    id INTEGER PRIMARY KEY,
    file_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    code TEXT NOT NULL,
    summary TEXT,
    embedding BLOB,
    FOREIGN KEY (file_id) REFERENCES files(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_functions_file ON functions(file_id);

-- Top-level classes
CREATE TABLE IF NOT EXISTS classes (
    id INTEGER PRIMARY KEY,
    file_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    code TEXT NOT NULL,
    summary TEXT,
    embedding BLOB,
    FOREIGN KEY (file_id) REFERENCES files(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_classes_file ON classes(file_id);

-- Methods, owned by a class
CREATE TABLE IF NOT EXISTS methods (
    id INTEGER PRIMARY KEY,
    class_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    code TEXT NOT NULL,
    summary TEXT,
    embedding BLOB,
    FOREIGN KEY (class_id) REFERENCES classes(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_methods_class ON methods(class_id);
"#;

/// Settings key holding the embedding dimension
pub const DIMENSION_KEY: &str = "embedding_dimension";
