//! codebase-analysis - Retrieval-augmented question answering over source code
//!
//! This library splits source files into functions, classes and methods,
//! enriches them with LLM summaries and embeddings, stores them in SQLite,
//! and answers questions with numbered references back into the code.

pub mod cli;
pub mod extract;
pub mod llm;
pub mod pipeline;
pub mod repo;
pub mod retrieval;
pub mod storage;

/// Re-export commonly used types
pub use extract::{FileBreakdown, SourceUnit, UnitKind};
pub use pipeline::Orchestrator;
pub use repo::AppConfig;
pub use retrieval::{Answer, Candidate, CandidateSet, CitationFormatter};
pub use storage::Database;

/// Application-wide error type
pub use anyhow::Result;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_NAME: &str = "codebase-analysis";
