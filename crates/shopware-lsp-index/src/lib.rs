//! Workspace indexing engine for shopware-lsp.
//!
//! The scanner walks the workspace, hashes file contents, and dispatches
//! changed files to the registered domain indexers. Hashes and indexer facts
//! persist under the server cache directory, so an unchanged workspace costs
//! one hash pass and zero parses on restart.

pub mod fact_store;
pub mod hash_store;
pub mod indexer;
pub mod indexers;
pub mod scanner;
pub mod tree_cache;

pub use fact_store::FactStore;
pub use hash_store::{content_hash, HashStore};
pub use indexer::Indexer;
pub use scanner::FileScanner;
pub use tree_cache::TreeCache;

/// Errors produced by the indexing engine.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("invalid exclusion pattern: {0}")]
    Glob(#[from] globset::Error),

    #[error("file watcher error: {0}")]
    Watch(#[from] notify::Error),

    #[error("worker pool error: {0}")]
    Pool(String),

    #[error("parse failure: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, IndexError>;
