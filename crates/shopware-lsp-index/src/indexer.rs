//! The contract every domain indexer implements.

use std::path::Path;
use tree_sitter::Tree;

use crate::Result;

/// A consumer of parsed files that maintains its own queryable index.
///
/// Implementations must be internally thread-safe: the scanner invokes
/// `index_file` from parallel workers (serialised per path), and providers
/// read query methods while scans are writing.
pub trait Indexer: Send + Sync {
    /// Stable id, unique across the registry (e.g. "symfony.service").
    fn id(&self) -> &'static str;

    /// Lowercase file extensions (with leading dot) this indexer consumes.
    fn extensions(&self) -> &'static [&'static str];

    /// Index one file. Must be idempotent for identical (path, content) and
    /// must replace any facts previously attributed to `path`.
    fn index_file(&self, path: &Path, tree: &Tree, content: &[u8]) -> Result<()>;

    /// Drop every fact attributed to `path`. No-op for unknown paths.
    fn remove_file(&self, path: &Path) -> Result<()>;

    /// Flush and release resources. No other method is called afterwards.
    fn close(&self) -> Result<()>;
}
