//! Scan-local parse cache.
//!
//! Lives for the duration of one scan so every indexer interested in a file
//! shares a single parse. The first consumer triggers the parse; the cache
//! is dropped with the scan.

use dashmap::DashMap;
use shopware_lsp_parser::ParserPool;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tree_sitter::Tree;

/// A parsed file held for the duration of a scan.
pub struct ParsedFile {
    pub tree: Tree,
    pub content: Vec<u8>,
}

/// Transient `path → parsed file` map owned by the scanner.
#[derive(Default)]
pub struct TreeCache {
    entries: DashMap<PathBuf, Arc<ParsedFile>>,
}

impl TreeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `content` with the pool parser for `extension`, or reuse the
    /// tree from an earlier consumer of the same path. `None` when the
    /// extension has no parser or the parse fails.
    pub fn get_or_parse(
        &self,
        pool: &ParserPool,
        path: &Path,
        extension: &str,
        content: &[u8],
    ) -> Option<Arc<ParsedFile>> {
        if let Some(hit) = self.entries.get(path) {
            return Some(hit.value().clone());
        }
        let tree = pool.parse(extension, content)?;
        let parsed = Arc::new(ParsedFile {
            tree,
            content: content.to_vec(),
        });
        self.entries.insert(path.to_path_buf(), parsed.clone());
        Some(parsed)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_lookup_reuses_parse() {
        let pool = ParserPool::new();
        let cache = TreeCache::new();
        let path = Path::new("/workspace/services.xml");

        let first = cache
            .get_or_parse(&pool, path, ".xml", b"<container/>")
            .unwrap();
        let second = cache
            .get_or_parse(&pool, path, ".xml", b"<ignored/>")
            .unwrap();

        // Same Arc: the second consumer saw the first parse.
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_unknown_extension_is_not_cached() {
        let pool = ParserPool::new();
        let cache = TreeCache::new();
        assert!(cache
            .get_or_parse(&pool, Path::new("/a.rs"), ".rs", b"fn main() {}")
            .is_none());
        assert!(cache.is_empty());
    }
}
