//! Snippet JSON indexer.
//!
//! Flattens nested snippet JSON files into dot-joined keys and derives the
//! locale from the file path (filename first, then directories).

use dashmap::DashMap;
use once_cell::sync::Lazy;
use regex::Regex;
use shopware_lsp_parser::json;
use shopware_lsp_types::{FilePosition, Snippet};
use std::collections::HashSet;
use std::path::Path;
use tree_sitter::{Node, Tree};

use crate::fact_store::FactStore;
use crate::indexer::Indexer;
use crate::Result;

pub struct SnippetIndexer {
    store: FactStore,
    files: DashMap<String, Vec<Snippet>>,
}

impl SnippetIndexer {
    pub fn new(cache_dir: &Path) -> Result<Self> {
        Self::with_store(FactStore::open(&cache_dir.join("snippet.indexer"))?)
    }

    pub fn in_memory() -> Result<Self> {
        Self::with_store(FactStore::in_memory()?)
    }

    fn with_store(store: FactStore) -> Result<Self> {
        let files = DashMap::new();
        for (path, snippets) in store.load_all::<Vec<Snippet>>()? {
            files.insert(path, snippets);
        }
        Ok(SnippetIndexer { store, files })
    }

    /// Translations for one key across every indexed locale.
    pub fn snippets_for_key(&self, key: &str) -> Vec<Snippet> {
        let mut found: Vec<Snippet> = self
            .files
            .iter()
            .flat_map(|entry| {
                entry
                    .value()
                    .iter()
                    .filter(|s| s.key == key)
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect();
        found.sort_by(|a, b| a.locale.cmp(&b.locale));
        found
    }

    pub fn known_keys(&self) -> HashSet<String> {
        self.files
            .iter()
            .flat_map(|entry| entry.value().iter().map(|s| s.key.clone()).collect::<Vec<_>>())
            .collect()
    }

    /// All keys, deduplicated and sorted, for completion.
    pub fn all_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.known_keys().into_iter().collect();
        keys.sort();
        keys
    }

    /// Paths of every indexed snippet file.
    pub fn snippet_files(&self) -> Vec<String> {
        let mut files: Vec<String> = self.files.iter().map(|entry| entry.key().clone()).collect();
        files.sort();
        files
    }
}

impl Indexer for SnippetIndexer {
    fn id(&self) -> &'static str {
        "snippet.indexer"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[".json"]
    }

    fn index_file(&self, path: &Path, tree: &Tree, content: &[u8]) -> Result<()> {
        let key = path.to_string_lossy().into_owned();
        if !is_snippet_file(&key) {
            return Ok(());
        }

        let locale = locale_from_path(&key);
        let mut snippets = Vec::new();
        if let Some(root) = json::document_root(tree.root_node()) {
            flatten(root, content, "", &locale, &key, &mut snippets);
        }

        self.store.set(&key, &snippets)?;
        self.files.insert(key, snippets);
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        let key = path.to_string_lossy().into_owned();
        self.store.remove(&key)?;
        self.files.remove(&key);
        Ok(())
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Snippet files live under a `snippet` directory segment.
pub fn is_snippet_file(path: &str) -> bool {
    path.replace('\\', "/")
        .split('/')
        .any(|component| component.eq_ignore_ascii_case("snippet"))
}

fn flatten(
    node: Node<'_>,
    content: &[u8],
    prefix: &str,
    locale: &str,
    path: &str,
    snippets: &mut Vec<Snippet>,
) {
    for member in json::object_members(node, content) {
        let key = if prefix.is_empty() {
            member.key.clone()
        } else {
            format!("{}.{}", prefix, member.key)
        };

        match member.value.kind() {
            "object" => flatten(member.value, content, &key, locale, path, snippets),
            "string" => {
                let start = member.key_node.start_position();
                snippets.push(Snippet {
                    key,
                    text: json::string_value(member.value, content).unwrap_or_default(),
                    locale: locale.to_string(),
                    path: path.to_string(),
                    position: FilePosition::new(start.row as u32, start.column as u32),
                });
            }
            _ => {}
        }
    }
}

static LOCALE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9]{2}([-_][A-Za-z0-9]{2})?$").unwrap());

/// Whether a path segment looks like a locale code ("de", "de-DE", "en_GB").
pub fn is_locale_pattern(segment: &str) -> bool {
    LOCALE_RE.is_match(segment)
}

/// Normalise a locale to dash separators ("de_DE" → "de-DE").
pub fn normalize_locale(locale: &str) -> String {
    locale.replace('_', "-")
}

/// Derive the locale from a snippet file path.
///
/// Filename parts win over directory names; directories are searched from
/// the innermost outwards. Unknown paths yield "unknown".
pub fn locale_from_path(path: &str) -> String {
    let normalized = path.replace('\\', "/");
    let mut components: Vec<&str> = normalized.split('/').filter(|c| !c.is_empty()).collect();
    let filename = components.pop().unwrap_or_default();

    // All dot-separated filename parts except the extension.
    let parts: Vec<&str> = filename.split('.').collect();
    for part in &parts[..parts.len().saturating_sub(1)] {
        if is_locale_pattern(part) {
            return normalize_locale(part);
        }
    }

    for component in components.iter().rev() {
        if is_locale_pattern(component) {
            return normalize_locale(component);
        }
    }

    "unknown".to_string()
}
