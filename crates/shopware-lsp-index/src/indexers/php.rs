//! PHP class indexer.
//!
//! Tracks class/interface declarations with namespaces and use statements,
//! and builds the request context the dispatcher attaches to PHP requests.

use dashmap::DashMap;
use shopware_lsp_parser::{node_text, php};
use shopware_lsp_types::{PhpClass, PhpFileFacts};
use std::path::Path;
use tree_sitter::{Node, Tree};

use crate::fact_store::FactStore;
use crate::indexer::Indexer;
use crate::Result;

/// Language-specific context attached to requests in PHP documents.
///
/// Built from the indexed namespace/imports of the file so providers can
/// work with resolved FQNs instead of raw tokens.
#[derive(Debug, Clone, Default)]
pub struct PhpRequestContext {
    /// FQN of the class name under the cursor, if the cursor is on one.
    pub resolved_fqcn: Option<String>,
}

pub struct PhpIndexer {
    store: FactStore,
    files: DashMap<String, PhpFileFacts>,
}

impl PhpIndexer {
    pub fn new(cache_dir: &Path) -> Result<Self> {
        Self::with_store(FactStore::open(&cache_dir.join("php.index"))?)
    }

    pub fn in_memory() -> Result<Self> {
        Self::with_store(FactStore::in_memory()?)
    }

    fn with_store(store: FactStore) -> Result<Self> {
        let files = DashMap::new();
        for (path, facts) in store.load_all::<PhpFileFacts>()? {
            files.insert(path, facts);
        }
        Ok(PhpIndexer { store, files })
    }

    pub fn class_by_fqn(&self, fqn: &str) -> Option<PhpClass> {
        let fqn = fqn.trim_start_matches('\\');
        for entry in self.files.iter() {
            if let Some(class) = entry.value().classes.iter().find(|c| c.fqn == fqn) {
                return Some(class.clone());
            }
        }
        None
    }

    pub fn facts_for(&self, path: &str) -> Option<PhpFileFacts> {
        self.files.get(path).map(|entry| entry.value().clone())
    }

    /// Build the PHP request context for a node under the cursor.
    ///
    /// Name nodes resolve through the file's use statements and namespace.
    pub fn request_context(
        &self,
        path: &str,
        node: Option<Node<'_>>,
        content: &[u8],
    ) -> PhpRequestContext {
        let mut context = PhpRequestContext::default();
        let Some(node) = node else {
            return context;
        };

        let name_node = match node.kind() {
            "name" | "qualified_name" => Some(node),
            _ => node
                .parent()
                .filter(|p| p.kind() == "name" || p.kind() == "qualified_name"),
        };
        let Some(name_node) = name_node else {
            return context;
        };

        let raw = node_text(name_node, content);
        if raw.is_empty() {
            return context;
        }
        context.resolved_fqcn = Some(match self.facts_for(path) {
            Some(facts) => facts.resolve_name(raw),
            None => raw.trim_start_matches('\\').to_string(),
        });
        context
    }
}

impl Indexer for PhpIndexer {
    fn id(&self) -> &'static str {
        "php.index"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[".php"]
    }

    fn index_file(&self, path: &Path, tree: &Tree, content: &[u8]) -> Result<()> {
        let key = path.to_string_lossy().into_owned();
        let facts = php::extract_php_facts(tree.root_node(), content, &key);
        self.store.set(&key, &facts)?;
        self.files.insert(key, facts);
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
