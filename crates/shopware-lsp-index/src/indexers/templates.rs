//! Twig template indexer.
//!
//! Records `{% block %}` declarations and `{% extends %}` / `{% sw_extends %}`
//! references per template.

use dashmap::DashMap;
use shopware_lsp_parser::twig;
use shopware_lsp_types::{TemplateFileFacts, TemplateReference, TwigBlock};
use std::path::Path;
use tree_sitter::Tree;

use crate::fact_store::FactStore;
use crate::indexer::Indexer;
use crate::Result;

pub struct TemplateIndexer {
    store: FactStore,
    files: DashMap<String, TemplateFileFacts>,
}

impl TemplateIndexer {
    pub fn new(cache_dir: &Path) -> Result<Self> {
        Self::with_store(FactStore::open(&cache_dir.join("twig.template"))?)
    }

    pub fn in_memory() -> Result<Self> {
        Self::with_store(FactStore::in_memory()?)
    }

    fn with_store(store: FactStore) -> Result<Self> {
        let files = DashMap::new();
        for (path, facts) in store.load_all::<TemplateFileFacts>()? {
            files.insert(path, facts);
        }
        Ok(TemplateIndexer { store, files })
    }

    /// Every block declaration with the given name, across all templates.
    pub fn blocks_named(&self, name: &str) -> Vec<TwigBlock> {
        self.files
            .iter()
            .flat_map(|entry| {
                entry
                    .value()
                    .blocks
                    .iter()
                    .filter(|b| b.name == name)
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    pub fn blocks_in(&self, path: &str) -> Vec<TwigBlock> {
        self.files
            .get(path)
            .map(|entry| entry.value().blocks.clone())
            .unwrap_or_default()
    }

    pub fn extends_in(&self, path: &str) -> Vec<TemplateReference> {
        self.files
            .get(path)
            .map(|entry| entry.value().extends.clone())
            .unwrap_or_default()
    }

    /// Resolve a template reference like `@Storefront/storefront/base.html.twig`
    /// to an indexed file path by suffix match.
    pub fn resolve_template(&self, target: &str) -> Option<String> {
        let suffix = target.trim_start_matches('@');
        let suffix = suffix
            .split_once('/')
            .map(|(_, rest)| rest)
            .unwrap_or(suffix);
        self.files
            .iter()
            .map(|entry| entry.key().clone())
            .find(|path| path.replace('\\', "/").ends_with(suffix))
    }
}

impl Indexer for TemplateIndexer {
    fn id(&self) -> &'static str {
        "twig.template"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[".twig"]
    }

    fn index_file(&self, path: &Path, _tree: &Tree, content: &[u8]) -> Result<()> {
        let key = path.to_string_lossy().into_owned();
        let facts = twig::extract_template_facts(content, &key);
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

#[cfg(test)]
mod tests {
    use super::*;
    use shopware_lsp_parser::ParserPool;

    fn index(indexer: &TemplateIndexer, path: &str, content: &str) {
        let pool = ParserPool::new();
        let tree = pool.parse(".twig", content.as_bytes()).unwrap();
        indexer
            .index_file(Path::new(path), &tree, content.as_bytes())
            .unwrap();
    }

    #[test]
    fn test_blocks_and_extends() {
        let indexer = TemplateIndexer::in_memory().unwrap();
        index(
            &indexer,
            "/theme/storefront/base.html.twig",
            "{% block base_main %}{% endblock %}",
        );
        index(
            &indexer,
            "/plugin/storefront/page.html.twig",
            "{% sw_extends '@Storefront/storefront/base.html.twig' %}\n{% block base_main %}override{% endblock %}",
        );

        assert_eq!(indexer.blocks_named("base_main").len(), 2);
        assert_eq!(indexer.blocks_in("/plugin/storefront/page.html.twig").len(), 1);

        let extends = indexer.extends_in("/plugin/storefront/page.html.twig");
        assert_eq!(extends.len(), 1);
        assert_eq!(extends[0].target, "@Storefront/storefront/base.html.twig");
    }

    #[test]
    fn test_resolve_template_by_suffix() {
        let indexer = TemplateIndexer::in_memory().unwrap();
        index(
            &indexer,
            "/theme/Resources/views/storefront/base.html.twig",
            "{% block base_main %}{% endblock %}",
        );

        assert_eq!(
            indexer.resolve_template("@Storefront/storefront/base.html.twig"),
            Some("/theme/Resources/views/storefront/base.html.twig".to_string())
        );
        assert_eq!(indexer.resolve_template("@Storefront/missing.html.twig"), None);
    }

    #[test]
    fn test_umlaut_block_names_survive_round_trip() {
        let indexer = TemplateIndexer::in_memory().unwrap();
        index(
            &indexer,
            "/tpl.twig",
            "{% block grüße %}{% endblock %}",
        );

        let blocks = indexer.blocks_named("grüße");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].position.character, 9);
    }
}
