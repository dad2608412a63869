//! Workspace command providers.

use serde_json::{json, Map, Value};
use shopware_lsp_index::indexers::SnippetIndexer;
use shopware_lsp_index::FileScanner;
use std::path::PathBuf;
use std::sync::Arc;

use crate::CommandProvider;

pub const CREATE_SNIPPET_COMMAND: &str = "shopware/snippet.create";

/// Creates a snippet key in every indexed snippet file.
///
/// Arguments: `[key]`. Existing translations are left untouched; missing
/// keys are inserted with an empty string, then the touched files are
/// re-indexed.
pub struct SnippetCommandProvider {
    snippets: Arc<SnippetIndexer>,
    scanner: Arc<FileScanner>,
}

impl SnippetCommandProvider {
    pub fn new(snippets: Arc<SnippetIndexer>, scanner: Arc<FileScanner>) -> Self {
        SnippetCommandProvider { snippets, scanner }
    }

    fn create_snippet(&self, key: &str) -> Value {
        let mut touched = Vec::new();
        for file in self.snippets.snippet_files() {
            match insert_key_into_file(&file, key) {
                Ok(true) => touched.push(PathBuf::from(file)),
                Ok(false) => {}
                Err(err) => tracing::warn!("updating snippet file {} failed: {}", file, err),
            }
        }

        if !touched.is_empty() {
            if let Err(err) = self.scanner.index_files(&touched) {
                tracing::warn!("re-indexing snippet files failed: {}", err);
            }
        }

        json!({"key": key, "updatedFiles": touched.len()})
    }
}

impl CommandProvider for SnippetCommandProvider {
    fn commands(&self) -> Vec<String> {
        vec![CREATE_SNIPPET_COMMAND.to_string()]
    }

    fn execute(&self, command: &str, arguments: &[Value]) -> Option<Value> {
        if command != CREATE_SNIPPET_COMMAND {
            return None;
        }
        let key = arguments.first().and_then(|arg| arg.as_str())?;
        if key.is_empty() {
            return None;
        }
        Some(self.create_snippet(key))
    }
}

/// Insert a dot-joined key with an empty value into a snippet JSON file.
/// Returns whether the file changed.
fn insert_key_into_file(path: &str, key: &str) -> std::io::Result<bool> {
    let content = std::fs::read_to_string(path)?;
    let mut document: Value = serde_json::from_str(&content).unwrap_or_else(|_| json!({}));

    if !insert_key(&mut document, key) {
        return Ok(false);
    }

    let pretty = serde_json::to_string_pretty(&document)?;
    std::fs::write(path, pretty + "\n")?;
    Ok(true)
}

/// Walk/create nested objects along the key path; insert `""` at the leaf
/// if absent. Returns whether anything was inserted.
fn insert_key(document: &mut Value, key: &str) -> bool {
    if !document.is_object() {
        *document = Value::Object(Map::new());
    }

    let mut current = document;
    let segments: Vec<&str> = key.split('.').collect();
    for (i, segment) in segments.iter().enumerate() {
        let object = current.as_object_mut().expect("object ensured above");
        if i == segments.len() - 1 {
            if object.contains_key(*segment) {
                return false;
            }
            object.insert(segment.to_string(), json!(""));
            return true;
        }
        let entry = object
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            // A scalar sits where the path needs an object; leave it alone.
            return false;
        }
        current = entry;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::index_file;
    use shopware_lsp_index::HashStore;
    use shopware_lsp_parser::ParserPool;

    #[test]
    fn test_insert_key_nested() {
        let mut document = json!({"cart": {"title": "Warenkorb"}});
        assert!(insert_key(&mut document, "cart.subtitle"));
        assert_eq!(document["cart"]["subtitle"], "");
        assert_eq!(document["cart"]["title"], "Warenkorb");
    }

    #[test]
    fn test_insert_key_existing_is_untouched() {
        let mut document = json!({"cart": {"title": "Warenkorb"}});
        assert!(!insert_key(&mut document, "cart.title"));
        assert_eq!(document["cart"]["title"], "Warenkorb");
    }

    #[test]
    fn test_insert_key_through_scalar_fails() {
        let mut document = json!({"cart": "oops"});
        assert!(!insert_key(&mut document, "cart.title"));
    }

    #[test]
    fn test_create_snippet_command_updates_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let snippet_dir = dir.path().join("snippet/de-DE");
        std::fs::create_dir_all(&snippet_dir).unwrap();
        let file = snippet_dir.join("storefront.json");
        std::fs::write(&file, r#"{"cart": {"title": "Warenkorb"}}"#).unwrap();

        let snippets = Arc::new(SnippetIndexer::in_memory().unwrap());
        index_file(
            snippets.as_ref(),
            file.to_str().unwrap(),
            ".json",
            r#"{"cart": {"title": "Warenkorb"}}"#,
        );

        let scanner = Arc::new(
            FileScanner::new(Arc::new(ParserPool::new()), HashStore::in_memory().unwrap())
                .unwrap(),
        );
        scanner.add_indexer(snippets.clone());
        scanner.set_root(dir.path().to_path_buf());

        let provider = SnippetCommandProvider::new(snippets.clone(), scanner);
        let result = provider
            .execute(CREATE_SNIPPET_COMMAND, &[json!("cart.subtitle")])
            .unwrap();

        assert_eq!(result["updatedFiles"], 1);
        let written: Value =
            serde_json::from_str(&std::fs::read_to_string(&file).unwrap()).unwrap();
        assert_eq!(written["cart"]["subtitle"], "");
        // The re-index picked the new key up.
        assert!(snippets.known_keys().contains("cart.subtitle"));
    }

    #[test]
    fn test_unknown_command_is_ignored() {
        let snippets = Arc::new(SnippetIndexer::in_memory().unwrap());
        let scanner = Arc::new(
            FileScanner::new(Arc::new(ParserPool::new()), HashStore::in_memory().unwrap())
                .unwrap(),
        );
        let provider = SnippetCommandProvider::new(snippets, scanner);
        assert!(provider.execute("shopware/other", &[json!("x")]).is_none());
    }
}
