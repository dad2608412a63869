//! Theme configuration indexer.
//!
//! Indexes config fields from Shopware `theme.json` files and SCSS variable
//! definitions from theme stylesheets.

use dashmap::DashMap;
use once_cell::sync::Lazy;
use regex::Regex;
use shopware_lsp_parser::{json, position::byte_to_position};
use shopware_lsp_types::ThemeConfigField;
use std::path::Path;
use tree_sitter::Tree;

use crate::fact_store::FactStore;
use crate::indexer::Indexer;
use crate::scanner::file_extension;
use crate::Result;

static SCSS_VARIABLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*(\$[\w-]+)\s*:\s*([^;]+);").unwrap());

pub struct ThemeIndexer {
    store: FactStore,
    files: DashMap<String, Vec<ThemeConfigField>>,
}

impl ThemeIndexer {
    pub fn new(cache_dir: &Path) -> Result<Self> {
        Self::with_store(FactStore::open(&cache_dir.join("theme.config"))?)
    }

    pub fn in_memory() -> Result<Self> {
        Self::with_store(FactStore::in_memory()?)
    }

    fn with_store(store: FactStore) -> Result<Self> {
        let files = DashMap::new();
        for (path, fields) in store.load_all::<Vec<ThemeConfigField>>()? {
            files.insert(path, fields);
        }
        Ok(ThemeIndexer { store, files })
    }

    pub fn all_fields(&self) -> Vec<ThemeConfigField> {
        let mut fields: Vec<ThemeConfigField> = self
            .files
            .iter()
            .flat_map(|entry| entry.value().clone())
            .collect();
        fields.sort_by(|a, b| a.name.cmp(&b.name));
        fields
    }

    pub fn field_by_name(&self, name: &str) -> Option<ThemeConfigField> {
        for entry in self.files.iter() {
            if let Some(field) = entry.value().iter().find(|f| f.name == name) {
                return Some(field.clone());
            }
        }
        None
    }
}

impl Indexer for ThemeIndexer {
    fn id(&self) -> &'static str {
        "theme.config"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[".json", ".scss"]
    }

    fn index_file(&self, path: &Path, tree: &Tree, content: &[u8]) -> Result<()> {
        let key = path.to_string_lossy().into_owned();
        let fields = match file_extension(path).as_deref() {
            Some(".json") => {
                if path.file_name().map(|n| n == "theme.json").unwrap_or(false) {
                    parse_theme_json(tree, content, &key)
                } else {
                    // Not a theme file; keep no facts for it.
                    self.store.remove(&key)?;
                    self.files.remove(&key);
                    return Ok(());
                }
            }
            Some(".scss") => parse_scss_variables(content, &key),
            _ => Vec::new(),
        };
        self.store.set(&key, &fields)?;
        self.files.insert(key, fields);
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

/// Fields from `{"config": {"fields": {"sw-color-brand-primary": {"type": "color"}}}}`.
fn parse_theme_json(tree: &Tree, content: &[u8], path: &str) -> Vec<ThemeConfigField> {
    let mut fields = Vec::new();
    let Some(root) = json::document_root(tree.root_node()) else {
        return fields;
    };
    let Some(config) = json::member(root, "config", content) else {
        return fields;
    };
    let Some(field_map) = json::member(config, "fields", content) else {
        return fields;
    };

    for member in json::object_members(field_map, content) {
        let field_type = json::member(member.value, "type", content)
            .and_then(|node| json::string_value(node, content));
        let start = member.key_node.start_position();
        fields.push(ThemeConfigField {
            name: member.key,
            field_type,
            path: path.to_string(),
            position: shopware_lsp_types::FilePosition::new(
                start.row as u32,
                start.column as u32,
            ),
        });
    }
    fields
}

/// SCSS variable definitions (`$sw-color-brand-primary: #008490;`).
///
/// SCSS variables are not valid CSS, so the parsed tree is not usable here;
/// they are collected lexically instead.
fn parse_scss_variables(content: &[u8], path: &str) -> Vec<ThemeConfigField> {
    let source = String::from_utf8_lossy(content);
    SCSS_VARIABLE_RE
        .captures_iter(&source)
        .map(|caps| {
            let name = caps.get(1).unwrap();
            ThemeConfigField {
                name: name.as_str().to_string(),
                field_type: None,
                path: path.to_string(),
                position: byte_to_position(source.as_bytes(), name.start()),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopware_lsp_parser::ParserPool;

    #[test]
    fn test_theme_json_fields() {
        let indexer = ThemeIndexer::in_memory().unwrap();
        let pool = ParserPool::new();
        let content = r##"{
    "name": "My Theme",
    "config": {
        "fields": {
            "sw-color-brand-primary": {
                "type": "color",
                "value": "#008490"
            },
            "sw-logo-desktop": {
                "type": "media"
            }
        }
    }
}"##;
        let tree = pool.parse(".json", content.as_bytes()).unwrap();
        indexer
            .index_file(Path::new("/theme/theme.json"), &tree, content.as_bytes())
            .unwrap();

        let fields = indexer.all_fields();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].name, "sw-color-brand-primary");
        assert_eq!(fields[0].field_type.as_deref(), Some("color"));
        assert_eq!(fields[0].position.line, 4);
        assert_eq!(fields[1].name, "sw-logo-desktop");
    }

    #[test]
    fn test_other_json_files_are_ignored() {
        let indexer = ThemeIndexer::in_memory().unwrap();
        let pool = ParserPool::new();
        let content = r#"{"config": {"fields": {"not-a-theme": {}}}}"#;
        let tree = pool.parse(".json", content.as_bytes()).unwrap();
        indexer
            .index_file(Path::new("/app/other.json"), &tree, content.as_bytes())
            .unwrap();

        assert!(indexer.all_fields().is_empty());
    }

    #[test]
    fn test_scss_variables() {
        let indexer = ThemeIndexer::in_memory().unwrap();
        let pool = ParserPool::new();
        let content = "$sw-color-brand-primary: #008490;\n.btn {\n    color: $sw-color-brand-primary;\n}\n$sw-font-family-base: 'Inter', sans-serif;\n";
        let tree = pool.parse(".scss", content.as_bytes()).unwrap();
        indexer
            .index_file(Path::new("/theme/base.scss"), &tree, content.as_bytes())
            .unwrap();

        let fields = indexer.all_fields();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].name, "$sw-color-brand-primary");
        assert_eq!(fields[1].name, "$sw-font-family-base");
        assert_eq!(indexer.field_by_name("$sw-font-family-base").unwrap().position.line, 4);
    }
}
