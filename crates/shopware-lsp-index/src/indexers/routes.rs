//! Symfony route indexer.
//!
//! Collects routes from PHP `#[Route]` attributes on controllers and from
//! Symfony routing YAML files.

use dashmap::DashMap;
use shopware_lsp_parser::{node_text, php};
use shopware_lsp_types::{FilePosition, Route};
use std::path::Path;
use tree_sitter::{Node, Tree};

use crate::fact_store::FactStore;
use crate::indexer::Indexer;
use crate::scanner::file_extension;
use crate::Result;

pub struct RouteIndexer {
    store: FactStore,
    files: DashMap<String, Vec<Route>>,
}

impl RouteIndexer {
    pub fn new(cache_dir: &Path) -> Result<Self> {
        Self::with_store(FactStore::open(&cache_dir.join("symfony.route"))?)
    }

    pub fn in_memory() -> Result<Self> {
        Self::with_store(FactStore::in_memory()?)
    }

    fn with_store(store: FactStore) -> Result<Self> {
        let files = DashMap::new();
        for (path, routes) in store.load_all::<Vec<Route>>()? {
            files.insert(path, routes);
        }
        Ok(RouteIndexer { store, files })
    }

    pub fn all_routes(&self) -> Vec<Route> {
        let mut routes: Vec<Route> = self
            .files
            .iter()
            .flat_map(|entry| entry.value().clone())
            .collect();
        routes.sort_by(|a, b| a.name.cmp(&b.name));
        routes
    }

    pub fn route_by_name(&self, name: &str) -> Option<Route> {
        for entry in self.files.iter() {
            if let Some(route) = entry.value().iter().find(|r| r.name == name) {
                return Some(route.clone());
            }
        }
        None
    }
}

impl Indexer for RouteIndexer {
    fn id(&self) -> &'static str {
        "symfony.route"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[".php", ".yaml", ".yml"]
    }

    fn index_file(&self, path: &Path, tree: &Tree, content: &[u8]) -> Result<()> {
        let key = path.to_string_lossy().into_owned();
        let routes = match file_extension(path).as_deref() {
            Some(".php") => php::extract_routes(tree.root_node(), content, &key),
            Some(".yaml") | Some(".yml") => parse_yaml_routes(tree.root_node(), content, &key),
            _ => Vec::new(),
        };
        self.store.set(&key, &routes)?;
        self.files.insert(key, routes);
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

/// Extract routes from a Symfony routing YAML file:
///
/// ```yaml
/// frontend.home.page:
///     path: /
///     controller: App\Controller\HomeController::index
/// ```
///
/// Only top-level mappings whose value carries a `path` key are routes;
/// anything else (service definitions, arbitrary config) is ignored.
pub fn parse_yaml_routes(root: Node<'_>, content: &[u8], path: &str) -> Vec<Route> {
    let mut routes = Vec::new();

    for (key_node, value_node) in top_level_mapping_pairs(root) {
        let name = scalar_text(key_node, content);
        if name.is_empty() {
            continue;
        }
        let Some(url_path) = mapping_value(value_node, "path", content) else {
            continue;
        };
        let controller = mapping_value(value_node, "controller", content).unwrap_or_default();
        let start = key_node.start_position();
        routes.push(Route {
            name,
            url_path,
            controller,
            path: path.to_string(),
            position: FilePosition::new(start.row as u32, start.column as u32),
        });
    }

    routes
}

/// Key/value nodes of the top-level block mapping of a YAML document.
fn top_level_mapping_pairs<'t>(root: Node<'t>) -> Vec<(Node<'t>, Node<'t>)> {
    let mut pairs = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        match node.kind() {
            "block_mapping_pair" => {
                if let (Some(key), Some(value)) = (
                    node.child_by_field_name("key"),
                    node.child_by_field_name("value"),
                ) {
                    pairs.push((key, value));
                }
            }
            "stream" | "document" | "block_node" | "block_mapping" => {
                for i in (0..node.named_child_count()).rev() {
                    if let Some(child) = node.named_child(i) {
                        stack.push(child);
                    }
                }
            }
            _ => {}
        }
    }
    pairs
}

/// The scalar value of `key` inside a nested block mapping.
fn mapping_value(value_node: Node<'_>, key: &str, content: &[u8]) -> Option<String> {
    for (k, v) in top_level_mapping_pairs(value_node) {
        if scalar_text(k, content) == key {
            let text = scalar_text(v, content);
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

fn scalar_text(node: Node<'_>, content: &[u8]) -> String {
    node_text(node, content)
        .trim()
        .trim_matches(|c| c == '\'' || c == '"')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopware_lsp_parser::ParserPool;

    #[test]
    fn test_php_routes_are_indexed() {
        let indexer = RouteIndexer::in_memory().unwrap();
        let pool = ParserPool::new();
        let source = r#"<?php
namespace Shopware\Storefront\Controller;

class WishlistController
{
    #[Route(path: '/wishlist', name: 'frontend.wishlist.page')]
    public function index(): void
    {
    }
}
"#;
        let tree = pool.parse(".php", source.as_bytes()).unwrap();
        indexer
            .index_file(Path::new("/src/WishlistController.php"), &tree, source.as_bytes())
            .unwrap();

        let route = indexer.route_by_name("frontend.wishlist.page").unwrap();
        assert_eq!(route.url_path, "/wishlist");
        assert_eq!(
            route.controller,
            "Shopware\\Storefront\\Controller\\WishlistController::index"
        );
    }

    #[test]
    fn test_yaml_routes_are_indexed() {
        let indexer = RouteIndexer::in_memory().unwrap();
        let pool = ParserPool::new();
        let source = "frontend.home.page:\n    path: /\n    controller: App\\Controller\\HomeController::index\n\nnot_a_route:\n    foo: bar\n";
        let tree = pool.parse(".yaml", source.as_bytes()).unwrap();
        indexer
            .index_file(Path::new("/config/routes.yaml"), &tree, source.as_bytes())
            .unwrap();

        let routes = indexer.all_routes();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].name, "frontend.home.page");
        assert_eq!(routes[0].url_path, "/");
        assert_eq!(routes[0].controller, "App\\Controller\\HomeController::index");
    }

    #[test]
    fn test_remove_file_drops_routes() {
        let indexer = RouteIndexer::in_memory().unwrap();
        let pool = ParserPool::new();
        let source = "home:\n    path: /home\n";
        let tree = pool.parse(".yaml", source.as_bytes()).unwrap();
        let path = Path::new("/config/routes.yaml");

        indexer.index_file(path, &tree, source.as_bytes()).unwrap();
        assert_eq!(indexer.all_routes().len(), 1);

        indexer.remove_file(path).unwrap();
        assert!(indexer.all_routes().is_empty());
    }
}
