//! Completion providers: service ids, container parameters, route names,
//! snippet keys.

use shopware_lsp_index::indexers::{RouteIndexer, ServiceIndexer, SnippetIndexer};
use shopware_lsp_parser::{node_text, php, twig, xml};
use std::sync::Arc;
use tower_lsp::lsp_types::{CompletionItem, CompletionItemKind};

use crate::{CompletionProvider, DocumentContext};

/// Service ids inside `<argument type="service" id="...">` and container
/// parameters (`%name%`) inside argument bodies.
pub struct ServiceCompletionProvider {
    services: Arc<ServiceIndexer>,
}

impl ServiceCompletionProvider {
    pub fn new(services: Arc<ServiceIndexer>) -> Self {
        ServiceCompletionProvider { services }
    }

    fn service_items(&self) -> Vec<CompletionItem> {
        self.services
            .all_services()
            .into_iter()
            .map(|service| CompletionItem {
                label: service.id,
                kind: Some(CompletionItemKind::CLASS),
                detail: Some(service.class),
                ..Default::default()
            })
            .collect()
    }

    fn parameter_items(&self) -> Vec<CompletionItem> {
        self.services
            .parameters()
            .into_iter()
            .map(|parameter| CompletionItem {
                label: format!("%{}%", parameter.name),
                kind: Some(CompletionItemKind::VALUE),
                detail: Some(parameter.value),
                ..Default::default()
            })
            .collect()
    }
}

impl CompletionProvider for ServiceCompletionProvider {
    fn trigger_characters(&self) -> Vec<String> {
        vec!["\"".to_string(), "%".to_string()]
    }

    fn completions(&self, ctx: &DocumentContext<'_>) -> Vec<CompletionItem> {
        if ctx.extension != ".xml" {
            return Vec::new();
        }
        let Some(node) = ctx.node else {
            return Vec::new();
        };

        if xml::is_service_argument_reference(node, ctx.text) {
            return self.service_items();
        }

        // Parameter reference in argument element text: <argument>%shopware.
        if node.kind() == "CharData" || node.kind() == "ETag" {
            let parent = if node.kind() == "ETag" {
                node.parent()
            } else {
                node.parent().and_then(|content| content.parent())
            };
            let in_argument = parent
                .and_then(|element| xml::element_tag(element))
                .and_then(|tag| xml::first_node_of_kind(tag, "Name"))
                .map(|name| node_text(name, ctx.text) == "argument")
                .unwrap_or(false);
            if in_argument {
                return self.parameter_items();
            }
        }

        Vec::new()
    }
}

/// Route names inside `$this->redirectToRoute(...)` and the Twig `url()` /
/// `path()` / `seoUrl()` helpers.
pub struct RouteCompletionProvider {
    routes: Arc<RouteIndexer>,
}

impl RouteCompletionProvider {
    pub fn new(routes: Arc<RouteIndexer>) -> Self {
        RouteCompletionProvider { routes }
    }

    fn route_items(&self) -> Vec<CompletionItem> {
        self.routes
            .all_routes()
            .into_iter()
            .map(|route| CompletionItem {
                label: route.name,
                kind: Some(CompletionItemKind::REFERENCE),
                detail: Some(route.url_path),
                ..Default::default()
            })
            .collect()
    }
}

impl CompletionProvider for RouteCompletionProvider {
    fn trigger_characters(&self) -> Vec<String> {
        vec!["'".to_string()]
    }

    fn completions(&self, ctx: &DocumentContext<'_>) -> Vec<CompletionItem> {
        match ctx.extension.as_str() {
            ".php" => {
                let Some(node) = ctx.node else {
                    return Vec::new();
                };
                if php::in_method_call_argument(node, ctx.text, "redirectToRoute") {
                    self.route_items()
                } else {
                    Vec::new()
                }
            }
            ".twig" => {
                let Some(offset) = ctx.offset else {
                    return Vec::new();
                };
                if twig::in_route_call(ctx.text, offset)
                    || twig::route_name_at(ctx.text, offset).is_some()
                {
                    self.route_items()
                } else {
                    Vec::new()
                }
            }
            _ => Vec::new(),
        }
    }
}

/// Snippet keys inside Twig `|trans` strings.
pub struct SnippetCompletionProvider {
    snippets: Arc<SnippetIndexer>,
}

impl SnippetCompletionProvider {
    pub fn new(snippets: Arc<SnippetIndexer>) -> Self {
        SnippetCompletionProvider { snippets }
    }
}

impl CompletionProvider for SnippetCompletionProvider {
    fn trigger_characters(&self) -> Vec<String> {
        vec!["'".to_string()]
    }

    fn completions(&self, ctx: &DocumentContext<'_>) -> Vec<CompletionItem> {
        if ctx.extension != ".twig" {
            return Vec::new();
        }
        let Some(offset) = ctx.offset else {
            return Vec::new();
        };
        if !twig::in_trans_context(ctx.text, offset) {
            return Vec::new();
        }

        self.snippets
            .all_keys()
            .into_iter()
            .map(|key| {
                let translations = self.snippets.snippets_for_key(&key);
                CompletionItem {
                    label: key,
                    kind: Some(CompletionItemKind::TEXT),
                    detail: translations.first().map(|s| s.text.clone()),
                    ..Default::default()
                }
            })
            .collect()
    }
}
