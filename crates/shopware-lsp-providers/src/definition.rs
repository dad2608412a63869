//! Go-to-definition providers.

use shopware_lsp_index::indexers::{PhpIndexer, RouteIndexer, ServiceIndexer, SnippetIndexer, TemplateIndexer};
use shopware_lsp_parser::{node_text, php, twig, xml};
use shopware_lsp_types::FilePosition;
use std::sync::Arc;
use tower_lsp::lsp_types::Location;

use crate::{location, DefinitionProvider, DocumentContext};

/// Service argument ids jump to the `<service>` definition; `class`
/// attributes jump to the PHP class.
pub struct ServiceDefinitionProvider {
    services: Arc<ServiceIndexer>,
    php: Arc<PhpIndexer>,
}

impl ServiceDefinitionProvider {
    pub fn new(services: Arc<ServiceIndexer>, php: Arc<PhpIndexer>) -> Self {
        ServiceDefinitionProvider { services, php }
    }
}

impl DefinitionProvider for ServiceDefinitionProvider {
    fn definitions(&self, ctx: &DocumentContext<'_>) -> Vec<Location> {
        if ctx.extension != ".xml" {
            return Vec::new();
        }
        let Some(node) = ctx.node else {
            return Vec::new();
        };

        if xml::is_service_argument_reference(node, ctx.text) {
            let id = xml::unquote(node_text(node, ctx.text));
            return self
                .services
                .service_by_id(id)
                .and_then(|service| location(&service.path, service.position))
                .into_iter()
                .collect();
        }

        if xml::is_service_id_attribute(node, ctx.text) {
            // The class attribute (or class-as-id) leads to the PHP class.
            let fqn = xml::unquote(node_text(node, ctx.text));
            return self
                .php
                .class_by_fqn(fqn)
                .and_then(|class| location(&class.path, class.position))
                .into_iter()
                .collect();
        }

        Vec::new()
    }
}

/// Route names (Twig helpers, `redirectToRoute`) jump to the controller.
pub struct RouteDefinitionProvider {
    routes: Arc<RouteIndexer>,
}

impl RouteDefinitionProvider {
    pub fn new(routes: Arc<RouteIndexer>) -> Self {
        RouteDefinitionProvider { routes }
    }

    fn route_location(&self, name: &str) -> Vec<Location> {
        self.routes
            .route_by_name(name)
            .and_then(|route| location(&route.path, route.position))
            .into_iter()
            .collect()
    }
}

impl DefinitionProvider for RouteDefinitionProvider {
    fn definitions(&self, ctx: &DocumentContext<'_>) -> Vec<Location> {
        match ctx.extension.as_str() {
            ".twig" => {
                let Some(offset) = ctx.offset else {
                    return Vec::new();
                };
                twig::route_name_at(ctx.text, offset)
                    .map(|occ| self.route_location(&occ.value))
                    .unwrap_or_default()
            }
            ".php" => {
                let Some(node) = ctx.node else {
                    return Vec::new();
                };
                if !php::in_method_call_argument(node, ctx.text, "redirectToRoute") {
                    return Vec::new();
                }
                let name = node_text(node, ctx.text)
                    .trim_matches(|c| c == '\'' || c == '"')
                    .to_string();
                self.route_location(&name)
            }
            _ => Vec::new(),
        }
    }
}

/// Snippet keys jump to every snippet file defining them.
pub struct SnippetDefinitionProvider {
    snippets: Arc<SnippetIndexer>,
}

impl SnippetDefinitionProvider {
    pub fn new(snippets: Arc<SnippetIndexer>) -> Self {
        SnippetDefinitionProvider { snippets }
    }
}

impl DefinitionProvider for SnippetDefinitionProvider {
    fn definitions(&self, ctx: &DocumentContext<'_>) -> Vec<Location> {
        if ctx.extension != ".twig" {
            return Vec::new();
        }
        let Some(offset) = ctx.offset else {
            return Vec::new();
        };
        let Some(occurrence) = twig::trans_key_at(ctx.text, offset) else {
            return Vec::new();
        };

        self.snippets
            .snippets_for_key(&occurrence.value)
            .into_iter()
            .filter_map(|snippet| location(&snippet.path, snippet.position))
            .collect()
    }
}

/// `{% sw_extends %}` / `{% extends %}` targets jump to the template file.
pub struct TemplateDefinitionProvider {
    templates: Arc<TemplateIndexer>,
}

impl TemplateDefinitionProvider {
    pub fn new(templates: Arc<TemplateIndexer>) -> Self {
        TemplateDefinitionProvider { templates }
    }
}

impl DefinitionProvider for TemplateDefinitionProvider {
    fn definitions(&self, ctx: &DocumentContext<'_>) -> Vec<Location> {
        if ctx.extension != ".twig" {
            return Vec::new();
        }
        let Some(offset) = ctx.offset else {
            return Vec::new();
        };
        let Some(target) = twig::extends_target_at(ctx.text, offset) else {
            return Vec::new();
        };

        self.templates
            .resolve_template(&target.value)
            .and_then(|path| location(&path, FilePosition::default()))
            .into_iter()
            .collect()
    }
}
