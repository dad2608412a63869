//! Hover providers.

use shopware_lsp_index::indexers::{ServiceIndexer, SnippetIndexer};
use shopware_lsp_parser::{node_text, twig, xml};
use std::sync::Arc;

use crate::{DocumentContext, HoverProvider};

/// Snippet keys hover as a locale → translation table.
pub struct SnippetHoverProvider {
    snippets: Arc<SnippetIndexer>,
}

impl SnippetHoverProvider {
    pub fn new(snippets: Arc<SnippetIndexer>) -> Self {
        SnippetHoverProvider { snippets }
    }
}

impl HoverProvider for SnippetHoverProvider {
    fn hover(&self, ctx: &DocumentContext<'_>) -> Option<String> {
        if ctx.extension != ".twig" {
            return None;
        }
        let occurrence = twig::trans_key_at(ctx.text, ctx.offset?)?;
        let translations = self.snippets.snippets_for_key(&occurrence.value);
        if translations.is_empty() {
            return None;
        }

        let mut content = format!("**{}**\n\n", occurrence.value);
        content.push_str("| Locale | Translation |\n|--------|-------------|\n");
        for snippet in translations {
            content.push_str(&format!("| {} | {} |\n", snippet.locale, snippet.text));
        }
        Some(content)
    }
}

/// Service argument ids hover with the resolved class and tags.
pub struct ServiceHoverProvider {
    services: Arc<ServiceIndexer>,
}

impl ServiceHoverProvider {
    pub fn new(services: Arc<ServiceIndexer>) -> Self {
        ServiceHoverProvider { services }
    }
}

impl HoverProvider for ServiceHoverProvider {
    fn hover(&self, ctx: &DocumentContext<'_>) -> Option<String> {
        if ctx.extension != ".xml" {
            return None;
        }
        let node = ctx.node?;
        if !xml::is_service_argument_reference(node, ctx.text) {
            return None;
        }

        let id = xml::unquote(node_text(node, ctx.text));
        let service = self.services.service_by_id(id)?;

        let mut content = format!("**{}**\n\nClass: `{}`\n", service.id, service.class);
        if !service.tags.is_empty() {
            content.push_str("\nTags:\n");
            for tag in &service.tags {
                content.push_str(&format!("- `{}`\n", tag));
            }
        }
        Some(content)
    }
}
