//! Diagnostics providers.

use serde_json::json;
use shopware_lsp_index::indexers::{services, ServiceIndexer, SnippetIndexer};
use shopware_lsp_parser::twig;
use std::sync::Arc;
use tower_lsp::lsp_types::{Diagnostic, DiagnosticSeverity, NumberOrString};

use crate::code_action::MISSING_SNIPPET_CODE;
use crate::{span, DiagnosticsProvider, DocumentContext};

const SOURCE: &str = "shopware-lsp";

/// Flags `|trans` keys that no indexed snippet file defines.
pub struct SnippetDiagnosticsProvider {
    snippets: Arc<SnippetIndexer>,
}

impl SnippetDiagnosticsProvider {
    pub fn new(snippets: Arc<SnippetIndexer>) -> Self {
        SnippetDiagnosticsProvider { snippets }
    }
}

impl DiagnosticsProvider for SnippetDiagnosticsProvider {
    fn diagnostics(&self, ctx: &DocumentContext<'_>) -> Vec<Diagnostic> {
        if ctx.extension != ".twig" {
            return Vec::new();
        }

        let known = self.snippets.known_keys();
        twig::trans_keys(ctx.text)
            .into_iter()
            .filter(|occurrence| !occurrence.value.is_empty())
            .filter(|occurrence| !known.contains(&occurrence.value))
            .map(|occurrence| Diagnostic {
                range: span(occurrence.position, occurrence.value.chars().count() as u32),
                severity: Some(DiagnosticSeverity::WARNING),
                code: Some(NumberOrString::String(MISSING_SNIPPET_CODE.to_string())),
                source: Some(SOURCE.to_string()),
                message: format!("Missing snippet key: {}", occurrence.value),
                data: Some(json!({"snippetText": occurrence.value})),
                ..Default::default()
            })
            .collect()
    }
}

/// Flags `<argument type="service">` references to unknown service ids.
pub struct ServiceDiagnosticsProvider {
    services: Arc<ServiceIndexer>,
}

impl ServiceDiagnosticsProvider {
    pub fn new(services: Arc<ServiceIndexer>) -> Self {
        ServiceDiagnosticsProvider { services }
    }
}

impl DiagnosticsProvider for ServiceDiagnosticsProvider {
    fn diagnostics(&self, ctx: &DocumentContext<'_>) -> Vec<Diagnostic> {
        if ctx.extension != ".xml" {
            return Vec::new();
        }
        let Some(root) = ctx.root else {
            return Vec::new();
        };

        let facts = services::parse_services_xml(root, ctx.text, ctx.path);
        let known = self.services.known_ids();

        facts
            .references
            .into_iter()
            .filter(|reference| !known.contains(&reference.id))
            .map(|reference| Diagnostic {
                // The recorded position is the quoted attribute value.
                range: span(reference.position, reference.id.chars().count() as u32 + 2),
                severity: Some(DiagnosticSeverity::WARNING),
                code: Some(NumberOrString::String("symfony.service.unknown".to_string())),
                source: Some(SOURCE.to_string()),
                message: format!("Unknown service: {}", reference.id),
                ..Default::default()
            })
            .collect()
    }
}
