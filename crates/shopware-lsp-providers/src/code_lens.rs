//! Code-lens providers.

use serde_json::json;
use shopware_lsp_index::indexers::TemplateIndexer;
use shopware_lsp_parser::twig;
use std::sync::Arc;
use tower_lsp::lsp_types::{CodeLens, Command};

use crate::{span, CodeLensProvider, DocumentContext};

/// A lens on every `{% block %}` showing how many templates declare the
/// same block. The count is filled in lazily on `codeLens/resolve`.
pub struct TwigBlockCodeLensProvider {
    templates: Arc<TemplateIndexer>,
}

impl TwigBlockCodeLensProvider {
    pub fn new(templates: Arc<TemplateIndexer>) -> Self {
        TwigBlockCodeLensProvider { templates }
    }
}

impl CodeLensProvider for TwigBlockCodeLensProvider {
    fn id(&self) -> &'static str {
        "twig.block"
    }

    fn code_lenses(&self, ctx: &DocumentContext<'_>) -> Vec<CodeLens> {
        if ctx.extension != ".twig" {
            return Vec::new();
        }

        // Extract from the live document text, not the on-disk index, so
        // unsaved edits are reflected.
        let facts = twig::extract_template_facts(ctx.text, ctx.path);
        facts
            .blocks
            .into_iter()
            .map(|block| CodeLens {
                range: span(block.position, block.name.chars().count() as u32),
                command: None,
                data: Some(json!({
                    "provider": self.id(),
                    "name": block.name,
                    "path": ctx.path,
                })),
            })
            .collect()
    }

    fn resolve(&self, mut lens: CodeLens) -> Option<CodeLens> {
        let data = lens.data.take()?;
        if data.get("provider").and_then(|p| p.as_str()) != Some(self.id()) {
            lens.data = Some(data);
            return None;
        }
        let name = data.get("name").and_then(|n| n.as_str())?;
        let path = data.get("path").and_then(|p| p.as_str()).unwrap_or_default();

        let declarations = self
            .templates
            .blocks_named(name)
            .into_iter()
            .filter(|block| block.path != path)
            .count();
        let title = match declarations {
            1 => "1 other template".to_string(),
            n => format!("{} other templates", n),
        };

        lens.command = Some(Command {
            title,
            command: String::new(),
            arguments: None,
        });
        Some(lens)
    }
}
