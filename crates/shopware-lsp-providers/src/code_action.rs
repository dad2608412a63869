//! Code-action providers.

use serde_json::json;
use shopware_lsp_parser::position::position_to_byte;
use tower_lsp::lsp_types::{
    CodeAction, CodeActionKind, CodeActionOrCommand, CodeActionParams, Command,
};

use crate::{CodeActionProvider, DocumentContext};

/// Diagnostic code attached to unresolved snippet keys.
pub const MISSING_SNIPPET_CODE: &str = "frontend.snippet.missing";

/// Snippet quick fixes in Twig templates: insert a snippet, create one from
/// the selection, or create a missing key reported by diagnostics.
pub struct SnippetCodeActionProvider;

impl SnippetCodeActionProvider {
    pub fn new() -> Self {
        SnippetCodeActionProvider
    }

    fn selected_text(ctx: &DocumentContext<'_>, params: &CodeActionParams) -> Option<String> {
        let start = position_to_byte(
            ctx.text,
            params.range.start.line,
            params.range.start.character,
        )?;
        let end = position_to_byte(ctx.text, params.range.end.line, params.range.end.character)?;
        if start >= end || end > ctx.text.len() {
            return None;
        }
        Some(String::from_utf8_lossy(&ctx.text[start..end]).into_owned())
    }
}

impl Default for SnippetCodeActionProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeActionProvider for SnippetCodeActionProvider {
    fn kinds(&self) -> Vec<CodeActionKind> {
        vec![CodeActionKind::QUICKFIX]
    }

    fn code_actions(
        &self,
        ctx: &DocumentContext<'_>,
        params: &CodeActionParams,
    ) -> Vec<CodeActionOrCommand> {
        if ctx.extension != ".twig" {
            return Vec::new();
        }

        let mut actions = Vec::new();
        let empty_selection = params.range.start == params.range.end;

        if empty_selection {
            actions.push(CodeActionOrCommand::CodeAction(CodeAction {
                title: "Insert Snippet".to_string(),
                kind: Some(CodeActionKind::QUICKFIX),
                command: Some(Command {
                    title: "Insert Snippet".to_string(),
                    command: "shopware.insertSnippet".to_string(),
                    arguments: None,
                }),
                ..Default::default()
            }));
        } else if let Some(selected) = Self::selected_text(ctx, params) {
            actions.push(CodeActionOrCommand::CodeAction(CodeAction {
                title: "Create snippet from selection".to_string(),
                kind: Some(CodeActionKind::QUICKFIX),
                command: Some(Command {
                    title: "Create Snippet from Selection".to_string(),
                    command: "shopware.createSnippetFromSelection".to_string(),
                    arguments: Some(vec![json!(ctx.uri), json!(selected)]),
                }),
                ..Default::default()
            }));
        }

        for diagnostic in &params.context.diagnostics {
            let is_missing_snippet = matches!(
                &diagnostic.code,
                Some(tower_lsp::lsp_types::NumberOrString::String(code))
                    if code == MISSING_SNIPPET_CODE
            );
            if !is_missing_snippet {
                continue;
            }
            let Some(key) = diagnostic
                .data
                .as_ref()
                .and_then(|data| data.get("snippetText"))
                .and_then(|key| key.as_str())
            else {
                continue;
            };

            actions.push(CodeActionOrCommand::CodeAction(CodeAction {
                title: format!("Create snippet {}", key),
                kind: Some(CodeActionKind::QUICKFIX),
                diagnostics: Some(vec![diagnostic.clone()]),
                command: Some(Command {
                    title: "Create Snippet".to_string(),
                    command: "shopware.createSnippet".to_string(),
                    arguments: Some(vec![json!(key), json!(ctx.uri)]),
                }),
                ..Default::default()
            }));
        }

        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ContextFixture;
    use tower_lsp::lsp_types::{
        CodeActionContext, Diagnostic, NumberOrString, PartialResultParams, Position, Range,
        TextDocumentIdentifier, Url, WorkDoneProgressParams,
    };

    fn params(range: Range, diagnostics: Vec<Diagnostic>) -> CodeActionParams {
        CodeActionParams {
            text_document: TextDocumentIdentifier {
                uri: Url::parse("file:///page.twig").unwrap(),
            },
            range,
            context: CodeActionContext {
                diagnostics,
                only: None,
                trigger_kind: None,
            },
            work_done_progress_params: WorkDoneProgressParams::default(),
            partial_result_params: PartialResultParams::default(),
        }
    }

    fn titles(actions: Vec<CodeActionOrCommand>) -> Vec<String> {
        actions
            .into_iter()
            .map(|action| match action {
                CodeActionOrCommand::CodeAction(a) => a.title,
                CodeActionOrCommand::Command(c) => c.title,
            })
            .collect()
    }

    #[test]
    fn test_empty_selection_offers_insert() {
        let provider = SnippetCodeActionProvider::new();
        let fixture = ContextFixture::parse("/page.twig", ".twig", "<span>Hello</span>");
        let range = Range::new(Position::new(0, 8), Position::new(0, 8));
        let actions =
            fixture.with_context_at(0, 8, |ctx| provider.code_actions(ctx, &params(range, vec![])));

        assert_eq!(titles(actions), vec!["Insert Snippet"]);
    }

    #[test]
    fn test_selection_offers_create_from_selection() {
        let provider = SnippetCodeActionProvider::new();
        let fixture = ContextFixture::parse("/page.twig", ".twig", "<span>Hello</span>");
        let range = Range::new(Position::new(0, 6), Position::new(0, 11));
        let actions =
            fixture.with_context_at(0, 6, |ctx| provider.code_actions(ctx, &params(range, vec![])));

        assert_eq!(actions.len(), 1);
        let CodeActionOrCommand::CodeAction(action) = &actions[0] else {
            panic!("expected code action");
        };
        let command = action.command.as_ref().unwrap();
        assert_eq!(command.command, "shopware.createSnippetFromSelection");
        assert_eq!(command.arguments.as_ref().unwrap()[1], json!("Hello"));
    }

    #[test]
    fn test_missing_snippet_diagnostic_offers_create() {
        let provider = SnippetCodeActionProvider::new();
        let fixture =
            ContextFixture::parse("/page.twig", ".twig", "{{ 'cart.title'|trans }}");
        let diagnostic = Diagnostic {
            range: Range::new(Position::new(0, 4), Position::new(0, 14)),
            code: Some(NumberOrString::String(MISSING_SNIPPET_CODE.to_string())),
            data: Some(json!({"snippetText": "cart.title"})),
            ..Default::default()
        };
        let range = Range::new(Position::new(0, 4), Position::new(0, 4));
        let actions = fixture.with_context_at(0, 4, |ctx| {
            provider.code_actions(ctx, &params(range, vec![diagnostic]))
        });

        let titles = titles(actions);
        assert!(titles.contains(&"Create snippet cart.title".to_string()));
    }

    #[test]
    fn test_non_twig_documents_get_nothing() {
        let provider = SnippetCodeActionProvider::new();
        let fixture = ContextFixture::parse("/a.xml", ".xml", "<container/>");
        let range = Range::new(Position::new(0, 0), Position::new(0, 0));
        let actions =
            fixture.with_context_at(0, 0, |ctx| provider.code_actions(ctx, &params(range, vec![])));
        assert!(actions.is_empty());
    }
}
