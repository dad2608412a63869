//! Provider registries.
//!
//! One ordered list per LSP capability; the dispatcher invokes providers in
//! registration order and concatenates their results.

use shopware_lsp_providers::{
    CodeActionProvider, CodeLensProvider, CommandProvider, CompletionProvider, DefinitionProvider,
    DiagnosticsProvider, HoverProvider, ReferencesProvider,
};
use std::sync::Arc;
use tower_lsp::lsp_types::{CodeActionKind, CodeLens};

#[derive(Default)]
pub struct ProviderRegistry {
    pub completion: Vec<Arc<dyn CompletionProvider>>,
    pub definition: Vec<Arc<dyn DefinitionProvider>>,
    pub references: Vec<Arc<dyn ReferencesProvider>>,
    pub hover: Vec<Arc<dyn HoverProvider>>,
    pub code_lens: Vec<Arc<dyn CodeLensProvider>>,
    pub code_action: Vec<Arc<dyn CodeActionProvider>>,
    pub diagnostics: Vec<Arc<dyn DiagnosticsProvider>>,
    pub commands: Vec<Arc<dyn CommandProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_completion(&mut self, provider: Arc<dyn CompletionProvider>) {
        self.completion.push(provider);
    }

    pub fn register_definition(&mut self, provider: Arc<dyn DefinitionProvider>) {
        self.definition.push(provider);
    }

    pub fn register_references(&mut self, provider: Arc<dyn ReferencesProvider>) {
        self.references.push(provider);
    }

    pub fn register_hover(&mut self, provider: Arc<dyn HoverProvider>) {
        self.hover.push(provider);
    }

    pub fn register_code_lens(&mut self, provider: Arc<dyn CodeLensProvider>) {
        self.code_lens.push(provider);
    }

    pub fn register_code_action(&mut self, provider: Arc<dyn CodeActionProvider>) {
        self.code_action.push(provider);
    }

    pub fn register_diagnostics(&mut self, provider: Arc<dyn DiagnosticsProvider>) {
        self.diagnostics.push(provider);
    }

    pub fn register_command(&mut self, provider: Arc<dyn CommandProvider>) {
        self.commands.push(provider);
    }

    /// Trigger characters across all completion providers, deduplicated in
    /// registration order for capability advertisement.
    pub fn trigger_characters(&self) -> Vec<String> {
        let mut characters: Vec<String> = Vec::new();
        for provider in &self.completion {
            for character in provider.trigger_characters() {
                if !characters.contains(&character) {
                    characters.push(character);
                }
            }
        }
        characters
    }

    /// Code-action kinds across all providers, deduplicated.
    pub fn code_action_kinds(&self) -> Vec<CodeActionKind> {
        let mut kinds: Vec<CodeActionKind> = Vec::new();
        for provider in &self.code_action {
            for kind in provider.kinds() {
                if !kinds.contains(&kind) {
                    kinds.push(kind);
                }
            }
        }
        kinds
    }

    /// Command names across all command providers.
    pub fn command_names(&self) -> Vec<String> {
        self.commands
            .iter()
            .flat_map(|provider| provider.commands())
            .collect()
    }

    /// Dispatch a workspace command to the provider that registered it.
    pub fn execute_command(
        &self,
        command: &str,
        arguments: &[serde_json::Value],
    ) -> Option<serde_json::Value> {
        self.commands
            .iter()
            .find_map(|provider| provider.execute(command, arguments))
    }

    /// Resolve a code lens via the provider discriminator in its data.
    pub fn resolve_code_lens(&self, lens: CodeLens) -> CodeLens {
        for provider in &self.code_lens {
            if let Some(resolved) = provider.resolve(lens.clone()) {
                return resolved;
            }
        }
        lens
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopware_lsp_providers::DocumentContext;
    use tower_lsp::lsp_types::CompletionItem;

    struct FakeCompletion(&'static str);

    impl CompletionProvider for FakeCompletion {
        fn trigger_characters(&self) -> Vec<String> {
            vec![self.0.to_string(), "'".to_string()]
        }

        fn completions(&self, _ctx: &DocumentContext<'_>) -> Vec<CompletionItem> {
            Vec::new()
        }
    }

    #[test]
    fn test_trigger_characters_are_deduplicated_in_order() {
        let mut registry = ProviderRegistry::new();
        registry.register_completion(Arc::new(FakeCompletion("\"")));
        registry.register_completion(Arc::new(FakeCompletion("%")));

        assert_eq!(registry.trigger_characters(), vec!["\"", "'", "%"]);
    }

    #[test]
    fn test_execute_command_unknown_is_none() {
        let registry = ProviderRegistry::new();
        assert!(registry.execute_command("shopware/none", &[]).is_none());
    }
}
