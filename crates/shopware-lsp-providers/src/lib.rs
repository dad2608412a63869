//! LSP capability providers.
//!
//! A provider answers one capability and reads indexer state; the dispatcher
//! fans requests out over the registered providers in registration order and
//! concatenates their results.

pub mod code_action;
pub mod code_lens;
pub mod commands;
pub mod completion;
pub mod definition;
pub mod diagnostics;
pub mod hover;
pub mod references;

use shopware_lsp_index::indexers::php::PhpRequestContext;
use shopware_lsp_types::FilePosition;
use tower_lsp::lsp_types::{Location, Position, Range, Url};
use tree_sitter::Node;

/// Everything a provider gets to see about the request's document.
///
/// Borrowed from the document manager for the duration of one request;
/// providers must not block.
pub struct DocumentContext<'a> {
    /// Document URI as sent by the client.
    pub uri: &'a str,
    /// Filesystem path (URI with the `file://` prefix stripped).
    pub path: &'a str,
    /// Lowercase file extension with leading dot.
    pub extension: String,
    pub text: &'a [u8],
    pub root: Option<Node<'a>>,
    /// Most specific node at the request position, if any.
    pub node: Option<Node<'a>>,
    pub position: FilePosition,
    /// Byte offset of the request position.
    pub offset: Option<usize>,
    /// PHP-specific context, attached for `.php` documents.
    pub php: Option<PhpRequestContext>,
}

/// Contributes completion items.
pub trait CompletionProvider: Send + Sync {
    /// Characters that should trigger completion in this provider's
    /// contexts. Deduplicated during capability advertisement.
    fn trigger_characters(&self) -> Vec<String> {
        Vec::new()
    }

    fn completions(&self, ctx: &DocumentContext<'_>) -> Vec<tower_lsp::lsp_types::CompletionItem>;
}

/// Contributes go-to-definition targets.
pub trait DefinitionProvider: Send + Sync {
    fn definitions(&self, ctx: &DocumentContext<'_>) -> Vec<Location>;
}

/// Contributes find-references results.
pub trait ReferencesProvider: Send + Sync {
    fn references(&self, ctx: &DocumentContext<'_>) -> Vec<Location>;
}

/// Contributes hover content (markdown). Multiple hovers are concatenated
/// by the dispatcher.
pub trait HoverProvider: Send + Sync {
    fn hover(&self, ctx: &DocumentContext<'_>) -> Option<String>;
}

/// Contributes code lenses, resolved lazily through a provider
/// discriminator in the lens data.
pub trait CodeLensProvider: Send + Sync {
    /// Discriminator written into `CodeLens.data.provider`.
    fn id(&self) -> &'static str;

    fn code_lenses(&self, ctx: &DocumentContext<'_>) -> Vec<tower_lsp::lsp_types::CodeLens>;

    /// Resolve a lens this provider claimed. `None` when the lens is not
    /// recognised after all.
    fn resolve(&self, lens: tower_lsp::lsp_types::CodeLens)
        -> Option<tower_lsp::lsp_types::CodeLens>;
}

/// Contributes code actions.
pub trait CodeActionProvider: Send + Sync {
    /// Kinds advertised in the server capabilities. Deduplicated.
    fn kinds(&self) -> Vec<tower_lsp::lsp_types::CodeActionKind>;

    fn code_actions(
        &self,
        ctx: &DocumentContext<'_>,
        params: &tower_lsp::lsp_types::CodeActionParams,
    ) -> Vec<tower_lsp::lsp_types::CodeActionOrCommand>;
}

/// Contributes diagnostics for a document.
pub trait DiagnosticsProvider: Send + Sync {
    fn diagnostics(&self, ctx: &DocumentContext<'_>) -> Vec<tower_lsp::lsp_types::Diagnostic>;
}

/// Contributes workspace commands, dispatched with opaque JSON arguments.
pub trait CommandProvider: Send + Sync {
    fn commands(&self) -> Vec<String>;

    /// Execute a command this provider registered. `None` when the command
    /// name is not this provider's.
    fn execute(&self, command: &str, arguments: &[serde_json::Value])
        -> Option<serde_json::Value>;
}

/// Point location in a file, for jump targets derived from indexed facts.
pub fn location(path: &str, position: FilePosition) -> Option<Location> {
    let uri = Url::from_file_path(path).ok()?;
    let pos = Position::new(position.line, position.character);
    Some(Location::new(uri, Range::new(pos, pos)))
}

/// Range spanning `characters` starting at an indexed position.
pub fn span(position: FilePosition, characters: u32) -> Range {
    Range::new(
        Position::new(position.line, position.character),
        Position::new(position.line, position.character + characters),
    )
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::DocumentContext;
    use shopware_lsp_index::Indexer;
    use shopware_lsp_parser::{position, xml, ParserPool};
    use shopware_lsp_types::FilePosition;
    use std::path::Path;
    use tree_sitter::Tree;

    /// Parse and index one file into a fresh in-memory indexer.
    pub fn index_file(indexer: &dyn Indexer, path: &str, extension: &str, content: &str) {
        let pool = ParserPool::new();
        let tree = pool.parse(extension, content.as_bytes()).unwrap();
        indexer
            .index_file(Path::new(path), &tree, content.as_bytes())
            .unwrap();
    }

    /// A parsed document from which request contexts can be borrowed.
    pub struct ContextFixture {
        path: String,
        uri: String,
        extension: String,
        text: Vec<u8>,
        tree: Option<Tree>,
    }

    impl ContextFixture {
        pub fn parse(path: &str, extension: &str, content: &str) -> Self {
            let pool = ParserPool::new();
            let tree = pool.parse(extension, content.as_bytes());
            ContextFixture {
                path: path.to_string(),
                uri: format!("file://{}", path),
                extension: extension.to_string(),
                text: content.as_bytes().to_vec(),
                tree,
            }
        }

        pub fn with_context_at<R>(
            &self,
            line: u32,
            character: u32,
            f: impl FnOnce(&DocumentContext<'_>) -> R,
        ) -> R {
            let offset = position::position_to_byte(&self.text, line, character);
            let root = self.tree.as_ref().map(|tree| tree.root_node());
            let node = match (root, offset) {
                (Some(root), Some(offset)) => position::node_at_offset(root, offset),
                _ => None,
            };
            let ctx = DocumentContext {
                uri: &self.uri,
                path: &self.path,
                extension: self.extension.clone(),
                text: &self.text,
                root,
                node,
                position: FilePosition::new(line, character),
                offset,
                php: None,
            };
            f(&ctx)
        }
    }

    /// Whether the node at a position is a service argument id value.
    pub fn xml_context_at(content: &str, line: u32, character: u32) -> bool {
        let fixture = ContextFixture::parse("/t.xml", ".xml", content);
        fixture.with_context_at(line, character, |ctx| {
            ctx.node
                .map(|node| xml::is_service_argument_reference(node, ctx.text))
                .unwrap_or(false)
        })
    }
}
