//! Syntax layer for shopware-lsp.
//!
//! Wraps tree-sitter behind a per-extension parser pool and provides the
//! tree helpers the indexers and providers share: position conversion,
//! node-at-position descent, and XML/PHP/Twig specific extraction.

pub mod json;
pub mod php;
pub mod pool;
pub mod position;
pub mod twig;
pub mod xml;

pub use pool::ParserPool;

use tree_sitter::Node;

/// UTF-8 text of a node, empty on invalid ranges.
pub fn node_text<'a>(node: Node<'_>, text: &'a [u8]) -> &'a str {
    node.utf8_text(text).unwrap_or_default()
}
