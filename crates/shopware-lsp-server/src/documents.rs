//! In-memory store of editor-open documents.
//!
//! Each document keeps its full text, the client version, and a live parse
//! for the document's file type. A single readers-writer lock protects the
//! map; request handlers read, document sync writes.

use parking_lot::RwLock;
use shopware_lsp_parser::{position, ParserPool};
use std::collections::HashMap;
use std::sync::Arc;
use tree_sitter::{Node, Tree};

use crate::server::{extension_of, uri_to_path};

/// A document open in the editor.
pub struct TextDocument {
    pub uri: String,
    pub text: Vec<u8>,
    pub version: i32,
    pub tree: Option<Tree>,
}

impl TextDocument {
    /// Most specific node at an LSP position, descending through all
    /// children and falling back to the named-descendant search.
    pub fn node_at(&self, line: u32, character: u32) -> Option<Node<'_>> {
        let root = self.tree.as_ref()?.root_node();
        position::node_at_position(root, &self.text, line, character)
    }

    pub fn root_node(&self) -> Option<Node<'_>> {
        self.tree.as_ref().map(|tree| tree.root_node())
    }
}

pub struct DocumentManager {
    parsers: Arc<ParserPool>,
    documents: RwLock<HashMap<String, TextDocument>>,
}

impl DocumentManager {
    pub fn new(parsers: Arc<ParserPool>) -> Self {
        DocumentManager {
            parsers,
            documents: RwLock::new(HashMap::new()),
        }
    }

    pub fn open(&self, uri: &str, text: String, version: i32) {
        let document = self.make_document(uri, text, version);
        self.documents.write().insert(uri.to_string(), document);
    }

    /// Replace a document's content. Unknown URIs behave like `open`.
    pub fn update(&self, uri: &str, text: String, version: i32) {
        self.open(uri, text, version);
    }

    pub fn close(&self, uri: &str) {
        self.documents.write().remove(uri);
    }

    pub fn close_all(&self) {
        self.documents.write().clear();
    }

    pub fn text(&self, uri: &str) -> Option<Vec<u8>> {
        self.documents.read().get(uri).map(|doc| doc.text.clone())
    }

    pub fn version(&self, uri: &str) -> Option<i32> {
        self.documents.read().get(uri).map(|doc| doc.version)
    }

    /// URIs and versions of every open document.
    pub fn open_documents(&self) -> Vec<(String, i32)> {
        self.documents
            .read()
            .values()
            .map(|doc| (doc.uri.clone(), doc.version))
            .collect()
    }

    /// Run a closure against a document under the read lock.
    pub fn with_document<R>(&self, uri: &str, f: impl FnOnce(&TextDocument) -> R) -> Option<R> {
        let documents = self.documents.read();
        documents.get(uri).map(f)
    }

    fn make_document(&self, uri: &str, text: String, version: i32) -> TextDocument {
        let text = text.into_bytes();
        let extension = extension_of(uri_to_path(uri));
        let tree = self.parsers.parse(&extension, &text);
        TextDocument {
            uri: uri.to_string(),
            text,
            version,
            tree,
        }
    }
}
