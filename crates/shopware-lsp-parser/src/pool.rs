//! Per-extension parser pool.
//!
//! One grammar per scanned file extension, with a take/return pool of
//! parsers per extension so parallel scan workers never share a parser
//! instance.

use parking_lot::Mutex;
use std::collections::HashMap;
use tree_sitter::{Language, Parser, Tree};

/// File extensions the server scans and parses.
pub const SCANNED_FILE_TYPES: &[&str] = &[".php", ".xml", ".yaml", ".yml", ".twig", ".json", ".scss"];

/// Maps a lowercase file extension (with leading dot) to a pooled
/// tree-sitter parser bound to the matching grammar.
pub struct ParserPool {
    languages: HashMap<&'static str, Language>,
    parsers: HashMap<&'static str, Mutex<Vec<Parser>>>,
}

impl ParserPool {
    /// Create the pool with every supported grammar loaded.
    ///
    /// Grammar incompatibility is a startup-fatal configuration error, so
    /// this panics instead of propagating.
    pub fn new() -> Self {
        let mut languages: HashMap<&'static str, Language> = HashMap::new();
        languages.insert(".php", tree_sitter_php::LANGUAGE_PHP.into());
        languages.insert(".xml", tree_sitter_xml::LANGUAGE_XML.into());
        languages.insert(".yaml", tree_sitter_yaml::LANGUAGE.into());
        languages.insert(".yml", tree_sitter_yaml::LANGUAGE.into());
        languages.insert(".json", tree_sitter_json::LANGUAGE.into());
        // Twig templates are HTML-structured; template tags surface as text
        // and are handled lexically (see the twig module).
        languages.insert(".twig", tree_sitter_html::LANGUAGE.into());
        // SCSS is parsed with the CSS grammar.
        languages.insert(".scss", tree_sitter_css::LANGUAGE.into());

        let parsers = languages
            .keys()
            .map(|ext| (*ext, Mutex::new(Vec::new())))
            .collect();

        ParserPool { languages, parsers }
    }

    /// Whether a parser exists for the given extension.
    pub fn supports(&self, extension: &str) -> bool {
        self.languages.contains_key(extension)
    }

    /// Parse `text` with the grammar registered for `extension`.
    ///
    /// Returns `None` when the extension has no parser or the parse itself
    /// fails. A tree containing error nodes is still returned; consumers
    /// must tolerate error nodes.
    pub fn parse(&self, extension: &str, text: &[u8]) -> Option<Tree> {
        let language = self.languages.get(extension)?;
        let pool = self.parsers.get(extension)?;

        let mut parser = pool.lock().pop().unwrap_or_else(|| {
            let mut parser = Parser::new();
            parser
                .set_language(language)
                .expect("failed to load tree-sitter grammar");
            parser
        });

        let tree = parser.parse(text, None);
        pool.lock().push(parser);
        tree
    }
}

impl Default for ParserPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_every_scanned_extension() {
        let pool = ParserPool::new();
        for ext in SCANNED_FILE_TYPES {
            assert!(pool.supports(ext), "missing parser for {}", ext);
        }

        let tree = pool.parse(".xml", b"<container><services/></container>").unwrap();
        assert_eq!(tree.root_node().kind(), "document");

        let tree = pool.parse(".php", b"<?php class Foo {}").unwrap();
        assert_eq!(tree.root_node().kind(), "program");
    }

    #[test]
    fn test_unknown_extension_yields_none() {
        let pool = ParserPool::new();
        assert!(!pool.supports(".go"));
        assert!(pool.parse(".go", b"package main").is_none());
    }

    #[test]
    fn test_error_nodes_are_tolerated() {
        let pool = ParserPool::new();
        let tree = pool.parse(".php", b"<?php function ( {").unwrap();
        assert!(tree.root_node().has_error());
    }

    #[test]
    fn test_parser_is_returned_to_pool() {
        let pool = ParserPool::new();
        pool.parse(".json", b"{}").unwrap();
        pool.parse(".json", b"{\"a\": 1}").unwrap();
        assert_eq!(pool.parsers[".json"].lock().len(), 1);
    }
}
