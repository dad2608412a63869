//! Lexical Twig analysis.
//!
//! Twig documents are parsed with the HTML grammar for document sync and
//! node-at-position; the template constructs themselves (`{% block %}`,
//! `{% sw_extends %}`, `|trans` filters, route helper calls) are extracted
//! lexically from the text.

use once_cell::sync::Lazy;
use regex::Regex;
use shopware_lsp_types::{FilePosition, TemplateFileFacts, TemplateReference, TwigBlock};

use crate::position::byte_to_position;

static BLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{%-?\s*block\s+(\w+)").unwrap());

static EXTENDS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\{%-?\s*(?:sw_extends|extends)\s+(?:'([^']+)'|"([^"]+)")"#).unwrap());

static TRANS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?:'([^']*)'|"([^"]*)")\s*\|\s*trans"#).unwrap());

static ROUTE_CALL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:seoUrl|url|path)\(\s*(?:'([^']*)'|"([^"]*)")"#).unwrap()
});

/// Prefix of a line that ends inside the string argument of a route helper,
/// used to detect completion context: `{{ path('fron` → `Some("fron")`.
static ROUTE_CALL_PREFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:seoUrl|url|path)\(\s*['"]([^'"]*)$"#).unwrap()
});

/// A lexical occurrence of a quoted string with its position and content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringOccurrence {
    pub value: String,
    pub position: FilePosition,
    /// Byte range of the quoted content (without quotes).
    pub start_byte: usize,
    pub end_byte: usize,
}

/// Extract block declarations and extends references from a template.
pub fn extract_template_facts(text: &[u8], path: &str) -> TemplateFileFacts {
    let source = String::from_utf8_lossy(text);
    let mut facts = TemplateFileFacts::default();

    for caps in BLOCK_RE.captures_iter(&source) {
        let m = caps.get(1).unwrap();
        facts.blocks.push(TwigBlock {
            name: m.as_str().to_string(),
            path: path.to_string(),
            position: byte_to_position(source.as_bytes(), m.start()),
        });
    }

    for caps in EXTENDS_RE.captures_iter(&source) {
        let m = caps.get(1).or_else(|| caps.get(2)).unwrap();
        facts.extends.push(TemplateReference {
            target: m.as_str().to_string(),
            path: path.to_string(),
            position: byte_to_position(source.as_bytes(), m.start()),
        });
    }

    facts
}

/// All `'key'|trans` occurrences in a template.
pub fn trans_keys(text: &[u8]) -> Vec<StringOccurrence> {
    let source = String::from_utf8_lossy(text);
    TRANS_RE
        .captures_iter(&source)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| StringOccurrence {
            value: m.as_str().to_string(),
            position: byte_to_position(source.as_bytes(), m.start()),
            start_byte: m.start(),
            end_byte: m.end(),
        })
        .collect()
}

/// The `'key'|trans` string containing `offset`, if any.
///
/// The offset may sit anywhere inside the quoted content, including at
/// either quote boundary.
pub fn trans_key_at(text: &[u8], offset: usize) -> Option<StringOccurrence> {
    trans_keys(text)
        .into_iter()
        .find(|occ| occ.start_byte.saturating_sub(1) <= offset && offset <= occ.end_byte + 1)
}

/// The route-helper string (`path('...')`, `url()`, `seoUrl()`) containing
/// `offset`, if any.
pub fn route_name_at(text: &[u8], offset: usize) -> Option<StringOccurrence> {
    let source = String::from_utf8_lossy(text);
    ROUTE_CALL_RE
        .captures_iter(&source)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| StringOccurrence {
            value: m.as_str().to_string(),
            position: byte_to_position(source.as_bytes(), m.start()),
            start_byte: m.start(),
            end_byte: m.end(),
        })
        .find(|occ| occ.start_byte.saturating_sub(1) <= offset && offset <= occ.end_byte + 1)
}

/// The extends/sw_extends target string containing `offset`, if any.
pub fn extends_target_at(text: &[u8], offset: usize) -> Option<StringOccurrence> {
    let source = String::from_utf8_lossy(text);
    EXTENDS_RE
        .captures_iter(&source)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| StringOccurrence {
            value: m.as_str().to_string(),
            position: byte_to_position(source.as_bytes(), m.start()),
            start_byte: m.start(),
            end_byte: m.end(),
        })
        .find(|occ| occ.start_byte.saturating_sub(1) <= offset && offset <= occ.end_byte + 1)
}

/// Whether the text up to `offset` ends inside the string argument of a
/// route helper call (the completion trigger context).
pub fn in_route_call(text: &[u8], offset: usize) -> bool {
    let source = String::from_utf8_lossy(text);
    let offset = offset.min(source.len());
    let line_start = source[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0);
    ROUTE_CALL_PREFIX_RE.is_match(&source[line_start..offset])
}

/// Whether the text around `offset` looks like an unfinished or complete
/// `|trans` string (the snippet completion context).
pub fn in_trans_context(text: &[u8], offset: usize) -> bool {
    if trans_key_at(text, offset).is_some() {
        return true;
    }
    // Editing inside an existing string: accept when the remainder of the
    // line after the closing quote carries |trans.
    let source = String::from_utf8_lossy(text);
    let offset = offset.min(source.len());
    let line_end = source[offset..]
        .find('\n')
        .map(|i| offset + i)
        .unwrap_or(source.len());
    static AHEAD_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r#"^[^'"]*['"]\s*\|\s*trans"#).unwrap());
    AHEAD_RE.is_match(&source[offset..line_end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_blocks() {
        let text = b"{% block base_main %}\n  {% block base_inner %}{% endblock %}\n{% endblock %}\n";
        let facts = extract_template_facts(text, "/tpl.twig");

        assert_eq!(facts.blocks.len(), 2);
        assert_eq!(facts.blocks[0].name, "base_main");
        assert_eq!(facts.blocks[0].position, FilePosition::new(0, 9));
        assert_eq!(facts.blocks[1].name, "base_inner");
        assert_eq!(facts.blocks[1].position, FilePosition::new(1, 11));
    }

    #[test]
    fn test_block_name_with_umlaut() {
        let text = "{% block grüße_block %}{% endblock %}".as_bytes();
        let facts = extract_template_facts(text, "/tpl.twig");

        assert_eq!(facts.blocks.len(), 1);
        assert_eq!(facts.blocks[0].name, "grüße_block");
        // Character column, not byte column.
        assert_eq!(facts.blocks[0].position, FilePosition::new(0, 9));
    }

    #[test]
    fn test_extract_extends() {
        let text = br#"{% sw_extends '@Storefront/storefront/base.html.twig' %}"#;
        let facts = extract_template_facts(text, "/tpl.twig");

        assert_eq!(facts.extends.len(), 1);
        assert_eq!(
            facts.extends[0].target,
            "@Storefront/storefront/base.html.twig"
        );
    }

    #[test]
    fn test_trans_keys() {
        let text = br#"<span>{{ 'checkout.cart.title'|trans }}</span> {{ "general.back" | trans }}"#;
        let keys = trans_keys(text);

        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0].value, "checkout.cart.title");
        assert_eq!(keys[1].value, "general.back");
    }

    #[test]
    fn test_trans_key_at_offset() {
        let text = br#"{{ 'checkout.cart.title'|trans }}"#;
        let inside = 10;
        let found = trans_key_at(text, inside).unwrap();
        assert_eq!(found.value, "checkout.cart.title");
        assert!(trans_key_at(text, text.len() - 1).is_none());
    }

    #[test]
    fn test_route_call_contexts() {
        let text = br#"<a href="{{ path('frontend.account.home') }}">"#;
        let inside = 20;
        assert_eq!(
            route_name_at(text, inside).unwrap().value,
            "frontend.account.home"
        );

        let partial = br#"{{ seoUrl('frontend.acc"#;
        assert!(in_route_call(partial, partial.len()));
        assert!(!in_route_call(text, 5));
    }

    #[test]
    fn test_in_trans_context_complete_string() {
        let text = br#"{{ 'checkout.cart.title'|trans }}"#;
        assert!(in_trans_context(text, 8));
        assert!(!in_trans_context(text, text.len() - 1));
    }
}
