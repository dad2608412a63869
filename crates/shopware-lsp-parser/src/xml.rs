//! Helpers over the tree-sitter-xml grammar.
//!
//! The grammar names its nodes after the XML spec productions: an `element`
//! wraps either `STag content ETag` or an `EmptyElemTag`, attributes are
//! `Attribute` nodes with `Name` and `AttValue` children.

use std::collections::HashMap;
use tree_sitter::Node;

use crate::node_text;

/// Depth-first search for the first descendant of the given kind.
pub fn first_node_of_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    for i in 0..node.named_child_count() {
        let child = node.named_child(i)?;
        if child.kind() == kind {
            return Some(child);
        }
        if let Some(found) = first_node_of_kind(child, kind) {
            return Some(found);
        }
    }
    None
}

/// The `STag` or `EmptyElemTag` of an element node.
pub fn element_tag(element: Node<'_>) -> Option<Node<'_>> {
    let tag = element.named_child(0)?;
    match tag.kind() {
        "STag" | "EmptyElemTag" => Some(tag),
        _ => None,
    }
}

/// Name of an element, read from its start tag.
pub fn element_name<'a>(element: Node<'_>, text: &'a [u8]) -> Option<&'a str> {
    let tag = element_tag(element)?;
    let name = first_node_of_kind(tag, "Name")?;
    Some(node_text(name, text))
}

/// The `content` node of a non-empty element.
pub fn element_content(element: Node<'_>) -> Option<Node<'_>> {
    for i in 0..element.named_child_count() {
        let child = element.named_child(i)?;
        if child.kind() == "content" {
            return Some(child);
        }
    }
    None
}

/// Attribute name → unquoted value for a start tag (or any node holding
/// `Attribute` children).
pub fn attribute_values(tag: Node<'_>, text: &[u8]) -> HashMap<String, String> {
    let mut values = HashMap::new();
    for i in 0..tag.named_child_count() {
        let Some(attr) = tag.named_child(i) else {
            continue;
        };
        if attr.kind() != "Attribute" {
            continue;
        }
        let Some(name) = first_node_of_kind(attr, "Name") else {
            continue;
        };
        let Some(value) = first_node_of_kind(attr, "AttValue") else {
            continue;
        };
        values.insert(
            node_text(name, text).to_string(),
            unquote(node_text(value, text)).to_string(),
        );
    }
    values
}

/// The `AttValue` node of a named attribute on a start tag.
pub fn attribute_value_node<'t>(tag: Node<'t>, name: &str, text: &[u8]) -> Option<Node<'t>> {
    for i in 0..tag.named_child_count() {
        let attr = tag.named_child(i)?;
        if attr.kind() != "Attribute" {
            continue;
        }
        let attr_name = first_node_of_kind(attr, "Name")?;
        if node_text(attr_name, text) == name {
            return first_node_of_kind(attr, "AttValue");
        }
    }
    None
}

/// Strip the surrounding quotes of an `AttValue`.
pub fn unquote(value: &str) -> &str {
    value.trim_matches(|c| c == '"' || c == '\'')
}

/// Whether `node` is the `AttValue` of an `id` or `class` attribute on a
/// `<service>` element.
pub fn is_service_id_attribute(node: Node<'_>, text: &[u8]) -> bool {
    attvalue_context(node, text)
        .map(|(attr_name, element)| {
            (attr_name == "id" || attr_name == "class") && element == "service"
        })
        .unwrap_or(false)
}

/// Whether `node` is the `AttValue` of the `id` attribute on an
/// `<argument type="service">` element.
pub fn is_service_argument_reference(node: Node<'_>, text: &[u8]) -> bool {
    let Some((attr_name, element)) = attvalue_context(node, text) else {
        return false;
    };
    if attr_name != "id" || element != "argument" {
        return false;
    }
    let tag = node.parent().and_then(|attr| attr.parent());
    tag.map(|tag| attribute_values(tag, text).get("type").map(String::as_str) == Some("service"))
        .unwrap_or(false)
}

/// For an `AttValue` node: the owning attribute name and element name.
fn attvalue_context<'a>(node: Node<'_>, text: &'a [u8]) -> Option<(&'a str, &'a str)> {
    if node.kind() != "AttValue" {
        return None;
    }
    let attr = node.parent()?;
    if attr.kind() != "Attribute" {
        return None;
    }
    let attr_name = first_node_of_kind(attr, "Name")?;
    let tag = attr.parent()?;
    let element_name = first_node_of_kind(tag, "Name")?;
    Some((node_text(attr_name, text), node_text(element_name, text)))
}
