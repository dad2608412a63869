//! Helpers over the tree-sitter-json grammar.

use tree_sitter::Node;

use crate::node_text;

/// A key/value member of a JSON object.
pub struct JsonMember<'t> {
    pub key: String,
    pub key_node: Node<'t>,
    pub value: Node<'t>,
}

/// The value node of a parsed JSON document.
pub fn document_root(root: Node<'_>) -> Option<Node<'_>> {
    if root.kind() == "document" {
        root.named_child(0)
    } else {
        Some(root)
    }
}

/// Members of an object node, with unquoted keys.
pub fn object_members<'t>(object: Node<'t>, text: &[u8]) -> Vec<JsonMember<'t>> {
    let mut members = Vec::new();
    if object.kind() != "object" {
        return members;
    }
    for i in 0..object.named_child_count() {
        let Some(pair) = object.named_child(i) else {
            continue;
        };
        if pair.kind() != "pair" {
            continue;
        }
        let (Some(key_node), Some(value)) = (
            pair.child_by_field_name("key"),
            pair.child_by_field_name("value"),
        ) else {
            continue;
        };
        members.push(JsonMember {
            key: string_value(key_node, text).unwrap_or_default(),
            key_node,
            value,
        });
    }
    members
}

/// Unquoted content of a JSON string node.
pub fn string_value(node: Node<'_>, text: &[u8]) -> Option<String> {
    if node.kind() != "string" {
        return None;
    }
    Some(node_text(node, text).trim_matches('"').to_string())
}

/// Look up a member value by key.
pub fn member<'t>(object: Node<'t>, key: &str, text: &[u8]) -> Option<Node<'t>> {
    object_members(object, text)
        .into_iter()
        .find(|m| m.key == key)
        .map(|m| m.value)
}
