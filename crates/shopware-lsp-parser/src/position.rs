//! Position/offset conversion and node-at-position search.
//!
//! LSP positions are zero-based (line, character) with character counted in
//! characters of the line; trees index by byte. All conversion between the
//! two lives here so the offset semantics stay in one place.

use shopware_lsp_types::FilePosition;
use tree_sitter::Node;

/// Convert an LSP position to a byte offset in `text`.
///
/// Returns `None` when the line does not exist. A character count past the
/// end of the line clamps to the line end.
pub fn position_to_byte(text: &[u8], line: u32, character: u32) -> Option<usize> {
    let text = std::str::from_utf8(text).ok()?;
    let mut offset = 0usize;

    for (current_line, l) in text.split_inclusive('\n').enumerate() {
        if current_line as u32 == line {
            let mut byte_col = 0usize;
            let mut char_col = 0u32;
            for ch in l.chars() {
                if char_col == character || ch == '\n' {
                    break;
                }
                byte_col += ch.len_utf8();
                char_col += 1;
            }
            return Some(offset + byte_col);
        }
        offset += l.len();
    }

    // Position exactly at the end of text on a trailing line.
    if line == 0 && text.is_empty() {
        return Some(0);
    }
    None
}

/// Convert a byte offset into a zero-based (line, character) position.
pub fn byte_to_position(text: &[u8], byte: usize) -> FilePosition {
    let byte = byte.min(text.len());
    let prefix = &text[..byte];
    let line = prefix.iter().filter(|b| **b == b'\n').count() as u32;
    let line_start = prefix
        .iter()
        .rposition(|b| *b == b'\n')
        .map(|i| i + 1)
        .unwrap_or(0);
    let character = String::from_utf8_lossy(&prefix[line_start..]).chars().count() as u32;
    FilePosition { line, character }
}

/// Find the most specific node whose byte span contains `offset`.
///
/// All children are considered, including unnamed ones; when no child
/// contains the offset the current node wins.
pub fn node_at_offset(node: Node<'_>, offset: usize) -> Option<Node<'_>> {
    if node.start_byte() > offset || offset > node.end_byte() {
        return None;
    }
    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            if let Some(found) = node_at_offset(child, offset) {
                return Some(found);
            }
        }
    }
    Some(node)
}

/// Resolve an LSP position to the most specific node in the tree.
pub fn node_at_position<'t>(
    root: Node<'t>,
    text: &[u8],
    line: u32,
    character: u32,
) -> Option<Node<'t>> {
    let offset = position_to_byte(text, line, character)?;
    node_at_offset(root, offset).or_else(|| {
        let point = tree_sitter::Point::new(line as usize, character as usize);
        root.named_descendant_for_point_range(point, point)
    })
}
