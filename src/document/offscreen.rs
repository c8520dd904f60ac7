//! Offscreen estimation for lazy loading.
//!
//! Layout is unknown at render time, so the vertical position of a block is
//! estimated from the heights of the top-level blocks above it. A block is
//! offscreen once that estimate passes the first viewport.

use super::node::{Block, Document};
use std::ptr;

/// Estimated height of the first viewport, in CSS pixels.
pub const VIEWPORT_HEIGHT: u32 = 1000;

const LINE_HEIGHT: u32 = 28;
const CHARS_PER_LINE: usize = 90;

/// Whether `block`, reached through `ancestors`, starts below the first
/// viewport.
///
/// Nested blocks are positioned by their top-level ancestor. A block that is
/// not part of `document` is treated as visible.
pub fn is_block_offscreen(document: &Document, block: &Block, ancestors: &[&Block]) -> bool {
    let root = ancestors.first().copied().unwrap_or(block);
    let Some(position) = document.nodes.iter().position(|node| ptr::eq(node, root)) else {
        return false;
    };

    let above: u32 = document.nodes[..position].iter().map(estimate_height).sum();
    above > VIEWPORT_HEIGHT
}

/// Rough rendered height of a block.
pub fn estimate_height(block: &Block) -> u32 {
    match block.kind.as_str() {
        "heading-1" => 64,
        "heading-2" => 52,
        "heading-3" => 44,
        "divider" => 32,
        "image" | "images" | "embed" => 420,
        "code" => {
            let lines = block.child_blocks().len().max(1) as u32;
            lines * 24 + 48
        }
        "tabs" => {
            // Only the first tab is visible before interaction.
            let first = block.child_blocks().into_iter().next();
            56 + first.map_or(0, children_height)
        }
        "paragraph" | "list-item" => text_height(block),
        _ if block.child_blocks().is_empty() => text_height(block),
        _ => 32 + children_height(block),
    }
}

fn children_height(block: &Block) -> u32 {
    block.child_blocks().into_iter().map(estimate_height).sum()
}

fn text_height(block: &Block) -> u32 {
    let chars = block.plain_text().chars().count();
    let lines = chars.div_ceil(CHARS_PER_LINE).max(1) as u32;
    lines * LINE_HEIGHT
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(json: &str) -> Document {
        serde_json::from_str(json).unwrap()
    }

    fn paragraphs(count: usize) -> Document {
        let nodes: Vec<String> = (0..count)
            .map(|i| format!(r#"{{ "type": "paragraph", "key": "p{i}" }}"#))
            .collect();
        doc(&format!(r#"{{ "nodes": [{}] }}"#, nodes.join(",")))
    }

    #[test]
    fn test_first_blocks_visible() {
        let document = paragraphs(3);
        for block in &document.nodes {
            assert!(!is_block_offscreen(&document, block, &[]));
        }
    }

    #[test]
    fn test_far_blocks_offscreen() {
        // 28px per empty paragraph: block 36 sits at 1008px
        let document = paragraphs(40);
        assert!(!is_block_offscreen(&document, &document.nodes[35], &[]));
        assert!(is_block_offscreen(&document, &document.nodes[36], &[]));
    }

    #[test]
    fn test_nested_uses_root_position() {
        let document = doc(
            r#"{ "nodes": [
                { "type": "image", "key": "a" }, { "type": "image", "key": "b" },
                { "type": "image", "key": "c" },
                { "type": "hint", "key": "h", "nodes": [
                    { "object": "block", "type": "paragraph", "key": "inner" }
                ] }
            ] }"#,
        );
        let hint = &document.nodes[3];
        let inner = hint.child_blocks()[0];

        assert!(is_block_offscreen(&document, inner, &[hint]));
        assert!(!is_block_offscreen(&document, &document.nodes[1], &[]));
    }

    #[test]
    fn test_foreign_block_visible() {
        let document = paragraphs(100);
        let other = paragraphs(100);
        assert!(!is_block_offscreen(&document, &other.nodes[99], &[]));
    }

    #[test]
    fn test_code_height_counts_lines() {
        let document = doc(
            r#"{ "nodes": [{ "type": "code", "nodes": [
                { "object": "block", "type": "code-line" },
                { "object": "block", "type": "code-line" }
            ] }] }"#,
        );
        assert_eq!(estimate_height(&document.nodes[0]), 96);
    }
}
