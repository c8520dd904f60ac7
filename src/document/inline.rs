//! Inline rendering: text leaves with marks, links and emoji.

use super::node::{Leaf, MarkKind, Node};
use crate::utils::xml::{XmlWriter, write_end, write_start, write_text, write_text_element};
use anyhow::Result;

/// Render inline content. Block nodes in inline position are skipped.
pub fn write_inline_nodes(writer: &mut XmlWriter, nodes: &[Node]) -> Result<()> {
    for node in nodes {
        match node {
            Node::Text(text) => {
                for leaf in &text.leaves {
                    write_leaf(writer, leaf)?;
                }
            }
            Node::Inline(inline) => match inline.kind.as_str() {
                "link" => {
                    let href = inline.data.url.as_deref().unwrap_or("#");
                    write_start(writer, "a", &[("href", href)])?;
                    write_inline_nodes(writer, &inline.nodes)?;
                    write_end(writer, "a")?;
                }
                "emoji" => {
                    let emoji = inline.data.code.as_deref().map(emoji_from_code).unwrap_or_default();
                    write_text_element(writer, "span", &[("class", "emoji")], &emoji)?;
                }
                _ => write_inline_nodes(writer, &inline.nodes)?,
            },
            Node::Block(_) => {}
        }
    }
    Ok(())
}

fn write_leaf(writer: &mut XmlWriter, leaf: &Leaf) -> Result<()> {
    let tags: Vec<&str> = leaf.marks.iter().filter_map(|mark| mark_tag(mark.kind)).collect();

    for tag in &tags {
        write_start(writer, tag, &[])?;
    }
    write_text(writer, &leaf.text)?;
    for tag in tags.iter().rev() {
        write_end(writer, tag)?;
    }
    Ok(())
}

const fn mark_tag(kind: MarkKind) -> Option<&'static str> {
    match kind {
        MarkKind::Bold => Some("strong"),
        MarkKind::Italic => Some("em"),
        MarkKind::Code => Some("code"),
        MarkKind::Strikethrough => Some("s"),
        MarkKind::Other => None,
    }
}

/// Decode an emoji given as hex code points joined by `-`
/// (`1f4d8`, `1f1eb-1f1f7`). Invalid code points are dropped.
pub fn emoji_from_code(code: &str) -> String {
    code.split('-')
        .filter_map(|part| u32::from_str_radix(part.trim(), 16).ok())
        .filter_map(char::from_u32)
        .collect()
}
