//! Document model.
//!
//! A page document is a tree of typed nodes. Each node is tagged by its
//! `object` field:
//!
//! ```json
//! { "object": "block", "type": "paragraph", "key": "p1", "nodes": [
//!     { "object": "text", "leaves": [{ "text": "Hello", "marks": [{ "type": "bold" }] }] }
//! ] }
//! ```
//!
//! Nodes never store their parents. Renderers pass the ancestor chain down
//! explicitly.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Root of a page: top-level blocks in display order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub nodes: Vec<Block>,
}

impl Document {
    /// Top-level blocks as a slice of references, the shape renderers take.
    pub fn blocks(&self) -> Vec<&Block> {
        self.nodes.iter().collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "object", rename_all = "lowercase")]
pub enum Node {
    Block(Block),
    Inline(Inline),
    Text(Text),
}

impl Node {
    #[inline]
    pub fn as_block(&self) -> Option<&Block> {
        match self {
            Self::Block(block) => Some(block),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub data: BlockData,

    #[serde(default)]
    pub meta: BlockMeta,

    #[serde(default)]
    pub nodes: Vec<Node>,
}

/// Block payload. Only the fields the renderers read are modelled; anything
/// else in the JSON is ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockData {
    /// Render in the wide container.
    #[serde(default)]
    pub full_width: bool,

    /// Tab title (`tabs-item`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Hint style: `info`, `success`, `warning`, `danger`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,

    /// Code block language.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub syntax: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,

    /// Task list item state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockMeta {
    /// Stable anchor id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl Block {
    /// The block key, or `{type}-{index}` when the document has none.
    pub fn key_or_index(&self, index: usize) -> Cow<'_, str> {
        match &self.key {
            Some(key) => Cow::Borrowed(key),
            None => Cow::Owned(format!("{}-{index}", self.kind)),
        }
    }

    /// Direct block children, skipping inline and text nodes.
    pub fn child_blocks(&self) -> Vec<&Block> {
        self.nodes.iter().filter_map(Node::as_block).collect()
    }

    /// Concatenated text of every leaf below this block.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        collect_text(&self.nodes, &mut out);
        out
    }
}

fn collect_text(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Block(block) => collect_text(&block.nodes, out),
            Node::Inline(inline) => collect_text(&inline.nodes, out),
            Node::Text(text) => text.leaves.iter().for_each(|leaf| out.push_str(&leaf.text)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inline {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub data: InlineData,

    #[serde(default)]
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InlineData {
    /// Link target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Emoji code points in hex, `-` separated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Text {
    #[serde(default)]
    pub leaves: Vec<Leaf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Leaf {
    pub text: String,
    #[serde(default)]
    pub marks: Vec<Mark>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mark {
    #[serde(rename = "type")]
    pub kind: MarkKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkKind {
    Bold,
    Italic,
    Code,
    Strikethrough,
    #[serde(other)]
    Other,
}
