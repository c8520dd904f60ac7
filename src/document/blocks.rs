//! Block rendering.
//!
//! `write_blocks` wraps a block list in a container element,
//! `write_unwrapped_blocks` renders the list directly into its parent.
//! Both walk the list in order and carry an offscreen latch forward: once a
//! block is estimated to be below the first viewport, every later sibling is
//! treated as offscreen too.

use super::{
    inline::write_inline_nodes,
    node::{Block, Document},
    offscreen::is_block_offscreen,
    tabs::write_tabs,
};
use crate::utils::{
    slug::slugify_anchor,
    xml::{XmlWriter, write_empty_elem, write_end, write_start, write_text, write_text_element},
};
use anyhow::Result;

/// Classes shared by every rendered block.
const BLOCK_BASE_CLASS: &str = "mx-auto w-full decoration-primary/6";
const WIDE_CLASS: &str = "max-w-screen-2xl";
const NARROW_CLASS: &str = "page-full-width:ml-0 max-w-3xl";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RenderMode {
    /// Interactive page.
    #[default]
    Default,
    /// Printable page: interactive widgets are flattened.
    Print,
}

/// Context shared by a whole render pass.
#[derive(Debug, Clone, Copy)]
pub struct DocumentContext<'a> {
    pub document: &'a Document,
    pub mode: RenderMode,
}

/// Options of a block list.
#[derive(Debug, Clone, Copy)]
pub struct BlocksOptions<'s> {
    /// Container element.
    pub tag: &'s str,
    /// Container class.
    pub style: &'s str,
    /// Class appended to every block of the list.
    pub block_style: &'s str,
    /// Start with the latch already set.
    pub is_offscreen: bool,
}

impl Default for BlocksOptions<'_> {
    fn default() -> Self {
        Self {
            tag: "div",
            style: "",
            block_style: "",
            is_offscreen: false,
        }
    }
}

/// A single block as seen by its renderer.
#[derive(Debug, Clone, Copy)]
pub struct BlockProps<'a> {
    pub block: &'a Block,
    pub ancestors: &'a [&'a Block],
    pub key: &'a str,
    pub style: &'a str,
    pub is_offscreen: bool,
}

/// Render `nodes` inside a `tag` container.
pub fn write_blocks(
    writer: &mut XmlWriter,
    ctx: &DocumentContext<'_>,
    nodes: &[&Block],
    ancestors: &[&Block],
    options: &BlocksOptions<'_>,
) -> Result<()> {
    write_start(writer, options.tag, &class_attr(options.style))?;
    write_unwrapped_blocks(
        writer,
        ctx,
        nodes,
        ancestors,
        options.block_style,
        options.is_offscreen,
    )?;
    write_end(writer, options.tag)
}

/// Render `nodes` without a container.
pub fn write_unwrapped_blocks(
    writer: &mut XmlWriter,
    ctx: &DocumentContext<'_>,
    nodes: &[&Block],
    ancestors: &[&Block],
    block_style: &str,
    is_offscreen: bool,
) -> Result<()> {
    let flags = offscreen_flags(ctx.document, nodes, ancestors, is_offscreen);

    for (index, (block, offscreen)) in nodes.iter().zip(flags).enumerate() {
        let key = block.key_or_index(index);
        let style = block_class(block, block_style);
        write_block(
            writer,
            ctx,
            &BlockProps {
                block,
                ancestors,
                key: &key,
                style: &style,
                is_offscreen: offscreen,
            },
        )?;
    }
    Ok(())
}

/// Offscreen flag of each block in `nodes`, latched: the sequence is
/// monotonic, `false` values only before the first `true`.
pub fn offscreen_flags(
    document: &Document,
    nodes: &[&Block],
    ancestors: &[&Block],
    is_offscreen: bool,
) -> Vec<bool> {
    let mut latch = is_offscreen;
    nodes
        .iter()
        .map(|block| {
            latch = latch || is_block_offscreen(document, block, ancestors);
            latch
        })
        .collect()
}

/// Class list of a block: base, width container, then `block_style`.
pub fn block_class(block: &Block, block_style: &str) -> String {
    let width = if block.data.full_width {
        WIDE_CLASS
    } else {
        NARROW_CLASS
    };
    [BLOCK_BASE_CLASS, width, block_style]
        .into_iter()
        .filter(|class| !class.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn class_attr(style: &str) -> Vec<(&str, &str)> {
    if style.is_empty() {
        Vec::new()
    } else {
        vec![("class", style)]
    }
}

/// Render one block according to its type.
pub fn write_block(
    writer: &mut XmlWriter,
    ctx: &DocumentContext<'_>,
    props: &BlockProps<'_>,
) -> Result<()> {
    let block = props.block;
    let base = [("class", props.style), ("data-key", props.key)];

    match block.kind.as_str() {
        "paragraph" => {
            write_start(writer, "p", &base)?;
            write_inline_nodes(writer, &block.nodes)?;
            write_end(writer, "p")
        }
        "heading-1" | "heading-2" | "heading-3" => write_heading(writer, props),
        "list-unordered" | "list-tasks" => write_container(writer, ctx, props, "ul", &base),
        "list-ordered" => write_container(writer, ctx, props, "ol", &base),
        "list-item" => write_list_item(writer, ctx, props),
        "blockquote" => write_container(writer, ctx, props, "blockquote", &base),
        "hint" => {
            let class = format!(
                "{} hint hint-{}",
                props.style,
                block.data.style.as_deref().unwrap_or("info")
            );
            let attrs = [("class", class.as_str()), ("data-key", props.key), ("role", "note")];
            write_container(writer, ctx, props, "div", &attrs)
        }
        "code" => write_code(writer, props),
        "divider" => write_empty_elem(writer, "hr", &base),
        "image" => write_image(writer, props),
        "tabs" => write_tabs(writer, ctx, props),
        _ => {
            let attrs = [
                ("class", props.style),
                ("data-key", props.key),
                ("data-block", block.kind.as_str()),
            ];
            write_container(writer, ctx, props, "div", &attrs)
        }
    }
}

/// Render a block whose children are either blocks or inline content.
fn write_container(
    writer: &mut XmlWriter,
    ctx: &DocumentContext<'_>,
    props: &BlockProps<'_>,
    tag: &str,
    attrs: &[(&str, &str)],
) -> Result<()> {
    write_start(writer, tag, attrs)?;
    write_children(writer, ctx, props)?;
    write_end(writer, tag)
}

fn write_children(
    writer: &mut XmlWriter,
    ctx: &DocumentContext<'_>,
    props: &BlockProps<'_>,
) -> Result<()> {
    let children = props.block.child_blocks();
    if children.is_empty() {
        return write_inline_nodes(writer, &props.block.nodes);
    }

    let mut ancestors = props.ancestors.to_vec();
    ancestors.push(props.block);
    write_unwrapped_blocks(writer, ctx, &children, &ancestors, "", props.is_offscreen)
}

fn write_heading(writer: &mut XmlWriter, props: &BlockProps<'_>) -> Result<()> {
    let block = props.block;
    let tag = match block.kind.as_str() {
        "heading-1" => "h2",
        "heading-2" => "h3",
        _ => "h4",
    };
    let id = match &block.meta.id {
        Some(id) => id.clone(),
        None => slugify_anchor(&block.plain_text()),
    };

    write_start(
        writer,
        tag,
        &[("id", id.as_str()), ("class", props.style), ("data-key", props.key)],
    )?;
    write_inline_nodes(writer, &block.nodes)?;
    write_end(writer, tag)
}

fn write_list_item(
    writer: &mut XmlWriter,
    ctx: &DocumentContext<'_>,
    props: &BlockProps<'_>,
) -> Result<()> {
    write_start(writer, "li", &[("class", props.style), ("data-key", props.key)])?;
    if let Some(checked) = props.block.data.checked {
        let mut attrs = vec![("type", "checkbox"), ("disabled", "")];
        if checked {
            attrs.push(("checked", ""));
        }
        write_empty_elem(writer, "input", &attrs)?;
    }
    write_children(writer, ctx, props)?;
    write_end(writer, "li")
}

fn write_code(writer: &mut XmlWriter, props: &BlockProps<'_>) -> Result<()> {
    let block = props.block;
    let lines: Vec<String> = match block.child_blocks() {
        lines if lines.is_empty() => vec![block.plain_text()],
        lines => lines.into_iter().map(Block::plain_text).collect(),
    };
    let lang = block.data.syntax.as_deref().unwrap_or("text");

    write_start(writer, "pre", &[("class", props.style), ("data-key", props.key)])?;
    write_start(writer, "code", &[("data-lang", lang)])?;
    write_text(writer, &lines.join("\n"))?;
    write_end(writer, "code")?;
    write_end(writer, "pre")
}

fn write_image(writer: &mut XmlWriter, props: &BlockProps<'_>) -> Result<()> {
    let data = &props.block.data;
    let loading = if props.is_offscreen { "lazy" } else { "eager" };

    write_start(writer, "figure", &[("class", props.style), ("data-key", props.key)])?;
    write_empty_elem(
        writer,
        "img",
        &[
            ("src", data.src.as_deref().unwrap_or("")),
            ("alt", data.alt.as_deref().unwrap_or("")),
            ("loading", loading),
        ],
    )?;
    if let Some(caption) = &data.caption {
        write_text_element(writer, "figcaption", &[], caption)?;
    }
    write_end(writer, "figure")
}
