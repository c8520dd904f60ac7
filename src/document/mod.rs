//! Document rendering.
//!
//! Maps a page document to HTML. Rendering is a pure recursive walk: a
//! `DocumentContext` (document, display mode) and the ancestor chain flow
//! down, an offscreen latch flows forward across siblings.

mod blocks;
mod inline;
mod node;
mod offscreen;
mod tabs;

pub use blocks::{BlocksOptions, DocumentContext, RenderMode, write_blocks};
pub use inline::emoji_from_code;
pub use node::Document;

use crate::utils::xml::{create_writer, into_string};
use anyhow::Result;

/// Container style of a page body.
const PAGE_BODY_STYLE: &str = "flex w-full flex-col gap-4";

/// Render a whole document to an HTML fragment.
pub fn render_document(document: &Document, mode: RenderMode) -> Result<String> {
    let ctx = DocumentContext { document, mode };
    let mut writer = create_writer();
    write_blocks(
        &mut writer,
        &ctx,
        &document.blocks(),
        &[],
        &BlocksOptions {
            style: PAGE_BODY_STYLE,
            ..BlocksOptions::default()
        },
    )?;
    into_string(writer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_document_wraps_body() {
        let document: Document = serde_json::from_str(
            r#"{ "nodes": [{ "type": "paragraph", "key": "p",
                "nodes": [{ "object": "text", "leaves": [{ "text": "Hi" }] }] }] }"#,
        )
        .unwrap();
        let html = render_document(&document, RenderMode::Default).unwrap();

        assert!(html.starts_with(r#"<div class="flex w-full flex-col gap-4"><p "#));
        assert!(html.ends_with(">Hi</p></div>"));
    }

    #[test]
    fn test_render_empty_document() {
        let html = render_document(&Document::default(), RenderMode::Print).unwrap();
        assert_eq!(html, r#"<div class="flex w-full flex-col gap-4"></div>"#);
    }
}
