//! SVG composition and rasterization.
//!
//! Images are composed as SVG documents through the shared XML writer, then
//! rendered with `resvg` and encoded to PNG.

use crate::utils::xml::{
    XmlWriter, create_writer, into_string, write_empty_elem, write_end, write_start,
    write_text_element,
};
use anyhow::{Context, Result, anyhow};
use resvg::tiny_skia::{Pixmap, Transform};
use std::sync::Arc;
use usvg::fontdb::Database;

/// Text presentation attributes.
#[derive(Debug, Clone, Copy)]
pub struct TextStyle<'a> {
    pub font_family: &'a str,
    pub font_size: f32,
    pub font_weight: u16,
    pub fill: &'a str,
    /// `text-anchor`
    pub anchor: &'a str,
    /// `dominant-baseline`
    pub baseline: &'a str,
    pub letter_spacing: f32,
}

impl Default for TextStyle<'_> {
    fn default() -> Self {
        Self {
            font_family: "sans-serif",
            font_size: 16.0,
            font_weight: 400,
            fill: "#000000",
            anchor: "start",
            baseline: "auto",
            letter_spacing: 0.0,
        }
    }
}

/// An SVG document under construction.
pub struct SvgCanvas {
    writer: XmlWriter,
    width: u32,
    height: u32,
}

impl SvgCanvas {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let mut writer = create_writer();
        let (w, h) = (width.to_string(), height.to_string());
        let view_box = format!("0 0 {width} {height}");
        write_start(
            &mut writer,
            "svg",
            &[
                ("xmlns", "http://www.w3.org/2000/svg"),
                ("xmlns:xlink", "http://www.w3.org/1999/xlink"),
                ("width", w.as_str()),
                ("height", h.as_str()),
                ("viewBox", view_box.as_str()),
            ],
        )?;
        Ok(Self {
            writer,
            width,
            height,
        })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw access for elements without a helper (gradients, groups).
    #[inline]
    pub fn writer(&mut self) -> &mut XmlWriter {
        &mut self.writer
    }

    pub fn rect(&mut self, x: f32, y: f32, width: f32, height: f32, radius: f32, fill: &str) -> Result<()> {
        write_empty_elem(
            &mut self.writer,
            "rect",
            &[
                ("x", num(x).as_str()),
                ("y", num(y).as_str()),
                ("width", num(width).as_str()),
                ("height", num(height).as_str()),
                ("rx", num(radius).as_str()),
                ("fill", fill),
            ],
        )
    }

    /// Embed an image; `href` is usually a `data:` URI.
    pub fn image(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        href: &str,
        preserve_aspect_ratio: &str,
    ) -> Result<()> {
        write_empty_elem(
            &mut self.writer,
            "image",
            &[
                ("x", num(x).as_str()),
                ("y", num(y).as_str()),
                ("width", num(width).as_str()),
                ("height", num(height).as_str()),
                ("preserveAspectRatio", preserve_aspect_ratio),
                ("xlink:href", href),
            ],
        )
    }

    pub fn text(&mut self, x: f32, y: f32, content: &str, style: &TextStyle<'_>) -> Result<()> {
        write_text_element(
            &mut self.writer,
            "text",
            &[
                ("x", num(x).as_str()),
                ("y", num(y).as_str()),
                ("font-family", style.font_family),
                ("font-size", num(style.font_size).as_str()),
                ("font-weight", style.font_weight.to_string().as_str()),
                ("fill", style.fill),
                ("text-anchor", style.anchor),
                ("dominant-baseline", style.baseline),
                ("letter-spacing", num(style.letter_spacing).as_str()),
            ],
            content,
        )
    }

    pub fn finish(mut self) -> Result<String> {
        write_end(&mut self.writer, "svg")?;
        into_string(self.writer)
    }
}

/// Format a coordinate without a trailing `.0`.
fn num(value: f32) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value:.2}")
    }
}

/// Rasterize an SVG document to PNG bytes at its intrinsic size.
pub fn render_png(svg: &str, fontdb: Arc<Database>) -> Result<Vec<u8>> {
    let options = usvg::Options {
        fontdb,
        ..Default::default()
    };
    let tree = usvg::Tree::from_str(svg, &options).context("Failed to parse generated SVG")?;

    let size = tree.size().to_int_size();
    let mut pixmap = Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow!("Invalid image size {}x{}", size.width(), size.height()))?;
    resvg::render(&tree, Transform::default(), &mut pixmap.as_mut());

    pixmap.encode_png().context("Failed to encode PNG")
}

/// Width and height from a PNG header.
pub fn png_dimensions(png: &[u8]) -> Option<(u32, u32)> {
    const SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";
    if png.len() < 24 || !png.starts_with(SIGNATURE) || &png[12..16] != b"IHDR" {
        return None;
    }
    let width = u32::from_be_bytes(png[16..20].try_into().ok()?);
    let height = u32::from_be_bytes(png[20..24].try_into().ok()?);
    Some((width, height))
}
