//! Site icon: `GET /~site/icon?size={small|medium}&theme={light|dark}`.
//!
//! A custom favicon redirects to its resized image. Otherwise the icon is a
//! monogram (first character of the site title) or the favicon emoji on a
//! rounded square.

use super::{ImageResponse, RouteError, query_param, site_cache_tag};
use crate::{
    config::{Favicon, SiteConfig, Theme},
    document::emoji_from_code,
    graphics::{
        ImageServices, ResizeOptions,
        fonts::system_fonts,
        svg::{SvgCanvas, TextStyle, render_png},
    },
};
use anyhow::Result;
use clap::ValueEnum;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum IconSize {
    /// Favicon.
    #[default]
    Small,
    /// App icon, header and social preview.
    Medium,
}

/// Pixel geometry of an icon size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IconMetrics {
    pub width: u32,
    pub height: u32,
    pub text_size: f32,
    pub border_radius: f32,
}

impl IconSize {
    pub const fn metrics(self) -> IconMetrics {
        match self {
            Self::Small => IconMetrics {
                width: 48,
                height: 48,
                text_size: 32.0,
                border_radius: 8.0,
            },
            Self::Medium => IconMetrics {
                width: 256,
                height: 256,
                text_size: 164.0,
                border_radius: 32.0,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IconOptions {
    pub size: IconSize,
    pub theme: Theme,
}

impl IconOptions {
    /// Parse `size` and `theme` from a query string. Missing parameters take
    /// their defaults (`small`, `light`); unknown values are not found.
    pub fn from_query(query: &str) -> Result<Self, RouteError> {
        let size = match query_param(query, "size") {
            Some(value) => IconSize::from_str(&value, false).map_err(|_| RouteError::NotFound)?,
            None => IconSize::default(),
        };
        let theme = match query_param(query, "theme") {
            Some(value) => Theme::from_str(&value, false).map_err(|_| RouteError::NotFound)?,
            None => Theme::default(),
        };
        Ok(Self { size, theme })
    }
}

pub fn serve_icon(
    config: &SiteConfig,
    services: &ImageServices,
    options: IconOptions,
) -> Result<ImageResponse, RouteError> {
    let metrics = options.size.metrics();

    if let Favicon::Icon(icon) = &config.customization.favicon {
        let url = services.resizer.resized_url(
            icon.get(options.theme),
            ResizeOptions {
                width: metrics.width,
                height: metrics.height,
            },
        );
        return Ok(ImageResponse::Redirect(url));
    }

    Ok(ImageResponse::Png {
        data: render_icon_png(config, options)?,
        cache_tag: site_cache_tag(&config.site.id),
    })
}

/// Glyph drawn on a generated icon.
pub fn icon_glyph(config: &SiteConfig) -> String {
    match &config.customization.favicon {
        Favicon::Emoji(code) => emoji_from_code(code),
        _ => config
            .site
            .title
            .chars()
            .next()
            .map(|c| c.to_uppercase().collect())
            .unwrap_or_default(),
    }
}

/// SVG of a generated icon.
pub fn icon_svg(config: &SiteConfig, options: IconOptions) -> Result<String> {
    let metrics = options.size.metrics();
    let (background, foreground) = match options.theme {
        Theme::Light => ("#ffffff", "#000000"),
        Theme::Dark => ("#000000", "#ffffff"),
    };
    let (width, height) = (metrics.width as f32, metrics.height as f32);

    let mut canvas = SvgCanvas::new(metrics.width, metrics.height)?;
    canvas.rect(0.0, 0.0, width, height, metrics.border_radius, background)?;
    canvas.text(
        width / 2.0,
        height / 2.0,
        &icon_glyph(config),
        &TextStyle {
            font_size: metrics.text_size,
            font_weight: 700,
            fill: foreground,
            anchor: "middle",
            baseline: "central",
            // tracking-tight
            letter_spacing: -0.025 * metrics.text_size,
            ..TextStyle::default()
        },
    )?;
    canvas.finish()
}

/// PNG of a generated icon, drawn with system fonts.
pub fn render_icon_png(config: &SiteConfig, options: IconOptions) -> Result<Vec<u8>> {
    render_png(&icon_svg(config, options)?, system_fonts())
}
