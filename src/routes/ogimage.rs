//! Social preview: `GET /~site/ogimage/{page}`.
//!
//! A configured social preview image wins (redirect). Otherwise a 1200×630
//! card is composed from the site customization: gradient and grid over the
//! theme background, the site favicon and title (or the logo), then the page
//! title and description anchored to the bottom.

use super::{
    ImageResponse, RouteError,
    icon::{IconOptions, IconSize, render_icon_png},
    site_cache_tag, space_cache_tag,
};
use crate::{
    config::{CustomizationConfig, Favicon, FontChoice, HeaderPreset, SiteConfig, Theme},
    content::Page,
    document::emoji_from_code,
    graphics::{
        ImageServices, ResizeOptions,
        colors::{DARK_BASE, LIGHT_BASE, color_contrast},
        fetch::data_uri,
        fonts::{
            LoadedFont, custom_font_source, font_database, font_family_attr, load_custom_font,
            load_google_font,
        },
        svg::{SvgCanvas, TextStyle, render_png},
    },
    log,
    utils::xml::{write_empty_elem, write_end, write_start},
};
use anyhow::Result;

pub const OG_WIDTH: u32 = 1200;
pub const OG_HEIGHT: u32 = 630;

const TITLE_LIMIT: usize = 64;
const DESCRIPTION_LIMIT: usize = 164;
const NOT_FOUND_TITLE: &str = "Not found";

const PADDING: f32 = 80.0;
const HEADER_SIZE: f32 = 36.0;
const FAVICON_SIZE: f32 = 40.0;
const LOGO_HEIGHT: f32 = 60.0;
const TITLE_SIZE: f32 = 96.0;
const DESCRIPTION_SIZE: f32 = 36.0;
const DESCRIPTION_LINE_HEIGHT: f32 = 40.0;
const DESCRIPTION_GAP: f32 = 32.0;
/// Average glyph advance, in em, used to wrap text.
const BOLD_ADVANCE: f32 = 0.55;
const REGULAR_ADVANCE: f32 = 0.5;
/// Ascent of the first line above its baseline, in em.
const ASCENT: f32 = 0.8;

// ============================================================================
// Text
// ============================================================================

/// Texts drawn on the card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OgText {
    /// Site title next to the favicon, empty when a logo is shown.
    pub content_title: String,
    pub page_title: String,
    pub page_description: String,
}

pub fn og_text(config: &SiteConfig, page: Option<&Page>) -> OgText {
    let content_title = if config.customization.header.logo.is_some() {
        String::new()
    } else {
        config.site.title.clone()
    };

    let Some(page) = page else {
        return OgText {
            content_title,
            page_title: NOT_FOUND_TITLE.to_owned(),
            page_description: String::new(),
        };
    };

    // A long title leaves no room for the description
    let page_description = if page.title.chars().count() <= TITLE_LIMIT {
        truncate(&page.description, DESCRIPTION_LIMIT)
    } else {
        String::new()
    };

    OgText {
        content_title,
        page_title: truncate(&page.title, TITLE_LIMIT),
        page_description,
    }
}

/// Keep the first `limit` characters, marking the cut with `...`.
fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_owned(),
    }
}

/// Greedy word wrap to at most `max_chars` characters per line. Words
/// longer than a line are split.
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines: Vec<String> = Vec::new();
    let mut line = String::new();
    let mut line_len = 0;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if line_len > 0 {
                lines.push(std::mem::take(&mut line));
                line_len = 0;
            }
            lines.push(word.drain(..max_chars).collect());
        }
        if word.is_empty() {
            continue;
        }

        let needed = if line_len == 0 { word.len() } else { line_len + 1 + word.len() };
        if needed > max_chars {
            lines.push(std::mem::take(&mut line));
            line_len = 0;
        }
        if line_len > 0 {
            line.push(' ');
            line_len += 1;
        }
        line.extend(word.iter());
        line_len += word.len();
    }
    if line_len > 0 {
        lines.push(line);
    }
    lines
}

fn chars_per_line(width: f32, font_size: f32, advance: f32) -> usize {
    (width / (font_size * advance)).floor() as usize
}

// ============================================================================
// Palette
// ============================================================================

/// Grid overlay variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grid {
    White,
    Black,
}

impl Grid {
    pub const fn asset_path(self) -> &'static str {
        match self {
            Self::White => "images/ogimage-grid-white.png",
            Self::Black => "images/ogimage-grid-black.png",
        }
    }

    /// White grid on light text, black grid otherwise.
    fn for_body(body: &str) -> Self {
        if body == LIGHT_BASE { Self::White } else { Self::Black }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    pub background: String,
    pub gradient: String,
    pub title: String,
    pub body: String,
    pub grid: Grid,
}

const fn base_color(theme: Theme) -> &'static str {
    match theme {
        Theme::Light => LIGHT_BASE,
        Theme::Dark => DARK_BASE,
    }
}

/// Card colors for the default theme and header preset.
pub fn palette(customization: &CustomizationConfig) -> Palette {
    let theme = customization.themes.default;
    let primary = customization.styling.primary_color.get(theme);
    let header = &customization.header;
    let candidates = [LIGHT_BASE, DARK_BASE];

    let default = Palette {
        background: base_color(theme).to_owned(),
        gradient: primary.to_owned(),
        title: primary.to_owned(),
        body: base_color(theme.opposite()).to_owned(),
        grid: match theme {
            Theme::Light => Grid::Black,
            Theme::Dark => Grid::White,
        },
    };

    match header.preset {
        HeaderPreset::Custom => {
            let background = header
                .background_color
                .as_ref()
                .and_then(|c| c.non_empty(theme))
                .unwrap_or(&default.background)
                .to_owned();
            let link = header
                .link_color
                .as_ref()
                .and_then(|c| c.non_empty(theme))
                .unwrap_or(&default.gradient)
                .to_owned();
            let body = color_contrast(&background, &candidates).to_owned();
            Palette {
                grid: Grid::for_body(&body),
                background,
                gradient: link.clone(),
                title: link,
                body,
            }
        }
        HeaderPreset::Bold => {
            let contrast = color_contrast(primary, &candidates);
            Palette {
                background: primary.to_owned(),
                gradient: contrast.to_owned(),
                title: contrast.to_owned(),
                body: contrast.to_owned(),
                grid: Grid::for_body(contrast),
            }
        }
        _ => default,
    }
}

// ============================================================================
// Assets
// ============================================================================

/// Mark drawn left of the site title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaviconMark {
    /// Image as a data URI.
    Image(String),
    Emoji(String),
    None,
}

/// Resolved images of the card. Missing entries are simply not drawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OgAssets {
    pub favicon: FaviconMark,
    pub logo: Option<String>,
    pub grid: Option<String>,
}

async fn favicon_mark(config: &SiteConfig, services: &ImageServices, theme: Theme) -> FaviconMark {
    match &config.customization.favicon {
        Favicon::Icon(icon) => services
            .image_data_uri(icon.get(theme))
            .await
            .map_or(FaviconMark::None, FaviconMark::Image),
        Favicon::Emoji(code) => FaviconMark::Emoji(emoji_from_code(code)),
        Favicon::Default => {
            let options = IconOptions {
                size: IconSize::Medium,
                theme,
            };
            match render_icon_png(config, options) {
                Ok(png) => FaviconMark::Image(data_uri("image/png", &png)),
                Err(err) => {
                    log!("image"; "default icon: {err:#}");
                    FaviconMark::None
                }
            }
        }
    }
}

async fn load_logo(config: &SiteConfig, services: &ImageServices, theme: Theme) -> Option<String> {
    let logo = config.customization.header.logo.as_ref()?;
    services.image_data_uri(logo.get(theme)).await
}

async fn load_grid(services: &ImageServices, grid: Grid) -> Option<String> {
    let url = services.static_asset_url(grid.asset_path())?;
    services.static_image(&url).await
}

/// Load the fonts of the card, weights concurrently.
///
/// Google fonts are subset: regular weight for the description only, bold
/// for the site and page titles. Custom fonts load their 400 and 700 faces.
async fn load_fonts(services: &ImageServices, font: &FontChoice, text: &OgText) -> Vec<LoadedFont> {
    let (regular, bold) = match font {
        FontChoice::Default(family) => {
            let bold_text = format!("{}{}", text.content_title, text.page_title);
            tokio::join!(
                load_google_font(services, family, &text.page_description, 400),
                load_google_font(services, family, &bold_text, 700),
            )
        }
        FontChoice::Custom(custom) => {
            let load = |weight: u16| async move {
                let url = custom_font_source(custom, weight)?;
                load_custom_font(services, url, weight).await
            };
            tokio::join!(load(400), load(700))
        }
    };
    [regular, bold].into_iter().flatten().collect()
}

// ============================================================================
// Composition
// ============================================================================

/// SVG of the card.
pub fn og_svg(
    text: &OgText,
    palette: &Palette,
    assets: &OgAssets,
    font_family: &str,
) -> Result<String> {
    let (width, height) = (OG_WIDTH as f32, OG_HEIGHT as f32);
    let mut canvas = SvgCanvas::new(OG_WIDTH, OG_HEIGHT)?;

    // Background, top-right gradient, grid
    canvas.rect(0.0, 0.0, width, height, 0.0, &palette.background)?;
    {
        let w = canvas.writer();
        write_start(w, "defs", &[])?;
        write_start(
            w,
            "radialGradient",
            &[("id", "og-gradient"), ("cx", "100%"), ("cy", "0%"), ("r", "100%")],
        )?;
        write_empty_elem(
            w,
            "stop",
            &[("offset", "0"), ("stop-color", palette.gradient.as_str())],
        )?;
        write_empty_elem(
            w,
            "stop",
            &[
                ("offset", "1"),
                ("stop-color", palette.gradient.as_str()),
                ("stop-opacity", "0"),
            ],
        )?;
        write_end(w, "radialGradient")?;
        write_end(w, "defs")?;
        write_empty_elem(
            w,
            "rect",
            &[
                ("width", "100%"),
                ("height", "100%"),
                ("fill", "url(#og-gradient)"),
                ("opacity", "0.5"),
            ],
        )?;
    }
    if let Some(grid) = &assets.grid {
        canvas.image(0.0, 0.0, width, height, grid, "none")?;
    }

    let bold = TextStyle {
        font_family,
        font_weight: 700,
        fill: &palette.body,
        ..TextStyle::default()
    };

    // Header
    if let Some(logo) = &assets.logo {
        canvas.image(PADDING, PADDING, width - 2.0 * PADDING, LOGO_HEIGHT, logo, "xMinYMin meet")?;
    } else {
        let center = PADDING + FAVICON_SIZE / 2.0;
        let mut x = PADDING;
        match &assets.favicon {
            FaviconMark::Image(src) => {
                canvas.image(x, PADDING, FAVICON_SIZE, FAVICON_SIZE, src, "xMidYMid meet")?;
                x += FAVICON_SIZE + 16.0;
            }
            FaviconMark::Emoji(emoji) => {
                canvas.text(x, center, emoji, &TextStyle {
                    font_size: HEADER_SIZE,
                    baseline: "central",
                    ..bold
                })?;
                x += HEADER_SIZE * 1.2 + 16.0;
            }
            FaviconMark::None => {}
        }
        canvas.text(x, center, &text.content_title, &TextStyle {
            font_size: HEADER_SIZE,
            baseline: "central",
            ..bold
        })?;
    }

    // Title and description, bottom aligned
    let content_width = width - 2.0 * PADDING;
    let title_lines = wrap_text(
        &text.page_title,
        chars_per_line(content_width, TITLE_SIZE, BOLD_ADVANCE),
    );
    let description_lines = wrap_text(
        &text.page_description,
        chars_per_line(content_width * 0.75, DESCRIPTION_SIZE, REGULAR_ADVANCE),
    );

    let title_height = title_lines.len() as f32 * TITLE_SIZE;
    let description_height = if description_lines.is_empty() {
        0.0
    } else {
        DESCRIPTION_GAP + description_lines.len() as f32 * DESCRIPTION_LINE_HEIGHT
    };
    let top = height - PADDING - title_height - description_height;

    let title_style = TextStyle {
        font_size: TITLE_SIZE,
        fill: &palette.title,
        // tracking-tight
        letter_spacing: -0.025 * TITLE_SIZE,
        ..bold
    };
    for (i, line) in title_lines.iter().enumerate() {
        let y = top + i as f32 * TITLE_SIZE + ASCENT * TITLE_SIZE;
        canvas.text(PADDING, y, line, &title_style)?;
    }

    let description_style = TextStyle {
        font_family,
        font_size: DESCRIPTION_SIZE,
        font_weight: 400,
        fill: &palette.body,
        ..TextStyle::default()
    };
    let description_top = top + title_height + DESCRIPTION_GAP;
    for (i, line) in description_lines.iter().enumerate() {
        let y = description_top + i as f32 * DESCRIPTION_LINE_HEIGHT + ASCENT * DESCRIPTION_SIZE;
        canvas.text(PADDING, y, line, &description_style)?;
    }

    canvas.finish()
}

pub async fn serve_og_image(
    config: &SiteConfig,
    services: &ImageServices,
    page: Option<&Page>,
) -> Result<ImageResponse, RouteError> {
    let customization = &config.customization;

    if let Some(url) = customization
        .social_preview
        .url
        .as_deref()
        .filter(|url| !url.is_empty())
    {
        let url = services.resizer.resized_url(
            url,
            ResizeOptions {
                width: OG_WIDTH,
                height: OG_HEIGHT,
            },
        );
        return Ok(ImageResponse::Redirect(url));
    }

    let text = og_text(config, page);
    let palette = palette(customization);
    let theme = customization.themes.default;

    let (fonts, favicon, logo, grid) = tokio::join!(
        load_fonts(services, &customization.styling.font, &text),
        favicon_mark(config, services, theme),
        load_logo(config, services, theme),
        load_grid(services, palette.grid),
    );
    let (fontdb, families) = font_database(&fonts);

    let assets = OgAssets {
        favicon,
        logo,
        grid,
    };
    let svg = og_svg(&text, &palette, &assets, &font_family_attr(&families))?;

    Ok(ImageResponse::Png {
        data: render_png(&svg, fontdb)?,
        cache_tag: format!(
            "{},{}",
            site_cache_tag(&config.site.id),
            space_cache_tag(&config.site.space_id)
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ThemedValue;
    use crate::graphics::{
        CachePolicy, IdentityResizer, fetch::stub::StubFetcher, svg::png_dimensions,
    };
    use std::sync::Arc;

    fn config() -> SiteConfig {
        let mut config = SiteConfig::default();
        config.site.id = "site_1".into();
        config.site.space_id = "space_1".into();
        config.site.title = "Acme".into();
        config
    }

    fn page(title: &str, description: &str) -> Page {
        Page {
            path: "p".into(),
            id: "page_1".into(),
            title: title.into(),
            description: description.into(),
            ..Page::default()
        }
    }

    fn services(fetcher: StubFetcher, static_url: Option<&str>) -> ImageServices {
        ImageServices::new(
            Arc::new(fetcher),
            Arc::new(IdentityResizer),
            CachePolicy::Unbounded,
            static_url.map(Into::into),
        )
    }

    #[test]
    fn test_long_title_truncated_without_description() {
        let title = "a".repeat(65);
        let text = og_text(&config(), Some(&page(&title, "Some description")));

        assert_eq!(text.page_title, format!("{}...", "a".repeat(64)));
        assert_eq!(text.page_description, "");
    }

    #[test]
    fn test_title_at_limit_keeps_description() {
        let title = "b".repeat(64);
        let description = "d".repeat(200);
        let text = og_text(&config(), Some(&page(&title, &description)));

        assert_eq!(text.page_title, title);
        assert_eq!(text.page_description, format!("{}...", "d".repeat(164)));
        assert_eq!(text.content_title, "Acme");
    }

    #[test]
    fn test_missing_page() {
        let text = og_text(&config(), None);

        assert_eq!(text.page_title, "Not found");
        assert_eq!(text.page_description, "");
    }

    #[test]
    fn test_logo_hides_site_title() {
        let mut config = config();
        config.customization.header.logo = Some(ThemedValue::same("https://a/logo.png"));

        assert_eq!(og_text(&config, None).content_title, "");
    }

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate("héllo", 2), "hé...");
        assert_eq!(truncate("héllo", 5), "héllo");
    }

    #[test]
    fn test_wrap_text() {
        assert_eq!(wrap_text("the quick brown fox", 9), vec!["the quick", "brown fox"]);
        assert_eq!(wrap_text("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
        assert!(wrap_text("   ", 10).is_empty());
    }

    #[test]
    fn test_default_palette() {
        let mut config = config();
        let light = palette(&config.customization);
        assert_eq!(
            light,
            Palette {
                background: "#ffffff".into(),
                gradient: "#346ddb".into(),
                title: "#346ddb".into(),
                body: "#111827".into(),
                grid: Grid::Black,
            }
        );

        config.customization.themes.default = Theme::Dark;
        let dark = palette(&config.customization);
        assert_eq!(dark.background, "#111827");
        assert_eq!(dark.body, "#ffffff");
        assert_eq!(dark.grid, Grid::White);
    }

    #[test]
    fn test_bold_palette_from_primary() {
        let mut config = config();
        config.customization.header.preset = HeaderPreset::Bold;
        let bold = palette(&config.customization);

        assert_eq!(bold.background, "#346ddb");
        assert_eq!(bold.gradient, "#ffffff");
        assert_eq!(bold.title, "#ffffff");
        assert_eq!(bold.body, "#ffffff");
        assert_eq!(bold.grid, Grid::White);

        config.customization.styling.primary_color = ThemedValue::same("#ffcc00");
        let bright = palette(&config.customization);
        assert_eq!(bright.body, "#111827");
        assert_eq!(bright.grid, Grid::Black);
    }

    #[test]
    fn test_custom_palette() {
        let mut config = config();
        config.customization.header.preset = HeaderPreset::Custom;
        config.customization.header.background_color = Some(ThemedValue {
            light: "#0b1d3a".into(),
            dark: String::new(),
        });
        let custom = palette(&config.customization);

        assert_eq!(custom.background, "#0b1d3a");
        assert_eq!(custom.gradient, "#346ddb");
        assert_eq!(custom.body, "#ffffff");
        assert_eq!(custom.grid, Grid::White);

        config.customization.header.link_color = Some(ThemedValue::same("#ff0000"));
        config.customization.themes.default = Theme::Dark;
        let dark = palette(&config.customization);
        // Empty dark background falls back to the base color
        assert_eq!(dark.background, "#111827");
        assert_eq!(dark.title, "#ff0000");
        assert_eq!(dark.body, "#ffffff");
    }

    #[test]
    fn test_og_svg_content() {
        let text = og_text(&config(), Some(&page("Quickstart", "Install & configure")));
        let assets = OgAssets {
            favicon: FaviconMark::Emoji("\u{1f4d8}".into()),
            logo: None,
            grid: Some("data:image/png;base64,AA==".into()),
        };
        let svg = og_svg(&text, &palette(&config().customization), &assets, "'Inter', sans-serif").unwrap();

        assert!(svg.contains(r##"<stop offset="0" stop-color="#346ddb"/>"##));
        assert!(svg.contains(">Quickstart</text>"));
        assert!(svg.contains(">Install &amp; configure</text>"));
        assert!(svg.contains(">Acme</text>"));
        assert!(svg.contains("\u{1f4d8}"));
        assert!(svg.contains(r#"preserveAspectRatio="none""#));
    }

    #[tokio::test]
    async fn test_social_preview_redirects() {
        let mut config = config();
        config.customization.social_preview.url = Some("https://a/preview.png".into());

        let response = serve_og_image(&config, &services(StubFetcher::new(), None), None)
            .await
            .unwrap();
        assert_eq!(response, ImageResponse::Redirect("https://a/preview.png".into()));
    }

    #[tokio::test]
    async fn test_render_card() {
        let fetcher = StubFetcher::new().with(
            "https://static.acme.dev/images/ogimage-grid-black.png",
            "text/plain",
            b"oops",
        );
        let services = services(fetcher, Some("https://static.acme.dev"));
        let page = page("Quickstart", "Get going");

        let response = serve_og_image(&config(), &services, Some(&page)).await.unwrap();
        let ImageResponse::Png { data, cache_tag } = response else {
            panic!("expected a png");
        };
        assert_eq!(png_dimensions(&data), Some((OG_WIDTH, OG_HEIGHT)));
        assert_eq!(cache_tag, "site:site_1,space:space_1");
        // Non-image grid response is skipped and not cached
        assert!(services.images.is_empty());
    }

    async fn font_requests(page: &Page) -> Vec<String> {
        let fetcher = Arc::new(StubFetcher::new());
        let services = ImageServices::new(
            fetcher.clone(),
            Arc::new(IdentityResizer),
            CachePolicy::Unbounded,
            None,
        );
        serve_og_image(&config(), &services, Some(page)).await.unwrap();

        fetcher
            .calls()
            .into_iter()
            .filter(|url| url.starts_with("https://fonts.googleapis.com/css2"))
            .collect()
    }

    #[tokio::test]
    async fn test_google_font_subsets() {
        let requests = font_requests(&page("Quickstart", "Get going")).await;

        let bold: Vec<_> = requests.iter().filter(|url| url.contains(":wght@700&")).collect();
        assert_eq!(bold.len(), 1);
        assert!(bold[0].ends_with("&text=AcmeQuickstart"));

        let regular: Vec<_> = requests.iter().filter(|url| url.contains(":wght@400&")).collect();
        assert_eq!(regular.len(), 1);
        assert!(regular[0].ends_with("&text=Get%20going"));
    }

    #[tokio::test]
    async fn test_no_regular_font_without_description() {
        let title = "A".repeat(TITLE_LIMIT + 1);
        let requests = font_requests(&page(&title, "Never shown")).await;

        assert!(requests.iter().any(|url| url.contains(":wght@700&")));
        assert!(!requests.iter().any(|url| url.contains(":wght@400&")));
    }
}
