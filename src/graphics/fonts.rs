//! Font loading for generated images.
//!
//! System fonts are scanned once per process. Site fonts are fetched per
//! request (Google-hosted subsets or custom font files), cached by URL and
//! layered on top of a copy of the system database.

use super::{ImageServices, fetch::fetch_ok};
use crate::{config::CustomFont, log};
use anyhow::{Result, anyhow};
use regex::Regex;
use std::sync::{Arc, LazyLock, OnceLock};
use usvg::fontdb::Database;

const GOOGLE_FONTS_CSS: &str = "https://fonts.googleapis.com/css2";

/// Global system font database, scanned on first use.
static SYSTEM_FONTS: OnceLock<Arc<Database>> = OnceLock::new();

/// First `src: url(...)` of a stylesheet.
static FONT_SRC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"src:\s*url\(\s*['"]?([^'")\s]+)['"]?\s*\)"#).unwrap());

pub fn system_fonts() -> Arc<Database> {
    SYSTEM_FONTS
        .get_or_init(|| {
            let mut db = Database::new();
            db.load_system_fonts();
            Arc::new(db)
        })
        .clone()
}

/// Font file bytes for one weight.
#[derive(Debug, Clone)]
pub struct LoadedFont {
    pub weight: u16,
    pub data: Arc<Vec<u8>>,
}

/// Stylesheet URL of a Google font subset limited to the glyphs of `text`.
pub fn google_font_css_url(family: &str, weight: u16, text: &str) -> String {
    format!(
        "{GOOGLE_FONTS_CSS}?family={}:wght@{weight}&text={}",
        urlencoding::encode(family).replace("%20", "+"),
        urlencoding::encode(text)
    )
}

/// Font file URL declared by a `@font-face` stylesheet.
pub fn parse_font_src(css: &str) -> Option<&str> {
    FONT_SRC
        .captures(css)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Load the `weight` subset of a Google font covering `text`.
///
/// Returns `None` when there is nothing to draw or the font cannot be
/// fetched; text then falls back to system fonts.
pub async fn load_google_font(
    services: &ImageServices,
    family: &str,
    text: &str,
    weight: u16,
) -> Option<LoadedFont> {
    if text.trim().is_empty() {
        return None;
    }

    match fetch_google_font(services, family, text, weight).await {
        Ok(data) => Some(LoadedFont { weight, data }),
        Err(err) => {
            log!("image"; "font {family} {weight} unavailable: {err:#}");
            None
        }
    }
}

async fn fetch_google_font(
    services: &ImageServices,
    family: &str,
    text: &str,
    weight: u16,
) -> Result<Arc<Vec<u8>>> {
    let css_url = google_font_css_url(family, weight, text);
    let css = fetch_ok(services.fetcher.as_ref(), &css_url).await?;
    let css = String::from_utf8_lossy(&css.body);
    let url = parse_font_src(&css)
        .ok_or_else(|| anyhow!("no font source in {css_url}"))?
        .to_owned();

    let data = services
        .files
        .get_or_try_fetch(&format!("google-font-files:{url}"), || async {
            fetch_ok(services.fetcher.as_ref(), &url)
                .await
                .map(|response| Arc::new(response.body))
        })
        .await?;
    Ok(data)
}

/// Source URL of the `weight` face of a custom font: the first declared
/// source, unless it is a WOFF/WOFF2 file the rasterizer cannot read.
pub fn custom_font_source(font: &CustomFont, weight: u16) -> Option<&str> {
    let face = font.faces.iter().find(|face| face.weight == weight)?;
    let source = face.sources.first()?;

    let format = source.format.as_deref().unwrap_or("");
    let url = source.url.to_ascii_lowercase();
    if format.starts_with("woff") || url.ends_with(".woff") || url.ends_with(".woff2") {
        return None;
    }
    Some(&source.url)
}

/// Load a custom font face. Not cached.
pub async fn load_custom_font(services: &ImageServices, url: &str, weight: u16) -> Option<LoadedFont> {
    match fetch_ok(services.fetcher.as_ref(), url).await {
        Ok(response) => Some(LoadedFont {
            weight,
            data: Arc::new(response.body),
        }),
        Err(err) => {
            log!("image"; "custom font {url} unavailable: {err:#}");
            None
        }
    }
}

/// System fonts plus `fonts`, with the family names the added faces
/// declare, in load order and without duplicates.
pub fn font_database(fonts: &[LoadedFont]) -> (Arc<Database>, Vec<String>) {
    if fonts.is_empty() {
        return (system_fonts(), Vec::new());
    }

    let mut db = (*system_fonts()).clone();
    let before = db.len();
    for font in fonts {
        db.load_font_data(font.data.as_ref().clone());
    }

    let mut families: Vec<String> = Vec::new();
    for face in db.faces().skip(before) {
        for (name, _) in &face.families {
            if !families.contains(name) {
                families.push(name.clone());
            }
        }
    }
    (Arc::new(db), families)
}

/// `font-family` attribute value: the loaded families, then a generic
/// fallback.
pub fn font_family_attr(families: &[String]) -> String {
    families
        .iter()
        .map(|name| format!("'{name}'"))
        .chain(std::iter::once("sans-serif".to_owned()))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FontFace, FontSource};
    use crate::graphics::{CachePolicy, fetch::stub::StubFetcher, resize::IdentityResizer};

    fn services(fetcher: StubFetcher) -> ImageServices {
        ImageServices::new(
            Arc::new(fetcher),
            Arc::new(IdentityResizer),
            CachePolicy::Unbounded,
            None,
        )
    }

    fn font(sources: &[(&str, Option<&str>)]) -> CustomFont {
        CustomFont {
            family: "Brand".into(),
            faces: vec![FontFace {
                weight: 400,
                sources: sources
                    .iter()
                    .map(|(url, format)| FontSource {
                        url: (*url).into(),
                        format: format.map(Into::into),
                    })
                    .collect(),
            }],
        }
    }

    #[test]
    fn test_google_font_css_url() {
        assert_eq!(
            google_font_css_url("Open Sans", 700, "Hi & bye"),
            "https://fonts.googleapis.com/css2?family=Open+Sans:wght@700&text=Hi%20%26%20bye"
        );
    }

    #[test]
    fn test_parse_font_src() {
        let css = "@font-face {\n  font-family: 'Inter';\n  src: url(https://fonts.gstatic.com/l/font?kit=abc) format('truetype');\n}";
        assert_eq!(parse_font_src(css), Some("https://fonts.gstatic.com/l/font?kit=abc"));
        assert_eq!(parse_font_src("body {}"), None);
    }

    #[test]
    fn test_custom_font_source_skips_woff() {
        assert_eq!(
            custom_font_source(&font(&[("https://a/r.ttf", Some("truetype"))]), 400),
            Some("https://a/r.ttf")
        );
        assert_eq!(custom_font_source(&font(&[("https://a/r.woff2", None)]), 400), None);
        assert_eq!(custom_font_source(&font(&[("https://a/r", Some("woff"))]), 400), None);
        // Only the first source is considered
        assert_eq!(
            custom_font_source(
                &font(&[("https://a/r.woff2", None), ("https://a/r.ttf", None)]),
                400
            ),
            None
        );
        assert_eq!(custom_font_source(&font(&[("https://a/r.ttf", None)]), 700), None);
    }

    #[test]
    fn test_font_family_attr() {
        assert_eq!(font_family_attr(&[]), "sans-serif");
        assert_eq!(font_family_attr(&["Inter".into()]), "'Inter', sans-serif");
    }

    #[tokio::test]
    async fn test_google_font_file_is_cached() {
        let css_url = google_font_css_url("Inter", 700, "Docs");
        let css = b"@font-face { src: url(https://fonts.gstatic.com/inter.ttf) format('truetype'); }";
        let fetcher = StubFetcher::new()
            .with(&css_url, "text/css", css)
            .with("https://fonts.gstatic.com/inter.ttf", "font/ttf", b"ttf-bytes");
        let services = services(fetcher);

        for _ in 0..2 {
            let font = load_google_font(&services, "Inter", "Docs", 700).await.unwrap();
            assert_eq!(font.weight, 700);
            assert_eq!(font.data.as_slice(), b"ttf-bytes");
        }
        assert_eq!(services.files.len(), 1);
    }

    #[tokio::test]
    async fn test_google_font_soft_failures() {
        let services = services(StubFetcher::new());

        assert!(load_google_font(&services, "Inter", "   ", 400).await.is_none());
        assert!(load_google_font(&services, "Inter", "Docs", 400).await.is_none());
        assert!(services.files.is_empty());
    }
}
