//! Static build: render every page of the content directory to html.
//!
//! ```text
//! content/index.json          → public/index.html
//! content/guides/setup.json   → public/guides/setup/index.html
//! ```

use crate::{
    config::SiteConfig,
    content::{Page, PageStore, render_page},
    document::RenderMode,
    log,
    logger::ProgressBars,
    utils::minify::minify,
};
use anyhow::{Context, Result, anyhow};
use rayon::prelude::*;
use std::{
    fs,
    path::{Path, PathBuf},
    sync::atomic::{AtomicBool, Ordering},
};

/// Render all pages in parallel. Returns the number of pages written.
///
/// Stops at the first failing page; the error is logged once.
pub fn build_site(config: &SiteConfig) -> Result<usize> {
    let store = PageStore::load(&config.build.content)?;
    let pages = store.pages();
    let output = &config.build.output;

    fs::create_dir_all(output)
        .with_context(|| format!("Failed to create output dir {}", output.display()))?;

    let mode = if config.build.print {
        RenderMode::Print
    } else {
        RenderMode::Default
    };

    log!("build"; "rendering {} pages...", pages.len());
    let progress = ProgressBars::new_filtered(&[("pages", pages.len())]);
    let has_error = AtomicBool::new(false);

    let result = pages.par_iter().try_for_each(|page| {
        if has_error.load(Ordering::Relaxed) {
            return Err(anyhow!("Aborted"));
        }
        if let Err(e) = write_page(page, config, mode) {
            if !has_error.swap(true, Ordering::Relaxed) {
                log!("error"; "{}: {:#}", page.pathname(), e);
            }
            return Err(anyhow!("Build failed"));
        }
        if let Some(progress) = &progress {
            progress.inc(0);
        }
        Ok(())
    });

    if let Some(progress) = &progress {
        progress.finish();
    }
    result?;

    log!("build"; "{} pages written to {}", pages.len(), output.display());
    Ok(pages.len())
}

/// `output/{path}/index.html`
pub fn page_output_path(output: &Path, page: &Page) -> PathBuf {
    if page.path.is_empty() {
        output.join("index.html")
    } else {
        output.join(&page.path).join("index.html")
    }
}

fn write_page(page: &Page, config: &SiteConfig, mode: RenderMode) -> Result<()> {
    let html = render_page(page, config, mode)?;
    let html = if config.build.minify {
        minify(html.as_bytes(), config).into_owned()
    } else {
        html.into_bytes()
    };

    let path = page_output_path(&config.build.output, page);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(&path, html).with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PAGE: &str = r#"{
        "id": "p1",
        "title": "Setup",
        "document": { "nodes": [
            { "object": "block", "type": "paragraph", "nodes": [
                { "object": "text", "leaves": [{ "text": "Install it." }] }
            ] }
        ] }
    }"#;

    fn project() -> (TempDir, SiteConfig) {
        let dir = TempDir::new().unwrap();
        let content = dir.path().join("content");
        fs::create_dir_all(content.join("guides")).unwrap();
        fs::write(content.join("index.json"), r#"{ "id": "home", "title": "Home" }"#).unwrap();
        fs::write(content.join("guides/setup.json"), PAGE).unwrap();

        let mut config = SiteConfig::default();
        config.site.id = "s".into();
        config.site.title = "Acme".into();
        config.build.content = content;
        config.build.output = dir.path().join("public");
        config.build.minify = false;
        (dir, config)
    }

    #[test]
    fn test_page_output_path() {
        let output = Path::new("/out");
        let mut page = Page::default();
        assert_eq!(page_output_path(output, &page), Path::new("/out/index.html"));

        page.path = "guides/setup".into();
        assert_eq!(
            page_output_path(output, &page),
            Path::new("/out/guides/setup/index.html")
        );
    }

    #[test]
    fn test_build_site_writes_pages() {
        let (dir, config) = project();

        assert_eq!(build_site(&config).unwrap(), 2);

        let home = fs::read_to_string(dir.path().join("public/index.html")).unwrap();
        assert!(home.contains("<title>Home | Acme</title>"));
        let setup = fs::read_to_string(dir.path().join("public/guides/setup/index.html")).unwrap();
        assert!(setup.contains("Install it."));
    }

    #[test]
    fn test_build_site_invalid_page() {
        let (dir, config) = project();
        fs::write(dir.path().join("content/broken.json"), "{").unwrap();

        assert!(build_site(&config).is_err());
    }
}
