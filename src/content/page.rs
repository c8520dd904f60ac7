//! Page files.
//!
//! Each page is a JSON file under the content directory:
//!
//! ```json
//! { "id": "page_01", "title": "Quickstart", "description": "...", "document": { "nodes": [] } }
//! ```
//!
//! The page path is the file path relative to the content directory without
//! the `.json` extension; `index.json` maps to its directory.

use crate::document::Document;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use walkdir::WalkDir;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Page {
    /// Page path without leading or trailing slash, `""` for the root page.
    #[serde(skip)]
    pub path: String,

    pub id: String,

    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub document: Document,
}

impl Page {
    /// Public pathname of the page (`/`, `/guides/setup`).
    pub fn pathname(&self) -> String {
        format!("/{}", self.path)
    }
}

/// Normalize a request or file path to a page path.
pub fn normalize_page_path(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    match trimmed.strip_suffix("/index").or((trimmed == "index").then_some("")) {
        Some(parent) => parent.to_owned(),
        None => trimmed.to_owned(),
    }
}

/// Page path of a content file.
fn page_path(content_dir: &Path, file: &Path) -> String {
    let relative = file.strip_prefix(content_dir).unwrap_or(file).with_extension("");
    let joined = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    normalize_page_path(&joined)
}

/// Read one page file.
pub fn load_page(content_dir: &Path, file: &Path) -> Result<Page> {
    let content = fs::read_to_string(file)
        .with_context(|| format!("Failed to read page {}", file.display()))?;
    let mut page: Page = serde_json::from_str(&content)
        .with_context(|| format!("Invalid page {}", file.display()))?;
    page.path = page_path(content_dir, file);
    Ok(page)
}

/// Collect all `.json` page files under `content_dir`, sorted by path.
pub fn collect_page_files(content_dir: &Path) -> Vec<std::path::PathBuf> {
    let mut files: Vec<_> = WalkDir::new(content_dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_normalize_page_path() {
        assert_eq!(normalize_page_path("/"), "");
        assert_eq!(normalize_page_path("index"), "");
        assert_eq!(normalize_page_path("/guides/index/"), "guides");
        assert_eq!(normalize_page_path("/guides/setup/"), "guides/setup");
        assert_eq!(normalize_page_path("reindex"), "reindex");
    }

    #[test]
    fn test_load_page_sets_path() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("guides")).unwrap();
        let file = dir.path().join("guides/setup.json");
        fs::write(&file, r#"{ "id": "p1", "title": "Setup" }"#).unwrap();

        let page = load_page(dir.path(), &file).unwrap();
        assert_eq!(page.path, "guides/setup");
        assert_eq!(page.pathname(), "/guides/setup");
        assert_eq!(page.description, "");
        assert!(page.document.nodes.is_empty());
    }

    #[test]
    fn test_load_page_invalid_json() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("broken.json");
        fs::write(&file, "{").unwrap();

        let err = load_page(dir.path(), &file).unwrap_err();
        assert!(format!("{err:#}").contains("Invalid page"));
    }

    #[test]
    fn test_collect_page_files_skips_other_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("index.json"), "{}").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();

        let files = collect_page_files(dir.path());
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("index.json"));
    }
}
