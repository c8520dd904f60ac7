//! Page storage.
//!
//! Pages are loaded once and shared between the build workers or the
//! request loop. Reads vastly outnumber writes, hence the `RwLock`.

use super::page::{Page, collect_page_files, load_page, normalize_page_path};
use anyhow::Result;
use parking_lot::RwLock;
use rayon::prelude::*;
use std::{collections::BTreeMap, path::Path, sync::Arc};

/// Thread-safe page index keyed by page path.
#[derive(Debug, Default)]
pub struct PageStore {
    pages: RwLock<BTreeMap<String, Arc<Page>>>,
}

impl PageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every page under `content_dir` in parallel.
    pub fn load(content_dir: &Path) -> Result<Self> {
        let files = collect_page_files(content_dir);
        let pages: Vec<Page> = files
            .par_iter()
            .map(|file| load_page(content_dir, file))
            .collect::<Result<_>>()?;

        let store = Self::new();
        for page in pages {
            store.insert_page(page);
        }
        Ok(store)
    }

    /// Insert or replace a page.
    pub fn insert_page(&self, page: Page) {
        self.pages.write().insert(page.path.clone(), Arc::new(page));
    }

    /// Look a page up by request path (`/guides/setup/` or `guides/setup`).
    pub fn get(&self, path: &str) -> Option<Arc<Page>> {
        self.pages.read().get(&normalize_page_path(path)).cloned()
    }

    /// All pages sorted by path.
    pub fn pages(&self) -> Vec<Arc<Page>> {
        self.pages.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.pages.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn page(path: &str, title: &str) -> Page {
        Page {
            path: path.into(),
            id: format!("id-{title}"),
            title: title.into(),
            ..Page::default()
        }
    }

    #[test]
    fn test_get_normalizes_path() {
        let store = PageStore::new();
        store.insert_page(page("", "Home"));
        store.insert_page(page("guides/setup", "Setup"));

        assert_eq!(store.get("/").unwrap().title, "Home");
        assert_eq!(store.get("/guides/setup/").unwrap().title, "Setup");
        assert!(store.get("/missing").is_none());
    }

    #[test]
    fn test_insert_replaces() {
        let store = PageStore::new();
        store.insert_page(page("a", "Old"));
        store.insert_page(page("a", "New"));

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("a").unwrap().title, "New");
    }

    #[test]
    fn test_load_directory() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("guides")).unwrap();
        fs::write(dir.path().join("index.json"), r#"{ "id": "1", "title": "Home" }"#).unwrap();
        fs::write(
            dir.path().join("guides/index.json"),
            r#"{ "id": "2", "title": "Guides" }"#,
        )
        .unwrap();

        let store = PageStore::load(dir.path()).unwrap();
        let paths: Vec<_> = store.pages().iter().map(|p| p.path.clone()).collect();
        assert_eq!(paths, vec!["", "guides"]);
    }

    #[test]
    fn test_load_fails_on_invalid_page() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("bad.json"), "[]").unwrap();

        assert!(PageStore::load(dir.path()).is_err());
    }
}
