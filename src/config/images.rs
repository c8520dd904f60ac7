//! `[images]` section configuration.
//!
//! Where derivative images fetch their inputs from, and how much of it they
//! keep in memory.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};

/// `[images]` section in docsite.toml.
///
/// # Example
/// ```toml
/// [images]
/// static_url = "https://static.acme.dev"       # serves images/ogimage-grid-*.png
/// resizer_url = "https://docs.acme.dev"        # cdn-cgi/image resizing
/// cache_capacity = 64                          # omit for an unbounded cache
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct ImagesConfig {
    /// Base URL of static assets (grid overlays).
    #[serde(default)]
    pub static_url: Option<String>,

    /// Base URL of the image resizing service. Custom images are used as-is
    /// when unset.
    #[serde(default)]
    pub resizer_url: Option<String>,

    /// Maximum number of cached font/image entries, least recently used
    /// evicted first. Unbounded when unset.
    #[serde(default)]
    pub cache_capacity: Option<usize>,

    /// Timeout of a single font or image fetch.
    #[serde(default = "defaults::images::timeout_ms")]
    #[educe(Default = defaults::images::timeout_ms())]
    pub timeout_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::super::SiteConfig;

    #[test]
    fn test_images_defaults() {
        let config: SiteConfig = toml::from_str("[site]\nid = \"s\"\ntitle = \"T\"").unwrap();

        assert_eq!(config.images.static_url, None);
        assert_eq!(config.images.resizer_url, None);
        assert_eq!(config.images.cache_capacity, None);
        assert_eq!(config.images.timeout_ms, 10_000);
    }

    #[test]
    fn test_images_capacity() {
        let config = "[site]\nid = \"s\"\ntitle = \"T\"\n[images]\ncache_capacity = 8\n";
        let config: SiteConfig = toml::from_str(config).unwrap();

        assert_eq!(config.images.cache_capacity, Some(8));
    }
}
