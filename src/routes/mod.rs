//! Image routes: `~site/icon` and `~site/ogimage/{page}`.
//!
//! Handlers are transport-agnostic: they return an `ImageResponse` that the
//! server maps onto HTTP and the CLI writes to disk.

pub mod icon;
pub mod ogimage;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RouteError {
    /// Invalid request parameters. Maps to HTTP 404.
    #[error("not found")]
    NotFound,

    #[error(transparent)]
    Render(#[from] anyhow::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageResponse {
    /// 302 to an externally hosted image.
    Redirect(String),
    /// Generated PNG with its `cache-tag` header value.
    Png { data: Vec<u8>, cache_tag: String },
}

/// Cache tag of everything derived from a site.
pub fn site_cache_tag(site_id: &str) -> String {
    format!("site:{site_id}")
}

/// Cache tag of everything derived from a space.
pub fn space_cache_tag(space_id: &str) -> String {
    format!("space:{space_id}")
}

/// First value of `name` in a query string, percent-decoded.
pub fn query_param(query: &str, name: &str) -> Option<String> {
    query
        .trim_start_matches('?')
        .split('&')
        .filter_map(|pair| match pair.split_once('=') {
            Some((key, value)) => Some((key, value)),
            None if !pair.is_empty() => Some((pair, "")),
            None => None,
        })
        .find(|(key, _)| *key == name)
        .map(|(_, value)| {
            let value = value.replace('+', " ");
            urlencoding::decode(&value)
                .map(|v| v.into_owned())
                .unwrap_or(value)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_param() {
        let query = "?size=medium&theme=dark&size=small&q=a+b%26c&flag";

        assert_eq!(query_param(query, "size").as_deref(), Some("medium"));
        assert_eq!(query_param(query, "theme").as_deref(), Some("dark"));
        assert_eq!(query_param(query, "q").as_deref(), Some("a b&c"));
        assert_eq!(query_param(query, "flag").as_deref(), Some(""));
        assert_eq!(query_param(query, "missing"), None);
        assert_eq!(query_param("", "size"), None);
    }

    #[test]
    fn test_cache_tags() {
        assert_eq!(site_cache_tag("s1"), "site:s1");
        assert_eq!(space_cache_tag("sp"), "space:sp");
    }
}
