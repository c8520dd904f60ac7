//! Visitor id resolution.

use super::session::{generate_id, is_valid_id};
use futures::future::BoxFuture;
use std::collections::BTreeMap;

/// Cookie holding the visitor id when cookie tracking is enabled.
pub const VISITOR_COOKIE: &str = "__session_visitor_id";

/// Resolves the id of the current visitor. Resolution may be slow; the
/// tracker calls it at most once and caches the result.
pub trait VisitorIdSource: Send + Sync {
    fn resolve(&self) -> BoxFuture<'_, String>;
}

/// Visitor id from the visitor cookie, or a freshly generated one.
#[derive(Debug, Clone, Default)]
pub struct CookieVisitorSource {
    cookie: Option<String>,
    cookie_tracking: bool,
}

impl CookieVisitorSource {
    pub fn new(cookies: &BTreeMap<String, String>, cookie_tracking: bool) -> Self {
        Self {
            cookie: cookies.get(VISITOR_COOKIE).cloned(),
            cookie_tracking,
        }
    }
}

impl VisitorIdSource for CookieVisitorSource {
    fn resolve(&self) -> BoxFuture<'_, String> {
        Box::pin(async move {
            match &self.cookie {
                Some(id) if self.cookie_tracking && is_valid_id(id) => id.clone(),
                _ => generate_id("visitor"),
            }
        })
    }
}

/// Parse a `Cookie` request header.
pub fn parse_cookies(header: &str) -> BTreeMap<String, String> {
    header
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            let name = name.trim();
            (!name.is_empty()).then(|| (name.to_owned(), value.trim().to_owned()))
        })
        .collect()
}
