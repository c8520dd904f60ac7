//! `[insights]` section configuration.
//!
//! Controls visitor analytics delivery.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};

/// `[insights]` section in docsite.toml.
///
/// # Example
/// ```toml
/// [insights]
/// enable = true
/// api_host = "https://api.acme.dev"
/// visitor_cookie_tracking = true
/// debounce_ms = 1500
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct InsightsConfig {
    /// Send batches to the collection endpoint. When false, batches are
    /// computed and dropped (dry run).
    #[serde(default)]
    pub enable: bool,

    /// Host of the collection API, e.g. `https://api.acme.dev`.
    #[serde(default)]
    pub api_host: Option<String>,

    /// Honour the visitor id cookie before generating a fresh id.
    #[serde(default)]
    pub visitor_cookie_tracking: bool,

    /// Trailing-edge delay of the batched flush, in milliseconds.
    #[serde(default = "defaults::insights::debounce_ms")]
    #[educe(Default = defaults::insights::debounce_ms())]
    pub debounce_ms: u64,

    /// User agent reported in the session envelope of server-side events.
    #[serde(default = "defaults::insights::user_agent")]
    #[educe(Default = defaults::insights::user_agent())]
    pub user_agent: String,
}

#[cfg(test)]
mod tests {
    use super::super::SiteConfig;

    #[test]
    fn test_insights_defaults() {
        let config: SiteConfig = toml::from_str("[site]\nid = \"s\"\ntitle = \"T\"").unwrap();

        assert!(!config.insights.enable);
        assert_eq!(config.insights.api_host, None);
        assert!(!config.insights.visitor_cookie_tracking);
        assert_eq!(config.insights.debounce_ms, 1500);
        assert!(config.insights.user_agent.starts_with("docsite/"));
    }

    #[test]
    fn test_insights_enabled() {
        let config = r#"
            [site]
            id = "s"
            title = "T"

            [insights]
            enable = true
            api_host = "https://api.acme.dev"
            visitor_cookie_tracking = true
            debounce_ms = 200
        "#;
        let config: SiteConfig = toml::from_str(config).unwrap();

        assert!(config.insights.enable);
        assert_eq!(config.insights.api_host.as_deref(), Some("https://api.acme.dev"));
        assert!(config.insights.visitor_cookie_tracking);
        assert_eq!(config.insights.debounce_ms, 200);
    }
}
