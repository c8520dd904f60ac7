//! `[site]` section configuration.
//!
//! Identifiers of the published content. They end up in cache tags, in the
//! insights endpoint and in the location envelope of every tracked event.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};

/// `[site]` section in docsite.toml - published site identity.
///
/// # Example
/// ```toml
/// [site]
/// id = "site_7f2a"
/// title = "Acme Docs"
/// organization_id = "org_01"
/// space_id = "space_main"
/// revision_id = "rev_42"
/// url = "https://docs.acme.dev"
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct SiteSection {
    /// Site identifier.
    pub id: String,

    /// Site title, used for the monogram icon and social previews.
    pub title: String,

    /// Organization owning the site.
    #[serde(default)]
    pub organization_id: String,

    /// Space whose revision is published.
    #[serde(default)]
    pub space_id: String,

    /// Published revision.
    #[serde(default)]
    pub revision_id: String,

    #[serde(default)]
    pub site_section_id: Option<String>,

    #[serde(default)]
    pub site_space_id: Option<String>,

    /// Share key when the site is published behind a share link.
    #[serde(default)]
    pub share_key: Option<String>,

    /// Public base URL, used for absolute page URLs in tracked events.
    #[serde(default)]
    pub url: Option<String>,

    /// BCP 47 language code written to `<html lang>`.
    #[serde(default = "defaults::site::language")]
    #[educe(Default = defaults::site::language())]
    pub language: String,
}
