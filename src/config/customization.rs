//! `[customization]` section configuration.
//!
//! Read-only site customization consumed by icon and social preview
//! generation: favicon, header preset, colors, fonts and themes.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};

// ============================================================================
// Themes
// ============================================================================

/// Color theme of a rendered image.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    pub const fn opposite(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

/// A value with one variant per theme.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThemedValue {
    #[serde(default)]
    pub light: String,
    #[serde(default)]
    pub dark: String,
}

impl ThemedValue {
    pub fn same(value: &str) -> Self {
        Self {
            light: value.to_owned(),
            dark: value.to_owned(),
        }
    }

    pub fn get(&self, theme: Theme) -> &str {
        match theme {
            Theme::Light => &self.light,
            Theme::Dark => &self.dark,
        }
    }

    /// Value for `theme`, or `None` when left empty.
    pub fn non_empty(&self, theme: Theme) -> Option<&str> {
        Some(self.get(theme)).filter(|v| !v.is_empty())
    }
}

// ============================================================================
// Favicon / Header
// ============================================================================

/// Site favicon: generated monogram, custom image or emoji.
///
/// ```toml
/// favicon = { emoji = "1f4d8" }
/// # or
/// [customization.favicon.icon]
/// light = "https://acme.dev/icon-light.png"
/// dark = "https://acme.dev/icon-dark.png"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Favicon {
    #[default]
    Default,
    Icon(ThemedValue),
    /// Hex code points, `-` separated (e.g. `1f1eb-1f1f7`).
    Emoji(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderPreset {
    #[default]
    Default,
    Bold,
    Contrast,
    Custom,
    None,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HeaderConfig {
    #[serde(default)]
    pub preset: HeaderPreset,

    /// Header background, used by the `custom` preset.
    #[serde(default)]
    pub background_color: Option<ThemedValue>,

    /// Header link color, used by the `custom` preset.
    #[serde(default)]
    pub link_color: Option<ThemedValue>,

    /// Logo replacing the site title in the header.
    #[serde(default)]
    pub logo: Option<ThemedValue>,
}

// ============================================================================
// Styling
// ============================================================================

/// Either a default (Google-hosted) font family or a custom font.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FontChoice {
    Default(String),
    Custom(CustomFont),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomFont {
    pub family: String,
    #[serde(default)]
    pub faces: Vec<FontFace>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FontFace {
    pub weight: u16,
    pub sources: Vec<FontSource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FontSource {
    pub url: String,
    #[serde(default)]
    pub format: Option<String>,
}

#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct StylingConfig {
    #[serde(default = "defaults::customization::primary_color")]
    #[educe(Default = defaults::customization::primary_color())]
    pub primary_color: ThemedValue,

    #[serde(default = "defaults::customization::font")]
    #[educe(Default = defaults::customization::font())]
    pub font: FontChoice,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThemesConfig {
    #[serde(default)]
    pub default: Theme,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SocialPreviewConfig {
    #[serde(default)]
    pub url: Option<String>,
}

/// `[customization]` section in docsite.toml.
///
/// # Example
/// ```toml
/// [customization]
/// favicon = { emoji = "1f4d8" }
///
/// [customization.header]
/// preset = "bold"
///
/// [customization.styling]
/// primary_color = { light = "#346ddb", dark = "#8ab4f8" }
/// font = "Inter"
///
/// [customization.themes]
/// default = "dark"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomizationConfig {
    #[serde(default)]
    pub favicon: Favicon,

    #[serde(default)]
    pub header: HeaderConfig,

    #[serde(default)]
    pub styling: StylingConfig,

    #[serde(default)]
    pub themes: ThemesConfig,

    #[serde(default)]
    pub social_preview: SocialPreviewConfig,
}
