//! Site configuration management for `docsite.toml`.
//!
//! # Sections
//!
//! | Section           | Purpose                                           |
//! |-------------------|---------------------------------------------------|
//! | `[site]`          | Site identity (ids, title, public url)            |
//! | `[build]`         | Content and output paths, minify, print mode      |
//! | `[serve]`         | HTTP server (port, interface)                     |
//! | `[insights]`      | Visitor analytics delivery                        |
//! | `[images]`        | Static asset / resizer URLs, cache capacity       |
//! | `[customization]` | Favicon, header preset, colors, fonts, themes     |
//!
//! # Example
//!
//! ```toml
//! [site]
//! id = "site_7f2a"
//! title = "Acme Docs"
//! organization_id = "org_01"
//!
//! [build]
//! content = "content"
//! output = "public"
//!
//! [insights]
//! enable = true
//! api_host = "https://api.acme.dev"
//!
//! [customization.header]
//! preset = "bold"
//! ```

mod build;
mod customization;
pub mod defaults;
mod error;
mod handle;
mod images;
mod insights;
mod serve;
mod site;

pub use customization::{
    CustomFont, CustomizationConfig, Favicon, FontChoice, FontFace, FontSource, HeaderPreset,
    Theme, ThemedValue,
};
pub use handle::{cfg, init_config};

use build::BuildConfig;
use error::ConfigError;
use images::ImagesConfig;
use insights::InsightsConfig;
use serve::ServeConfig;
use site::SiteSection;

use crate::cli::{Cli, Commands};
use anyhow::{Result, bail};
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration structure representing docsite.toml
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    /// Absolute path to the config file (set after loading)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Site identity
    #[serde(default)]
    pub site: SiteSection,

    /// Build settings
    #[serde(default)]
    pub build: BuildConfig,

    /// HTTP server settings
    #[serde(default)]
    pub serve: ServeConfig,

    /// Analytics settings
    #[serde(default)]
    pub insights: InsightsConfig,

    /// Derivative image settings
    #[serde(default)]
    pub images: ImagesConfig,

    /// Site customization
    #[serde(default)]
    pub customization: CustomizationConfig,
}

impl SiteConfig {
    /// Load configuration from file path
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        let config =
            toml::from_str(&content).map_err(|err| ConfigError::Toml(path.to_path_buf(), err))?;
        Ok(config)
    }

    /// Load the config file named by the CLI and apply CLI overrides.
    pub fn load(cli: &Cli) -> Result<Self> {
        let root = cli.root.as_deref().unwrap_or(Path::new("./"));
        let config_path = root.join(&cli.config);

        if !config_path.exists() {
            bail!(ConfigError::NotFound(config_path));
        }

        let mut config = Self::from_path(&config_path)?;
        config.update_with_cli(cli);
        Ok(config)
    }

    /// Get the root directory path
    pub fn get_root(&self) -> &Path {
        self.build.root.as_deref().unwrap_or(Path::new("./"))
    }

    /// Set the root directory path
    pub fn set_root(&mut self, path: &Path) {
        self.build.root = Some(path.to_path_buf())
    }

    /// Update configuration with CLI arguments
    pub fn update_with_cli(&mut self, cli: &Cli) {
        let root = cli
            .root
            .as_ref()
            .cloned()
            .unwrap_or_else(|| self.get_root().to_owned());

        self.update_path_with_root(&root, cli);

        match &cli.command {
            Commands::Build { print, minify } => {
                self.build.print |= *print;
                Self::update_option(&mut self.build.minify, minify.as_ref());
            }
            Commands::Serve {
                interface,
                port,
                insights,
            } => {
                Self::update_option(&mut self.serve.interface, interface.as_ref());
                Self::update_option(&mut self.serve.port, port.as_ref());
                Self::update_option(&mut self.insights.enable, insights.as_ref());
                if self.site.url.is_none() {
                    self.site.url = Some(format!(
                        "http://{}:{}",
                        self.serve.interface, self.serve.port
                    ));
                }
            }
            Commands::Replay { dry_run: true, .. } => {
                self.insights.enable = false;
            }
            _ => {}
        }
    }

    /// Update config option if CLI value is provided
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Update all paths relative to root directory and normalize to absolute paths
    fn update_path_with_root(&mut self, root: &Path, cli: &Cli) {
        // Apply CLI overrides first
        Self::update_option(&mut self.build.content, cli.content.as_ref());
        Self::update_option(&mut self.build.output, cli.output.as_ref());

        // Normalize root to absolute path
        let root = Self::normalize_path(root);
        self.set_root(&root);

        self.config_path = Self::normalize_path(&root.join(&cli.config));
        self.build.content = Self::normalize_path(&root.join(&self.build.content));
        self.build.output = Self::normalize_path(&root.join(&self.build.output));
    }

    /// Normalize a path to absolute, using canonicalize if the path exists
    fn normalize_path(path: &Path) -> PathBuf {
        path.canonicalize().unwrap_or_else(|_| {
            // For non-existent paths, manually make them absolute
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                std::env::current_dir()
                    .map(|cwd| cwd.join(path))
                    .unwrap_or_else(|_| path.to_path_buf())
            }
        })
    }

    /// Validate configuration for the current command
    pub fn validate(&self, cli: &Cli) -> Result<()> {
        if self.site.id.trim().is_empty() {
            bail!(ConfigError::invalid("site.id", "must not be empty"));
        }

        if let Some(url) = &self.site.url
            && !url.starts_with("http")
        {
            bail!(ConfigError::invalid(
                "site.url",
                "must start with http:// or https://"
            ));
        }

        if self.insights.enable {
            match &self.insights.api_host {
                None => bail!(ConfigError::invalid(
                    "insights.api_host",
                    "must be set when [insights.enable] = true"
                )),
                Some(host) if !host.starts_with("http") => bail!(ConfigError::invalid(
                    "insights.api_host",
                    "must start with http:// or https://"
                )),
                _ => {}
            }
        }

        if self.images.cache_capacity == Some(0) {
            bail!(ConfigError::invalid(
                "images.cache_capacity",
                "must be greater than zero"
            ));
        }

        if cli.needs_content() && !self.build.content.is_dir() {
            bail!(ConfigError::invalid(
                "build.content",
                format!("`{}` is not a directory", self.build.content.display())
            ));
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
