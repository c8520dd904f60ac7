//! Image generation support.
//!
//! Everything the icon and social preview routes need besides layout:
//! color contrast, font loading, outbound fetching, the asset cache, the
//! resizing service and SVG rasterization.

pub mod cache;
pub mod colors;
pub mod fetch;
pub mod fonts;
pub mod resize;
pub mod svg;

pub use cache::{AssetCache, CachePolicy};
pub use fetch::{FetchError, Fetcher, HttpFetcher};
pub use resize::{CdnResizer, IdentityResizer, ImageResizer, ResizeOptions};

use crate::{config::SiteConfig, log};
use anyhow::Result;
use fetch::fetch_image_data_uri;
use std::{sync::Arc, time::Duration};

/// Shared collaborators of image routes, built once per process.
pub struct ImageServices {
    pub fetcher: Arc<dyn Fetcher>,
    pub resizer: Arc<dyn ImageResizer>,
    /// Font files, keyed `google-font-files:{url}`.
    pub files: AssetCache<Arc<Vec<u8>>>,
    /// Static images as data URIs, keyed `static-image:{url}`.
    pub images: AssetCache<String>,
    /// Base URL of static assets.
    pub static_url: Option<String>,
}

impl ImageServices {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        resizer: Arc<dyn ImageResizer>,
        policy: CachePolicy,
        static_url: Option<String>,
    ) -> Self {
        Self {
            fetcher,
            resizer,
            files: AssetCache::new(policy),
            images: AssetCache::new(policy),
            static_url,
        }
    }

    pub fn from_config(config: &SiteConfig) -> Result<Self> {
        let images = &config.images;
        let fetcher = HttpFetcher::new(
            Duration::from_millis(images.timeout_ms),
            &config.insights.user_agent,
        )?;
        let resizer: Arc<dyn ImageResizer> = match &images.resizer_url {
            Some(base) => Arc::new(CdnResizer::new(base)),
            None => Arc::new(IdentityResizer),
        };

        Ok(Self::new(
            Arc::new(fetcher),
            resizer,
            CachePolicy::from_capacity(images.cache_capacity),
            images.static_url.clone(),
        ))
    }

    /// Absolute URL of a static asset, when a static base URL is configured.
    pub fn static_asset_url(&self, path: &str) -> Option<String> {
        self.static_url
            .as_deref()
            .map(|base| format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/')))
    }

    /// Static image as a cached data URI. Failures are logged and yield
    /// `None`.
    pub async fn static_image(&self, url: &str) -> Option<String> {
        let key = format!("static-image:{url}");
        match self
            .images
            .get_or_try_fetch(&key, || fetch_image_data_uri(self.fetcher.as_ref(), url))
            .await
        {
            Ok(uri) => Some(uri),
            Err(err) => {
                log!("image"; "{err}");
                None
            }
        }
    }

    /// Site-provided image (favicon, logo) as a data URI. Not cached.
    pub async fn image_data_uri(&self, url: &str) -> Option<String> {
        match fetch_image_data_uri(self.fetcher.as_ref(), url).await {
            Ok(uri) => Some(uri),
            Err(err) => {
                log!("image"; "{err}");
                None
            }
        }
    }
}
