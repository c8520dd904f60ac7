//! One-shot image generation: `docsite icon` and `docsite ogimage`.

use crate::{
    config::cfg,
    content::PageStore,
    graphics::ImageServices,
    log,
    routes::{
        ImageResponse,
        icon::{IconOptions, serve_icon},
        ogimage::serve_og_image,
    },
};
use anyhow::{Context, Result};
use std::{fs, path::Path};
use tokio::runtime::Handle;

/// Render the site icon to `out`.
pub fn write_icon(options: IconOptions, out: &Path) -> Result<()> {
    let c = cfg();
    let services = ImageServices::from_config(&c)?;
    let response = serve_icon(&c, &services, options)?;
    write_image(response, out)
}

/// Render the social preview of `page` (site root when `None`) to `out`.
pub fn write_og_image(page: Option<&str>, out: &Path, runtime: Handle) -> Result<()> {
    let c = cfg();
    let store = PageStore::load(&c.build.content)?;
    let path = page.unwrap_or_default();
    let page = store.get(path);
    if page.is_none() {
        log!("image"; "no page at `/{}`, rendering the not found card", path.trim_matches('/'));
    }

    let services = ImageServices::from_config(&c)?;
    let response = runtime.block_on(serve_og_image(&c, &services, page.as_deref()))?;
    write_image(response, out)
}

fn write_image(response: ImageResponse, out: &Path) -> Result<()> {
    match response {
        ImageResponse::Redirect(url) => {
            log!("image"; "served from {url}, nothing written");
        }
        ImageResponse::Png { data, .. } => {
            fs::write(out, &data).with_context(|| format!("Failed to write {}", out.display()))?;
            log!("image"; "{} ({} bytes)", out.display(), data.len());
        }
    }
    Ok(())
}
