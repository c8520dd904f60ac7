//! Docsite - renders documentation pages, site icons and social previews,
//! and records visitor insights.

mod build;
mod cli;
mod config;
mod content;
mod document;
mod graphics;
mod image;
mod insights;
mod logger;
mod replay;
mod routes;
mod serve;
mod utils;

use anyhow::{Context, Result};
use build::build_site;
use clap::Parser;
use cli::{Cli, Commands};
use config::{SiteConfig, cfg, init_config};
use image::{write_icon, write_og_image};
use replay::replay_file;
use routes::icon::IconOptions;
use serve::serve_site;
use tokio::runtime::Runtime;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_config(load_config(&cli)?);

    match &cli.command {
        Commands::Build { .. } => build_site(&cfg()).map(|_| ()),
        Commands::Serve { .. } => {
            let runtime = runtime()?;
            serve_site(runtime.handle().clone())
        }
        Commands::Icon { size, theme, out } => write_icon(
            IconOptions {
                size: *size,
                theme: *theme,
            },
            out,
        ),
        Commands::Ogimage { page, out } => {
            let runtime = runtime()?;
            write_og_image(page.as_deref(), out, runtime.handle().clone())
        }
        Commands::Replay { file, cookie, .. } => {
            let runtime = runtime()?;
            replay_file(file, cookie.as_deref(), runtime.handle().clone())
        }
    }
}

/// Load and validate configuration from CLI arguments
fn load_config(cli: &Cli) -> Result<SiteConfig> {
    let config = SiteConfig::load(cli)?;
    config.validate(cli)?;
    Ok(config)
}

/// Runtime for fetches and insights delivery.
fn runtime() -> Result<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")
}
