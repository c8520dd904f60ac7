//! Command-line interface definitions.
//!
//! Defines all CLI arguments and subcommands using clap.

use crate::{config::Theme, routes::icon::IconSize};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Docsite CLI - render pages, site icons and social previews
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Project root directory
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Output directory path (relative to project root)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Content directory path (relative to project root)
    #[arg(short, long)]
    pub content: Option<PathBuf>,

    /// Config file name (default: docsite.toml)
    #[arg(short = 'C', long, default_value = "docsite.toml")]
    pub config: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Render every page of the content directory to html
    Build {
        /// Render pages in print mode (tabs flattened one after the other)
        #[arg(long)]
        print: bool,

        /// Minify the html content
        #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
        minify: Option<bool>,
    },

    /// Serve pages, icons and social previews over http
    Serve {
        /// Interface to bind on
        #[arg(short, long)]
        interface: Option<String>,

        /// The port you should provide
        #[arg(short, long)]
        port: Option<u16>,

        /// Send insights events (overrides `[insights].enable`)
        #[arg(long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
        insights: Option<bool>,
    },

    /// Render the site icon to a png file
    Icon {
        #[arg(long, value_enum, default_value = "small")]
        size: IconSize,

        #[arg(long, value_enum, default_value = "light")]
        theme: Theme,

        /// Output png file
        #[arg(short = 'O', long = "out", default_value = "icon.png")]
        out: PathBuf,
    },

    /// Render the social preview image of a page to a png file
    Ogimage {
        /// Page path, e.g. `guides/install` (site root when omitted)
        page: Option<String>,

        /// Output png file
        #[arg(short = 'O', long = "out", default_value = "ogimage.png")]
        out: PathBuf,
    },

    /// Replay a json-lines capture of insights events through the tracker
    Replay {
        /// Capture file, one event per line
        file: PathBuf,

        /// Compute batches without sending them
        #[arg(long)]
        dry_run: bool,

        /// `Cookie` header of the replayed visitor
        #[arg(long)]
        cookie: Option<String>,
    },
}

impl Cli {
    /// Commands that read pages from `[build].content`.
    pub const fn needs_content(&self) -> bool {
        matches!(
            self.command,
            Commands::Build { .. } | Commands::Serve { .. } | Commands::Ogimage { .. }
        )
    }
}
