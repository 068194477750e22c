// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// Subcommands:
// - discover: collect the pages linked from a seed page into <host>.txt
// - mirror:   mirror a list of pages (arguments or a URL file) to disk
// - clone:    discover, then mirror everything that was found
//
// Rust concepts:
// - Derive macros: clap builds the parser from the struct definitions
// - #[command(flatten)]: shared flags declared once, reused by two subcommands
// - Option<T>: a flag that was not given leaves the config value alone
// =============================================================================

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::MirrorConfig;

#[derive(Parser, Debug)]
#[command(
    name = "site-mirror",
    version,
    about = "Mirror web pages and their assets to local disk",
    long_about = "site-mirror discovers the pages of a website and saves each one, together with \
                  its stylesheets, scripts, images and fonts, as a self-contained local copy."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Show debug logs (RUST_LOG overrides this)
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Collect the same-site pages linked from a seed page
    ///
    /// Example: site-mirror discover https://example.com
    Discover {
        /// Seed URL; https:// is assumed when no scheme is given
        seed: String,

        /// Where to write the URL list (default: <hostname>.txt)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// TOML config file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Mirror pages to local disk
    ///
    /// Example: site-mirror mirror --input example.com.txt --concurrency 4
    Mirror {
        /// Page URLs to mirror (read from --input when none are given)
        urls: Vec<String>,

        /// Newline-delimited URL list (default: urls.txt)
        #[arg(long, short)]
        input: Option<PathBuf>,

        #[command(flatten)]
        options: MirrorArgs,
    },

    /// Discover the pages linked from a seed, then mirror all of them
    ///
    /// Example: site-mirror clone example.com --output-dir mirrors
    Clone {
        /// Seed URL; https:// is assumed when no scheme is given
        seed: String,

        /// Where to write the URL list (default: <hostname>.txt)
        #[arg(long)]
        frontier: Option<PathBuf>,

        #[command(flatten)]
        options: MirrorArgs,
    },
}

/// Flags shared by the subcommands that mirror pages
#[derive(Args, Debug, Clone, Default)]
pub struct MirrorArgs {
    /// Directory the <host>/pages/... trees are written under
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Asset downloads in flight per page
    #[arg(long, short)]
    pub concurrency: Option<usize>,

    /// Give up on a page after this many seconds
    #[arg(long, value_name = "SECS")]
    pub page_timeout: Option<u64>,

    /// TOML config file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print the report as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

impl MirrorArgs {
    /// Config file (or defaults) with command-line overrides applied
    pub fn resolve_config(&self) -> Result<MirrorConfig> {
        let mut config = load_config(self.config.as_ref())?;
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(secs) = self.page_timeout {
            config.page_timeout_secs = Some(secs);
        }
        Ok(config)
    }
}

pub fn load_config(path: Option<&PathBuf>) -> Result<MirrorConfig> {
    match path {
        Some(path) => MirrorConfig::load(path),
        None => Ok(MirrorConfig::default()),
    }
}
