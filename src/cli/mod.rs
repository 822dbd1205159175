//! CLI argument parsing for denotify
//!
//! A single command: `denotify [OPTIONS] <INPUT> <OUTPUT>`. Flags form the
//! highest-priority configuration layer; unset flags leave config-file
//! values alone.

pub mod output;
pub mod parse;

use clap::Parser;
use std::path::PathBuf;

use denotify_core::config::{AssetPolicy, ConfigOverlay, OutputFormat};
use parse::{parse_asset_policy, parse_output_format};

/// Denotify - convert an Obsidian vault into a Denote note collection
#[derive(Parser, Debug)]
#[command(name = "denotify")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Obsidian vault directory, or a single note file
    pub input: PathBuf,

    /// Directory to write the Denote collection into
    pub output: PathBuf,

    /// Output note format: org or md
    #[arg(long, short = 'f', value_parser = parse_output_format)]
    pub format: Option<OutputFormat>,

    /// Keep wikilink syntax in markdown output (targets are still rewritten)
    #[arg(long, overrides_with = "no_preserve_links")]
    pub preserve_links: bool,

    /// Write markdown links even if a config file enables --preserve-links
    #[arg(long, overrides_with = "preserve_links")]
    pub no_preserve_links: bool,

    /// Mirror the vault's folder layout instead of flattening
    #[arg(long, overrides_with = "no_preserve_structure")]
    pub preserve_structure: bool,

    /// Flatten output even if a config file enables --preserve-structure
    #[arg(long, overrides_with = "preserve_structure")]
    pub no_preserve_structure: bool,

    /// Add each folder in a note's path as a keyword
    #[arg(long, overrides_with = "no_add_folder_tags")]
    pub add_folder_tags: bool,

    /// Skip folder keywords even if a config file enables --add-folder-tags
    #[arg(long, overrides_with = "add_folder_tags")]
    pub no_add_folder_tags: bool,

    /// Asset handling: copy, link or ignore
    #[arg(long, value_parser = parse_asset_policy)]
    pub assets: Option<AssetPolicy>,

    /// Subdirectory of the output that copied assets go into
    #[arg(long)]
    pub assets_dir: Option<String>,

    /// Maximum slug length
    #[arg(long)]
    pub slug_max_len: Option<usize>,

    /// Extra config file (applied after global and vault config)
    #[arg(long, env = "DENOTIFY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Show what would be converted without writing anything
    #[arg(long, short = 'n')]
    pub dry_run: bool,

    /// Print the conversion report as JSON
    #[arg(long)]
    pub json: bool,

    /// Suppress warnings and the summary
    #[arg(long, short)]
    pub quiet: bool,

    /// Verbose logging
    #[arg(long, short)]
    pub verbose: bool,

    /// Log level or filter directive (e.g. "debug", "denotify_core=trace")
    #[arg(long)]
    pub log_level: Option<String>,

    /// Emit logs as JSON on stderr
    #[arg(long)]
    pub log_json: bool,
}

impl Cli {
    /// Configuration layer contributed by command-line flags
    pub fn overlay(&self) -> ConfigOverlay {
        ConfigOverlay {
            format: self.format,
            preserve_links: switch(self.preserve_links, self.no_preserve_links),
            preserve_structure: switch(self.preserve_structure, self.no_preserve_structure),
            add_folder_tags: switch(self.add_folder_tags, self.no_add_folder_tags),
            assets: self.assets,
            assets_dir: self.assets_dir.clone(),
            slug_max_len: self.slug_max_len,
            ..Default::default()
        }
    }
}

/// A `--flag`/`--no-flag` pair; unset leaves the lower layers alone
fn switch(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (false, true) => Some(false),
        (false, false) => None,
    }
}
