//! Configuration type definitions

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DenotifyError, Result};

/// Output content convention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Org-mode files with Denote org front matter
    #[default]
    Org,
    /// Markdown files with Denote markdown-yaml front matter
    Md,
}

impl OutputFormat {
    /// File extension including the leading dot
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Org => ".org",
            OutputFormat::Md => ".md",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = DenotifyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "org" => Ok(OutputFormat::Org),
            "md" | "markdown" => Ok(OutputFormat::Md),
            other => Err(DenotifyError::unsupported("format", other, "org, md")),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Org => write!(f, "org"),
            OutputFormat::Md => write!(f, "md"),
        }
    }
}

/// What happens to assets referenced from notes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetPolicy {
    /// Copy the file into the output asset directory
    #[default]
    Copy,
    /// Point at the original location, no file operation
    Link,
    /// Leave the reference as literal text
    Ignore,
}

impl FromStr for AssetPolicy {
    type Err = DenotifyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "copy" => Ok(AssetPolicy::Copy),
            "link" => Ok(AssetPolicy::Link),
            "ignore" => Ok(AssetPolicy::Ignore),
            other => Err(DenotifyError::unsupported(
                "asset policy",
                other,
                "copy, link, ignore",
            )),
        }
    }
}

impl fmt::Display for AssetPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetPolicy::Copy => write!(f, "copy"),
            AssetPolicy::Link => write!(f, "link"),
            AssetPolicy::Ignore => write!(f, "ignore"),
        }
    }
}

/// Default cap on slug length, in bytes
pub const DEFAULT_SLUG_MAX_LEN: usize = 60;

/// Conversion configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    /// Output content convention
    pub format: OutputFormat,

    /// Keep wiki-style link syntax in markdown output (targets still rewritten)
    pub preserve_links: bool,

    /// Mirror the source folder layout instead of flattening
    pub preserve_structure: bool,

    /// Inject folder-path components as tags
    pub add_folder_tags: bool,

    /// Asset destination policy
    pub assets: AssetPolicy,

    /// Subdirectory of the output root that copied assets land in
    pub assets_dir: String,

    /// Maximum slug length before truncation at a token boundary
    pub slug_max_len: usize,

    /// File extensions (without dot) treated as notes
    pub note_extensions: Vec<String>,

    /// Conventional attachment folder names searched during asset resolution
    pub attachment_dirs: Vec<String>,

    /// Directory names skipped entirely during discovery
    pub ignore_dirs: Vec<String>,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Org,
            preserve_links: false,
            preserve_structure: false,
            add_folder_tags: false,
            assets: AssetPolicy::Copy,
            assets_dir: "assets".to_string(),
            slug_max_len: DEFAULT_SLUG_MAX_LEN,
            note_extensions: vec!["md".to_string(), "markdown".to_string()],
            attachment_dirs: vec![
                "attachments".to_string(),
                "assets".to_string(),
                "images".to_string(),
            ],
            ignore_dirs: vec![
                ".obsidian".to_string(),
                ".trash".to_string(),
                ".git".to_string(),
            ],
        }
    }
}

/// A partial configuration layer: every field optional.
///
/// Config files and CLI flags each produce one overlay; overlays are applied
/// on top of the defaults in priority order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigOverlay {
    pub format: Option<OutputFormat>,
    pub preserve_links: Option<bool>,
    pub preserve_structure: Option<bool>,
    pub add_folder_tags: Option<bool>,
    pub assets: Option<AssetPolicy>,
    pub assets_dir: Option<String>,
    pub slug_max_len: Option<usize>,
    pub note_extensions: Option<Vec<String>>,
    pub attachment_dirs: Option<Vec<String>>,
    pub ignore_dirs: Option<Vec<String>>,
}
