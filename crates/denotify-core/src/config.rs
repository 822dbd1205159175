//! Conversion configuration for denotify
//!
//! Layering, lowest to highest priority:
//! built-in defaults → global `config.toml` → vault `.denotify.toml` →
//! explicit `--config` file → CLI flags.

pub mod types;

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};

use crate::error::{DenotifyError, Result};

pub use types::{AssetPolicy, ConfigOverlay, ConvertConfig, OutputFormat, DEFAULT_SLUG_MAX_LEN};

/// Name of the per-vault config file, looked up in the input root
pub const VAULT_CONFIG_FILE: &str = ".denotify.toml";

const CONFIG_DIR: &str = "denotify";
const CONFIG_FILE: &str = "config.toml";
const CONFIG_DIR_ENV_VAR: &str = "DENOTIFY_CONFIG_DIR";

/// Environment variable pinning the last-resort "now" timestamp
pub const NOW_ENV_VAR: &str = "DENOTIFY_NOW";

impl ConvertConfig {
    /// Apply a partial layer on top of this configuration
    pub fn apply(&mut self, overlay: ConfigOverlay) {
        if let Some(v) = overlay.format {
            self.format = v;
        }
        if let Some(v) = overlay.preserve_links {
            self.preserve_links = v;
        }
        if let Some(v) = overlay.preserve_structure {
            self.preserve_structure = v;
        }
        if let Some(v) = overlay.add_folder_tags {
            self.add_folder_tags = v;
        }
        if let Some(v) = overlay.assets {
            self.assets = v;
        }
        if let Some(v) = overlay.assets_dir {
            self.assets_dir = v;
        }
        if let Some(v) = overlay.slug_max_len {
            self.slug_max_len = v;
        }
        if let Some(v) = overlay.note_extensions {
            self.note_extensions = v;
        }
        if let Some(v) = overlay.attachment_dirs {
            self.attachment_dirs = v;
        }
        if let Some(v) = overlay.ignore_dirs {
            self.ignore_dirs = v;
        }
    }

    /// Reject configurations the pipeline cannot honour
    pub fn validate(&self) -> Result<()> {
        let dir = self.assets_dir.trim();
        if dir.is_empty() || dir.contains("..") || Path::new(dir).is_absolute() {
            return Err(DenotifyError::invalid_value("assets_dir", &self.assets_dir));
        }
        if self.slug_max_len < 8 {
            return Err(DenotifyError::invalid_value("slug_max_len", self.slug_max_len));
        }
        if self.note_extensions.is_empty() {
            return Err(DenotifyError::invalid_value("note_extensions", "empty list"));
        }
        for ext in &self.note_extensions {
            if ext.starts_with('.') || ext.is_empty() {
                return Err(DenotifyError::unsupported(
                    "note extension",
                    ext,
                    "bare extensions such as \"md\"",
                ));
            }
        }
        Ok(())
    }

    /// True when `ext` (no dot, any case) names a note file
    pub fn is_note_extension(&self, ext: &str) -> bool {
        self.note_extensions
            .iter()
            .any(|e| e.eq_ignore_ascii_case(ext))
    }

    /// Build the effective configuration for converting `input`.
    ///
    /// `explicit` is a `--config` path (must exist); `cli` carries flag values.
    #[tracing::instrument(skip(cli))]
    pub fn resolve(input: &Path, explicit: Option<&Path>, cli: ConfigOverlay) -> Result<Self> {
        let mut config = ConvertConfig::default();

        if let Some(path) = global_config_path() {
            if path.is_file() {
                tracing::debug!(path = %path.display(), "applying global config");
                config.apply(load_overlay(&path)?);
            }
        }

        if input.is_dir() {
            let vault_config = input.join(VAULT_CONFIG_FILE);
            if vault_config.is_file() {
                tracing::debug!(path = %vault_config.display(), "applying vault config");
                config.apply(load_overlay(&vault_config)?);
            }
        }

        if let Some(path) = explicit {
            if !path.is_file() {
                return Err(DenotifyError::InvalidConfig {
                    path: path.to_path_buf(),
                    reason: "file not found".to_string(),
                });
            }
            config.apply(load_overlay(path)?);
        }

        config.apply(cli);
        config.validate()?;
        Ok(config)
    }

}

/// Load one overlay from a TOML file
pub fn load_overlay(path: &Path) -> Result<ConfigOverlay> {
    let content = fs::read_to_string(path).map_err(|e| DenotifyError::InvalidConfig {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    toml::from_str(&content).map_err(|e| DenotifyError::InvalidConfig {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Location of the global config file, if a config directory is known
pub fn global_config_path() -> Option<PathBuf> {
    let dir = match std::env::var(CONFIG_DIR_ENV_VAR) {
        Ok(env_dir) if !env_dir.is_empty() => PathBuf::from(env_dir),
        _ => dirs::config_dir()?.join(CONFIG_DIR),
    };
    Some(dir.join(CONFIG_FILE))
}

/// The run's frozen "now", captured once and used only as the last-resort
/// note timestamp. `DENOTIFY_NOW` (`YYYY-MM-DDTHH:MM:SS`) pins it.
pub fn frozen_now() -> NaiveDateTime {
    if let Ok(value) = std::env::var(NOW_ENV_VAR) {
        match NaiveDateTime::parse_from_str(value.trim(), "%Y-%m-%dT%H:%M:%S") {
            Ok(now) => return now,
            Err(e) => tracing::warn!(value = %value, error = %e, "ignoring unparseable DENOTIFY_NOW"),
        }
    }
    Local::now().naive_local()
}
