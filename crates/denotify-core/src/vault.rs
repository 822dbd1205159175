//! Vault discovery: one walk over the input tree, indexed for later lookups.
//!
//! Asset resolution reads only this index, so the rewrite phase never
//! touches the filesystem to decide where a reference points.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::config::ConvertConfig;
use crate::error::{DenotifyError, Result};
use crate::paths;
use crate::report::FileFailure;

/// Snapshot of the files under a vault root
#[derive(Debug, Clone, Default)]
pub struct VaultIndex {
    root: PathBuf,
    notes: Vec<PathBuf>,
    files: BTreeSet<String>,
    lower: HashMap<String, String>,
    by_basename: BTreeMap<String, Vec<String>>,
    attachment_dirs: Vec<String>,
    failures: Vec<FileFailure>,
}

impl VaultIndex {
    /// Walk `root`, skipping configured ignore directories, hidden files and
    /// `exclude` (typically an output directory nested inside the vault).
    #[tracing::instrument(skip(config))]
    pub fn scan(root: &Path, config: &ConvertConfig, exclude: Option<&Path>) -> Result<Self> {
        if !root.is_dir() {
            return Err(DenotifyError::InvalidVault {
                reason: format!("{} is not a directory", root.display()),
            });
        }
        std::fs::read_dir(root).map_err(|e| DenotifyError::InvalidVault {
            reason: format!("cannot read {}: {}", root.display(), e),
        })?;

        let mut index = VaultIndex {
            root: root.to_path_buf(),
            ..Default::default()
        };

        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_skipped(e, config, exclude));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e
                        .path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| root.display().to_string());
                    tracing::warn!(%path, error = %e, "skipping unreadable entry");
                    index.failures.push(FileFailure {
                        path,
                        operation: "scan".to_string(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let Ok(relative) = entry.path().strip_prefix(root) else {
                continue;
            };
            if relative.as_os_str().is_empty() {
                continue;
            }

            if entry.file_type().is_dir() {
                let name = entry.file_name().to_string_lossy();
                if config
                    .attachment_dirs
                    .iter()
                    .any(|d| d.eq_ignore_ascii_case(&name))
                {
                    index.attachment_dirs.push(paths::to_slash(relative));
                }
                continue;
            }

            let is_note = relative
                .extension()
                .is_some_and(|ext| config.is_note_extension(&ext.to_string_lossy()));
            if is_note {
                index.notes.push(relative.to_path_buf());
            } else {
                index.add_file(paths::to_slash(relative));
            }
        }

        index.notes.sort();
        index
            .attachment_dirs
            .sort_by(|a, b| depth(a).cmp(&depth(b)).then_with(|| a.cmp(b)));

        tracing::debug!(
            notes = index.notes.len(),
            files = index.files.len(),
            attachment_dirs = index.attachment_dirs.len(),
            "vault scanned"
        );
        Ok(index)
    }

    fn add_file(&mut self, relative: String) {
        self.lower
            .entry(relative.to_lowercase())
            .or_insert_with(|| relative.clone());
        let base = relative.rsplit('/').next().unwrap_or(&relative).to_lowercase();
        self.by_basename.entry(base).or_default().push(relative.clone());
        self.files.insert(relative);
    }

    /// Keep only the given note (single-file mode); assets stay indexed
    pub fn retain_note(&mut self, relative: &Path) {
        self.notes.retain(|n| n == relative);
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Vault-relative note paths, sorted
    pub fn notes(&self) -> &[PathBuf] {
        &self.notes
    }

    /// Entries the walk could not read
    pub fn failures(&self) -> &[FileFailure] {
        &self.failures
    }

    /// Look up a non-note file by vault-relative path. Exact case wins;
    /// otherwise the match is case-insensitive.
    pub fn find_file(&self, relative: &str) -> Option<&str> {
        if let Some(exact) = self.files.get(relative) {
            return Some(exact.as_str());
        }
        self.lower.get(&relative.to_lowercase()).map(String::as_str)
    }

    /// Attachment folders, shallowest first
    pub fn attachment_dirs(&self) -> &[String] {
        &self.attachment_dirs
    }

    /// First file (in path order) anywhere in the vault with this name
    pub fn find_by_basename(&self, name: &str) -> Option<&str> {
        let candidates = self.by_basename.get(&name.to_lowercase())?;
        if candidates.len() > 1 {
            tracing::debug!(name, chosen = %candidates[0], count = candidates.len(), "basename shared by several files");
        }
        candidates.first().map(String::as_str)
    }
}

fn depth(path: &str) -> usize {
    path.matches('/').count()
}

fn is_skipped(entry: &DirEntry, config: &ConvertConfig, exclude: Option<&Path>) -> bool {
    if entry.depth() == 0 {
        return false;
    }
    if exclude.is_some_and(|ex| entry.path() == ex) {
        return true;
    }
    let name = entry.file_name().to_string_lossy();
    if entry.file_type().is_dir() {
        return config.ignore_dirs.iter().any(|d| d == name.as_ref());
    }
    name.starts_with('.')
}
