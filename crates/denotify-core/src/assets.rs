//! Asset resolution and destination naming.
//!
//! Search order for a reference made from a note in folder `F`:
//! 1. relative to `F`
//! 2. relative to the vault root
//! 3. inside each conventional attachment folder, shallowest first
//! 4. anywhere in the vault by file name (first in path order)
//!
//! Every distinct (folder, reference) pair is resolved once; later lookups
//! hit the cache. References that resolve to the same file share one
//! [`AssetEntry`], so each source file is copied at most once.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::PathBuf;

use sha2::{Digest, Sha256};

use crate::config::{AssetPolicy, ConvertConfig};
use crate::logging::CacheMetrics;
use crate::paths::{self, lexical_resolve};
use crate::vault::VaultIndex;

const HASH_LEN: usize = 8;

/// A source asset and every spelling used to reference it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRecord {
    /// Absolute (or root-joined) path of the source file
    pub source_path: PathBuf,
    /// Vault-relative path, `/`-separated
    pub relative_path: String,
    pub reference_forms: BTreeSet<String>,
}

/// A resolved asset with its destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetEntry {
    pub record: AssetRecord,
    /// Copy: output-root-relative path. Link: the source path.
    pub new_reference_path: String,
    pub is_image: bool,
}

/// Outcome of an asset lookup during rewriting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetLookup<'a> {
    Found(&'a AssetEntry),
    NotFound,
    /// Policy is `ignore`: leave the reference alone, no warning
    Ignored,
}

/// Frozen asset table produced by the mapping phase
#[derive(Debug, Clone, Default)]
pub struct AssetMap {
    policy: AssetPolicy,
    entries: BTreeMap<String, AssetEntry>,
    resolutions: HashMap<(String, String), Option<String>>,
}

impl AssetMap {
    pub fn policy(&self) -> AssetPolicy {
        self.policy
    }

    pub fn lookup(&self, reference: &str, note_folder: &str) -> AssetLookup<'_> {
        if self.policy == AssetPolicy::Ignore {
            return AssetLookup::Ignored;
        }
        let key = (note_folder.to_string(), reference.to_string());
        match self.resolutions.get(&key) {
            Some(Some(rel)) => self
                .entries
                .get(rel)
                .map(AssetLookup::Found)
                .unwrap_or(AssetLookup::NotFound),
            Some(None) => AssetLookup::NotFound,
            None => {
                tracing::debug!(%reference, folder = %note_folder, "asset reference missed by pre-scan");
                AssetLookup::NotFound
            }
        }
    }

    /// Resolved assets in source path order
    pub fn entries(&self) -> impl Iterator<Item = &AssetEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolves asset references against a [`VaultIndex`]
pub struct AssetResolver<'a> {
    index: &'a VaultIndex,
    config: &'a ConvertConfig,
    map: AssetMap,
    used_names: HashSet<String>,
    metrics: CacheMetrics,
}

impl<'a> AssetResolver<'a> {
    pub fn new(index: &'a VaultIndex, config: &'a ConvertConfig) -> Self {
        Self {
            index,
            config,
            map: AssetMap {
                policy: config.assets,
                ..Default::default()
            },
            used_names: HashSet::new(),
            metrics: CacheMetrics::new(),
        }
    }

    /// Resolve and record `reference` as written in a note in `note_folder`
    pub fn resolve(&mut self, reference: &str, note_folder: &str) -> Option<&AssetEntry> {
        if self.config.assets == AssetPolicy::Ignore {
            return None;
        }

        let key = (note_folder.to_string(), reference.to_string());
        let rel = match self.map.resolutions.get(&key) {
            Some(cached) => {
                self.metrics.record_cache_hit();
                cached.clone()
            }
            None => {
                self.metrics.record_cache_miss();
                let found = self.locate(reference, note_folder).map(str::to_string);
                if let Some(rel) = &found {
                    self.register(rel, reference);
                } else {
                    tracing::debug!(%reference, folder = %note_folder, "asset not found");
                }
                self.map.resolutions.insert(key, found.clone());
                found
            }
        }?;

        self.map.entries.get(&rel)
    }

    /// Find the vault-relative path of `reference` without recording it
    pub fn locate(&self, reference: &str, note_folder: &str) -> Option<&'a str> {
        let cleaned = reference.trim().replace('\\', "/");
        if cleaned.is_empty() {
            return None;
        }
        let index = self.index;

        let direct = [paths::join(note_folder, &cleaned), cleaned.clone()];
        let in_attachments = index
            .attachment_dirs()
            .iter()
            .map(|dir| paths::join(dir, &cleaned));

        direct
            .into_iter()
            .chain(in_attachments)
            .filter_map(|candidate| lexical_resolve(&candidate))
            .find_map(|candidate| index.find_file(&candidate))
            .or_else(|| {
                let base = cleaned.rsplit('/').next().unwrap_or(&cleaned);
                index.find_by_basename(base)
            })
    }

    fn register(&mut self, relative: &str, reference: &str) {
        if let Some(entry) = self.map.entries.get_mut(relative) {
            entry.record.reference_forms.insert(reference.to_string());
            return;
        }

        let source_path = self.index.root().join(relative);
        let new_reference_path = match self.config.assets {
            AssetPolicy::Copy => {
                let name = self.unique_copy_name(relative);
                paths::join(self.config.assets_dir.trim_matches('/'), &name)
            }
            _ => source_path.to_string_lossy().into_owned(),
        };

        self.map.entries.insert(
            relative.to_string(),
            AssetEntry {
                record: AssetRecord {
                    source_path,
                    relative_path: relative.to_string(),
                    reference_forms: BTreeSet::from([reference.to_string()]),
                },
                new_reference_path,
                is_image: is_image(relative),
            },
        );
    }

    fn unique_copy_name(&mut self, relative: &str) -> String {
        let base = copy_name(relative);
        let mut name = base.clone();
        let mut n = 1;
        while !self.used_names.insert(name.to_lowercase()) {
            n += 1;
            name = match base.rsplit_once('.') {
                Some((stem, ext)) => format!("{}-{}.{}", stem, n, ext),
                None => format!("{}-{}", base, n),
            };
        }
        name
    }

    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    /// Freeze the table for the rewrite phase
    pub fn finish(self) -> AssetMap {
        crate::log_cache_metrics!(self.metrics, "asset_resolution");
        self.map
    }
}

/// Destination file name: `<stem>_<8 hex of sha256(relative path)><.ext>`.
/// Whitespace in the stem becomes `-`.
pub fn copy_name(relative: &str) -> String {
    let file = relative.rsplit('/').next().unwrap_or(relative);
    let (stem, ext) = match file.rfind('.') {
        Some(i) if i > 0 => (&file[..i], &file[i..]),
        _ => (file, ""),
    };
    let stem: String = stem
        .chars()
        .map(|c| if c.is_whitespace() { '-' } else { c })
        .collect();

    let digest = Sha256::digest(relative.as_bytes());
    let hash = hex::encode(digest);
    format!("{}_{}{}", stem, &hash[..HASH_LEN], ext)
}

/// True when the file's extension maps to an `image/*` type
pub fn is_image(path: &str) -> bool {
    mime_guess::from_path(path)
        .first()
        .is_some_and(|m| m.type_() == mime_guess::mime::IMAGE)
}

/// True when `ext` is a type `mime_guess` knows, i.e. plausibly an
/// attachment rather than part of a note name like `v1.2`
pub fn is_known_extension(ext: &str) -> bool {
    mime_guess::from_ext(ext).first().is_some()
}
