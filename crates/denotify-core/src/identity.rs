//! Note identity: canonical keys and the frozen key → filename map.
//!
//! Obsidian resolves links case-insensitively, with or without the note
//! extension, by bare name or by folder path. Every spelling is reduced to a
//! [`ReferenceKey`] and looked up in the [`IdentityMap`] built once during
//! collection mapping.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::ConvertConfig;
use crate::paths::{self, lexical_resolve};
use crate::report::Warning;

/// Normalized, case-folded note identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CanonicalKey(String);

impl CanonicalKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A reference reduced to the form used for lookup
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReferenceKey {
    /// Reference naming a folder path (`projects/Note`, `./Note`)
    Path(CanonicalKey),
    /// Bare name, matched against file stems, titles and aliases
    Bare(CanonicalKey),
}

impl ReferenceKey {
    pub fn key(&self) -> &CanonicalKey {
        match self {
            ReferenceKey::Path(k) | ReferenceKey::Bare(k) => k,
        }
    }
}

/// Reduces paths and reference strings to canonical keys
#[derive(Debug, Clone)]
pub struct IdentityNormalizer {
    note_extensions: Vec<String>,
}

impl IdentityNormalizer {
    pub fn new(config: &ConvertConfig) -> Self {
        Self {
            note_extensions: config
                .note_extensions
                .iter()
                .map(|e| e.to_lowercase())
                .collect(),
        }
    }

    /// Key for a note file from its vault-relative path
    pub fn path_key(&self, relative_path: &Path) -> CanonicalKey {
        self.canonical(&paths::to_slash(relative_path))
    }

    /// Key for a bare name (stem, title or alias)
    pub fn bare_key(&self, name: &str) -> CanonicalKey {
        CanonicalKey(name.trim().to_lowercase())
    }

    /// Normalize `reference` as written in a note that lives in
    /// `context_folder` (vault-relative, `/`-separated).
    ///
    /// Explicit relative references (`./x`, `../x`) are resolved against the
    /// context folder. A reference that climbs above the vault root keeps
    /// its leading `..` and can never match.
    pub fn normalize(&self, reference: &str, context_folder: &str) -> ReferenceKey {
        let cleaned = reference.trim().replace('\\', "/");
        let explicit_relative = cleaned.starts_with("./") || cleaned.starts_with("../");

        if !cleaned.contains('/') {
            return ReferenceKey::Bare(self.canonical(&cleaned));
        }

        let joined = if explicit_relative {
            paths::join(context_folder, &cleaned)
        } else {
            cleaned
        };
        let resolved = lexical_resolve(&joined).unwrap_or_else(|| format!("../{}", joined));
        ReferenceKey::Path(self.canonical(&resolved))
    }

    fn canonical(&self, s: &str) -> CanonicalKey {
        let collapsed = s
            .split('/')
            .filter(|seg| !seg.is_empty())
            .collect::<Vec<_>>()
            .join("/");
        let lower = collapsed.trim().to_lowercase();
        let stripped = self
            .note_extensions
            .iter()
            .find_map(|ext| lower.strip_suffix(&format!(".{}", ext)))
            .filter(|rest| !rest.is_empty() && !rest.ends_with('/'))
            .unwrap_or(&lower);
        CanonicalKey(stripped.to_string())
    }
}

/// Where a resolved note ends up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteTarget {
    /// Vault-relative source path
    pub source: PathBuf,
    /// Output-root-relative path of the converted file
    pub output_path: String,
    /// Denote filename of the converted file
    pub new_filename: String,
}

/// Result of an identity lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<'a> {
    Found(&'a NoteTarget),
    /// Several notes match; candidates are vault-relative source paths
    Ambiguous(Vec<String>),
    NotFound,
}

/// Frozen identity table. Built once by [`IdentityMapBuilder`]; read-only
/// for the rest of the run.
#[derive(Debug, Clone, Default)]
pub struct IdentityMap {
    targets: Vec<NoteTarget>,
    by_path: BTreeMap<CanonicalKey, usize>,
    by_stem: BTreeMap<CanonicalKey, Vec<usize>>,
    by_title: BTreeMap<CanonicalKey, Vec<usize>>,
}

impl IdentityMap {
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Resolve a normalized reference.
    ///
    /// Path keys match exactly, then by unique folder suffix. Bare keys match
    /// file stems first, then titles and aliases.
    pub fn resolve(&self, key: &ReferenceKey) -> Resolution<'_> {
        match key {
            ReferenceKey::Path(k) => {
                if let Some(&i) = self.by_path.get(k) {
                    return Resolution::Found(&self.targets[i]);
                }
                if k.0.starts_with("../") {
                    return Resolution::NotFound;
                }
                let suffix = format!("/{}", k.0);
                let matches: Vec<usize> = self
                    .by_path
                    .iter()
                    .filter(|(path, _)| path.0.ends_with(&suffix))
                    .map(|(_, &i)| i)
                    .collect();
                self.bucket(&matches)
            }
            ReferenceKey::Bare(k) => {
                if let Some(bucket) = self.by_stem.get(k) {
                    return self.bucket(bucket);
                }
                match self.by_title.get(k) {
                    Some(bucket) => self.bucket(bucket),
                    None => Resolution::NotFound,
                }
            }
        }
    }

    fn bucket(&self, indices: &[usize]) -> Resolution<'_> {
        match indices {
            [] => Resolution::NotFound,
            [i] => Resolution::Found(&self.targets[*i]),
            many => Resolution::Ambiguous(
                many.iter()
                    .map(|&i| paths::to_slash(&self.targets[i].source))
                    .collect(),
            ),
        }
    }
}

/// Accumulates note identities during collection mapping
#[derive(Debug, Default)]
pub struct IdentityMapBuilder {
    map: IdentityMap,
    warnings: Vec<Warning>,
}

/// Identity facts for one note
pub struct IdentityEntry {
    pub key: CanonicalKey,
    pub stem_key: CanonicalKey,
    pub name_keys: Vec<CanonicalKey>,
    pub target: NoteTarget,
}

impl IdentityMapBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a note. Insert in sorted source order: on a path-key
    /// collision the earlier note keeps the key.
    pub fn insert(&mut self, entry: IdentityEntry) {
        let idx = self.map.targets.len();

        if let Some(&existing) = self.map.by_path.get(&entry.key) {
            let kept = paths::to_slash(&self.map.targets[existing].source);
            let dropped = paths::to_slash(&entry.target.source);
            tracing::warn!(key = %entry.key, %kept, %dropped, "identity conflict");
            self.warnings.push(Warning::IdentityConflict {
                key: entry.key.to_string(),
                kept,
                dropped,
            });
            self.map.targets.push(entry.target);
            return;
        }

        self.map.by_path.insert(entry.key, idx);
        self.map.by_stem.entry(entry.stem_key).or_default().push(idx);
        for name in entry.name_keys {
            let bucket = self.map.by_title.entry(name).or_default();
            if !bucket.contains(&idx) {
                bucket.push(idx);
            }
        }
        self.map.targets.push(entry.target);
    }

    /// Freeze the map, reporting bare names shared by several notes
    pub fn build(mut self) -> (IdentityMap, Vec<Warning>) {
        let map = &self.map;
        // a title or alias is only looked up when no file stem claims the name
        let shared = map
            .by_stem
            .iter()
            .chain(
                map.by_title
                    .iter()
                    .filter(|(key, _)| !map.by_stem.contains_key(*key)),
            )
            .filter(|(_, bucket)| bucket.len() > 1);

        for (key, bucket) in shared {
            let candidates: Vec<String> = bucket
                .iter()
                .map(|&i| paths::to_slash(&map.targets[i].source))
                .collect();
            tracing::debug!(%key, count = candidates.len(), "ambiguous note name");
            self.warnings.push(Warning::AmbiguousIdentity {
                key: key.to_string(),
                candidates,
            });
        }
        (self.map, self.warnings)
    }
}
