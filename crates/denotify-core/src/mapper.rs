//! Collection mapping: the first conversion phase.
//!
//! Reads every note once, assigns Denote filenames in sorted source order,
//! builds the identity map and resolves every asset reference. The result
//! is a [`CollectionMap`] that the rewrite phase only reads.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::NaiveDateTime;

use crate::assets::{AssetMap, AssetResolver};
use crate::config::{AssetPolicy, ConvertConfig};
use crate::error::Result;
use crate::filename::{FilenameGenerator, NameRegistry};
use crate::identity::{IdentityEntry, IdentityMap, IdentityMapBuilder, IdentityNormalizer, NoteTarget};
use crate::note::{modified_time, parse_document, LoadedNote, NoteRecord};
use crate::paths;
use crate::report::{FileFailure, Warning};
use crate::rewrite::asset_targets;
use crate::trace_time;
use crate::vault::VaultIndex;

/// Frozen output of the mapping phase
#[derive(Debug)]
pub struct CollectionMap {
    pub vault_root: PathBuf,
    /// Notes in sorted source order, each with its filename attached
    pub notes: Vec<LoadedNote>,
    pub identities: IdentityMap,
    pub assets: AssetMap,
    pub normalizer: IdentityNormalizer,
    /// Identity and metadata warnings found while mapping
    pub warnings: Vec<Warning>,
    /// Notes that could not be read; they are absent from `notes`
    pub failures: Vec<FileFailure>,
}

impl CollectionMap {
    pub fn note(&self, relative_path: &Path) -> Option<&LoadedNote> {
        self.notes
            .iter()
            .find(|n| n.record.relative_path == relative_path)
    }
}

/// Builds a [`CollectionMap`] from a vault
pub struct CollectionMapper<'a> {
    config: &'a ConvertConfig,
    now: NaiveDateTime,
}

impl<'a> CollectionMapper<'a> {
    /// `now` is the run's frozen fallback timestamp
    pub fn new(config: &'a ConvertConfig, now: NaiveDateTime) -> Self {
        Self { config, now }
    }

    /// Scan `vault_root` and map it
    pub fn build(&self, vault_root: &Path) -> Result<CollectionMap> {
        let index = VaultIndex::scan(vault_root, self.config, None)?;
        self.build_from_index(index)
    }

    /// Map an already scanned vault
    #[tracing::instrument(skip(self, index), fields(root = %index.root().display()))]
    pub fn build_from_index(&self, index: VaultIndex) -> Result<CollectionMap> {
        let start = Instant::now();
        let normalizer = IdentityNormalizer::new(self.config);
        let mut failures: Vec<FileFailure> = index.failures().to_vec();
        let mut metadata_warnings = Vec::new();

        let mut notes = Vec::with_capacity(index.notes().len());
        for relative in index.notes() {
            let source = index.root().join(relative);
            let raw = match fs::read_to_string(&source) {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::warn!(path = %relative.display(), error = %e, "failed to read note");
                    failures.push(FileFailure {
                        path: paths::to_slash(relative),
                        operation: "read".to_string(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let doc = parse_document(&raw);
            if let Some(reason) = &doc.malformed {
                tracing::warn!(path = %relative.display(), %reason, "malformed front matter");
                metadata_warnings.push(Warning::MalformedMetadata {
                    note: paths::to_slash(relative),
                    reason: reason.clone(),
                });
            }

            let record = NoteRecord::from_document(
                source.clone(),
                relative.clone(),
                &doc,
                modified_time(&source),
                self.now,
                self.config,
                &normalizer,
            );
            notes.push(LoadedNote {
                record,
                metadata: doc.metadata,
                body: doc.body,
            });
        }
        trace_time!(start, "read_notes", notes = notes.len());

        let (identities, mut warnings) = self.assign_identities(&notes, &normalizer);
        warnings.extend(metadata_warnings);

        let assets = self.resolve_assets(&index, &notes);
        trace_time!(start, "mapping_phase");

        tracing::debug!(
            notes = notes.len(),
            assets = assets.len(),
            warnings = warnings.len(),
            failures = failures.len(),
            "collection mapped"
        );

        Ok(CollectionMap {
            vault_root: index.root().to_path_buf(),
            notes,
            identities,
            assets,
            normalizer,
            warnings,
            failures,
        })
    }

    fn assign_identities(
        &self,
        notes: &[LoadedNote],
        normalizer: &IdentityNormalizer,
    ) -> (IdentityMap, Vec<Warning>) {
        let generator = FilenameGenerator::new(self.config);
        let mut registry = NameRegistry::new();
        let mut builder = IdentityMapBuilder::new();

        for note in notes {
            let record = &note.record;
            let filename = generator.generate(record, &mut registry);
            record.assign_filename(filename.clone());
            let output_path = record
                .output_path(self.config.preserve_structure)
                .unwrap_or_else(|| filename.clone());

            let name_keys = std::iter::once(&record.title)
                .chain(record.aliases.iter())
                .map(|name| normalizer.bare_key(name))
                .collect();

            builder.insert(IdentityEntry {
                key: record.canonical_key.clone(),
                stem_key: normalizer.bare_key(&record.stem),
                name_keys,
                target: NoteTarget {
                    source: record.relative_path.clone(),
                    output_path,
                    new_filename: filename,
                },
            });
        }

        builder.build()
    }

    fn resolve_assets(&self, index: &VaultIndex, notes: &[LoadedNote]) -> AssetMap {
        let mut resolver = AssetResolver::new(index, self.config);
        if self.config.assets != AssetPolicy::Ignore {
            for note in notes {
                for target in asset_targets(&note.body, self.config) {
                    resolver.resolve(&target, &note.record.folder);
                }
            }
        }
        resolver.finish()
    }
}
