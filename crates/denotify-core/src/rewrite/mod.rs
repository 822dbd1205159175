//! Content rewriting: turn Obsidian references into links to the converted
//! collection.
//!
//! The rewriter only reads the frozen identity and asset maps. Unresolved
//! and ambiguous references keep their original text and produce one
//! warning per distinct target per note.

pub mod emit;
pub mod scan;

use std::collections::BTreeSet;

use crate::assets::{AssetLookup, AssetMap};
use crate::config::{AssetPolicy, ConvertConfig};
use crate::identity::{IdentityMap, IdentityNormalizer, Resolution};
use crate::note::NoteRecord;
use crate::paths;
use crate::report::Warning;

pub use emit::LinkStyle;
pub use scan::{scan_references, Reference, ReferenceKind, TargetClass};

/// A rewritten body and the warnings raised while rewriting it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteOutcome {
    pub body: String,
    pub warnings: Vec<Warning>,
}

/// Rewrites note bodies against the frozen collection maps
pub struct ContentRewriter<'a> {
    identities: &'a IdentityMap,
    assets: &'a AssetMap,
    normalizer: &'a IdentityNormalizer,
    config: &'a ConvertConfig,
    style: LinkStyle,
}

impl<'a> ContentRewriter<'a> {
    pub fn new(
        identities: &'a IdentityMap,
        assets: &'a AssetMap,
        normalizer: &'a IdentityNormalizer,
        config: &'a ConvertConfig,
    ) -> Self {
        Self {
            identities,
            assets,
            normalizer,
            config,
            style: LinkStyle::for_config(config),
        }
    }

    /// Rewrite every reference in `body`, which belongs to `note`
    pub fn rewrite(&self, note: &NoteRecord, body: &str) -> RewriteOutcome {
        let from_dir = note.output_folder(self.config.preserve_structure);
        let mut out = String::with_capacity(body.len());
        let mut warnings = Vec::new();
        let mut warned: BTreeSet<(&'static str, String)> = BTreeSet::new();
        let mut cursor = 0;

        for reference in scan_references(body) {
            let replacement = match reference.classify(self.config) {
                TargetClass::Note => self.rewrite_note_reference(note, &reference, from_dir),
                TargetClass::Asset => self.rewrite_asset_reference(note, &reference, from_dir),
            };

            let text = match replacement {
                Ok(text) => text,
                Err(warning) => {
                    if let Some(w) = warning {
                        if warned.insert((w.kind(), reference.target.to_lowercase())) {
                            tracing::debug!(note = %note.display_path(), warning = %w, "reference left as-is");
                            warnings.push(w);
                        }
                    }
                    continue;
                }
            };

            out.push_str(&body[cursor..reference.span.start]);
            out.push_str(&text);
            cursor = reference.span.end;
        }
        out.push_str(&body[cursor..]);

        RewriteOutcome {
            body: out,
            warnings,
        }
    }

    fn rewrite_note_reference(
        &self,
        note: &NoteRecord,
        reference: &Reference,
        from_dir: &str,
    ) -> Result<String, Option<Warning>> {
        let key = self.normalizer.normalize(&reference.target, &note.folder);
        match self.identities.resolve(&key) {
            Resolution::Found(target) => {
                let path = paths::relative_link(from_dir, &target.output_path);
                Ok(self.style.note_link(reference, &path))
            }
            Resolution::Ambiguous(candidates) => Err(Some(Warning::AmbiguousReference {
                note: note.display_path(),
                reference: reference.target.clone(),
                candidates,
            })),
            Resolution::NotFound => Err(Some(Warning::UnresolvedNote {
                note: note.display_path(),
                reference: reference.target.clone(),
            })),
        }
    }

    fn rewrite_asset_reference(
        &self,
        note: &NoteRecord,
        reference: &Reference,
        from_dir: &str,
    ) -> Result<String, Option<Warning>> {
        match self.assets.lookup(&reference.target, &note.folder) {
            AssetLookup::Found(entry) => {
                let path = match self.assets.policy() {
                    AssetPolicy::Copy => paths::relative_link(from_dir, &entry.new_reference_path),
                    _ => entry.new_reference_path.clone(),
                };
                Ok(self.style.asset_link(reference, &path, entry.is_image))
            }
            AssetLookup::Ignored => self.note_named_like_asset(note, reference, from_dir).ok_or(None),
            AssetLookup::NotFound => self
                .note_named_like_asset(note, reference, from_dir)
                .ok_or_else(|| {
                    Some(Warning::UnresolvedAsset {
                        note: note.display_path(),
                        reference: reference.target.clone(),
                    })
                }),
        }
    }

    /// `[[Intro to C.C]]` looks like an asset but may name a note
    fn note_named_like_asset(
        &self,
        note: &NoteRecord,
        reference: &Reference,
        from_dir: &str,
    ) -> Option<String> {
        if matches!(reference.kind, ReferenceKind::MarkdownLink { .. }) {
            return None;
        }
        let key = self.normalizer.normalize(&reference.target, &note.folder);
        match self.identities.resolve(&key) {
            Resolution::Found(target) => {
                let path = paths::relative_link(from_dir, &target.output_path);
                Some(self.style.note_link(reference, &path))
            }
            _ => None,
        }
    }
}

/// Targets of asset references in `body`, for the mapping pre-scan
pub fn asset_targets(body: &str, config: &ConvertConfig) -> Vec<String> {
    scan_references(body)
        .into_iter()
        .filter(|r| r.classify(config) == TargetClass::Asset)
        .map(|r| r.target)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetResolver;
    use crate::identity::{IdentityEntry, IdentityMapBuilder, NoteTarget};
    use crate::note::tests::record;
    use crate::vault::VaultIndex;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::tempdir;

    struct Fixture {
        _dir: tempfile::TempDir,
        identities: IdentityMap,
        assets: AssetMap,
        normalizer: IdentityNormalizer,
        config: ConvertConfig,
    }

    fn fixture(config: ConvertConfig, bodies: &[(&str, &str)]) -> Fixture {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("attachments")).unwrap();
        fs::write(dir.path().join("attachments/pic.png"), b"png").unwrap();
        let index = VaultIndex::scan(dir.path(), &config, None).unwrap();
        let normalizer = IdentityNormalizer::new(&config);

        let mut builder = IdentityMapBuilder::new();
        for (source, filename) in [
            ("My Note.md", "20240115T093000--my-note__x_y"),
            ("a/Notes.md", "20240101T000000--notes"),
            ("b/Notes.md", "20240102T000000--notes"),
            ("projects/Plan.md", "20240103T000000--plan"),
            ("Intro to C.C.md", "20240104T000000--intro-to-cc"),
        ] {
            let path = Path::new(source);
            let filename = format!("{}{}", filename, config.format.extension());
            let folder = paths::to_slash(path.parent().unwrap());
            let output_path = if config.preserve_structure {
                paths::join(&folder, &filename)
            } else {
                filename.clone()
            };
            builder.insert(IdentityEntry {
                key: normalizer.path_key(path),
                stem_key: normalizer.bare_key(&path.file_stem().unwrap().to_string_lossy()),
                name_keys: vec![],
                target: NoteTarget {
                    source: PathBuf::from(source),
                    output_path,
                    new_filename: filename,
                },
            });
        }
        let (identities, _) = builder.build();

        let mut resolver = AssetResolver::new(&index, &config);
        for (folder, body) in bodies {
            for target in asset_targets(body, &config) {
                resolver.resolve(&target, folder);
            }
        }
        let assets = resolver.finish();

        Fixture {
            _dir: dir,
            identities,
            assets,
            normalizer,
            config,
        }
    }

    fn rewrite(fx: &Fixture, note_path: &str, body: &str) -> RewriteOutcome {
        let note = record(note_path, "Src", "2024-02-01T00:00:00", &[]);
        ContentRewriter::new(&fx.identities, &fx.assets, &fx.normalizer, &fx.config)
            .rewrite(&note, body)
    }

    #[test]
    fn test_org_rewrite() {
        let body = "See [[My Note]] and [[my note.md|that]].\n![[pic.png]]\n";
        let fx = fixture(ConvertConfig::default(), &[("", body)]);
        let out = rewrite(&fx, "src.md", body);
        assert!(out.warnings.is_empty(), "{:?}", out.warnings);
        assert!(out.body.contains("[[file:20240115T093000--my-note__x_y.org][My Note]]"));
        assert!(out.body.contains("[[file:20240115T093000--my-note__x_y.org][that]]"));
        assert!(out.body.contains("[[file:assets/pic_"));
        assert!(!out.body.contains("![[pic.png]]"));
    }

    #[test]
    fn test_unresolved_left_untouched_and_warned_once() {
        let body = "[[Ghost]] again [[ghost]] and ![[missing.png]] ![[missing.png]]";
        let fx = fixture(ConvertConfig::default(), &[("", body)]);
        let out = rewrite(&fx, "src.md", body);
        assert_eq!(out.body, body);
        assert_eq!(out.warnings.len(), 2);
        assert!(matches!(out.warnings[0], Warning::UnresolvedNote { .. }));
        assert!(matches!(out.warnings[1], Warning::UnresolvedAsset { .. }));
    }

    #[test]
    fn test_note_with_media_extension_in_name() {
        let body = "Read [[Intro to C.C]] and [[intro to c.c|the intro]]";
        let fx = fixture(ConvertConfig::default(), &[("", body)]);
        let out = rewrite(&fx, "src.md", body);
        assert!(out.warnings.is_empty(), "{:?}", out.warnings);
        assert_eq!(
            out.body,
            "Read [[file:20240104T000000--intro-to-cc.org][Intro to C.C]] and \
             [[file:20240104T000000--intro-to-cc.org][the intro]]"
        );
    }

    #[test]
    fn test_ambiguous_left_untouched() {
        let body = "Read [[Notes]] or [[b/Notes]]";
        let fx = fixture(ConvertConfig::default(), &[]);
        let out = rewrite(&fx, "src.md", body);
        assert!(out.body.starts_with("Read [[Notes]] or [[file:20240102T000000--notes.org]"));
        assert_eq!(out.warnings.len(), 1);
        assert!(matches!(out.warnings[0], Warning::AmbiguousReference { .. }));
    }

    #[test]
    fn test_code_is_untouched() {
        let body = "`[[My Note]]`\n```\n[[My Note]]\n```\n";
        let fx = fixture(ConvertConfig::default(), &[]);
        let out = rewrite(&fx, "src.md", body);
        assert_eq!(out.body, body);
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_markdown_with_structure() {
        let config = ConvertConfig {
            format: crate::config::OutputFormat::Md,
            preserve_structure: true,
            ..Default::default()
        };
        let body = "[[Plan]] ![[pic.png]]";
        let fx = fixture(config, &[("journal", body)]);
        let out = rewrite(&fx, "journal/src.md", body);
        assert!(out.body.starts_with("[Plan](../projects/20240103T000000--plan.md) ![pic](../assets/pic_"));
    }

    #[test]
    fn test_ignore_policy_leaves_assets() {
        let config = ConvertConfig {
            assets: AssetPolicy::Ignore,
            ..Default::default()
        };
        let body = "![[pic.png]] ![[nothing.png]]";
        let fx = fixture(config, &[("", body)]);
        let out = rewrite(&fx, "src.md", body);
        assert_eq!(out.body, body);
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_rewrite_is_idempotent() {
        let body = "[[My Note]] ![[pic.png]] [[Ghost]]";
        let fx = fixture(ConvertConfig::default(), &[("", body)]);
        let once = rewrite(&fx, "src.md", body);
        let twice = rewrite(&fx, "src.md", &once.body);
        assert_eq!(once.body, twice.body);
    }
}
