//! Conversion pipeline: map, rewrite, write.
//!
//! Mapping completes before any rewriting starts, and rewriting reads only
//! the frozen [`CollectionMap`]. Writing happens last, note by note, so a
//! single failing file never aborts the run.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDateTime;

use crate::config::{frozen_now, AssetPolicy, ConvertConfig};
use crate::error::{DenotifyError, Result};
use crate::mapper::{CollectionMap, CollectionMapper};
use crate::render::render_note;
use crate::report::{ConversionReport, ConvertedNote, FileFailure, PlacedAsset};
use crate::rewrite::ContentRewriter;
use crate::trace_time;
use crate::vault::VaultIndex;

/// Runs a conversion with a fixed configuration
#[derive(Debug, Clone)]
pub struct Converter {
    config: ConvertConfig,
    dry_run: bool,
    now: NaiveDateTime,
    cancel: Arc<AtomicBool>,
}

impl Converter {
    pub fn new(config: ConvertConfig) -> Self {
        Self {
            config,
            dry_run: false,
            now: frozen_now(),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Plan only: map and rewrite, but write nothing
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Pin the fallback timestamp for notes with no other date
    pub fn with_now(mut self, now: NaiveDateTime) -> Self {
        self.now = now;
        self
    }

    /// Share a flag that stops further file operations once set
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &ConvertConfig {
        &self.config
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Convert a vault directory, or a single note file, into `output`
    #[tracing::instrument(skip(self), fields(dry_run = self.dry_run))]
    pub fn convert(&self, input: &Path, output: &Path) -> Result<ConversionReport> {
        let start = Instant::now();
        let (root, single) = split_input(input, &self.config)?;
        let root = fs::canonicalize(&root)
            .map_err(|e| DenotifyError::io_operation("resolve", root.display(), e))?;

        let exclude = fs::canonicalize(output)
            .ok()
            .or_else(|| std::path::absolute(output).ok());
        let mut index = VaultIndex::scan(&root, &self.config, exclude.as_deref())?;
        if let Some(note) = &single {
            index.retain_note(note);
        }

        let map = CollectionMapper::new(&self.config, self.now).build_from_index(index)?;
        trace_time!(start, "mapping_complete");

        let mut report = ConversionReport::new(
            input.to_path_buf(),
            output.to_path_buf(),
            self.config.format,
            self.dry_run,
        );
        report.warnings.extend(map.warnings.iter().cloned());
        report.failures.extend(map.failures.iter().cloned());

        if !self.dry_run {
            fs::create_dir_all(output)
                .map_err(|e| DenotifyError::io_operation("create output directory", output.display(), e))?;
        }

        self.write_notes(&map, output, &mut report);
        self.place_assets(&map, output, &mut report);

        trace_time!(start, "conversion_complete");
        tracing::info!(summary = %report.summary(), cancelled = report.cancelled, "conversion finished");
        Ok(report)
    }

    fn write_notes(&self, map: &CollectionMap, output: &Path, report: &mut ConversionReport) {
        let rewriter = ContentRewriter::new(&map.identities, &map.assets, &map.normalizer, &self.config);

        for note in &map.notes {
            if self.cancelled() {
                report.cancelled = true;
                return;
            }

            let record = &note.record;
            let Some(output_rel) = record.output_path(self.config.preserve_structure) else {
                continue;
            };

            let outcome = rewriter.rewrite(record, &note.body);
            report.warnings.extend(outcome.warnings);

            let rendered = match render_note(record, &note.metadata, &outcome.body, self.config.format) {
                Ok(rendered) => rendered,
                Err(e) => {
                    report.failures.push(FileFailure {
                        path: record.display_path(),
                        operation: "render".to_string(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            if !self.dry_run {
                if let Err(e) = write_atomic(&output.join(&output_rel), &rendered) {
                    tracing::warn!(path = %output_rel, error = %e, "failed to write note");
                    report.failures.push(FileFailure {
                        path: output_rel,
                        operation: "write".to_string(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            }

            tracing::debug!(source = %record.display_path(), output = %output_rel, "note converted");
            report.notes.push(ConvertedNote {
                source: record.display_path(),
                output: output_rel,
                title: record.title.clone(),
                timestamp_source: record.timestamp_source,
            });
        }
    }

    fn place_assets(&self, map: &CollectionMap, output: &Path, report: &mut ConversionReport) {
        let policy = map.assets.policy();
        if policy == AssetPolicy::Ignore {
            return;
        }

        for entry in map.assets.entries() {
            if self.cancelled() {
                report.cancelled = true;
                return;
            }

            if policy == AssetPolicy::Copy && !self.dry_run {
                let dest = output.join(&entry.new_reference_path);
                if let Err(e) = copy_file(&entry.record.source_path, &dest) {
                    tracing::warn!(source = %entry.record.relative_path, error = %e, "failed to copy asset");
                    report.failures.push(FileFailure {
                        path: entry.record.relative_path.clone(),
                        operation: "copy".to_string(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            }

            report.assets.push(PlacedAsset {
                source: entry.record.relative_path.clone(),
                destination: entry.new_reference_path.clone(),
                policy,
                references: entry.record.reference_forms.iter().cloned().collect(),
            });
        }
    }
}

/// Vault root plus, in single-file mode, the note's path relative to it
fn split_input(input: &Path, config: &ConvertConfig) -> Result<(PathBuf, Option<PathBuf>)> {
    if !input.exists() {
        return Err(DenotifyError::InputNotFound {
            path: input.to_path_buf(),
        });
    }
    if input.is_dir() {
        return Ok((input.to_path_buf(), None));
    }

    let is_note = input
        .extension()
        .is_some_and(|ext| config.is_note_extension(&ext.to_string_lossy()));
    if !is_note {
        return Err(DenotifyError::unsupported(
            "input file",
            input.display(),
            format!("a directory or a file ending in .{}", config.note_extensions.join(", .")),
        ));
    }

    let root = match input.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let name = input
        .file_name()
        .map(PathBuf::from)
        .ok_or_else(|| DenotifyError::invalid_value("input", input.display()))?;
    Ok((root, Some(name)))
}

/// Write via a sibling temp file and rename, so readers never see a partial note
fn write_atomic(path: &Path, contents: &str) -> std::io::Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = parent.join(format!(".{}.tmp", name));
    fs::write(&tmp, contents)?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(())
}

fn copy_file(source: &Path, dest: &Path) -> std::io::Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(source, dest)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;
    use tempfile::tempdir;

    fn now() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2030-01-01T00:00:00", "%Y-%m-%dT%H:%M:%S").unwrap()
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_missing_input_is_data_error() {
        let dir = tempdir().unwrap();
        let err = Converter::new(ConvertConfig::default())
            .convert(&dir.path().join("missing"), &dir.path().join("out"))
            .unwrap_err();
        assert!(matches!(err, DenotifyError::InputNotFound { .. }));
    }

    #[test]
    fn test_non_note_file_input_rejected() {
        let dir = tempdir().unwrap();
        write(dir.path(), "pic.png", "x");
        let err = Converter::new(ConvertConfig::default())
            .convert(&dir.path().join("pic.png"), &dir.path().join("out"))
            .unwrap_err();
        assert!(matches!(err, DenotifyError::Unsupported { .. }));
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let dir = tempdir().unwrap();
        let vault = dir.path().join("vault");
        let out = dir.path().join("out");
        write(&vault, "Note.md", "---\ncreated: 2024-01-15T09:30:00\n---\nhi ![[p.png]]");
        write(&vault, "p.png", "png");

        let report = Converter::new(ConvertConfig::default())
            .with_now(now())
            .dry_run(true)
            .convert(&vault, &out)
            .unwrap();
        assert!(!out.exists());
        assert_eq!(report.notes.len(), 1);
        assert_eq!(report.notes[0].output, "20240115T093000--note.org");
        assert_eq!(report.assets.len(), 1);
        assert!(report.dry_run);
    }

    #[test]
    fn test_single_file_mode() {
        let dir = tempdir().unwrap();
        let vault = dir.path().join("vault");
        let out = dir.path().join("out");
        write(&vault, "One.md", "---\ncreated: 2024-01-15T09:30:00\n---\n[[Two]] ![[p.png]]");
        write(&vault, "Two.md", "two");
        write(&vault, "p.png", "png");

        let report = Converter::new(ConvertConfig::default())
            .with_now(now())
            .convert(&vault.join("One.md"), &out)
            .unwrap();
        assert_eq!(report.notes.len(), 1);
        assert_eq!(report.assets.len(), 1);
        // Two.md is outside the single-note collection
        assert_eq!(report.warnings_of("unresolved_note").count(), 1);
        let written = fs::read_to_string(out.join("20240115T093000--one.org")).unwrap();
        assert!(written.contains("[[file:assets/p_"));
    }

    #[test]
    fn test_cancelled_before_start_writes_no_notes() {
        let dir = tempdir().unwrap();
        let vault = dir.path().join("vault");
        write(&vault, "a.md", "a");
        let flag = Arc::new(AtomicBool::new(true));
        let report = Converter::new(ConvertConfig::default())
            .with_cancel_flag(flag)
            .convert(&vault, &dir.path().join("out"))
            .unwrap();
        assert!(report.cancelled);
        assert!(report.notes.is_empty());
        assert!(!report.is_success());
    }

    #[test]
    fn test_output_inside_vault_is_not_reconverted() {
        let dir = tempdir().unwrap();
        let vault = dir.path().join("vault");
        write(&vault, "a.md", "---\ncreated: 2024-01-15T09:30:00\n---\n");
        let out = vault.join("denote");
        let config = ConvertConfig {
            format: OutputFormat::Md,
            ..Default::default()
        };
        let first = Converter::new(config.clone()).convert(&vault, &out).unwrap();
        let second = Converter::new(config).convert(&vault, &out).unwrap();
        assert_eq!(first.notes.len(), 1);
        assert_eq!(second.notes.len(), 1);
    }

    #[test]
    fn test_write_atomic_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sub/file.org");
        write_atomic(&path, "content").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "content");
        assert!(!dir.path().join("sub/.file.org.tmp").exists());
    }
}
