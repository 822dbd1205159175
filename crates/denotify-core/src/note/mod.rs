//! Source notes: what discovery learns about each file before conversion

pub mod frontmatter;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::NaiveDateTime;
use serde::Serialize;

pub use frontmatter::{parse_document, Metadata, ParsedDocument};

use crate::config::ConvertConfig;
use crate::filename::collect_keywords;
use crate::identity::{CanonicalKey, IdentityNormalizer};
use crate::paths;
use crate::text;

/// Where a note's timestamp came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampSource {
    /// Explicit `created` (or `date`) front matter
    Metadata,
    /// File modification time
    Modified,
    /// The run's frozen "now"
    Fallback,
}

/// Where a note's title came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TitleSource {
    Metadata,
    Heading,
    Filename,
}

/// Identity and naming facts for one source note.
///
/// Immutable once discovery finishes, except for the output filename which
/// is attached exactly once by the collection mapper.
#[derive(Debug)]
pub struct NoteRecord {
    /// Path as found on disk
    pub source_path: PathBuf,
    /// Path relative to the vault root
    pub relative_path: PathBuf,
    pub canonical_key: CanonicalKey,
    /// File name without extension
    pub stem: String,
    /// Vault-relative containing folder, `/`-separated, `""` at the root
    pub folder: String,
    pub title: String,
    pub title_source: TitleSource,
    pub created: NaiveDateTime,
    pub timestamp_source: TimestampSource,
    /// Denote keywords, sorted and de-duplicated
    pub tags: BTreeSet<String>,
    pub aliases: Vec<String>,
    new_filename: OnceLock<String>,
}

impl NoteRecord {
    /// Derive the record for a parsed note.
    ///
    /// `modified` is the file's mtime, if the filesystem reported one; `now`
    /// is the run's frozen fallback timestamp.
    pub fn from_document(
        source_path: PathBuf,
        relative_path: PathBuf,
        doc: &ParsedDocument,
        modified: Option<NaiveDateTime>,
        now: NaiveDateTime,
        config: &ConvertConfig,
        normalizer: &IdentityNormalizer,
    ) -> Self {
        let stem = relative_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let folder = relative_path
            .parent()
            .map(paths::to_slash)
            .unwrap_or_default();

        let (title, title_source) = match doc.metadata.title() {
            Some(t) => (t, TitleSource::Metadata),
            None => match text::first_heading(&doc.body) {
                Some(h) => (h, TitleSource::Heading),
                None => (stem.clone(), TitleSource::Filename),
            },
        };

        let (created, timestamp_source) = match (doc.metadata.created(), modified) {
            (Some(c), _) => (c, TimestampSource::Metadata),
            (None, Some(m)) => (m, TimestampSource::Modified),
            (None, None) => {
                tracing::debug!(path = %relative_path.display(), "no timestamp available, using run time");
                (now, TimestampSource::Fallback)
            }
        };

        let metadata_tags = doc.metadata.tags();
        let inline_tags = text::inline_hashtags(&doc.body);
        let folder_tags = config.add_folder_tags.then_some(folder.as_str());
        let tags = collect_keywords(
            metadata_tags.iter().map(String::as_str),
            inline_tags.iter().map(String::as_str),
            folder_tags,
        );

        Self {
            canonical_key: normalizer.path_key(&relative_path),
            source_path,
            relative_path,
            stem,
            folder,
            title,
            title_source,
            created,
            timestamp_source,
            tags,
            aliases: doc.metadata.aliases(),
            new_filename: OnceLock::new(),
        }
    }

    /// Vault-relative path with `/` separators
    pub fn display_path(&self) -> String {
        paths::to_slash(&self.relative_path)
    }

    pub fn new_filename(&self) -> Option<&str> {
        self.new_filename.get().map(String::as_str)
    }

    /// Attach the generated filename; false if one was already attached
    pub fn assign_filename(&self, filename: String) -> bool {
        self.new_filename.set(filename).is_ok()
    }

    /// Output-root-relative path of the converted note
    pub fn output_path(&self, preserve_structure: bool) -> Option<String> {
        let name = self.new_filename()?;
        Some(if preserve_structure {
            paths::join(&self.folder, name)
        } else {
            name.to_string()
        })
    }

    /// Output folder the note is written into
    pub fn output_folder(&self, preserve_structure: bool) -> &str {
        if preserve_structure {
            &self.folder
        } else {
            ""
        }
    }
}

/// A discovered note with its parsed content
#[derive(Debug)]
pub struct LoadedNote {
    pub record: NoteRecord,
    pub metadata: Metadata,
    pub body: String,
}

/// Modification time of `path` as local wall-clock time
pub fn modified_time(path: &Path) -> Option<NaiveDateTime> {
    let modified = std::fs::metadata(path).ok()?.modified().ok()?;
    let local: chrono::DateTime<chrono::Local> = modified.into();
    Some(local.naive_local())
}
