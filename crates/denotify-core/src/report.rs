//! Conversion report: what was written, what was skipped, and why.
//!
//! Per-file failures and reference warnings are values collected here,
//! never errors; only fatal conditions abort a run.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::config::{AssetPolicy, OutputFormat};
use crate::note::TimestampSource;

/// Non-fatal condition found while mapping or rewriting
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// A note reference matched no note
    UnresolvedNote { note: String, reference: String },
    /// An asset reference matched no file
    UnresolvedAsset { note: String, reference: String },
    /// A reference matched more than one note and was left untouched
    AmbiguousReference {
        note: String,
        reference: String,
        candidates: Vec<String>,
    },
    /// Several notes share the same bare name
    AmbiguousIdentity { key: String, candidates: Vec<String> },
    /// Two files normalize to the same path identity; the first one wins
    IdentityConflict {
        key: String,
        kept: String,
        dropped: String,
    },
    /// Front matter could not be parsed; the note was converted without it
    MalformedMetadata { note: String, reason: String },
}

impl Warning {
    /// Short machine-readable kind, matching the serialized tag
    pub fn kind(&self) -> &'static str {
        match self {
            Warning::UnresolvedNote { .. } => "unresolved_note",
            Warning::UnresolvedAsset { .. } => "unresolved_asset",
            Warning::AmbiguousReference { .. } => "ambiguous_reference",
            Warning::AmbiguousIdentity { .. } => "ambiguous_identity",
            Warning::IdentityConflict { .. } => "identity_conflict",
            Warning::MalformedMetadata { .. } => "malformed_metadata",
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::UnresolvedNote { note, reference } => {
                write!(f, "{}: unresolved note reference '{}'", note, reference)
            }
            Warning::UnresolvedAsset { note, reference } => {
                write!(f, "{}: asset not found '{}'", note, reference)
            }
            Warning::AmbiguousReference {
                note,
                reference,
                candidates,
            } => write!(
                f,
                "{}: ambiguous reference '{}' (candidates: {})",
                note,
                reference,
                candidates.join(", ")
            ),
            Warning::AmbiguousIdentity { key, candidates } => write!(
                f,
                "notes share the name '{}': {}",
                key,
                candidates.join(", ")
            ),
            Warning::IdentityConflict { key, kept, dropped } => write!(
                f,
                "'{}' and '{}' both normalize to '{}'; links resolve to '{}'",
                kept, dropped, key, kept
            ),
            Warning::MalformedMetadata { note, reason } => {
                write!(f, "{}: malformed front matter ({})", note, reason)
            }
        }
    }
}

/// A file that could not be read or written
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    pub path: String,
    pub operation: String,
    pub reason: String,
}

impl fmt::Display for FileFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: failed to {}: {}", self.path, self.operation, self.reason)
    }
}

/// One note written (or, in a dry run, planned)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConvertedNote {
    pub source: String,
    pub output: String,
    pub title: String,
    pub timestamp_source: TimestampSource,
}

/// One asset placed by the copy or link policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlacedAsset {
    pub source: String,
    pub destination: String,
    pub policy: AssetPolicy,
    pub references: Vec<String>,
}

/// Outcome of a conversion run
#[derive(Debug, Clone, Serialize)]
pub struct ConversionReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub format: OutputFormat,
    pub dry_run: bool,
    pub cancelled: bool,
    pub notes: Vec<ConvertedNote>,
    pub assets: Vec<PlacedAsset>,
    pub warnings: Vec<Warning>,
    pub failures: Vec<FileFailure>,
}

/// Counts for the one-line human summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub notes: usize,
    pub assets: usize,
    pub warnings: usize,
    pub failures: usize,
}

impl ConversionReport {
    pub fn new(input: PathBuf, output: PathBuf, format: OutputFormat, dry_run: bool) -> Self {
        Self {
            input,
            output,
            format,
            dry_run,
            cancelled: false,
            notes: Vec::new(),
            assets: Vec::new(),
            warnings: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// No failures and not interrupted
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && !self.cancelled
    }

    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            notes: self.notes.len(),
            assets: self.assets.len(),
            warnings: self.warnings.len(),
            failures: self.failures.len(),
        }
    }

    /// Warnings of one kind, in report order
    pub fn warnings_of<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Warning> + 'a {
        self.warnings.iter().filter(move |w| w.kind() == kind)
    }
}

impl fmt::Display for ReportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} notes, {} assets, {} warnings, {} failures",
            self.notes, self.assets, self.warnings, self.failures
        )
    }
}
