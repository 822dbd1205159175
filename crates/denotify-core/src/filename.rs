//! Denote filename generation
//!
//! Format: `YYYYMMDDTHHMMSS--slug[__kw1_kw2].ext`
//! - Identifier: the note's creation timestamp
//! - Slug: lowercase ASCII words joined by `-`, length-capped
//! - Keywords: sorted, de-duplicated, `_`-joined; omitted when empty
//!
//! Names are unique within a run. A colliding name gets `-2`, `-3`, ...
//! appended to its slug.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use chrono::NaiveDateTime;

use crate::config::ConvertConfig;
use crate::note::NoteRecord;

/// Denote identifier format
pub const IDENTIFIER_FORMAT: &str = "%Y%m%dT%H%M%S";

const FALLBACK_SLUG: &str = "untitled";

/// A parsed or generated Denote filename
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DenoteName {
    pub identifier: String,
    pub slug: String,
    pub keywords: Vec<String>,
    /// Extension including the leading dot
    pub extension: String,
}

impl DenoteName {
    pub fn new(
        created: NaiveDateTime,
        slug: impl Into<String>,
        keywords: &BTreeSet<String>,
        extension: &str,
    ) -> Self {
        Self {
            identifier: created.format(IDENTIFIER_FORMAT).to_string(),
            slug: slug.into(),
            keywords: keywords.iter().cloned().collect(),
            extension: extension.to_string(),
        }
    }

    /// The filename without its extension; the unit of uniqueness
    pub fn stem(&self) -> String {
        let mut out = format!("{}--{}", self.identifier, self.slug);
        if !self.keywords.is_empty() {
            out.push_str("__");
            out.push_str(&self.keywords.join("_"));
        }
        out
    }
}

impl fmt::Display for DenoteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.stem(), self.extension)
    }
}

/// Turn a title into a slug of at most `max_len` bytes.
///
/// Non-ASCII letters are transliterated. Truncation happens at a word
/// boundary unless the first word alone is too long.
pub fn slugify_title(title: &str, max_len: usize) -> String {
    let full = slug::slugify(title);
    if full.len() <= max_len {
        return full;
    }

    let mut out = String::new();
    for word in full.split('-') {
        let needed = if out.is_empty() { word.len() } else { out.len() + 1 + word.len() };
        if needed > max_len {
            break;
        }
        if !out.is_empty() {
            out.push('-');
        }
        out.push_str(word);
    }

    if out.is_empty() {
        // slugify output is ASCII, so byte slicing is safe
        out = full[..max_len].trim_end_matches('-').to_string();
    }
    out
}

/// Normalize a tag into a Denote keyword: lowercase ASCII alphanumerics only
pub fn keyword(tag: &str) -> Option<String> {
    let kw: String = slug::slugify(tag).chars().filter(|c| *c != '-').collect();
    if kw.is_empty() {
        None
    } else {
        Some(kw)
    }
}

/// Union of tag sources, normalized into keywords
pub fn collect_keywords<'a>(
    metadata_tags: impl IntoIterator<Item = &'a str>,
    inline_tags: impl IntoIterator<Item = &'a str>,
    folder: Option<&'a str>,
) -> BTreeSet<String> {
    let folder_parts = folder
        .into_iter()
        .flat_map(|f| f.split('/'))
        .filter(|p| !p.is_empty());

    metadata_tags
        .into_iter()
        .chain(inline_tags)
        .chain(folder_parts)
        .filter_map(keyword)
        .collect()
}

/// Filename stems already taken in this run
#[derive(Debug, Default, Clone)]
pub struct NameRegistry {
    taken: HashSet<String>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, stem: &str) -> bool {
        self.taken.contains(stem)
    }

    /// Reserve `stem`; false if it was already taken
    pub fn claim(&mut self, stem: String) -> bool {
        self.taken.insert(stem)
    }

    pub fn len(&self) -> usize {
        self.taken.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taken.is_empty()
    }
}

/// Assigns Denote filenames to notes
#[derive(Debug, Clone)]
pub struct FilenameGenerator {
    extension: &'static str,
    slug_max_len: usize,
}

impl FilenameGenerator {
    pub fn new(config: &ConvertConfig) -> Self {
        Self {
            extension: config.format.extension(),
            slug_max_len: config.slug_max_len,
        }
    }

    /// Slug for a note: its title, else its file stem, else `untitled`
    pub fn slug_for(&self, note: &NoteRecord) -> String {
        [note.title.as_str(), note.stem.as_str()]
            .iter()
            .map(|s| slugify_title(s, self.slug_max_len))
            .find(|s| !s.is_empty())
            .unwrap_or_else(|| FALLBACK_SLUG.to_string())
    }

    /// Generate a unique filename for `note` and claim it in `registry`
    pub fn generate(&self, note: &NoteRecord, registry: &mut NameRegistry) -> String {
        let base = self.slug_for(note);
        let mut name = DenoteName::new(note.created, base.clone(), &note.tags, self.extension);
        let mut attempt = 1;
        while !registry.claim(name.stem()) {
            attempt += 1;
            name.slug = format!("{}-{}", base, attempt);
        }
        if attempt > 1 {
            tracing::debug!(
                source = %note.relative_path.display(),
                filename = %name,
                "filename collision resolved with suffix"
            );
        }
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note::tests::record;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").unwrap()
    }

    #[test]
    fn test_denote_name_display() {
        let keywords: BTreeSet<String> = ["y", "x"].iter().map(|s| s.to_string()).collect();
        let name = DenoteName::new(ts("2024-01-15T09:30:00"), "my-note", &keywords, ".org");
        assert_eq!(name.stem(), "20240115T093000--my-note__x_y");
        assert_eq!(name.to_string(), "20240115T093000--my-note__x_y.org");

        let plain = DenoteName::new(ts("2024-01-15T09:30:00"), "plain", &BTreeSet::new(), ".md");
        assert_eq!(plain.to_string(), "20240115T093000--plain.md");
    }

    #[test]
    fn test_slugify_title() {
        assert_eq!(slugify_title("My Important Note!", 60), "my-important-note");
        assert_eq!(slugify_title("Café Déjà Vu", 60), "cafe-deja-vu");
        assert_eq!(slugify_title("???", 60), "");
    }

    #[test]
    fn test_slug_truncates_at_word_boundary() {
        assert_eq!(slugify_title("alpha beta gamma delta", 16), "alpha-beta-gamma");
        assert_eq!(slugify_title("alpha beta gamma delta", 15), "alpha-beta");
        assert_eq!(slugify_title("supercalifragilistic", 8), "supercal");
    }

    #[test]
    fn test_keyword_normalization() {
        assert_eq!(keyword("Project/Active"), Some("projectactive".to_string()));
        assert_eq!(keyword("to-do"), Some("todo".to_string()));
        assert_eq!(keyword("!!"), None);
    }

    #[test]
    fn test_collect_keywords_dedups_and_sorts() {
        let kws = collect_keywords(["Beta", "alpha"], ["beta", "gamma"], Some("Projects/2024"));
        let kws: Vec<_> = kws.into_iter().collect();
        assert_eq!(kws, vec!["2024", "alpha", "beta", "gamma", "projects"]);
    }

    #[test]
    fn test_generate_denote_filename() {
        let config = ConvertConfig::default();
        let generator = FilenameGenerator::new(&config);
        let note = record("My Note.md", "My Note", "2024-01-15T09:30:00", &["y", "x"]);
        let mut registry = NameRegistry::new();
        assert_eq!(
            generator.generate(&note, &mut registry),
            "20240115T093000--my-note__x_y.org"
        );
        assert!(registry.contains("20240115T093000--my-note__x_y"));
    }

    #[test]
    fn test_collision_gets_numeric_suffix() {
        let config = ConvertConfig::default();
        let generator = FilenameGenerator::new(&config);
        let a = record("a/Same.md", "Same", "2024-01-15T09:30:00", &[]);
        let b = record("b/Same.md", "Same", "2024-01-15T09:30:00", &[]);
        let c = record("c/Same.md", "Same", "2024-01-15T09:30:00", &[]);
        let mut registry = NameRegistry::new();
        assert_eq!(generator.generate(&a, &mut registry), "20240115T093000--same.org");
        assert_eq!(generator.generate(&b, &mut registry), "20240115T093000--same-2.org");
        assert_eq!(generator.generate(&c, &mut registry), "20240115T093000--same-3.org");
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_unsluggable_title_falls_back_to_stem_then_untitled() {
        let config = ConvertConfig::default();
        let generator = FilenameGenerator::new(&config);
        let a = record("daily-log.md", "???", "2024-01-15T09:30:00", &[]);
        assert_eq!(generator.slug_for(&a), "daily-log");
        let b = record("___.md", "!!!", "2024-01-15T09:30:00", &[]);
        assert_eq!(generator.slug_for(&b), "untitled");
    }

    #[test]
    fn test_markdown_extension() {
        let config = ConvertConfig {
            format: crate::config::OutputFormat::Md,
            ..Default::default()
        };
        let generator = FilenameGenerator::new(&config);
        let note = record("n.md", "Note", "2024-01-15T09:30:00", &[]);
        let mut registry = NameRegistry::new();
        assert_eq!(generator.generate(&note, &mut registry), "20240115T093000--note.md");
    }
}
