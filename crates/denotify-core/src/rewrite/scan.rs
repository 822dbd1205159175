//! Reference scanning: every link or embed in a note body, with its span.
//!
//! Recognized forms:
//! - `[[Target]]`, `[[Target#Heading]]`
//! - `[[Target|Display]]`
//! - `![[Target]]`, `![[image.png|300]]`
//! - `[text](path.md)`, `![alt](image.png)`, `[text](<path with spaces.md>)`
//!
//! Matches inside fenced or inline code are dropped, as are external URLs,
//! `mailto:` links and in-page anchors.

use std::ops::Range;
use std::path::Path;
use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::assets::is_known_extension;
use crate::config::ConvertConfig;
use crate::text::{code_ranges, in_ranges};

static REFERENCE_RE: OnceLock<Regex> = OnceLock::new();

fn reference_re() -> &'static Regex {
    REFERENCE_RE.get_or_init(|| {
        Regex::new(concat!(
            r"(?P<embed>!)?\[\[(?P<wiki>[^\[\]\n]+?)\]\]",
            r#"|(?P<image>!)?\[(?P<text>[^\[\]\n]*)\]\((?P<dest><[^<>\n]+>|[^\s()]+)(?:\s+"[^"\n]*")?\)"#,
        ))
        .expect("valid reference regex")
    })
}

/// Syntactic form of a reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    WikiLink,
    AliasedWikiLink,
    Embed,
    MarkdownLink { image: bool },
}

/// What a reference points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetClass {
    Note,
    Asset,
}

/// One link or embed found in a body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Byte span of the whole construct
    pub span: Range<usize>,
    pub kind: ReferenceKind,
    /// Target without fragment, percent-decoded for markdown links
    pub target: String,
    /// Text after `#`, if any
    pub fragment: Option<String>,
    /// Alias, embed size or markdown link text
    pub display: Option<String>,
}

impl Reference {
    pub fn is_embed(&self) -> bool {
        matches!(
            self.kind,
            ReferenceKind::Embed | ReferenceKind::MarkdownLink { image: true }
        )
    }

    /// Decide whether the target names a note or an asset.
    ///
    /// A note extension, or no recognizable extension at all, means note.
    /// Markdown links with any other extension, and wiki targets whose
    /// extension is a known media type, are assets.
    pub fn classify(&self, config: &ConvertConfig) -> TargetClass {
        let ext = Path::new(&self.target)
            .extension()
            .map(|e| e.to_string_lossy().into_owned());
        match ext {
            Some(e) if config.is_note_extension(&e) => TargetClass::Note,
            Some(e) if matches!(self.kind, ReferenceKind::MarkdownLink { .. }) || is_known_extension(&e) => {
                TargetClass::Asset
            }
            None if matches!(self.kind, ReferenceKind::MarkdownLink { image: true }) => {
                TargetClass::Asset
            }
            _ => TargetClass::Note,
        }
    }

    /// Target as written, including any fragment
    pub fn written_target(&self) -> String {
        match &self.fragment {
            Some(f) => format!("{}#{}", self.target, f),
            None => self.target.clone(),
        }
    }
}

/// All references in `body` outside code, in order of appearance
pub fn scan_references(body: &str) -> Vec<Reference> {
    let code = code_ranges(body);
    reference_re()
        .captures_iter(body)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            if in_ranges(&code, whole.start()) || is_escaped(body, whole.start()) {
                return None;
            }
            if caps.name("wiki").is_some() {
                wiki_reference(&caps, whole.range())
            } else {
                markdown_reference(&caps, whole.range())
            }
        })
        .collect()
}

fn is_escaped(body: &str, start: usize) -> bool {
    start > 0 && body.as_bytes()[start - 1] == b'\\'
}

fn split_fragment(target: &str) -> (String, Option<String>) {
    match target.split_once('#') {
        Some((t, f)) => (
            t.trim().to_string(),
            Some(f.trim().to_string()).filter(|f| !f.is_empty()),
        ),
        None => (target.trim().to_string(), None),
    }
}

fn is_external(target: &str) -> bool {
    let lower = target.to_ascii_lowercase();
    lower.contains("://")
        || ["mailto:", "file:", "data:", "tel:"]
            .iter()
            .any(|p| lower.starts_with(p))
}

fn wiki_reference(caps: &Captures<'_>, span: Range<usize>) -> Option<Reference> {
    let inner = caps.name("wiki")?.as_str();
    let (target_part, display) = match inner.split_once('|') {
        Some((t, d)) => (t, Some(d.trim().to_string()).filter(|d| !d.is_empty())),
        None => (inner, None),
    };
    if is_external(target_part.trim()) {
        return None;
    }
    let (target, fragment) = split_fragment(target_part);
    if target.is_empty() {
        return None;
    }

    let kind = if caps.name("embed").is_some() {
        ReferenceKind::Embed
    } else if display.is_some() {
        ReferenceKind::AliasedWikiLink
    } else {
        ReferenceKind::WikiLink
    };

    Some(Reference {
        span,
        kind,
        target,
        fragment,
        display,
    })
}

fn markdown_reference(caps: &Captures<'_>, span: Range<usize>) -> Option<Reference> {
    let dest = caps.name("dest")?.as_str();
    let dest = dest
        .strip_prefix('<')
        .and_then(|d| d.strip_suffix('>'))
        .unwrap_or(dest)
        .trim();
    if dest.is_empty() || dest.starts_with('#') || is_external(dest) {
        return None;
    }

    let (raw_target, fragment) = split_fragment(dest);
    let target = urlencoding::decode(&raw_target)
        .map(|s| s.into_owned())
        .unwrap_or(raw_target);
    if target.is_empty() {
        return None;
    }

    Some(Reference {
        span,
        kind: ReferenceKind::MarkdownLink {
            image: caps.name("image").is_some(),
        },
        target,
        fragment,
        display: caps.name("text").map(|m| m.as_str().to_string()),
    })
}
