//! Link syntax for each output convention

use crate::config::{ConvertConfig, OutputFormat};

use super::scan::{Reference, ReferenceKind};

/// How rewritten references are written out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStyle {
    /// `[[file:path][description]]`
    Org,
    /// `[text](path)`, `![alt](path)`
    Markdown,
    /// Wiki syntax kept, targets rewritten: `[[stem|display]]`, `![[path]]`
    Wiki,
}

impl LinkStyle {
    pub fn for_config(config: &ConvertConfig) -> Self {
        match (config.format, config.preserve_links) {
            (OutputFormat::Org, _) => LinkStyle::Org,
            (OutputFormat::Md, false) => LinkStyle::Markdown,
            (OutputFormat::Md, true) => LinkStyle::Wiki,
        }
    }

    /// Link to a converted note at `path` (relative, with extension)
    pub fn note_link(self, r: &Reference, path: &str) -> String {
        let display = note_display(r);
        match self {
            LinkStyle::Org => {
                let search = match r.fragment.as_deref() {
                    Some(f) if !f.starts_with('^') => format!("::*{}", f),
                    _ => String::new(),
                };
                format!("[[file:{}{}][{}]]", path, search, display)
            }
            LinkStyle::Markdown => format!("[{}]({})", display, md_dest(path)),
            LinkStyle::Wiki => {
                let stem = path.rsplit_once('.').map(|(s, _)| s).unwrap_or(path);
                let inner = match &r.fragment {
                    Some(f) => format!("{}#{}", stem, f),
                    None => stem.to_string(),
                };
                match r.kind {
                    ReferenceKind::Embed => match &r.display {
                        Some(d) => format!("![[{}|{}]]", inner, d),
                        None => format!("![[{}]]", inner),
                    },
                    ReferenceKind::MarkdownLink { .. } => {
                        let dest = match &r.fragment {
                            Some(f) => format!("{}#{}", path, f),
                            None => path.to_string(),
                        };
                        format!("[{}]({})", display, md_dest(&dest))
                    }
                    _ => format!("[[{}|{}]]", inner, display),
                }
            }
        }
    }

    /// Link or embed for an asset at `path` (relative or absolute)
    pub fn asset_link(self, r: &Reference, path: &str, is_image: bool) -> String {
        let desc = asset_description(r);
        match self {
            LinkStyle::Org => {
                if is_image && r.is_embed() {
                    format!("[[file:{}]]", path)
                } else {
                    format!("[[file:{}][{}]]", path, desc)
                }
            }
            LinkStyle::Markdown => {
                if is_image && r.is_embed() {
                    format!("![{}]({})", image_alt(r), md_dest(path))
                } else {
                    format!("[{}]({})", desc, md_dest(path))
                }
            }
            LinkStyle::Wiki => match r.kind {
                ReferenceKind::Embed => match &r.display {
                    Some(d) => format!("![[{}|{}]]", path, d),
                    None => format!("![[{}]]", path),
                },
                ReferenceKind::WikiLink => format!("[[{}]]", path),
                ReferenceKind::AliasedWikiLink => format!("[[{}|{}]]", path, desc),
                ReferenceKind::MarkdownLink { image: true } => {
                    format!("![{}]({})", image_alt(r), md_dest(path))
                }
                ReferenceKind::MarkdownLink { image: false } => {
                    format!("[{}]({})", desc, md_dest(path))
                }
            },
        }
    }
}

fn note_display(r: &Reference) -> String {
    r.display
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| r.written_target())
}

/// `300` or `300x200` after the pipe of an image embed
fn is_size_spec(s: &str) -> bool {
    let mut parts = s.splitn(2, 'x');
    let all_digits = |p: &str| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit());
    parts.next().is_some_and(all_digits) && parts.next().map_or(true, all_digits)
}

fn file_stem(target: &str) -> &str {
    let file = target.rsplit('/').next().unwrap_or(target);
    match file.rfind('.') {
        Some(i) if i > 0 => &file[..i],
        _ => file,
    }
}

fn asset_description(r: &Reference) -> String {
    r.display
        .as_deref()
        .filter(|d| !d.trim().is_empty() && !is_size_spec(d))
        .unwrap_or_else(|| file_stem(&r.target))
        .to_string()
}

fn image_alt(r: &Reference) -> String {
    match r.kind {
        ReferenceKind::MarkdownLink { .. } => r.display.clone().unwrap_or_default(),
        _ => asset_description(r),
    }
}

/// Markdown destination, angle-bracketed when it would otherwise break
pub fn md_dest(path: &str) -> String {
    if path.contains(|c: char| c.is_whitespace() || c == '(' || c == ')') {
        format!("<{}>", path)
    } else {
        path.to_string()
    }
}
