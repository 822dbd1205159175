//! Text scanning helpers shared by tag extraction, title detection and the
//! content rewriter.
//!
//! Markdown code (fenced blocks and inline spans) is opaque: nothing inside
//! it is a link, a tag or a heading.

use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;

static HEADING_RE: OnceLock<Regex> = OnceLock::new();
static HASHTAG_RE: OnceLock<Regex> = OnceLock::new();

fn heading_re() -> &'static Regex {
    HEADING_RE.get_or_init(|| Regex::new(r"^#\s+(.+?)\s*#*\s*$").expect("valid heading regex"))
}

fn hashtag_re() -> &'static Regex {
    HASHTAG_RE.get_or_init(|| {
        Regex::new(r"(?m)(?:^|[\s,;])#([\p{L}\p{N}_/\-]+)").expect("valid hashtag regex")
    })
}

/// Byte ranges of `text` covered by fenced code blocks or inline code spans.
///
/// Ranges are sorted and non-overlapping.
pub fn code_ranges(text: &str) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut fence: Option<(char, usize, usize)> = None; // (char, run length, block start)
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        let line_start = offset;
        offset += line.len();
        let trimmed = line.trim_start_matches(' ');
        let indent = line.len() - trimmed.len();

        if let Some((ch, len, start)) = fence {
            if indent <= 3 && fence_run(trimmed, ch) >= len && trimmed.trim_start_matches(ch).trim().is_empty() {
                ranges.push(start..offset);
                fence = None;
            }
            continue;
        }

        if indent <= 3 {
            for ch in ['`', '~'] {
                let run = fence_run(trimmed, ch);
                if run >= 3 {
                    fence = Some((ch, run, line_start));
                    break;
                }
            }
            if fence.is_some() {
                continue;
            }
        }

        inline_code_ranges(line, line_start, &mut ranges);
    }

    if let Some((_, _, start)) = fence {
        // Unterminated fence runs to end of text
        ranges.push(start..text.len());
    }

    ranges.sort_by_key(|r| r.start);
    ranges
}

fn fence_run(line: &str, ch: char) -> usize {
    line.chars().take_while(|&c| c == ch).count()
}

fn inline_code_ranges(line: &str, base: usize, ranges: &mut Vec<Range<usize>>) {
    let bytes = line.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'`' {
            i += 1;
            continue;
        }
        let open_len = bytes[i..].iter().take_while(|&&b| b == b'`').count();
        let mut j = i + open_len;
        let mut closed = None;
        while j < bytes.len() {
            if bytes[j] == b'`' {
                let run = bytes[j..].iter().take_while(|&&b| b == b'`').count();
                if run == open_len {
                    closed = Some(j + run);
                    break;
                }
                j += run;
            } else {
                j += 1;
            }
        }
        match closed {
            Some(end) => {
                ranges.push(base + i..base + end);
                i = end;
            }
            None => i += open_len,
        }
    }
}

/// True when `pos` falls inside any of the (sorted) ranges
pub fn in_ranges(ranges: &[Range<usize>], pos: usize) -> bool {
    ranges
        .binary_search_by(|r| {
            if r.end <= pos {
                std::cmp::Ordering::Less
            } else if r.start > pos {
                std::cmp::Ordering::Greater
            } else {
                std::cmp::Ordering::Equal
            }
        })
        .is_ok()
}

/// First top-level (`# `) heading outside code, trimmed
pub fn first_heading(body: &str) -> Option<String> {
    let code = code_ranges(body);
    let mut offset = 0;
    for line in body.split_inclusive('\n') {
        let start = offset;
        offset += line.len();
        if in_ranges(&code, start) {
            continue;
        }
        if let Some(caps) = heading_re().captures(line.trim_end_matches(['\n', '\r'])) {
            let text = caps[1].trim();
            if !text.is_empty() {
                return Some(text.to_string());
            }
        }
    }
    None
}

/// Inline `#tags` outside code, in order of appearance.
///
/// A tag needs at least one non-digit character, so `#123` is not a tag.
/// Headings (`# Title`) never match because a space follows the `#`.
pub fn inline_hashtags(body: &str) -> Vec<String> {
    let code = code_ranges(body);
    hashtag_re()
        .captures_iter(body)
        .filter_map(|caps| caps.get(1))
        .filter(|m| !in_ranges(&code, m.start()))
        .map(|m| m.as_str().trim_end_matches(['/', '-']).to_string())
        .filter(|tag| !tag.is_empty() && !tag.chars().all(|c| c.is_ascii_digit()))
        .collect()
}
