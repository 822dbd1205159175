//! Markdown → Org body conversion.
//!
//! Structural constructs (headings, code fences, quotes, lists, rules,
//! tables) are handled line by line. Inline emphasis is converted only in
//! plain text: org links, leftover wiki links, inline code and bare URLs
//! pass through untouched.

use std::sync::OnceLock;

use regex::Regex;

static HEADING: OnceLock<Regex> = OnceLock::new();
static LIST: OnceLock<Regex> = OnceLock::new();
static RULE: OnceLock<Regex> = OnceLock::new();
static PROTECTED: OnceLock<Regex> = OnceLock::new();
static BOLD: OnceLock<Regex> = OnceLock::new();
static ITALIC_STAR: OnceLock<Regex> = OnceLock::new();
static ITALIC_UNDERSCORE: OnceLock<Regex> = OnceLock::new();
static STRIKE: OnceLock<Regex> = OnceLock::new();

fn re(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("valid org conversion regex"))
}

// Placeholder for bold markers so the italic pass cannot see them
const BOLD_MARK: char = '\u{1}';

/// Convert a markdown body to Org syntax
pub fn markdown_to_org(body: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut fence: Option<(char, usize)> = None;
    let mut in_quote = false;

    for line in body.lines() {
        if let Some((marker, len)) = fence {
            let closing = line.trim();
            if closing.len() >= len && closing.chars().all(|c| c == marker) {
                out.push("#+END_SRC".to_string());
                fence = None;
            } else {
                out.push(line.to_string());
            }
            continue;
        }

        let trimmed = line.trim_start();
        if let Some((marker, len, lang)) = fence_open(trimmed) {
            if in_quote {
                out.push("#+END_QUOTE".to_string());
                in_quote = false;
            }
            out.push(if lang.is_empty() {
                "#+BEGIN_SRC".to_string()
            } else {
                format!("#+BEGIN_SRC {}", lang)
            });
            fence = Some((marker, len));
            continue;
        }

        if let Some(rest) = quote_line(line) {
            if !in_quote {
                out.push("#+BEGIN_QUOTE".to_string());
                in_quote = true;
            }
            out.push(convert_line(rest));
            continue;
        }
        if in_quote {
            out.push("#+END_QUOTE".to_string());
            in_quote = false;
        }

        out.push(convert_line(line));
    }

    if fence.is_some() {
        out.push("#+END_SRC".to_string());
    }
    if in_quote {
        out.push("#+END_QUOTE".to_string());
    }

    let mut result = out.join("\n");
    if body.ends_with('\n') {
        result.push('\n');
    }
    result
}

fn fence_open(trimmed: &str) -> Option<(char, usize, String)> {
    for ch in ['`', '~'] {
        let len = trimmed.chars().take_while(|&c| c == ch).count();
        if len >= 3 {
            let lang = trimmed[len..].split_whitespace().next().unwrap_or("");
            return Some((ch, len, lang.to_string()));
        }
    }
    None
}

fn quote_line(line: &str) -> Option<&str> {
    let rest = line.trim_start().strip_prefix('>')?;
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}

fn convert_line(line: &str) -> String {
    if let Some(caps) = re(&HEADING, r"^(#{1,6})\s+(.*?)\s*#*\s*$").captures(line) {
        let stars = "*".repeat(caps[1].len());
        return format!("{} {}", stars, convert_inline(&caps[2]));
    }
    if re(&RULE, r"^\s*(?:\*\s*){3,}$|^\s*(?:-\s*){3,}$|^\s*(?:_\s*){3,}$").is_match(line) {
        return "-----".to_string();
    }
    if is_table_separator(line) {
        return table_separator(line);
    }
    if let Some(caps) = re(&LIST, r"^(\s*)(?:[-*+])\s+(?:\[([ xX])\]\s+)?(.*)$").captures(line) {
        let indent = &caps[1];
        let rest = convert_inline(&caps[3]);
        return match caps.get(2).map(|m| m.as_str()) {
            Some(" ") => format!("{}- [ ] {}", indent, rest),
            Some(_) => format!("{}- [X] {}", indent, rest),
            None => format!("{}- {}", indent, rest),
        };
    }
    convert_inline(line)
}

fn is_table_separator(line: &str) -> bool {
    let t = line.trim();
    t.starts_with('|')
        && t.contains('-')
        && t.chars().all(|c| matches!(c, '|' | '-' | ':' | ' '))
}

fn table_separator(line: &str) -> String {
    let t = line.trim();
    let inner = t.trim_matches('|');
    let cells: Vec<String> = inner
        .split('|')
        .map(|cell| "-".repeat(cell.len().max(1)))
        .collect();
    format!("|{}|", cells.join("+"))
}

/// Convert inline markup, skipping protected spans
fn convert_inline(text: &str) -> String {
    let protected = re(
        &PROTECTED,
        concat!(
            r"\[\[[^\]\n]+\](?:\[[^\]\n]*\])?\]",
            r"|\[(?P<text>[^\[\]\n]+)\]\((?P<url>[a-zA-Z][a-zA-Z0-9+.-]*://[^\s)]+|mailto:[^\s)]+)\)",
            r"|`(?P<code>[^`\n]+)`",
            r"|<?https?://[^\s>)\]]+>?",
        ),
    );

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for caps in protected.captures_iter(text) {
        let Some(m) = caps.get(0) else { continue };
        out.push_str(&emphasis(&text[cursor..m.start()]));
        if let Some(code) = caps.name("code") {
            out.push('~');
            out.push_str(code.as_str());
            out.push('~');
        } else if let (Some(label), Some(url)) = (caps.name("text"), caps.name("url")) {
            out.push_str(&format!("[[{}][{}]]", url.as_str(), label.as_str()));
        } else {
            out.push_str(m.as_str());
        }
        cursor = m.end();
    }
    out.push_str(&emphasis(&text[cursor..]));
    out
}

fn emphasis(text: &str) -> String {
    let marked = re(&BOLD, r"\*\*([^*\n]+?)\*\*|__([^_\n]+?)__").replace_all(text, |caps: &regex::Captures<'_>| {
        let inner = caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str()).unwrap_or("");
        format!("{}{}{}", BOLD_MARK, inner, BOLD_MARK)
    });
    let italic = re(&ITALIC_STAR, r"\*([^*\s][^*\n]*?)\*").replace_all(&marked, "/$1/");
    let italic = re(&ITALIC_UNDERSCORE, r"(^|[^\w])_([^_\s][^_\n]*?)_($|[^\w])")
        .replace_all(&italic, "$1/$2/$3");
    let struck = re(&STRIKE, r"~~([^~\n]+?)~~").replace_all(&italic, "+$1+");
    struck.replace(BOLD_MARK, "*")
}
