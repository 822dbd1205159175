//! YAML front matter parsing
//!
//! Obsidian front matter is free-form, so metadata is kept as an ordered
//! mapping with typed accessors for the keys conversion cares about.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_yaml::{Mapping, Value};

/// Keys consumed by conversion and never copied through verbatim
pub const RESERVED_KEYS: &[&str] = &["title", "tags", "tag", "aliases", "alias", "created", "date"];

/// Ordered front matter mapping
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata(Mapping);

/// Result of splitting a raw note into metadata and body
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub metadata: Metadata,
    pub body: String,
    /// Set when a front matter block was present but could not be parsed
    pub malformed: Option<String>,
}

/// Split `raw` into front matter and body.
///
/// A document without a leading `---` line has empty metadata. A front
/// matter block that fails to parse (or is not a mapping) yields empty
/// metadata, the text after the block as body, and a `malformed` reason.
/// An unterminated block is treated as body text.
pub fn parse_document(raw: &str) -> ParsedDocument {
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);

    let Some((yaml, body)) = split_front_matter(raw) else {
        return ParsedDocument {
            metadata: Metadata::default(),
            body: raw.to_string(),
            malformed: None,
        };
    };

    if yaml.trim().is_empty() {
        return ParsedDocument {
            metadata: Metadata::default(),
            body: body.to_string(),
            malformed: None,
        };
    }

    match serde_yaml::from_str::<Value>(yaml) {
        Ok(Value::Mapping(map)) => ParsedDocument {
            metadata: Metadata(map),
            body: body.to_string(),
            malformed: None,
        },
        Ok(Value::Null) => ParsedDocument {
            metadata: Metadata::default(),
            body: body.to_string(),
            malformed: None,
        },
        Ok(_) => ParsedDocument {
            metadata: Metadata::default(),
            body: body.to_string(),
            malformed: Some("front matter is not a key/value mapping".to_string()),
        },
        Err(e) => ParsedDocument {
            metadata: Metadata::default(),
            body: body.to_string(),
            malformed: Some(e.to_string()),
        },
    }
}

fn split_front_matter(raw: &str) -> Option<(&str, &str)> {
    let mut lines = raw.split_inclusive('\n');
    let first = lines.next()?;
    if first.trim_end() != "---" {
        return None;
    }
    let yaml_start = first.len();
    let mut offset = yaml_start;
    for line in lines {
        let trimmed = line.trim_end();
        if trimmed == "---" || trimmed == "..." {
            let yaml = &raw[yaml_start..offset];
            let body = &raw[offset + line.len()..];
            return Some((yaml, body.strip_prefix('\n').unwrap_or(body)));
        }
        offset += line.len();
    }
    None
}

impl Metadata {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Explicit `title`, if present and non-blank
    pub fn title(&self) -> Option<String> {
        self.get("title")
            .and_then(scalar_string)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    /// `aliases` (or `alias`), accepting a list or a comma-separated string
    pub fn aliases(&self) -> Vec<String> {
        self.get("aliases")
            .or_else(|| self.get("alias"))
            .map(|v| string_list(v, &[',']))
            .unwrap_or_default()
    }

    /// `tags` (or `tag`), accepting a list or a comma/space-separated string.
    /// Leading `#` is stripped.
    pub fn tags(&self) -> Vec<String> {
        self.get("tags")
            .or_else(|| self.get("tag"))
            .map(|v| string_list(v, &[',', ' ']))
            .unwrap_or_default()
            .into_iter()
            .map(|t| t.trim_start_matches('#').to_string())
            .filter(|t| !t.is_empty())
            .collect()
    }

    /// `created` (falling back to `date`) parsed as a wall-clock timestamp.
    ///
    /// Offsets in RFC 3339 values are dropped; the written local time is kept.
    pub fn created(&self) -> Option<NaiveDateTime> {
        ["created", "date"]
            .iter()
            .filter_map(|key| self.get(key))
            .filter_map(scalar_string)
            .find_map(|s| parse_timestamp(&s))
    }

    /// Entries not consumed by conversion, in source order
    pub fn extra_entries(&self) -> impl Iterator<Item = (String, &Value)> {
        self.0.iter().filter_map(|(k, v)| {
            let key = scalar_string(k)?;
            if RESERVED_KEYS.contains(&key.as_str()) {
                None
            } else {
                Some((key, v))
            }
        })
    }

    /// Remaining entries as a mapping, for re-serialization
    pub fn extra_mapping(&self) -> Mapping {
        let mut out = Mapping::new();
        for (k, v) in self.extra_entries() {
            out.insert(Value::String(k), v.clone());
        }
        out
    }
}

/// Render a scalar YAML value as text; `None` for sequences, mappings and null
pub fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn string_list(value: &Value, separators: &[char]) -> Vec<String> {
    match value {
        Value::Sequence(items) => items
            .iter()
            .filter_map(scalar_string)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        other => scalar_string(other)
            .map(|s| {
                s.split(|c| separators.contains(&c))
                    .map(|part| part.trim().to_string())
                    .filter(|part| !part.is_empty())
                    .collect()
            })
            .unwrap_or_default(),
    }
}

/// Parse the timestamp shapes seen in Obsidian vaults
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    for fmt in [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
        "%Y%m%dT%H%M%S",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
