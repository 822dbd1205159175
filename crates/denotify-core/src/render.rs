//! Output documents: Denote front matter plus the converted body

use serde_yaml::{Mapping, Value};

use crate::config::OutputFormat;
use crate::error::Result;
use crate::filename::IDENTIFIER_FORMAT;
use crate::note::frontmatter::scalar_string;
use crate::note::{Metadata, NoteRecord};
use crate::org::markdown_to_org;

/// Render the complete output file for a note whose body has already been
/// link-rewritten
pub fn render_note(
    record: &NoteRecord,
    metadata: &Metadata,
    body: &str,
    format: OutputFormat,
) -> Result<String> {
    match format {
        OutputFormat::Org => Ok(render_org(record, metadata, body)),
        OutputFormat::Md => render_markdown(record, metadata, body),
    }
}

fn render_org(record: &NoteRecord, metadata: &Metadata, body: &str) -> String {
    let mut out = String::new();
    out.push_str(&format!("#+title:      {}\n", record.title));
    out.push_str(&format!(
        "#+date:       [{}]\n",
        record.created.format("%Y-%m-%d %a %H:%M")
    ));
    if !record.tags.is_empty() {
        let tags: Vec<&str> = record.tags.iter().map(String::as_str).collect();
        out.push_str(&format!("#+filetags:   :{}:\n", tags.join(":")));
    }
    out.push_str(&format!(
        "#+identifier: {}\n",
        record.created.format(IDENTIFIER_FORMAT)
    ));

    let mut properties: Vec<(String, String)> = Vec::new();
    if !record.aliases.is_empty() {
        properties.push(("ALIASES".to_string(), record.aliases.join(", ")));
    }
    for (key, value) in metadata.extra_entries() {
        if let Some(v) = property_value(value) {
            properties.push((property_key(&key), v));
        }
    }
    if !properties.is_empty() {
        out.push_str(":PROPERTIES:\n");
        for (key, value) in properties {
            out.push_str(&format!(":{}: {}\n", key, value));
        }
        out.push_str(":END:\n");
    }

    out.push('\n');
    out.push_str(&markdown_to_org(body));
    out
}

fn property_key(key: &str) -> String {
    key.trim()
        .chars()
        .map(|c| if c.is_whitespace() || c == ':' { '_' } else { c })
        .collect::<String>()
        .to_uppercase()
}

fn property_value(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        Value::Sequence(items) => items
            .iter()
            .filter_map(scalar_string)
            .collect::<Vec<_>>()
            .join(", "),
        other => match scalar_string(other) {
            Some(s) => s,
            None => serde_json::to_string(other).ok()?,
        },
    };
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.is_empty() {
        None
    } else {
        Some(flat)
    }
}

fn render_markdown(record: &NoteRecord, metadata: &Metadata, body: &str) -> Result<String> {
    let mut out = String::from("---\n");
    out.push_str(&format!("title:      {}\n", serde_json::to_string(&record.title)?));
    out.push_str(&format!(
        "date:       {}\n",
        record.created.format("%Y-%m-%dT%H:%M:%S")
    ));
    let tags: Vec<String> = record.tags.iter().map(|t| format!("\"{}\"", t)).collect();
    out.push_str(&format!("tags:       [{}]\n", tags.join(", ")));
    out.push_str(&format!(
        "identifier: \"{}\"\n",
        record.created.format(IDENTIFIER_FORMAT)
    ));

    let mut extra = Mapping::new();
    if !record.aliases.is_empty() {
        extra.insert(
            Value::String("aliases".to_string()),
            Value::Sequence(record.aliases.iter().cloned().map(Value::String).collect()),
        );
    }
    for (key, value) in metadata.extra_mapping() {
        extra.insert(key, value);
    }
    if !extra.is_empty() {
        out.push_str(&serde_yaml::to_string(&extra)?);
    }
    out.push_str("---\n\n");
    out.push_str(body);
    Ok(out)
}
