//! Comic metadata parsing and normalization.
//!
//! Every comic has exactly one metadata file. Two formats are accepted, and
//! the format is chosen by extension alone:
//!
//! ## Markdown (`.md`, `.markdown`)
//!
//! An optional header followed by a markdown body, converted to HTML. The
//! header comes in two flavours:
//!
//! ```text
//! ---                         title: First
//! title: First                tags: funny
//! tags: [foo, bar]                short
//! ---
//! # Hello                     # Hello
//! ```
//!
//! - **Fenced** (left): a YAML mapping between `---` lines (closed by `---`
//!   or `...`).
//! - **Bare** (right): `key: value` lines. A line indented by four or more
//!   spaces continues the previous key with another value. The header ends at
//!   the first blank line or the first line that is not a field.
//!
//! Keys are lowercased.
//!
//! ## YAML (`.yaml`, `.yml`)
//!
//! A single mapping. `long` holds the body HTML verbatim and is removed from
//! the fields; `date` is required and normalized to ISO-8601.
//!
//! ## Normalization
//!
//! Field values always end up as flat strings: lists are joined with single
//! spaces (`[foo, bar]` → `"foo bar"`), numbers and booleans use their
//! textual form, null becomes the empty string. Nested mappings have no flat
//! form and are rejected.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Timelike};
use pulldown_cmark::{Options, Parser, html as md_html};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("frontmatter opened with `---` is never closed")]
    UnterminatedFrontmatter,
    #[error("metadata must be a mapping of fields")]
    NotAMapping,
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("unrecognised date `{0}`")]
    InvalidDate(String),
    #[error("field `{0}` cannot be flattened to a string")]
    UnsupportedValue(String),
    #[error("unsupported field name: {0}")]
    UnsupportedKey(String),
}

/// Metadata file format, decided by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaFormat {
    /// Markdown body with optional header
    Markdown,
    /// Structured YAML document with `long` and `date`
    Yaml,
}

impl MetaFormat {
    /// All extensions that mark a metadata file.
    pub const EXTENSIONS: &'static [&'static str] = &["md", "markdown", "yaml", "yml"];

    pub fn from_path(path: &Path) -> Option<Self> {
        match crate::naming::extension(path)?.as_str() {
            "md" | "markdown" => Some(Self::Markdown),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }
}

/// Output of a single metadata parse: body HTML plus flat fields.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedMeta {
    pub html: String,
    pub meta: BTreeMap<String, String>,
}

/// Parse raw metadata text in the given format.
pub fn parse(format: MetaFormat, raw: &str) -> Result<ParsedMeta, MetadataError> {
    match format {
        MetaFormat::Markdown => parse_markdown(raw),
        MetaFormat::Yaml => parse_yaml(raw),
    }
}

// ============================================================================
// Markdown
// ============================================================================

/// Parse a markdown document with an optional fenced or bare header.
pub fn parse_markdown(raw: &str) -> Result<ParsedMeta, MetadataError> {
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    let lines: Vec<&str> = raw.lines().collect();

    let (meta, body_start) = if lines.first().is_some_and(|l| is_fence_open(l)) {
        parse_fenced_header(&lines)?
    } else {
        parse_bare_header(&lines)
    };

    let body = lines[body_start..].join("\n");
    Ok(ParsedMeta {
        html: markdown_to_html(&body),
        meta,
    })
}

/// Render markdown to HTML.
pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(markdown, options);
    let mut html = String::new();
    md_html::push_html(&mut html, parser);
    html
}

fn is_fence_open(line: &str) -> bool {
    line.trim_end() == "---"
}

fn is_fence_close(line: &str) -> bool {
    matches!(line.trim_end(), "---" | "...")
}

/// Returns the fields and the index of the first body line.
fn parse_fenced_header(
    lines: &[&str],
) -> Result<(BTreeMap<String, String>, usize), MetadataError> {
    let close = lines
        .iter()
        .skip(1)
        .position(|l| is_fence_close(l))
        .map(|i| i + 1)
        .ok_or(MetadataError::UnterminatedFrontmatter)?;

    let yaml = lines[1..close].join("\n");
    let mut meta = BTreeMap::new();
    if !yaml.trim().is_empty() {
        let value: Value = serde_yaml::from_str(&yaml)?;
        match value {
            Value::Mapping(map) => {
                for (key, value) in map {
                    let key = flatten_key(&key)?.to_lowercase();
                    let value = flatten_value(&key, &value)?;
                    meta.insert(key, value);
                }
            }
            Value::Null => {}
            _ => return Err(MetadataError::NotAMapping),
        }
    }
    Ok((meta, close + 1))
}

/// Bare `key: value` header. Never fails: a document whose first line is
/// not a field simply has no header.
fn parse_bare_header(lines: &[&str]) -> (BTreeMap<String, String>, usize) {
    let mut fields: Vec<(String, Vec<String>)> = Vec::new();
    // Index into `fields` of the key a continuation line extends.
    let mut current: Option<usize> = None;
    let mut body_start = 0;

    for (i, line) in lines.iter().enumerate() {
        if line.trim().is_empty() {
            body_start = if fields.is_empty() { 0 } else { i + 1 };
            break;
        }
        if let Some((key, value)) = split_field_line(line) {
            let key = key.to_lowercase();
            let idx = match fields.iter().position(|(k, _)| *k == key) {
                Some(idx) => idx,
                None => {
                    fields.push((key, Vec::new()));
                    fields.len() - 1
                }
            };
            fields[idx].1.push(value.to_string());
            current = Some(idx);
        } else if let (Some(rest), Some(idx)) = (line.strip_prefix("    "), current) {
            fields[idx].1.push(rest.trim().to_string());
        } else {
            body_start = i;
            break;
        }
        body_start = i + 1;
    }

    let meta = fields
        .into_iter()
        .map(|(k, values)| (k, join_values(values.iter().map(String::as_str))))
        .collect();
    (meta, body_start)
}

/// Split `key: value` where key is `[A-Za-z0-9_-]+` with at most three
/// leading spaces.
fn split_field_line(line: &str) -> Option<(&str, &str)> {
    let trimmed = line.trim_start_matches(' ');
    if line.len() - trimmed.len() > 3 {
        return None;
    }
    let (key, value) = trimmed.split_once(':')?;
    let valid_key = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    valid_key.then(|| (key, value.trim()))
}

// ============================================================================
// YAML
// ============================================================================

/// Parse a structured YAML metadata document.
pub fn parse_yaml(raw: &str) -> Result<ParsedMeta, MetadataError> {
    let value: Value = serde_yaml::from_str(raw)?;
    let Value::Mapping(map) = value else {
        return Err(MetadataError::NotAMapping);
    };

    let mut html = None;
    let mut meta = BTreeMap::new();
    for (key, value) in &map {
        let key = flatten_key(key)?;
        let value = flatten_value(&key, value)?;
        if key == "long" {
            html = Some(value);
        } else {
            meta.insert(key, value);
        }
    }

    let html = html.ok_or(MetadataError::MissingField("long"))?;
    let date = meta
        .get_mut("date")
        .ok_or(MetadataError::MissingField("date"))?;
    *date = normalize_date(date)?;

    Ok(ParsedMeta { html, meta })
}

/// Normalize a date or date-time to ISO-8601.
///
/// - `2014-01-05`, `2014/01/05`, `January 5, 2014` → `2014-01-05`
/// - `2014-01-05 10:30` → `2014-01-05T10:30:00`
/// - `2014-01-05 10:30:00.5` → `2014-01-05T10:30:00.500000`
/// - `2014-01-05T10:30:00Z` → `2014-01-05T10:30:00+00:00`
/// - `2001-12-14 21:59:43.10 -5` → `2001-12-14T21:59:43.100000-05:00`
///
/// Fractional seconds are kept as microseconds and omitted when zero.
pub fn normalize_date(raw: &str) -> Result<String, MetadataError> {
    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%B %d, %Y", "%b %d, %Y", "%d %B %Y"];

    let s = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(format_datetime(dt.naive_local(), Some(*dt.offset())));
    }
    if let Some((local, offset)) = split_offset(s) {
        if let Some(dt) = parse_naive_datetime(local) {
            return Ok(format_datetime(dt, Some(offset)));
        }
    }
    if let Some(dt) = parse_naive_datetime(s) {
        return Ok(format_datetime(dt, None));
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d.format("%Y-%m-%d").to_string());
        }
    }
    Err(MetadataError::InvalidDate(raw.to_string()))
}

fn parse_naive_datetime(s: &str) -> Option<NaiveDateTime> {
    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

/// Split a trailing, space-separated UTC offset as YAML timestamps write it:
/// `Z`, `-5`, `+05`, `+0530`, `+05:30`.
fn split_offset(s: &str) -> Option<(&str, FixedOffset)> {
    let (local, tz) = s.rsplit_once(' ')?;
    Some((local.trim_end(), parse_offset(tz)?))
}

fn parse_offset(tz: &str) -> Option<FixedOffset> {
    if tz == "Z" {
        return FixedOffset::east_opt(0);
    }
    let sign = match tz.split_at_checked(1)?.0 {
        "+" => 1,
        "-" => -1,
        _ => return None,
    };
    let rest = &tz[1..];
    let (hours, minutes) = match rest.split_once(':') {
        Some(parts) => parts,
        None if rest.len() > 2 => rest.split_at(rest.len() - 2),
        None => (rest, "00"),
    };
    let digits = |part: &str| {
        !part.is_empty() && part.len() <= 2 && part.bytes().all(|b| b.is_ascii_digit())
    };
    if !digits(hours) || !digits(minutes) {
        return None;
    }
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

fn format_datetime(dt: NaiveDateTime, offset: Option<FixedOffset>) -> String {
    let mut out = if dt.nanosecond() == 0 {
        dt.format("%Y-%m-%dT%H:%M:%S").to_string()
    } else {
        dt.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
    };
    if let Some(offset) = offset {
        out.push_str(&offset.to_string());
    }
    out
}

// ============================================================================
// Value flattening
// ============================================================================

fn flatten_key(key: &Value) -> Result<String, MetadataError> {
    scalar_to_string(key).ok_or_else(|| MetadataError::UnsupportedKey(format!("{key:?}")))
}

/// Flatten a YAML value to a single string. Sequences of scalars are
/// space-joined; anything nested is an error naming the field.
fn flatten_value(key: &str, value: &Value) -> Result<String, MetadataError> {
    match value {
        Value::Sequence(items) => {
            let parts = items
                .iter()
                .map(|item| {
                    scalar_to_string(item)
                        .ok_or_else(|| MetadataError::UnsupportedValue(key.to_string()))
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(join_values(parts.iter().map(String::as_str)))
        }
        Value::Tagged(tagged) => flatten_value(key, &tagged.value),
        other => {
            scalar_to_string(other).ok_or_else(|| MetadataError::UnsupportedValue(key.to_string()))
        }
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Tagged(tagged) => scalar_to_string(&tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

/// Join multi-valued fields with single spaces, skipping empty values.
fn join_values<'a>(values: impl Iterator<Item = &'a str>) -> String {
    values
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
