//! Front-matter splitting and body rendering.
//!
//! Sources open with an optional metadata block:
//!
//! ```text
//! ---                     +++
//! title: Hello            title = "Hello"
//! ---                     +++
//! Body text.              Body text.
//! ```
//!
//! `---` blocks are YAML, `+++` blocks are TOML. Both are normalized into a
//! JSON object so templates see one value model.

use crate::error::BuildError;
use pulldown_cmark::{Options, Parser, html};
use serde_json::{Map, Value};

/// Front-matter delimiters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Yaml,
    Toml,
}

impl Format {
    const fn delimiter(self) -> &'static str {
        match self {
            Self::Yaml => "---",
            Self::Toml => "+++",
        }
    }
}

/// Raw source split into metadata and body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedSource {
    pub metadata: Map<String, Value>,
    pub body: String,
}

/// Front-matter format opened by the first line, and the text after that
/// line. The line must be exactly a delimiter, so `----` or `--- x` open no
/// block.
fn opening(content: &str) -> Option<(Format, &str)> {
    let (first, rest) = match content.split_once('\n') {
        Some((first, rest)) => (first, rest),
        None => (content, ""),
    };
    let format = match first.trim_end() {
        "---" => Format::Yaml,
        "+++" => Format::Toml,
        _ => return None,
    };
    Some((format, rest))
}

/// Split the text after an opening delimiter into the block and the body.
/// The closing delimiter must sit on its own line.
fn split(format: Format, after_open: &str) -> Option<(&str, &str)> {
    let delimiter = format.delimiter();
    let mut offset = 0;
    for line in after_open.split_inclusive('\n') {
        if line.trim_end() == delimiter {
            return Some((&after_open[..offset], &after_open[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}

/// Parse a raw source file.
///
/// A file whose first line is not a delimiter yields empty metadata and the
/// whole file as body. An empty file or an unterminated block is rejected.
pub fn parse(raw: &str) -> Result<ParsedSource, BuildError> {
    if raw.trim().is_empty() {
        return Err(BuildError::InvalidContent("empty file".into()));
    }

    let raw = raw.trim_start_matches('\u{feff}');
    let Some((format, after_open)) = opening(raw) else {
        return Ok(ParsedSource { metadata: Map::new(), body: raw.to_owned() });
    };

    let (block, body) = split(format, after_open)
        .ok_or_else(|| BuildError::ParseFailure("unterminated front matter block".into()))?;

    let value: Value = match format {
        Format::Yaml if block.trim().is_empty() => Value::Object(Map::new()),
        Format::Yaml => serde_yaml::from_str(block)
            .map_err(|e| BuildError::ParseFailure(e.to_string()))?,
        Format::Toml => toml::from_str::<toml::Table>(block)
            .map(|table| toml_to_json(toml::Value::Table(table)))
            .map_err(|e| BuildError::ParseFailure(e.to_string()))?,
    };

    match value {
        Value::Object(metadata) => Ok(ParsedSource { metadata, body: body.to_owned() }),
        Value::Null => Ok(ParsedSource { metadata: Map::new(), body: body.to_owned() }),
        other => Err(BuildError::ParseFailure(format!(
            "front matter must be a mapping, found {}",
            value_kind(&other)
        ))),
    }
}

/// Convert TOML into the JSON value model. Datetimes become strings.
fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => Value::from(f),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => {
            Value::Object(table.into_iter().map(|(k, v)| (k, toml_to_json(v))).collect())
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}

/// Whether a source path holds markdown.
pub fn is_markdown(path: &str) -> bool {
    path.rsplit_once('.')
        .is_some_and(|(_, ext)| matches!(ext.to_ascii_lowercase().as_str(), "md" | "markdown"))
}

/// Render markdown to HTML.
pub fn render_markdown(source: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(source, options);
    let mut out = String::with_capacity(source.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

/// First non-blank line of a body, used as the default excerpt.
pub fn first_line(body: &str) -> &str {
    body.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or_default()
}
