//! Content type handlers.
//!
//! Each handler owns the semantics of one type tag: how a parsed source
//! becomes a [`ContentUnit`], when a unit is valid, how units of the type
//! sort inside a collection, and what it writes when generated.
//!
//! | Tag       | Handler         | Output                               |
//! |-----------|-----------------|--------------------------------------|
//! | `post`    | [`PostType`]    | one page, sorted newest first        |
//! | `page`    | [`PageType`]    | one page                             |
//! | `listing` | [`ListingType`] | one page per chunk of a collection   |
//! | `feed`    | [`FeedType`]    | one RSS document                     |

mod feed;
mod listing;
mod page;
mod post;

pub use feed::FeedType;
pub use listing::ListingType;
pub use page::PageType;
pub use post::PostType;

use super::{ContentUnit, PUBLISHED_KEY, parser};
use crate::{
    build::BuildContext,
    error::{BuildError, ErrorList},
    render::{ViewMode, output_filename},
};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use parser::ParsedSource;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::{cmp::Ordering, collections::HashMap, fmt, rc::Rc, sync::LazyLock};

/// Orders units inside a collection.
pub type Comparator = fn(&ContentUnit, &ContentUnit) -> Ordering;

/// Content selection applied to every unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Criteria {
    pub include_unpublished: bool,
}

/// Semantics of one content type.
pub trait ContentType {
    /// Tag this handler is registered under.
    fn tag(&self) -> &'static str;

    /// Extension of the default output file.
    fn extension(&self) -> &'static str {
        "html"
    }

    /// Build a unit from a parsed source. Non-fatal problems such as an
    /// unparseable date go to `notes`.
    fn create(
        &self,
        path: &str,
        source: ParsedSource,
        notes: &mut ErrorList,
    ) -> Result<ContentUnit, BuildError> {
        Ok(new_unit(self.tag(), path, source, self.extension(), notes))
    }

    /// Reject units that must not be built.
    fn validate(&self, unit: &ContentUnit, criteria: Criteria) -> Result<(), BuildError> {
        check_published(unit, criteria)
    }

    fn is_valid(&self, unit: &ContentUnit, criteria: Criteria) -> bool {
        self.validate(unit, criteria).is_ok()
    }

    /// Ordering of units of this type inside collections. Types without one
    /// keep path order.
    fn comparator(&self) -> Option<Comparator> {
        None
    }

    /// Write the outputs of `unit` through `ctx`.
    fn generate(&self, unit: &ContentUnit, ctx: &mut BuildContext) -> Result<(), BuildError>;
}

// ============================================================================
// Registry
// ============================================================================

/// Type tag → handler.
#[derive(Clone, Default)]
pub struct TypeRegistry {
    types: HashMap<String, Rc<dyn ContentType>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the post, page, listing and feed handlers.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(PostType);
        registry.register(PageType);
        registry.register(ListingType);
        registry.register(FeedType);
        registry
    }

    /// Register `handler` under its tag, replacing any previous one.
    pub fn register(&mut self, handler: impl ContentType + 'static) {
        self.types.insert(handler.tag().to_owned(), Rc::new(handler));
    }

    pub fn get(&self, tag: &str) -> Option<Rc<dyn ContentType>> {
        self.types.get(tag).cloned()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.types.contains_key(tag)
    }

    /// Registered tags, sorted.
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<_> = self.types.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry").field("types", &self.tags()).finish()
    }
}

// ============================================================================
// Shared unit construction
// ============================================================================

static FILENAME_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4}-\d{2}-\d{2})-").unwrap());

/// Build a unit with the attributes every type shares: publish state,
/// rendered body, excerpt, datetime and permalink.
pub fn new_unit(
    tag: &str,
    path: &str,
    source: ParsedSource,
    ext: &str,
    notes: &mut ErrorList,
) -> ContentUnit {
    let ParsedSource { metadata, body } = source;
    let mut unit = ContentUnit::new(path, tag);
    unit.meta = metadata;
    unit.published = published_flag(unit.get(PUBLISHED_KEY));

    let markdown = parser::is_markdown(path);
    unit.excerpt = match unit.get_str("excerpt") {
        Some(excerpt) => excerpt.to_owned(),
        None if markdown => strip_paragraph(&parser::render_markdown(parser::first_line(&body))),
        None => parser::first_line(&body).to_owned(),
    };
    unit.body = if markdown { parser::render_markdown(&body) } else { body };

    unit.datetime = resolve_datetime(&unit, notes);

    unit.permalink = match unit.get_str("permalink") {
        Some(permalink) => permalink.to_owned(),
        None => default_permalink(path, ext),
    };
    if !unit.permalink.contains("{{") {
        unit.output_paths = vec![output_filename(&unit.permalink, ext)];
    }
    unit
}

fn published_flag(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => !matches!(s.to_ascii_lowercase().as_str(), "false" | "no" | "0"),
        Some(Value::Number(n)) => n.as_i64() != Some(0),
        _ => true,
    }
}

/// `<p>text</p>\n` → `text`.
fn strip_paragraph(html: &str) -> String {
    let trimmed = html.trim();
    trimmed
        .strip_prefix("<p>")
        .and_then(|s| s.strip_suffix("</p>"))
        .unwrap_or(trimmed)
        .to_owned()
}

/// Source path with its extension replaced by `ext`.
pub fn default_permalink(path: &str, ext: &str) -> String {
    let file_start = path.rfind('/').map_or(0, |i| i + 1);
    let stem = match path[file_start..].rfind('.') {
        Some(dot) if dot > 0 => &path[..file_start + dot],
        _ => path,
    };
    format!("{stem}.{ext}")
}

/// Front-matter `datetime`, then `date`, then a `YYYY-MM-DD-` file name
/// prefix. A value that does not parse is noted and skipped.
fn resolve_datetime(unit: &ContentUnit, notes: &mut ErrorList) -> Option<NaiveDateTime> {
    for key in ["datetime", "date"] {
        let Some(value) = unit.get(key) else { continue };
        let raw = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        match parse_datetime(&raw) {
            Some(datetime) => return Some(datetime),
            None => {
                notes.push(&unit.path, BuildError::ParseFailure(format!("invalid {key} `{raw}`")));
                break;
            }
        }
    }

    FILENAME_DATE
        .captures(unit.file_name())
        .and_then(|caps| NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d").ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Parse the date formats accepted in front matter.
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(datetime) = DateTime::parse_from_rfc3339(raw) {
        return Some(datetime.naive_local());
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(datetime);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// `published: false` units only pass when unpublished content is included.
pub fn check_published(unit: &ContentUnit, criteria: Criteria) -> Result<(), BuildError> {
    if unit.published || criteria.include_unpublished {
        Ok(())
    } else {
        Err(BuildError::InvalidContent("unpublished".into()))
    }
}

// ============================================================================
// Shared rendering
// ============================================================================

/// Type template suggestions from the `layout` and `listing_type` fields.
pub fn suggestions(unit: &ContentUnit) -> Vec<String> {
    ["layout", "listing_type"]
        .iter()
        .filter_map(|key| unit.get_str(key))
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Render a unit through its own type template.
pub fn render_unit(
    unit: &ContentUnit,
    mode: ViewMode,
    ctx: &BuildContext,
) -> Result<String, BuildError> {
    let page = ctx.unit_context(unit);
    let mut data = json!({
        "site": ctx.site(),
        "page": page.clone(),
        "view_mode": mode.as_str(),
    });
    data[unit.type_tag.as_str()] = page;
    ctx.renderer().render_type(&unit.type_tag, mode, &suggestions(unit), &data)
}

/// Render a single-output unit inside its layout and write it.
pub fn write_single(unit: &ContentUnit, ctx: &mut BuildContext) -> Result<(), BuildError> {
    let Some(output) = unit.output_paths.first() else {
        return Err(BuildError::GenerationFailure(format!(
            "permalink `{}` does not name a single file",
            unit.permalink
        )));
    };

    let content = render_unit(unit, ViewMode::Full, ctx)?;
    let mut page = ctx.unit_context(unit);
    page["content"] = Value::String(content.clone());
    let data = json!({ "site": ctx.site(), "page": page, "content": content });
    let html = ctx.renderer().render_layout(&unit.type_tag, &data)?;
    ctx.write_output(output, &html)
}

/// Descending by datetime, undated last, ties broken by path.
pub fn compare_by_date(a: &ContentUnit, b: &ContentUnit) -> Ordering {
    match (&a.datetime, &b.datetime) {
        (Some(x), Some(y)) => y.cmp(x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.path.cmp(&b.path))
}
