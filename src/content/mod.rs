//! Content units and their loading.
//!
//! A [`ContentUnit`] is one parsed, validated source file. Its type tag is
//! derived from the leading directory of its path:
//!
//! ```text
//! content/
//! ├── posts/2024-01-01-hello.md     → tag "post"
//! ├── pages/about.md                → tag "page"
//! ├── listings/blog.html            → tag "listing"
//! └── feeds/rss.xml                 → tag "feed"
//! ```
//!
//! Units are owned by the [`ContentCache`] and shared as `Rc`s; a changed
//! source produces a new unit rather than mutating the cached one.

mod cache;
mod loader;
pub mod parser;
pub mod types;

pub use cache::ContentCache;
pub use loader::ContentLoader;

use chrono::NaiveDateTime;
use serde_json::{Map, Value, json};
use std::path::{Component, Path};

/// Front-matter key carrying the publish state.
pub const PUBLISHED_KEY: &str = "published";

/// One parsed, validated content file.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentUnit {
    /// Path relative to the content directory, `/`-separated.
    pub path: String,
    /// Registered content type, e.g. `post`.
    pub type_tag: String,
    /// Front-matter values, minus the fields lifted into typed attributes.
    pub meta: Map<String, Value>,
    /// Canonical date of the unit, if one could be determined.
    pub datetime: Option<NaiveDateTime>,
    pub published: bool,
    /// Rendered body (HTML for markdown sources).
    pub body: String,
    pub excerpt: String,
    /// Public path pattern; may contain a `{{ num }}` token for listings.
    pub permalink: String,
    /// Output files this unit renders to, relative to the output directory.
    pub output_paths: Vec<String>,
}

impl ContentUnit {
    /// Create a bare unit; type handlers fill in the derived attributes.
    pub fn new(path: impl Into<String>, type_tag: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            type_tag: type_tag.into(),
            meta: Map::new(),
            datetime: None,
            published: true,
            body: String::new(),
            excerpt: String::new(),
            permalink: String::new(),
            output_paths: Vec::new(),
        }
    }

    /// Front-matter value by key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.meta.get(key)
    }

    /// Front-matter string value by key.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.meta.get(key).and_then(Value::as_str)
    }

    /// Nested front-matter object value, e.g. `listing_item.type`.
    pub fn get_nested(&self, object: &str, key: &str) -> Option<&Value> {
        self.meta.get(object).and_then(|v| v.get(key))
    }

    /// File name of the source, without directories.
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// URL of the first output under the site's `baseurl`.
    pub fn url(&self, baseurl: &str) -> String {
        let rel = match self.output_paths.first() {
            Some(out) => out.trim_end_matches("index.html"),
            None => self.permalink.trim_start_matches('/'),
        };
        format!("{}/{rel}", baseurl.trim_end_matches('/'))
    }

    /// Template context object for this unit: the front matter plus the
    /// typed attributes.
    pub fn to_context(&self, baseurl: &str) -> Value {
        let mut ctx = self.meta.clone();
        let typed = json!({
            "path": self.path,
            "type": self.type_tag,
            "published": self.published,
            "body": self.body,
            "excerpt": self.excerpt,
            "permalink": self.permalink,
            "url": self.url(baseurl),
            "datetime": self.datetime.map(|d| d.format("%Y-%m-%dT%H:%M:%S").to_string()),
            "date_rfc2822": self
                .datetime
                .map(|d| d.and_utc().to_rfc2822()),
        });
        if let Value::Object(typed) = typed {
            ctx.extend(typed);
        }
        Value::Object(ctx)
    }
}

/// Derive the type tag of a relative content path: its leading directory
/// segment, singularized.
///
/// Returns `None` for files at the top of the content directory.
pub fn type_tag_for(path: &str) -> Option<String> {
    let (dir, rest) = path.split_once('/')?;
    if dir.is_empty() || rest.is_empty() {
        return None;
    }
    Some(singularize(dir).to_owned())
}

/// Strip one trailing `s`: `posts` → `post`, `listings` → `listing`.
fn singularize(word: &str) -> &str {
    match word.strip_suffix('s') {
        Some(stem) if !stem.is_empty() => stem,
        _ => word,
    }
}

/// Directory name holding content of `tag`.
pub fn type_dir(tag: &str) -> String {
    format!("{tag}s")
}

/// Convert a path under `root` into the `/`-separated relative form used as
/// content identity.
pub fn relative_key(path: &Path, root: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<_> = rel
        .components()
        .map(|c| match c {
            Component::Normal(s) => s.to_str(),
            _ => None,
        })
        .collect::<Option<_>>()?;
    (!parts.is_empty()).then(|| parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::path::PathBuf;

    #[test]
    fn test_type_tag_for() {
        assert_eq!(type_tag_for("posts/a.md").as_deref(), Some("post"));
        assert_eq!(type_tag_for("pages/sub/about.md").as_deref(), Some("page"));
        assert_eq!(type_tag_for("listings/blog.html").as_deref(), Some("listing"));
        assert_eq!(type_tag_for("feeds/rss.xml").as_deref(), Some("feed"));
        assert_eq!(type_tag_for("news/x.md").as_deref(), Some("new"));
        assert_eq!(type_tag_for("index.md"), None);
        assert_eq!(type_tag_for("posts/"), None);
    }

    #[test]
    fn test_singularize_keeps_bare_s() {
        assert_eq!(singularize("s"), "s");
        assert_eq!(singularize("media"), "media");
        assert_eq!(type_dir("post"), "posts");
    }

    #[test]
    fn test_relative_key() {
        let root = PathBuf::from("/site/content");
        assert_eq!(
            relative_key(&root.join("posts").join("a.md"), &root).as_deref(),
            Some("posts/a.md")
        );
        assert_eq!(relative_key(Path::new("/elsewhere/a.md"), &root), None);
        assert_eq!(relative_key(&root, &root), None);
    }

    #[test]
    fn test_to_context_merges_meta_and_typed_fields() {
        let mut unit = ContentUnit::new("posts/2024-01-02-b.md", "post");
        unit.meta.insert("title".into(), json!("B"));
        unit.datetime = NaiveDate::from_ymd_opt(2024, 1, 2).and_then(|d| d.and_hms_opt(0, 0, 0));
        unit.permalink = "posts/2024-01-02-b.html".into();
        unit.output_paths = vec!["posts/2024-01-02-b.html".into()];

        let ctx = unit.to_context("/");
        assert_eq!(ctx["title"], "B");
        assert_eq!(ctx["type"], "post");
        assert_eq!(ctx["datetime"], "2024-01-02T00:00:00");
        assert_eq!(ctx["url"], "/posts/2024-01-02-b.html");
        assert!(ctx["date_rfc2822"].as_str().unwrap().starts_with("Tue, 2 Jan 2024"));
    }

    #[test]
    fn test_url_of_directory_permalink() {
        let mut unit = ContentUnit::new("pages/about.md", "page");
        unit.output_paths = vec!["about/index.html".into()];
        assert_eq!(unit.url("/"), "/about/");
        assert_eq!(unit.file_name(), "about.md");
    }

    #[test]
    fn test_url_under_baseurl() {
        let mut unit = ContentUnit::new("posts/a.md", "post");
        unit.output_paths = vec!["posts/a.html".into()];
        assert_eq!(unit.url("/blog/"), "/blog/posts/a.html");
        assert_eq!(unit.url("/blog"), "/blog/posts/a.html");
        assert_eq!(unit.to_context("/blog/")["url"], "/blog/posts/a.html");
    }
}
