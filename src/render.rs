//! Template rendering.
//!
//! Handlers never touch template files directly; they go through the
//! [`Renderer`] held by the build context. [`ThemeRenderer`] resolves
//! templates inside the active theme:
//!
//! ```text
//! themes/<theme>/_templates/
//! ├── types/
//! │   ├── post.html              # type template, full view
//! │   ├── post--teaser.html      # type template, teaser view
//! │   ├── listing--archive.html  # suggestion for `listing_type: archive`
//! │   └── menu--main.html        # the `main` menu
//! └── layouts/
//!     ├── post.html
//!     └── default.html           # fallback for every layout
//! ```
//!
//! The template language is deliberately small: `{{ dotted.path }}` inserts
//! a context value and `{{ dotted.path | escape }}` HTML-escapes it.

use crate::error::BuildError;
use regex::{Captures, Regex};
use serde_json::{Value, json};
use std::{
    cell::RefCell,
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
    rc::Rc,
    sync::LazyLock,
};

/// How a unit is being presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    Full,
    Teaser,
}

impl ViewMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Teaser => "teaser",
        }
    }
}

/// Template collaborator used by content type handlers.
pub trait Renderer {
    /// Render the type template `name`. `suggestions` are tried before the
    /// plain name, the last one first.
    fn render_type(
        &self,
        name: &str,
        mode: ViewMode,
        suggestions: &[String],
        context: &Value,
    ) -> Result<String, BuildError>;

    /// Render the layout `name`, falling back to the default layout.
    fn render_layout(&self, name: &str, context: &Value) -> Result<String, BuildError>;

    /// Render a template given as a string, e.g. a permalink pattern.
    fn render_inline(&self, source: &str, context: &Value) -> String;

    /// Whether the theme itself provides a type template for `name`.
    /// Built-in defaults do not count.
    fn has_type(&self, name: &str, mode: ViewMode, suggestions: &[String]) -> Result<bool, BuildError>;
}

// ============================================================================
// Theme renderer
// ============================================================================

/// Renderer backed by the `_templates` directory of a theme.
///
/// Template files are read at most once per process.
#[derive(Debug)]
pub struct ThemeRenderer {
    templates_dir: PathBuf,
    loaded: RefCell<HashMap<PathBuf, Option<Rc<str>>>>,
}

impl ThemeRenderer {
    pub fn new(theme_dir: &Path) -> Self {
        Self {
            templates_dir: theme_dir.join("_templates"),
            loaded: RefCell::new(HashMap::new()),
        }
    }

    /// Read a template file, remembering misses too.
    fn load(&self, path: PathBuf) -> Result<Option<Rc<str>>, BuildError> {
        if let Some(hit) = self.loaded.borrow().get(&path) {
            return Ok(hit.clone());
        }
        let template = match fs::read_to_string(&path) {
            Ok(source) => Some(Rc::from(source)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => None,
            Err(err) => return Err(BuildError::Io(path, err)),
        };
        self.loaded.borrow_mut().insert(path, template.clone());
        Ok(template)
    }

    fn find_type(&self, candidates: &[String]) -> Result<Option<Rc<str>>, BuildError> {
        let dir = self.templates_dir.join("types");
        for candidate in candidates {
            if let Some(template) = self.load(dir.join(format!("{candidate}.html")))? {
                return Ok(Some(template));
            }
        }
        Ok(None)
    }
}

impl Renderer for ThemeRenderer {
    fn render_type(
        &self,
        name: &str,
        mode: ViewMode,
        suggestions: &[String],
        context: &Value,
    ) -> Result<String, BuildError> {
        let candidates = type_candidates(name, mode, suggestions);
        let template = match self.find_type(&candidates)? {
            Some(template) => template,
            None => Rc::from(builtin_type(name, mode).ok_or_else(|| {
                BuildError::MissingTemplate {
                    kind: "type",
                    name: candidates.last().cloned().unwrap_or_else(|| name.to_owned()),
                }
            })?),
        };
        Ok(render_str(&template, context))
    }

    fn render_layout(&self, name: &str, context: &Value) -> Result<String, BuildError> {
        let dir = self.templates_dir.join("layouts");
        let template = match self.load(dir.join(format!("{name}.html")))? {
            Some(template) => template,
            None => self
                .load(dir.join("default.html"))?
                .unwrap_or_else(|| Rc::from(DEFAULT_LAYOUT)),
        };
        Ok(render_str(&template, context))
    }

    fn render_inline(&self, source: &str, context: &Value) -> String {
        render_str(source, context)
    }

    fn has_type(&self, name: &str, mode: ViewMode, suggestions: &[String]) -> Result<bool, BuildError> {
        let candidates = type_candidates(name, mode, suggestions);
        Ok(self.find_type(&candidates)?.is_some())
    }
}

/// Type template names to try, most specific first.
///
/// `post` with suggestions `[a, b]` in teaser mode yields
/// `post--b--teaser`, `post--a--teaser`, `post--teaser`.
pub fn type_candidates(name: &str, mode: ViewMode, suggestions: &[String]) -> Vec<String> {
    let suffix = match mode {
        ViewMode::Full => "",
        ViewMode::Teaser => "--teaser",
    };
    suggestions
        .iter()
        .rev()
        .map(|s| format!("{name}--{s}{suffix}"))
        .chain(std::iter::once(format!("{name}{suffix}")))
        .collect()
}

// ============================================================================
// Built-in templates
// ============================================================================

const DEFAULT_LAYOUT: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{{ page.title | escape }} | {{ site.title | escape }}</title>
</head>
<body>
{{ content }}
</body>
</html>
"#;

const DEFAULT_ARTICLE: &str = r#"<article class="{{ page.type }}">
<header><h1>{{ page.title | escape }}</h1></header>
<div>{{ page.body }}</div>
</article>
"#;

const DEFAULT_TEASER: &str = r#"<article class="{{ page.type }} teaser">
<h2><a href="{{ page.url }}">{{ page.title | escape }}</a></h2>
<div>{{ page.excerpt }}</div>
</article>
"#;

const DEFAULT_LISTING: &str = r#"{{ page.header }}
<div>{{ page.body }}</div>
<div class="listing">
{{ listing.items }}
</div>
<nav class="pager">{{ pagination.links }}</nav>
{{ page.footer }}
"#;

const DEFAULT_MENU: &str = r#"<nav class="menu menu--{{ menu.name }}">
<h2>{{ menu.title | escape }}</h2>
<ul>
{{ menu.links }}
</ul>
</nav>
"#;

fn builtin_type(name: &str, mode: ViewMode) -> Option<&'static str> {
    match (name, mode) {
        ("post" | "page", ViewMode::Full) => Some(DEFAULT_ARTICLE),
        ("post" | "page" | "listing", ViewMode::Teaser) => Some(DEFAULT_TEASER),
        ("listing", ViewMode::Full) => Some(DEFAULT_LISTING),
        ("menu", ViewMode::Full) => Some(DEFAULT_MENU),
        _ => None,
    }
}

// ============================================================================
// Template engine
// ============================================================================

static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_.]*)\s*(?:\|\s*([a-z_]+)\s*)?\}\}").unwrap()
});

/// Substitute every `{{ path | filter }}` token in `template`.
pub fn render_str(template: &str, context: &Value) -> String {
    TOKEN
        .replace_all(template, |caps: &Captures| {
            let text = lookup(context, &caps[1]).map(stringify).unwrap_or_default();
            match caps.get(2).map(|m| m.as_str()) {
                Some("escape" | "e") => escape_html(&text),
                Some("json") => Value::String(text).to_string(),
                _ => text,
            }
        })
        .into_owned()
}

/// Resolve a dotted path; numeric segments index arrays.
fn lookup<'a>(context: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(context, |value, segment| match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => items.iter().map(stringify).collect::<Vec<_>>().join("\n"),
        Value::Null | Value::Object(_) => String::new(),
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

// ============================================================================
// Permalinks
// ============================================================================

/// Expand the `{{ num }}` token of a permalink for page `index`: empty for
/// the first page, the index otherwise.
pub fn expand_permalink(renderer: &dyn Renderer, pattern: &str, index: usize) -> String {
    let num = if index == 0 { json!("") } else { json!(index) };
    renderer.render_inline(pattern, &json!({ "num": num }))
}

/// Output file for a permalink, relative to the output directory. A
/// permalink ending in `/` writes `index.<ext>`.
pub fn output_filename(permalink: &str, ext: &str) -> String {
    let rel = permalink.trim_start_matches('/');
    if rel.is_empty() || rel.ends_with('/') {
        format!("{rel}index.{ext}")
    } else {
        rel.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn theme_with(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (rel, body) in files {
            let path = dir.path().join("_templates").join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, body).unwrap();
        }
        dir
    }

    #[test]
    fn test_render_str_values() {
        let ctx = json!({
            "page": { "title": "A & B", "tags": ["x", "y"], "n": 3 },
            "pages": ["index.html", "page1.html"],
        });
        assert_eq!(render_str("{{ page.title }}", &ctx), "A & B");
        assert_eq!(render_str("{{page.title|escape}}", &ctx), "A &amp; B");
        assert_eq!(render_str("{{ page.tags }}", &ctx), "x\ny");
        assert_eq!(render_str("n={{ page.n }}", &ctx), "n=3");
        assert_eq!(render_str("{{ pages.1 }}", &ctx), "page1.html");
        assert_eq!(render_str("[{{ page.missing }}]", &ctx), "[]");
        assert_eq!(render_str("{{ page.title | json }}", &ctx), "\"A & B\"");
    }

    #[test]
    fn test_type_candidates_order() {
        let suggestions = vec!["a".to_string(), "b".to_string()];
        assert_eq!(
            type_candidates("post", ViewMode::Full, &suggestions),
            vec!["post--b", "post--a", "post"]
        );
        assert_eq!(
            type_candidates("post", ViewMode::Teaser, &[]),
            vec!["post--teaser"]
        );
    }

    #[test]
    fn test_suggestion_template_preferred() {
        let theme = theme_with(&[
            ("types/listing.html", "plain"),
            ("types/listing--archive.html", "archive {{ page.title }}"),
        ]);
        let renderer = ThemeRenderer::new(theme.path());
        let ctx = json!({ "page": { "title": "T" } });

        let out = renderer
            .render_type("listing", ViewMode::Full, &["archive".into()], &ctx)
            .unwrap();
        assert_eq!(out, "archive T");
        let out = renderer.render_type("listing", ViewMode::Full, &[], &ctx).unwrap();
        assert_eq!(out, "plain");
    }

    #[test]
    fn test_builtin_default_and_missing_template() {
        let theme = TempDir::new().unwrap();
        let renderer = ThemeRenderer::new(theme.path());
        let ctx = json!({ "page": { "title": "Hi", "body": "<p>x</p>", "type": "post" } });

        let out = renderer.render_type("post", ViewMode::Full, &[], &ctx).unwrap();
        assert!(out.contains("<h1>Hi</h1>"));
        assert!(out.contains("<p>x</p>"));

        let err = renderer.render_type("note", ViewMode::Full, &[], &ctx).unwrap_err();
        assert!(matches!(err, BuildError::MissingTemplate { kind: "type", ref name } if name == "note"));
    }

    #[test]
    fn test_has_type_ignores_builtins() {
        let theme = theme_with(&[("types/feed--podcast.html", "podcast")]);
        let renderer = ThemeRenderer::new(theme.path());
        assert!(renderer.has_type("feed", ViewMode::Full, &["podcast".into()]).unwrap());
        assert!(!renderer.has_type("feed", ViewMode::Full, &[]).unwrap());
        assert!(!renderer.has_type("post", ViewMode::Full, &[]).unwrap());
    }

    #[test]
    fn test_layout_fallback_chain() {
        let theme = theme_with(&[("layouts/default.html", "default:{{ content }}")]);
        let renderer = ThemeRenderer::new(theme.path());
        let ctx = json!({ "content": "body" });
        assert_eq!(renderer.render_layout("post", &ctx).unwrap(), "default:body");

        let bare = TempDir::new().unwrap();
        let renderer = ThemeRenderer::new(bare.path());
        assert!(renderer.render_layout("post", &ctx).unwrap().contains("<body>\nbody\n</body>"));
    }

    #[test]
    fn test_templates_are_read_once() {
        let theme = theme_with(&[("types/page.html", "v1")]);
        let renderer = ThemeRenderer::new(theme.path());
        let ctx = json!({});
        assert_eq!(renderer.render_type("page", ViewMode::Full, &[], &ctx).unwrap(), "v1");

        fs::write(theme.path().join("_templates/types/page.html"), "v2").unwrap();
        assert_eq!(renderer.render_type("page", ViewMode::Full, &[], &ctx).unwrap(), "v1");
    }

    #[test]
    fn test_expand_permalink() {
        let theme = TempDir::new().unwrap();
        let renderer = ThemeRenderer::new(theme.path());
        assert_eq!(expand_permalink(&renderer, "blog/page{{ num }}.html", 0), "blog/page.html");
        assert_eq!(expand_permalink(&renderer, "blog/page{{ num }}.html", 2), "blog/page2.html");
        assert_eq!(expand_permalink(&renderer, "blog/{{num}}/", 1), "blog/1/");
    }

    #[test]
    fn test_output_filename() {
        assert_eq!(output_filename("/blog/", "html"), "blog/index.html");
        assert_eq!(output_filename("blog/a.html", "html"), "blog/a.html");
        assert_eq!(output_filename("/", "xml"), "index.xml");
        assert_eq!(output_filename("feed/", "xml"), "feed/index.xml");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<a href=\"x\">'&'</a>"), "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;");
    }
}
