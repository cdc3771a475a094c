//! RSS feeds over another content type.
//!
//! ```yaml
//! ---
//! permalink: feed.xml
//! feed_item:
//!   type: post
//!   count: 20
//! ---
//! ```
//!
//! Without a `feed` type template in the theme the document is built with
//! the `rss` crate and validated before it is written. A theme `feed.html`
//! (or `feed--<suggestion>.html`) replaces it; its `feed.items` are the
//! shown items rendered through the theme's `feed_item.html`.
//!
//! Links in a feed are absolute, so feeds need `base.url`.

use super::{
    ContentType, Criteria, check_published,
    listing::{ItemSelection, collect_items, depend_on},
    suggestions,
};
use crate::{
    build::BuildContext, config::SiteConfig, content::ContentUnit, error::BuildError,
    render::ViewMode,
};
use chrono::Utc;
use rss::{Category, ChannelBuilder, GuidBuilder, Item, ItemBuilder, validation::Validate};
use serde_json::{Value, json};
use std::rc::Rc;

/// Type template rendering one item of a themed feed.
const ITEM_TEMPLATE: &str = "feed_item";

#[derive(Debug, Clone, Copy, Default)]
pub struct FeedType;

impl ContentType for FeedType {
    fn tag(&self) -> &'static str {
        "feed"
    }

    fn extension(&self) -> &'static str {
        "xml"
    }

    fn validate(&self, unit: &ContentUnit, criteria: Criteria) -> Result<(), BuildError> {
        check_published(unit, criteria)?;
        ItemSelection::from_unit(unit, "feed_item").map(|_| ())
    }

    fn generate(&self, unit: &ContentUnit, ctx: &mut BuildContext) -> Result<(), BuildError> {
        let selection = ItemSelection::from_unit(unit, "feed_item")?;
        let Some(output) = unit.output_paths.first() else {
            return Err(BuildError::GenerationFailure(format!(
                "feed permalink `{}` does not name a single file",
                unit.permalink
            )));
        };

        let items = collect_items(unit, &selection, ctx);
        let shown = &items[..items.len().min(selection.count)];
        depend_on(unit, shown, ctx);

        let suggestions = suggestions(unit);
        let xml = if ctx.renderer().has_type(self.tag(), ViewMode::Full, &suggestions)? {
            render_themed(unit, shown, &suggestions, ctx)?
        } else {
            build_channel(shown, ctx)?
        };
        ctx.write_output(output, &xml)
    }
}

/// Feed document through the theme's `feed` and `feed_item` templates.
fn render_themed(
    unit: &ContentUnit,
    shown: &[Rc<ContentUnit>],
    suggestions: &[String],
    ctx: &BuildContext,
) -> Result<String, BuildError> {
    let config = ctx.config();
    let site_url = site_url(config)?;
    let rendered = shown
        .iter()
        .map(|item| {
            let mut item_ctx = ctx.unit_context(item);
            item_ctx["link"] = Value::String(format!("{site_url}{}", item.url(&config.base.baseurl)));
            let data = json!({ "site": ctx.site(), "item": item_ctx });
            ctx.renderer().render_type(ITEM_TEMPLATE, ViewMode::Full, &[], &data)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let data = json!({
        "site": ctx.site(),
        "page": ctx.unit_context(unit),
        "feed": {
            "items": rendered,
            "link": format!("{site_url}{}", config.base.baseurl),
            "build_date": Utc::now().to_rfc2822(),
        },
    });
    ctx.renderer().render_type("feed", ViewMode::Full, suggestions, &data)
}

/// Built-in RSS 2.0 document.
fn build_channel(shown: &[Rc<ContentUnit>], ctx: &BuildContext) -> Result<String, BuildError> {
    let config = ctx.config();
    let site_url = site_url(config)?;
    let items: Vec<Item> = shown
        .iter()
        .map(|unit| rss_item(unit, &format!("{site_url}{}", unit.url(&config.base.baseurl))))
        .collect();

    let channel = ChannelBuilder::default()
        .title(config.base.title.clone())
        .link(format!("{site_url}{}", config.base.baseurl))
        .description(config.base.description.clone())
        .generator("stagen".to_string())
        .last_build_date(Utc::now().to_rfc2822())
        .items(items)
        .build();

    channel
        .validate()
        .map_err(|e| BuildError::GenerationFailure(format!("invalid feed: {e}")))?;
    Ok(channel.to_string())
}

fn rss_item(unit: &ContentUnit, link: &str) -> Item {
    let categories = ["tags", "categories"]
        .iter()
        .flat_map(|key| string_list(unit.get(key)))
        .map(|name| Category { name, domain: None })
        .collect::<Vec<_>>();

    let mut builder = ItemBuilder::default();
    builder
        .title(unit.get_str("title").map(str::to_owned))
        .link(Some(link.to_owned()))
        .guid(GuidBuilder::default().permalink(true).value(link).build())
        .description(Some(unit.excerpt.clone()).filter(|e| !e.is_empty()))
        .pub_date(unit.datetime.map(|d| d.and_utc().to_rfc2822()))
        .categories(categories);
    builder.build()
}

/// `base.url` without a trailing slash. Unit URLs already carry the
/// `baseurl`, so appending one gives an absolute link.
fn site_url(config: &SiteConfig) -> Result<&str, BuildError> {
    config
        .base
        .url
        .as_deref()
        .map(|u| u.trim_end_matches('/'))
        .filter(|u| !u.is_empty())
        .ok_or_else(|| BuildError::GenerationFailure("feeds need `base.url` for absolute links".into()))
}

/// A front-matter value as a list of strings: a sequence, or one string.
fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{content::parser::ParsedSource, error::ErrorList};

    fn feed(meta: Value) -> ContentUnit {
        let source = ParsedSource {
            metadata: meta.as_object().cloned().unwrap(),
            body: String::new(),
        };
        FeedType.create("feeds/rss.yml", source, &mut ErrorList::new()).unwrap()
    }

    #[test]
    fn test_feed_defaults_to_xml_output() {
        let unit = feed(json!({ "feed_item": { "type": "post" } }));
        assert_eq!(unit.output_paths, ["feeds/rss.xml"]);

        let unit = feed(json!({ "permalink": "feed/", "feed_item": { "type": "post" } }));
        assert_eq!(unit.output_paths, ["feed/index.xml"]);
    }

    #[test]
    fn test_feed_requires_item_type() {
        let criteria = Criteria::default();
        assert!(FeedType.is_valid(&feed(json!({ "feed_item": { "type": "post" } })), criteria));
        assert!(!FeedType.is_valid(&feed(json!({ "title": "x" })), criteria));
    }

    #[test]
    fn test_site_url_required() {
        let mut config = SiteConfig::default();
        assert!(site_url(&config).is_err());

        config.base.url = Some("https://example.com/".into());
        assert_eq!(site_url(&config).unwrap(), "https://example.com");
    }

    #[test]
    fn test_rss_item_categories() {
        let mut unit = ContentUnit::new("posts/a.md", "post");
        unit.meta = json!({ "title": "A", "tags": ["rust", "ssg"], "categories": "notes" })
            .as_object()
            .cloned()
            .unwrap();
        unit.excerpt = "Intro".into();

        let item = rss_item(&unit, "https://example.com/posts/a.html");
        assert_eq!(item.title(), Some("A"));
        assert_eq!(item.link(), Some("https://example.com/posts/a.html"));
        assert_eq!(item.description(), Some("Intro"));
        let names: Vec<_> = item.categories().iter().map(|c| c.name()).collect();
        assert_eq!(names, ["rust", "ssg", "notes"]);
    }
}
