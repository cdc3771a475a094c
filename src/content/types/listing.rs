//! Paginated listings of another content type.
//!
//! ```yaml
//! ---
//! title: Blog
//! permalink: blog/{{ num }}/
//! listing_item:
//!   type: post
//!   count: 10
//! pager: true
//! ---
//! ```
//!
//! Page `0` expands `{{ num }}` to an empty string, later pages to their
//! index, so the example writes `blog/index.html`, `blog/1/index.html`, ...
//!
//! Optional `header` and `footer` strings are templates themselves. They are
//! rendered per page with the page's `pagination` in scope and handed to the
//! listing template as `page.header` and `page.footer`.

use super::{ContentType, Criteria, check_published, render_unit, suggestions};
use crate::{
    build::BuildContext,
    content::ContentUnit,
    error::BuildError,
    pagination::{Pagination, paginate},
    render::{ViewMode, expand_permalink, output_filename},
};
use serde_json::{Value, json};
use std::rc::Rc;

pub const DEFAULT_COUNT: usize = 10;

#[derive(Debug, Clone, Copy, Default)]
pub struct ListingType;

/// Collection settings shared by listings and feeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct ItemSelection {
    pub item_type: String,
    pub count: usize,
}

impl ItemSelection {
    /// Read `<key>.type` and `<key>.count` from the front matter.
    pub fn from_unit(unit: &ContentUnit, key: &str) -> Result<Self, BuildError> {
        let item_type = unit
            .get_nested(key, "type")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| BuildError::InvalidContent(format!("missing `{key}.type`")))?;
        let count = unit
            .get_nested(key, "count")
            .and_then(Value::as_u64)
            .and_then(|c| usize::try_from(c).ok())
            .filter(|c| *c > 0)
            .unwrap_or(DEFAULT_COUNT);
        Ok(Self { item_type: item_type.to_owned(), count })
    }
}

/// Load the collection a listing shows and subscribe the listing to the
/// item type, so items that appear later still reach it.
pub(super) fn collect_items(
    unit: &ContentUnit,
    selection: &ItemSelection,
    ctx: &mut BuildContext,
) -> Vec<Rc<ContentUnit>> {
    let items = ctx.collection(&selection.item_type);
    ctx.state_mut().subscribers.add_subscription(&selection.item_type, &unit.path);
    items
}

/// Record that the listing renders each of `shown`.
pub(super) fn depend_on(unit: &ContentUnit, shown: &[Rc<ContentUnit>], ctx: &mut BuildContext) {
    let deps = &mut ctx.state_mut().deps;
    for item in shown {
        deps.add_dependency(&item.path, &unit.path);
    }
}

impl ContentType for ListingType {
    fn tag(&self) -> &'static str {
        "listing"
    }

    fn validate(&self, unit: &ContentUnit, criteria: Criteria) -> Result<(), BuildError> {
        check_published(unit, criteria)?;
        if unit.get_str("permalink").is_none_or(str::is_empty) {
            return Err(BuildError::InvalidContent("listing has no `permalink`".into()));
        }
        ItemSelection::from_unit(unit, "listing_item").map(|_| ())
    }

    fn generate(&self, unit: &ContentUnit, ctx: &mut BuildContext) -> Result<(), BuildError> {
        let selection = ItemSelection::from_unit(unit, "listing_item")?;
        let pager = unit.get("pager").and_then(Value::as_bool).unwrap_or(true);

        let items = collect_items(unit, &selection, ctx);
        let pages = paginate(&items, selection.count, pager);
        for page in &pages {
            depend_on(unit, page, ctx);
        }

        let filenames: Vec<String> = (0..pages.len())
            .map(|i| output_filename(&expand_permalink(ctx.renderer(), &unit.permalink, i), "html"))
            .collect();
        if pages.len() > 1 && filenames[0] == filenames[1] {
            return Err(BuildError::GenerationFailure(format!(
                "permalink `{}` has no `{{{{ num }}}}` token but the listing has {} pages",
                unit.permalink,
                pages.len()
            )));
        }

        let navigation = Pagination::for_pages(&filenames);
        let suggestions = suggestions(unit);
        let page_ctx = ctx.unit_context(unit);
        let baseurl = ctx.config().base.baseurl.clone();

        for ((items, nav), filename) in pages.iter().zip(&navigation).zip(&filenames) {
            let teasers = items
                .iter()
                .map(|item| render_unit(item, ViewMode::Teaser, &*ctx))
                .collect::<Result<Vec<_>, _>>()?;

            let mut pagination = serde_json::to_value(nav)
                .map_err(|e| BuildError::GenerationFailure(e.to_string()))?;
            pagination["links"] = Value::String(nav.links(&baseurl));

            let mut data = json!({
                "site": ctx.site(),
                "page": page_ctx,
                "listing": { "items": teasers },
                "pagination": pagination,
            });
            for key in ["header", "footer"] {
                if let Some(template) = unit.get_str(key) {
                    let rendered = ctx.renderer().render_inline(template, &data);
                    data["page"][key] = Value::String(rendered);
                }
            }
            let content = ctx.renderer().render_type(self.tag(), ViewMode::Full, &suggestions, &data)?;

            let mut page = data["page"].take();
            page["content"] = Value::String(content.clone());
            let layout_data = json!({ "site": ctx.site(), "page": page, "content": content });
            let html = ctx.renderer().render_layout(self.tag(), &layout_data)?;
            ctx.write_output(filename, &html)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(meta: Value) -> ContentUnit {
        let mut unit = ContentUnit::new("listings/blog.html", "listing");
        unit.meta = meta.as_object().cloned().unwrap();
        unit
    }

    #[test]
    fn test_selection_defaults() {
        let unit = listing(json!({ "listing_item": { "type": "post" } }));
        let selection = ItemSelection::from_unit(&unit, "listing_item").unwrap();
        assert_eq!(selection, ItemSelection { item_type: "post".into(), count: DEFAULT_COUNT });

        let unit = listing(json!({ "listing_item": { "type": "post", "count": 0 } }));
        assert_eq!(ItemSelection::from_unit(&unit, "listing_item").unwrap().count, DEFAULT_COUNT);
    }

    #[test]
    fn test_listing_requires_permalink_and_item_type() {
        let criteria = Criteria::default();
        let valid = listing(json!({ "permalink": "blog/", "listing_item": { "type": "post" } }));
        assert!(ListingType.is_valid(&valid, criteria));

        let no_permalink = listing(json!({ "listing_item": { "type": "post" } }));
        assert!(!ListingType.is_valid(&no_permalink, criteria));

        let no_type = listing(json!({ "permalink": "blog/", "listing_item": { "count": 5 } }));
        assert!(!ListingType.is_valid(&no_type, criteria));
    }
}
