//! Navigation menus.
//!
//! Every `content/menus/<name>.yml` describes one menu:
//!
//! ```yaml
//! title: Main
//! items:
//!   - title: Home
//!   - title: About
//!     href: about/
//!   - title: Source
//!     href: https://github.com/example/site
//! ```
//!
//! An item without `href` links to the site root and a relative `href` is
//! resolved under `base.baseurl`. Hrefs starting with `/` and absolute URLs
//! are kept as written. Items without a title are not shown.
//!
//! Menus are rendered once per process through the `menu--<name>` type
//! template, then `menu`, then a built-in default, and reach every template
//! as `site.menus.<name>`.

use crate::{
    error::{BuildError, ErrorList},
    render::{Renderer, ViewMode, escape_html},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::{collections::BTreeMap, fs, path::Path};
use walkdir::WalkDir;

/// Directory under the content root holding menu files. Its files are not
/// content units.
pub const MENUS_DIR: &str = "menus";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Menu {
    pub title: String,
    pub items: Vec<MenuItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuItem {
    pub title: String,
    pub href: String,
    /// Set for links leaving the site.
    pub external: bool,
    /// Any other keys, passed through to templates.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Menu {
    /// Resolve every item's `href` against `baseurl`.
    fn normalize(&mut self, baseurl: &str) {
        for item in &mut self.items {
            if is_absolute_url(&item.href) {
                item.external = true;
            } else if item.href.is_empty() {
                item.href = baseurl.to_owned();
            } else if !item.href.starts_with('/') {
                item.href = format!("{baseurl}{}", item.href);
            }
        }
    }

    /// `<li>` elements of the titled items.
    fn links(&self) -> String {
        self.items
            .iter()
            .filter(|item| !item.title.is_empty())
            .map(|item| {
                format!(
                    "<li><a href=\"{}\">{}</a></li>",
                    escape_html(&item.href),
                    escape_html(&item.title)
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn is_absolute_url(href: &str) -> bool {
    href.contains("://") || href.starts_with("//") || href.starts_with("mailto:")
}

/// Whether a content key belongs to the menus directory.
pub fn is_menu_path(path: &str) -> bool {
    path.split_once('/').is_some_and(|(dir, _)| dir == MENUS_DIR)
}

/// Load every menu file in `dir`, keyed by file stem. Unreadable files are
/// recorded in `errors` and left out.
pub fn load_menus(dir: &Path, baseurl: &str, errors: &mut ErrorList) -> BTreeMap<String, Menu> {
    let mut menus = BTreeMap::new();
    if !dir.is_dir() {
        return menus;
    }

    let files = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "yml" || ext == "yaml"));

    for path in files {
        let Some(name) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
            continue;
        };
        let key = format!(
            "{MENUS_DIR}/{}",
            path.file_name().unwrap_or_default().to_string_lossy()
        );
        match read_menu(&path) {
            Ok(mut menu) => {
                menu.normalize(baseurl);
                menus.insert(name, menu);
            }
            Err(err) => errors.push(&key, err),
        }
    }
    menus
}

fn read_menu(path: &Path) -> Result<Menu, BuildError> {
    let content = fs::read_to_string(path).map_err(|e| BuildError::Io(path.to_path_buf(), e))?;
    serde_yaml::from_str(&content).map_err(|e| BuildError::ParseFailure(e.to_string()))
}

/// Render each menu to HTML for the `site.menus` object.
pub fn render_menus(
    menus: &BTreeMap<String, Menu>,
    renderer: &dyn Renderer,
    site: &Value,
    errors: &mut ErrorList,
) -> Map<String, Value> {
    let mut rendered = Map::new();
    for (name, menu) in menus {
        let data = json!({
            "site": site,
            "menu": {
                "name": name,
                "title": menu.title,
                "items": menu.items,
                "links": menu.links(),
            },
        });
        match renderer.render_type("menu", ViewMode::Full, std::slice::from_ref(name), &data) {
            Ok(html) => {
                rendered.insert(name.clone(), Value::String(html));
            }
            Err(err) => errors.push(&format!("{MENUS_DIR}/{name}.yml"), err),
        }
    }
    rendered
}
