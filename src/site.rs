//! Site-wide template data.
//!
//! The `site` object every template sees is the `[base]` config plus
//! `[extra]`, and the files of the data directory under `site.data`:
//!
//! ```text
//! data/
//! ├── authors.yml          → site.data.authors
//! └── social/
//!     └── links.yaml       → site.data.social.links
//! ```
//!
//! Data files are read once per process. Navigation menus live in
//! `content/menus/` instead; see [`crate::menu`].

use crate::{
    config::SiteConfig,
    error::{BuildError, ErrorList},
};
use serde_json::{Map, Value};
use std::{fs, path::Path};
use walkdir::WalkDir;

/// `site` template context for `config`. Unreadable data files are recorded
/// in `errors` and left out.
pub fn site_context(config: &SiteConfig, errors: &mut ErrorList) -> Value {
    let mut site = config.site_context();
    site["data"] = Value::Object(load_data(&config.build.data, errors));
    site
}

/// Load every YAML or JSON file under `dir` into one nested object.
pub fn load_data(dir: &Path, errors: &mut ErrorList) -> Map<String, Value> {
    let mut data = Map::new();
    if !dir.is_dir() {
        return data;
    }

    let mut files: Vec<_> = WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            p.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| matches!(ext, "yml" | "yaml" | "json"))
        })
        .collect();
    files.sort();

    for path in files {
        let Ok(rel) = path.strip_prefix(dir) else { continue };
        let display = format!("data/{}", rel.to_string_lossy().replace('\\', "/"));

        let value = match read_data_file(&path) {
            Ok(value) => value,
            Err(err) => {
                errors.push(&display, err);
                continue;
            }
        };

        let mut keys: Vec<String> = rel
            .parent()
            .into_iter()
            .flat_map(|p| p.components())
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        let Some(stem) = rel.file_stem() else { continue };
        keys.push(stem.to_string_lossy().into_owned());
        insert_nested(&mut data, &keys, value);
    }
    data
}

fn read_data_file(path: &Path) -> Result<Value, BuildError> {
    let content = fs::read_to_string(path).map_err(|e| BuildError::Io(path.to_path_buf(), e))?;
    let parsed = if path.extension().is_some_and(|ext| ext == "json") {
        serde_json::from_str(&content).map_err(|e| e.to_string())
    } else {
        serde_yaml::from_str(&content).map_err(|e| e.to_string())
    };
    parsed.map_err(BuildError::ParseFailure)
}

fn insert_nested(map: &mut Map<String, Value>, keys: &[String], value: Value) {
    match keys {
        [] => {}
        [last] => {
            map.insert(last.clone(), value);
        }
        [first, rest @ ..] => {
            let entry = map
                .entry(first.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(child) = entry {
                insert_nested(child, rest, value);
            }
        }
    }
}
