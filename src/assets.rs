//! Static files copied verbatim into the output directory.
//!
//! Sources are the site's `assets/` directory and the active theme's
//! directory. Theme entries whose top-level name starts with `_` (such as
//! `_templates/`) are theme internals and are not copied.

use crate::{config::SiteConfig, log};
use anyhow::{Context, Result};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};
use walkdir::WalkDir;

/// Copy site and theme assets into the output directory, skipping files
/// whose copy is already up to date. Returns the number of files copied.
pub fn copy_assets(config: &SiteConfig) -> Result<usize> {
    let mut sources = BTreeMap::new();
    collect(&config.build.theme_dir(), true, &mut sources)?;
    // Site assets override theme files of the same name.
    collect(&config.build.assets, false, &mut sources)?;

    let output = &config.build.output;
    let mut copied = 0;
    for (rel, src) in &sources {
        let dest = output.join(rel);
        if is_up_to_date(src, &dest) {
            continue;
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(src, &dest)
            .with_context(|| format!("Failed to copy {} to {}", src.display(), dest.display()))?;
        copied += 1;
    }

    if copied > 0 {
        log!("assets"; "copied {copied} files");
    }
    Ok(copied)
}

/// Map every file under `dir` from its relative path to its source path.
fn collect(dir: &Path, skip_internal: bool, sources: &mut BTreeMap<PathBuf, PathBuf>) -> Result<()> {
    if !dir.is_dir() {
        return Ok(());
    }

    let walker = WalkDir::new(dir).into_iter().filter_entry(|e| {
        let name = e.file_name().to_string_lossy();
        let internal = skip_internal && e.depth() == 1 && name.starts_with('_');
        e.depth() == 0 || !(name.starts_with('.') || internal)
    });

    for entry in walker {
        let entry = entry.with_context(|| format!("Failed to walk {}", dir.display()))?;
        if entry.file_type().is_file() {
            let rel = entry.path().strip_prefix(dir)?.to_path_buf();
            sources.insert(rel, entry.into_path());
        }
    }
    Ok(())
}

/// Destination exists and is not older than the source.
fn is_up_to_date(src: &Path, dest: &Path) -> bool {
    let modified = |p: &Path| fs::metadata(p).and_then(|m| m.modified()).ok();
    match (modified(src), modified(dest)) {
        (Some(src), Some(dest)) => dest >= src,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, body: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }

    fn config(dir: &TempDir) -> SiteConfig {
        let mut config = SiteConfig::default();
        config.resolve_paths(dir.path());
        config
    }

    #[test]
    fn test_copies_assets_and_theme_files() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "assets/img/logo.svg", "<svg/>");
        write(dir.path(), "assets/.hidden", "x");
        write(dir.path(), "themes/default/css/site.css", "body{}");
        write(dir.path(), "themes/default/_templates/layouts/default.html", "{{ content }}");

        let config = config(&dir);
        assert_eq!(copy_assets(&config).unwrap(), 2);

        let out = &config.build.output;
        assert_eq!(fs::read_to_string(out.join("img/logo.svg")).unwrap(), "<svg/>");
        assert_eq!(fs::read_to_string(out.join("css/site.css")).unwrap(), "body{}");
        assert!(!out.join("_templates").exists());
        assert!(!out.join(".hidden").exists());
    }

    #[test]
    fn test_site_assets_override_theme() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "themes/default/style.css", "theme");
        write(dir.path(), "assets/style.css", "site");

        let config = config(&dir);
        copy_assets(&config).unwrap();
        assert_eq!(fs::read_to_string(config.build.output.join("style.css")).unwrap(), "site");
    }

    #[test]
    fn test_up_to_date_files_are_skipped() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "assets/a.txt", "a");

        let config = config(&dir);
        assert_eq!(copy_assets(&config).unwrap(), 1);
        assert_eq!(copy_assets(&config).unwrap(), 0);
    }

    #[test]
    fn test_missing_dirs_copy_nothing() {
        let dir = TempDir::new().unwrap();
        assert_eq!(copy_assets(&config(&dir)).unwrap(), 0);
    }
}
