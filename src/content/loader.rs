//! Turning a content path into a validated, cached [`ContentUnit`].

use super::{ContentCache, ContentUnit, parser, relative_key, type_dir, type_tag_for};
use super::types::{Criteria, TypeRegistry};
use crate::{
    error::{BuildError, ErrorList},
    menu::is_menu_path,
};
use std::{
    fs,
    path::{Path, PathBuf},
    rc::Rc,
};
use walkdir::WalkDir;

#[derive(Debug)]
pub struct ContentLoader {
    content_dir: PathBuf,
    criteria: Criteria,
    registry: TypeRegistry,
    cache: ContentCache,
}

impl ContentLoader {
    pub fn new(content_dir: &Path, criteria: Criteria, registry: TypeRegistry) -> Self {
        Self {
            content_dir: content_dir.to_path_buf(),
            criteria,
            registry,
            cache: ContentCache::new(),
        }
    }

    pub fn content_dir(&self) -> &Path {
        &self.content_dir
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &ContentCache {
        &self.cache
    }

    pub fn invalidate(&mut self, path: &str) {
        self.cache.invalidate(path);
    }

    /// Load `path` (relative to the content directory).
    ///
    /// Without `force_reload` a cached outcome is returned as is, including
    /// a cached rejection. With it the cache entry is dropped and the source
    /// is read again. Non-fatal notes such as invalid dates go to `notes`.
    pub fn load(
        &mut self,
        path: &str,
        force_reload: bool,
        notes: &mut ErrorList,
    ) -> Result<Rc<ContentUnit>, BuildError> {
        if force_reload {
            self.cache.invalidate(path);
        } else if let Some(cached) = self.cache.get(path) {
            return cached;
        }

        match self.read(path, notes) {
            Ok(unit) => {
                let unit = Rc::new(unit);
                self.cache.insert(Rc::clone(&unit));
                Ok(unit)
            }
            Err(err) => {
                self.cache.insert_rejection(path, &err);
                Err(err)
            }
        }
    }

    fn read(&self, path: &str, notes: &mut ErrorList) -> Result<ContentUnit, BuildError> {
        let tag = type_tag_for(path).ok_or_else(|| BuildError::UnknownType(path.to_owned()))?;
        let handler = self.registry.get(&tag).ok_or(BuildError::UnknownType(tag))?;

        let file = self.content_dir.join(path);
        let raw = fs::read_to_string(&file).map_err(|e| BuildError::Io(file, e))?;
        let source = parser::parse(&raw)?;

        let unit = handler.create(path, source, notes)?;
        handler.validate(&unit, self.criteria)?;
        Ok(unit)
    }

    /// Relative paths of every file of type `tag`, sorted.
    pub fn paths_of_type(&self, tag: &str) -> Vec<String> {
        list_files(&self.content_dir.join(type_dir(tag)), &self.content_dir)
    }

    /// Relative paths of every content file, sorted. Menu files are site
    /// data, not content, and are left out.
    pub fn all_paths(&self) -> Vec<String> {
        let mut paths = list_files(&self.content_dir, &self.content_dir);
        paths.retain(|p| !is_menu_path(p));
        paths
    }
}

/// Files under `dir` as content keys relative to `root`, skipping hidden
/// entries.
fn list_files(dir: &Path, root: &Path) -> Vec<String> {
    let mut paths: Vec<String> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'))
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| relative_key(e.path(), root))
        .collect();
    paths.sort();
    paths
}
