//! Build driver.
//!
//! Decides which content paths to regenerate and cascades every change to
//! the paths derived from it.
//!
//! # Architecture
//!
//! ```text
//! full_build()
//!     │
//!     ├── enumerate content/ ──► compare mtimes with BuildSnapshot
//!     │
//!     ├── for each changed path ──► cascade(path)
//!     │
//!     ├── for each vanished path ──► cascade(path)  (retires it)
//!     │
//!     └── persist dependencies / subscribers / outputs / snapshot
//!
//! cascade(root)                       breadth-first, once per path per pass
//!     │
//!     ├── source exists?
//!     │     yes ──► clear outputs, drop its edges, force-reload,
//!     │             generate, record outputs
//!     │     no  ──► clear outputs, forget it (edges dropped at pass end)
//!     │
//!     └── enqueue dependents_of(path) ∪ subscribers_of(type of path)
//! ```
//!
//! Every path visited in a pass goes into the pass's [`GeneratedSet`] before
//! it is generated, so dependency cycles terminate.

use crate::{
    config::SiteConfig,
    content::{
        ContentLoader, ContentUnit,
        types::{Criteria, TypeRegistry},
        type_tag_for,
    },
    error::{BuildError, ErrorList},
    log, menu,
    render::{Renderer, ThemeRenderer},
    site,
    state::{BuildState, StateError, mtime_millis},
};
use anyhow::{Context, Result};
use rustc_hash::FxHashSet;
use serde_json::Value;
use std::{collections::VecDeque, fs, mem, path::Path, rc::Rc};

/// What happened to a path during a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Generation finished and its outputs were recorded.
    Generated,
    /// Rejected by loading or validation (unknown type, unpublished).
    Invalid,
    /// Parse, template, IO or generation error.
    Failed,
    /// Source no longer exists; its outputs were deleted.
    Removed,
}

/// Paths already visited in the current pass.
#[derive(Debug, Default)]
pub struct GeneratedSet(FxHashSet<String>);

impl GeneratedSet {
    /// Returns `false` if `path` was already present.
    pub fn insert(&mut self, path: &str) -> bool {
        self.0.insert(path.to_owned())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.0.contains(path)
    }
}

/// Result of one pass.
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Every visited path in visiting order.
    pub visited: Vec<(String, Outcome)>,
    pub errors: ErrorList,
    /// Persisting state at the end of the pass failed.
    pub state_error: Option<StateError>,
}

impl BuildReport {
    /// How many times `path` was visited.
    #[cfg(test)]
    pub fn visits(&self, path: &str) -> usize {
        self.visited.iter().filter(|(p, _)| p == path).count()
    }

    #[cfg(test)]
    pub fn outcome(&self, path: &str) -> Option<Outcome> {
        self.visited.iter().find(|(p, _)| p == path).map(|(_, o)| *o)
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.visited.iter().filter(|(_, o)| *o == outcome).count()
    }

    pub fn paths(&self, outcome: Outcome) -> Vec<&str> {
        self.visited
            .iter()
            .filter(|(_, o)| *o == outcome)
            .map(|(p, _)| p.as_str())
            .collect()
    }

    pub fn has_failures(&self) -> bool {
        self.errors.failure_count() > 0 || self.state_error.is_some()
    }

    /// Print the summary line and every failure.
    pub fn log(&self) {
        for (path, err) in self.errors.failures() {
            log!("error"; "{path}: {err}");
        }
        if let Some(err) = &self.state_error {
            log!("error"; "{err}");
        }
        for path in self.paths(Outcome::Removed) {
            log!("build"; "removed {path}");
        }
        let skipped = self.errors.len() - self.errors.failure_count();
        log!(
            "build";
            "{} generated, {} removed, {} skipped, {} errors",
            self.count(Outcome::Generated),
            self.count(Outcome::Removed),
            skipped,
            self.errors.failure_count()
        );
    }
}

/// Bookkeeping of one pass in flight.
#[derive(Debug, Default)]
struct Pass {
    generated: GeneratedSet,
    visited: Vec<(String, Outcome)>,
    removed: Vec<String>,
}

/// Everything a build needs, alive for the whole process.
///
/// Content type handlers receive it mutably while generating: they load
/// collections through it, register edges on its state and write outputs
/// through [`BuildContext::write_output`] so the outputs get recorded.
pub struct BuildContext {
    config: SiteConfig,
    renderer: Box<dyn Renderer>,
    loader: ContentLoader,
    state: BuildState,
    errors: ErrorList,
    site: Value,
    written: Vec<String>,
}

impl BuildContext {
    pub fn new(config: SiteConfig, registry: TypeRegistry, renderer: Box<dyn Renderer>) -> Self {
        let mut errors = ErrorList::new();
        let mut site = site::site_context(&config, &mut errors);
        let menus = menu::load_menus(
            &config.build.content.join(menu::MENUS_DIR),
            &config.base.baseurl,
            &mut errors,
        );
        let menus = menu::render_menus(&menus, renderer.as_ref(), &site, &mut errors);
        site["menus"] = Value::Object(menus);

        let criteria = Criteria { include_unpublished: config.build.include_unpublished };
        let loader = ContentLoader::new(&config.build.content, criteria, registry);
        let state = BuildState::load(&config.build.cache, criteria);

        Self { config, renderer, loader, state, errors, site, written: Vec::new() }
    }

    /// Context with the built-in content types and the configured theme.
    pub fn from_config(config: SiteConfig) -> Self {
        let renderer = ThemeRenderer::new(&config.build.theme_dir());
        Self::new(config, TypeRegistry::with_builtin(), Box::new(renderer))
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    /// `site` object handed to every template.
    pub fn site(&self) -> &Value {
        &self.site
    }

    /// Template context of `unit`, with URLs under the configured `baseurl`.
    pub fn unit_context(&self, unit: &ContentUnit) -> Value {
        unit.to_context(&self.config.base.baseurl)
    }

    pub fn renderer(&self) -> &dyn Renderer {
        self.renderer.as_ref()
    }

    pub fn state(&self) -> &BuildState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut BuildState {
        &mut self.state
    }

    pub fn load(&mut self, path: &str, force_reload: bool) -> Result<Rc<ContentUnit>, BuildError> {
        self.loader.load(path, force_reload, &mut self.errors)
    }

    /// Every valid unit of type `tag`, ordered by the type's comparator
    /// (path order when it has none). Invalid units are left out.
    pub fn collection(&mut self, tag: &str) -> Vec<Rc<ContentUnit>> {
        let mut units = Vec::new();
        for path in self.loader.paths_of_type(tag) {
            match self.load(&path, false) {
                Ok(unit) => units.push(unit),
                Err(err) if err.is_rejection() => {}
                Err(err) => self.errors.push(&path, err),
            }
        }
        if let Some(compare) = self.loader.registry().get(tag).and_then(|h| h.comparator()) {
            units.sort_by(|a, b| compare(a, b));
        }
        units
    }

    /// Write one output file, relative to the output directory, and record
    /// it for the unit being generated.
    pub fn write_output(&mut self, rel: &str, contents: &str) -> Result<(), BuildError> {
        let rel = rel.trim_start_matches('/');
        if rel.is_empty() || rel.split('/').any(|s| s == "..") {
            return Err(BuildError::GenerationFailure(format!("invalid output path `{rel}`")));
        }

        let path = self.config.build.output.join(rel);
        self.written.push(rel.to_owned());
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| BuildError::Io(parent.to_path_buf(), e))?;
        }
        fs::write(&path, contents).map_err(|e| BuildError::Io(path, e))
    }

    // ========================================================================
    // Entry points
    // ========================================================================

    /// Regenerate every path whose source is new or modified since the last
    /// full build, retire vanished ones, and persist state.
    pub fn full_build(&mut self) -> BuildReport {
        let mut pass = Pass::default();

        let current: Vec<(String, Option<u64>)> = self
            .loader
            .all_paths()
            .into_iter()
            .map(|path| {
                let mtime = mtime_millis(&self.loader.content_dir().join(&path)).ok();
                (path, mtime)
            })
            .collect();

        let changed: Vec<&str> = current
            .iter()
            .filter(|(path, mtime)| mtime.is_none_or(|m| self.state.snapshot.is_changed(path, m)))
            .map(|(path, _)| path.as_str())
            .collect();
        for path in &changed {
            self.loader.invalidate(path);
        }
        for path in &changed {
            self.cascade(path, &mut pass);
        }

        let present: FxHashSet<&str> = current.iter().map(|(p, _)| p.as_str()).collect();
        let vanished: Vec<String> = self
            .state
            .snapshot
            .paths()
            .filter(|p| !present.contains(p))
            .map(str::to_owned)
            .collect();
        for path in &vanished {
            self.loader.invalidate(path);
            self.cascade(path, &mut pass);
        }

        for (path, mtime) in &current {
            match mtime {
                Some(mtime) if !pass.failed(path) => self.state.snapshot.record(path, *mtime),
                _ => self.state.snapshot.remove(path),
            }
        }

        self.finish(pass)
    }

    /// Rebuild `path` and everything depending on it as one pass.
    #[cfg(test)]
    pub fn build_path(&mut self, path: &str) -> BuildReport {
        self.rebuild(&[path.to_owned()])
    }

    /// Rebuild a batch of changed paths as one pass. Paths whose source is
    /// gone are retired.
    pub fn rebuild(&mut self, paths: &[String]) -> BuildReport {
        let mut pass = Pass::default();
        for path in paths {
            self.loader.invalidate(path);
        }
        for path in paths {
            self.cascade(path, &mut pass);
        }
        for path in paths {
            let mtime = mtime_millis(&self.loader.content_dir().join(path)).ok();
            match mtime {
                Some(mtime) if !pass.failed(path) => self.state.snapshot.record(path, mtime),
                _ => self.state.snapshot.remove(path),
            }
        }
        self.finish(pass)
    }

    /// Retire `path`: delete its outputs, rebuild its dependents and
    /// subscribers, then forget its edges. Watch mode reaches the same
    /// path through [`Self::rebuild`] once the source is gone.
    #[cfg(test)]
    pub fn remove_path(&mut self, path: &str) -> BuildReport {
        let mut pass = Pass::default();
        self.loader.invalidate(path);
        self.run_cascade(path, true, &mut pass);
        self.finish(pass)
    }

    /// Persist the state maps.
    pub fn flush(&self) -> Result<(), StateError> {
        self.state.save()
    }

    // ========================================================================
    // Cascade
    // ========================================================================

    fn cascade(&mut self, root: &str, pass: &mut Pass) {
        self.run_cascade(root, false, pass);
    }

    fn run_cascade(&mut self, root: &str, remove_root: bool, pass: &mut Pass) {
        let mut queue = VecDeque::from([(root.to_owned(), remove_root)]);

        while let Some((path, remove)) = queue.pop_front() {
            if !pass.generated.insert(&path) {
                continue;
            }

            let tag = if remove || !self.source_exists(&path) {
                self.retire(&path, pass);
                type_tag_for(&path)
            } else {
                self.regenerate(&path, pass)
            };

            let mut targets: Vec<String> = self.state.deps.dependents_of(&path).to_vec();
            if let Some(tag) = &tag {
                for subscriber in self.state.subscribers.subscribers_of(tag) {
                    if !targets.contains(subscriber) {
                        targets.push(subscriber.clone());
                    }
                }
            }
            queue.extend(
                targets
                    .into_iter()
                    .filter(|t| !pass.generated.contains(t))
                    .map(|t| (t, false)),
            );
        }
    }

    fn source_exists(&self, path: &str) -> bool {
        self.loader.content_dir().join(path).is_file()
    }

    /// Regenerate one existing path. Returns its type tag for the cascade.
    fn regenerate(&mut self, path: &str, pass: &mut Pass) -> Option<String> {
        self.clear_outputs(path);
        self.state.deps.remove_dependent(path);
        self.state.subscribers.remove_subscriber(path);

        let unit = match self.load(path, true) {
            Ok(unit) => unit,
            Err(err) => {
                let outcome = if err.is_rejection() { Outcome::Invalid } else { Outcome::Failed };
                self.errors.push(path, err);
                pass.visited.push((path.to_owned(), outcome));
                return type_tag_for(path);
            }
        };

        let outcome = match self.loader.registry().get(&unit.type_tag) {
            Some(handler) => {
                self.written.clear();
                let result = handler.generate(&unit, self);
                let written = mem::take(&mut self.written);
                self.state.outputs.record_outputs(path, written);
                match result {
                    Ok(()) => Outcome::Generated,
                    Err(err) => {
                        self.errors.push(path, err);
                        Outcome::Failed
                    }
                }
            }
            None => {
                self.errors.push(path, BuildError::UnknownType(unit.type_tag.clone()));
                Outcome::Invalid
            }
        };

        pass.visited.push((path.to_owned(), outcome));
        Some(unit.type_tag.clone())
    }

    /// Delete the outputs of a vanished path and forget it.
    fn retire(&mut self, path: &str, pass: &mut Pass) {
        self.clear_outputs(path);
        self.loader.invalidate(path);
        self.state.snapshot.remove(path);
        pass.removed.push(path.to_owned());
        pass.visited.push((path.to_owned(), Outcome::Removed));
    }

    fn clear_outputs(&mut self, path: &str) {
        let output_dir = &self.config.build.output;
        if let Err(err) = self.state.outputs.clear_outputs(path, output_dir) {
            self.errors.push(path, err);
        }
    }

    /// Drop edges of retired paths, collect errors, persist state.
    fn finish(&mut self, pass: Pass) -> BuildReport {
        for path in &pass.removed {
            self.state.deps.remove_dependee(path);
            self.state.deps.remove_dependent(path);
            self.state.subscribers.remove_subscriber(path);
        }

        BuildReport {
            visited: pass.visited,
            errors: mem::take(&mut self.errors),
            state_error: self.state.save().err(),
        }
    }
}

impl Pass {
    fn failed(&self, path: &str) -> bool {
        self.visited.iter().any(|(p, o)| p == path && *o == Outcome::Failed)
    }
}

/// Remove everything under the output directory and the persisted state.
pub fn clean(config: &SiteConfig) -> Result<()> {
    let output = &config.build.output;
    if output.exists() {
        remove_dir_contents(output)
            .with_context(|| format!("Failed to clear output directory: {}", output.display()))?;
    }
    BuildState::remove_files(&config.build.cache).context("Failed to remove build state")?;
    log!("clean"; "removed {}", output.display());
    Ok(())
}

fn remove_dir_contents(dir: &Path) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
