//! Build state persisted between runs.
//!
//! Four maps survive the process, each in its own JSON file under the cache
//! directory:
//!
//! | File                | Map                                   |
//! |---------------------|---------------------------------------|
//! | `dependencies.json` | [`DependencyGraph`] dependee → dependents |
//! | `subscribers.json`  | [`SubscriberRegistry`] type → subscribers |
//! | `outputs.json`      | [`OutputMap`] source → output files   |
//! | `snapshot.json`     | [`BuildSnapshot`] source → mtime (ms) |
//!
//! Every file is wrapped as `{"version": N, "entries": {...}}`. A missing
//! file, unreadable JSON or a different version all load as an empty map,
//! which makes the next full build regenerate everything.
//!
//! The snapshot also stores the [`Criteria`] it was recorded under. A build
//! with other criteria (`build` after `build --all`, or the reverse) finds
//! the snapshot empty, so every path is checked again under the new rules.

mod graph;
mod outputs;
mod snapshot;

pub use graph::{DependencyGraph, SubscriberRegistry};
pub use outputs::OutputMap;
pub use snapshot::{BuildSnapshot, mtime_millis};

use crate::{content::types::Criteria, log};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Bump when any persisted map changes shape.
pub const STATE_VERSION: u64 = 1;

const DEPENDENCIES_FILE: &str = "dependencies.json";
const SUBSCRIBERS_FILE: &str = "subscribers.json";
const OUTPUTS_FILE: &str = "outputs.json";
const SNAPSHOT_FILE: &str = "snapshot.json";

const STATE_FILES: [&str; 4] = [DEPENDENCIES_FILE, SUBSCRIBERS_FILE, OUTPUTS_FILE, SNAPSHOT_FILE];

#[derive(Debug, Error)]
pub enum StateError {
    #[error("IO error on state file `{0}`")]
    Io(PathBuf, #[source] io::Error),

    #[error("failed to serialize `{0}`")]
    Json(PathBuf, #[source] serde_json::Error),
}

/// All persisted maps, loaded and saved together.
#[derive(Debug, Default)]
pub struct BuildState {
    dir: PathBuf,
    criteria: Criteria,
    pub deps: DependencyGraph,
    pub subscribers: SubscriberRegistry,
    pub outputs: OutputMap,
    pub snapshot: BuildSnapshot,
}

impl BuildState {
    /// Load state from `dir` for a build under `criteria`, starting empty
    /// for anything unusable.
    pub fn load(dir: &Path, criteria: Criteria) -> Self {
        Self {
            dir: dir.to_path_buf(),
            criteria,
            deps: load_versioned(&dir.join(DEPENDENCIES_FILE)),
            subscribers: load_versioned(&dir.join(SUBSCRIBERS_FILE)),
            outputs: load_versioned(&dir.join(OUTPUTS_FILE)),
            snapshot: load_snapshot(&dir.join(SNAPSHOT_FILE), criteria),
        }
    }

    pub fn save(&self) -> Result<(), StateError> {
        fs::create_dir_all(&self.dir).map_err(|e| StateError::Io(self.dir.clone(), e))?;
        save_versioned(&self.dir.join(DEPENDENCIES_FILE), &self.deps)?;
        save_versioned(&self.dir.join(SUBSCRIBERS_FILE), &self.subscribers)?;
        save_versioned(&self.dir.join(OUTPUTS_FILE), &self.outputs)?;
        let path = self.dir.join(SNAPSHOT_FILE);
        let doc = json!({
            "version": STATE_VERSION,
            "criteria": self.criteria,
            "entries": self.snapshot,
        });
        write_doc(&path, &doc)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Delete the state files in `dir`. Missing files are fine.
    pub fn remove_files(dir: &Path) -> Result<(), StateError> {
        for name in STATE_FILES {
            let path = dir.join(name);
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(StateError::Io(path, e)),
            }
        }
        Ok(())
    }
}

fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or_default()
}

/// Read a state file of the current version. `None` when missing or
/// unusable.
fn read_doc(path: &Path) -> Option<Value> {
    let content = fs::read_to_string(path).ok()?;
    let name = file_name(path);

    let Ok(doc) = serde_json::from_str::<Value>(&content) else {
        log!("warn"; "{name} is corrupt, starting fresh");
        return None;
    };
    if doc.get("version").and_then(Value::as_u64) != Some(STATE_VERSION) {
        log!("warn"; "{name} has an unknown version, starting fresh");
        return None;
    }
    Some(doc)
}

fn take_entries<T: DeserializeOwned + Default>(mut doc: Value, path: &Path) -> T {
    serde_json::from_value(doc["entries"].take()).unwrap_or_else(|_| {
        log!("warn"; "{} has malformed entries, starting fresh", file_name(path));
        T::default()
    })
}

/// Read one versioned state file.
pub fn load_versioned<T: DeserializeOwned + Default>(path: &Path) -> T {
    read_doc(path).map(|doc| take_entries(doc, path)).unwrap_or_default()
}

/// Read the snapshot, empty unless it was recorded under `criteria`.
fn load_snapshot(path: &Path, criteria: Criteria) -> BuildSnapshot {
    let Some(doc) = read_doc(path) else {
        return BuildSnapshot::default();
    };
    let recorded: Option<Criteria> =
        doc.get("criteria").cloned().and_then(|c| serde_json::from_value(c).ok());
    if recorded != Some(criteria) {
        log!("build"; "content criteria changed, checking every path");
        return BuildSnapshot::default();
    }
    take_entries(doc, path)
}

/// Write one versioned state file.
pub fn save_versioned<T: Serialize>(path: &Path, entries: &T) -> Result<(), StateError> {
    write_doc(path, &json!({ "version": STATE_VERSION, "entries": entries }))
}

fn write_doc(path: &Path, doc: &Value) -> Result<(), StateError> {
    let content =
        serde_json::to_string_pretty(doc).map_err(|e| StateError::Json(path.to_path_buf(), e))?;
    fs::write(path, content).map_err(|e| StateError::Io(path.to_path_buf(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let map: BTreeMap<String, u64> = load_versioned(&dir.path().join("nope.json"));
        assert!(map.is_empty());
    }

    #[test]
    fn test_corrupt_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snapshot.json");
        fs::write(&path, "not json {{{").unwrap();
        let map: BTreeMap<String, u64> = load_versioned(&path);
        assert!(map.is_empty());
    }

    #[test]
    fn test_version_mismatch_loads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snapshot.json");
        fs::write(&path, r#"{"version": 99, "entries": {"posts/a.md": 1}}"#).unwrap();
        let map: BTreeMap<String, u64> = load_versioned(&path);
        assert!(map.is_empty());
    }

    #[test]
    fn test_malformed_entries_load_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snapshot.json");
        fs::write(&path, r#"{"version": 1, "entries": ["posts/a.md"]}"#).unwrap();
        let map: BTreeMap<String, u64> = load_versioned(&path);
        assert!(map.is_empty());
    }

    #[test]
    fn test_saved_file_is_versioned() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snapshot.json");
        let mut map = BTreeMap::new();
        map.insert("posts/a.md".to_string(), 42u64);
        save_versioned(&path, &map).unwrap();

        let raw: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["version"], STATE_VERSION);
        assert_eq!(raw["entries"]["posts/a.md"], 42);

        let loaded: BTreeMap<String, u64> = load_versioned(&path);
        assert_eq!(loaded, map);
    }

    #[test]
    fn test_build_state_survives_restart() {
        let dir = TempDir::new().unwrap();
        let cache = dir.path().join(".cache");

        let mut state = BuildState::load(&cache, Criteria::default());
        state.deps.add_dependency("posts/a.md", "listings/blog.html");
        state.subscribers.add_subscription("post", "listings/blog.html");
        state.outputs.record_outputs("posts/a.md", vec!["posts/a.html".into()]);
        state.snapshot.record("posts/a.md", 7);
        state.save().unwrap();

        let reloaded = BuildState::load(&cache, Criteria::default());
        assert_eq!(reloaded.deps.dependents_of("posts/a.md"), ["listings/blog.html"]);
        assert_eq!(reloaded.subscribers.subscribers_of("post"), ["listings/blog.html"]);
        assert_eq!(reloaded.outputs.outputs_of("posts/a.md"), ["posts/a.html"]);
        assert_eq!(reloaded.snapshot.get("posts/a.md"), Some(7));
    }

    #[test]
    fn test_snapshot_dropped_when_criteria_change() {
        let dir = TempDir::new().unwrap();
        let drafts = Criteria { include_unpublished: true };

        let mut state = BuildState::load(dir.path(), Criteria::default());
        state.snapshot.record("posts/a.md", 7);
        state.deps.add_dependency("posts/a.md", "listings/blog.html");
        state.save().unwrap();

        let raw: Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join(SNAPSHOT_FILE)).unwrap())
                .unwrap();
        assert_eq!(raw["criteria"]["include_unpublished"], false);

        let with_drafts = BuildState::load(dir.path(), drafts);
        assert_eq!(with_drafts.snapshot.len(), 0);
        assert_eq!(with_drafts.deps.dependents_of("posts/a.md"), ["listings/blog.html"]);

        let same = BuildState::load(dir.path(), Criteria::default());
        assert_eq!(same.snapshot.get("posts/a.md"), Some(7));
    }

    #[test]
    fn test_snapshot_without_criteria_loads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(SNAPSHOT_FILE);
        fs::write(&path, r#"{"version": 1, "entries": {"posts/a.md": 1}}"#).unwrap();
        assert_eq!(load_snapshot(&path, Criteria::default()).len(), 0);
    }

    #[test]
    fn test_remove_files() {
        let dir = TempDir::new().unwrap();
        let state = BuildState::load(dir.path(), Criteria::default());
        state.save().unwrap();
        assert!(dir.path().join(SNAPSHOT_FILE).exists());

        BuildState::remove_files(dir.path()).unwrap();
        assert!(!dir.path().join(SNAPSHOT_FILE).exists());
        BuildState::remove_files(dir.path()).unwrap();
    }
}
