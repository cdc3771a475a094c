//! Modification times of every source seen by the last full build.

use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs, io,
    path::Path,
    time::UNIX_EPOCH,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildSnapshot(BTreeMap<String, u64>);

impl BuildSnapshot {
    /// Whether `path` needs a rebuild: unseen, or modified since recorded.
    pub fn is_changed(&self, path: &str, mtime: u64) -> bool {
        self.0.get(path) != Some(&mtime)
    }

    pub fn get(&self, path: &str) -> Option<u64> {
        self.0.get(path).copied()
    }

    pub fn record(&mut self, path: &str, mtime: u64) {
        self.0.insert(path.to_owned(), mtime);
    }

    pub fn remove(&mut self, path: &str) {
        self.0.remove(path);
    }

    /// Recorded paths, in order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Modification time of `path` in milliseconds since the Unix epoch.
pub fn mtime_millis(path: &Path) -> io::Result<u64> {
    let modified = fs::metadata(path)?.modified()?;
    let millis = modified
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    Ok(u64::try_from(millis).unwrap_or(u64::MAX))
}
