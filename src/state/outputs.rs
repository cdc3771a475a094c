//! Source path → output files it produced.
//!
//! Recorded after every generation so that a later change or removal can
//! delete exactly the files the previous generation wrote, including stale
//! pages of a listing that shrank.

use crate::error::BuildError;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fs, io, path::Path};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutputMap(BTreeMap<String, Vec<String>>);

impl OutputMap {
    /// Replace the recorded outputs of `source`.
    pub fn record_outputs(&mut self, source: &str, outputs: Vec<String>) {
        let mut unique: Vec<String> = Vec::with_capacity(outputs.len());
        for output in outputs {
            if !unique.contains(&output) {
                unique.push(output);
            }
        }
        if unique.is_empty() {
            self.0.remove(source);
        } else {
            self.0.insert(source.to_owned(), unique);
        }
    }

    pub fn outputs_of(&self, source: &str) -> &[String] {
        self.0.get(source).map(Vec::as_slice).unwrap_or_default()
    }

    /// Delete the recorded outputs of `source` from `output_dir` and forget
    /// them. Files that are already gone are fine; the first other IO error
    /// is returned after every file has been attempted.
    pub fn clear_outputs(&mut self, source: &str, output_dir: &Path) -> Result<Vec<String>, BuildError> {
        let Some(outputs) = self.0.remove(source) else {
            return Ok(Vec::new());
        };

        let mut first_error = None;
        for output in &outputs {
            let path = output_dir.join(output);
            match fs::remove_file(&path) {
                Ok(()) => prune_empty_parents(&path, output_dir),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    first_error.get_or_insert(BuildError::Io(path, e));
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(outputs),
        }
    }

    pub fn contains(&self, source: &str) -> bool {
        self.0.contains_key(source)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Remove directories left empty by a deleted output, stopping at `root`.
fn prune_empty_parents(file: &Path, root: &Path) {
    let mut dir = file.parent();
    while let Some(current) = dir {
        if current == root || !current.starts_with(root) {
            break;
        }
        // Fails on non-empty directories, which ends the walk.
        if fs::remove_dir(current).is_err() {
            break;
        }
        dir = current.parent();
    }
}
