//! In-memory cache of loaded content units.
//!
//! Lives for the whole process so watch passes reuse units parsed by earlier
//! passes. Rejected paths are remembered too, so a listing that enumerates a
//! draft on every pass does not re-read it each time.

use super::ContentUnit;
use crate::error::{BuildError, ErrorKind};
use std::{collections::HashMap, rc::Rc};

/// Cached outcome of loading one path.
#[derive(Debug, Clone)]
enum Entry {
    Loaded(Rc<ContentUnit>),
    Rejected(ErrorKind, String),
}

#[derive(Debug, Default)]
pub struct ContentCache {
    entries: HashMap<String, Entry>,
}

impl ContentCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached outcome for `path`, if any.
    pub fn get(&self, path: &str) -> Option<Result<Rc<ContentUnit>, BuildError>> {
        self.entries.get(path).map(|entry| match entry {
            Entry::Loaded(unit) => Ok(Rc::clone(unit)),
            Entry::Rejected(kind, message) => Err(rejection(*kind, message.clone())),
        })
    }

    pub fn insert(&mut self, unit: Rc<ContentUnit>) {
        self.entries.insert(unit.path.clone(), Entry::Loaded(unit));
    }

    /// Remember that `path` failed to load. IO failures are transient and
    /// are not cached.
    pub fn insert_rejection(&mut self, path: &str, error: &BuildError) {
        let message = match error {
            BuildError::UnknownType(m)
            | BuildError::InvalidContent(m)
            | BuildError::ParseFailure(m) => m.clone(),
            _ => return,
        };
        self.entries.insert(path.to_owned(), Entry::Rejected(error.kind(), message));
    }

    pub fn invalidate(&mut self, path: &str) {
        self.entries.remove(path);
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

fn rejection(kind: ErrorKind, message: String) -> BuildError {
    match kind {
        ErrorKind::UnknownType => BuildError::UnknownType(message),
        ErrorKind::ParseFailure => BuildError::ParseFailure(message),
        _ => BuildError::InvalidContent(message),
    }
}
