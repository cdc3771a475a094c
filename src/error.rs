//! Build error taxonomy and the run-scoped error list.
//!
//! Every kind except [`BuildError::MissingTemplate`] is non-fatal: it is
//! recorded in the pass's [`ErrorList`] and the pass continues with the next
//! path. `MissingTemplate` aborts the single `generate` call that hit it and
//! is caught by the driver at the per-path boundary.

use rustc_hash::FxHashSet;
use std::{io, path::PathBuf};
use thiserror::Error;

/// Errors raised while loading, validating, or generating one content path.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("no content type registered for `{0}`")]
    UnknownType(String),

    #[error("content rejected: {0}")]
    InvalidContent(String),

    #[error("front matter parse failed: {0}")]
    ParseFailure(String),

    #[error("generation failed: {0}")]
    GenerationFailure(String),

    #[error("no `{name}` {kind} template in theme and no default")]
    MissingTemplate { kind: &'static str, name: String },

    #[error("IO error on `{0}`")]
    Io(PathBuf, #[source] io::Error),
}

/// Discriminant of a [`BuildError`], used to de-duplicate reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    UnknownType,
    InvalidContent,
    ParseFailure,
    GenerationFailure,
    MissingTemplate,
    Io,
}

impl BuildError {
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownType(_) => ErrorKind::UnknownType,
            Self::InvalidContent(_) => ErrorKind::InvalidContent,
            Self::ParseFailure(_) => ErrorKind::ParseFailure,
            Self::GenerationFailure(_) => ErrorKind::GenerationFailure,
            Self::MissingTemplate { .. } => ErrorKind::MissingTemplate,
            Self::Io(..) => ErrorKind::Io,
        }
    }

    /// Rejections are expected outcomes (drafts, non-content files) and are
    /// reported separately from real failures.
    pub const fn is_rejection(&self) -> bool {
        matches!(self.kind(), ErrorKind::UnknownType | ErrorKind::InvalidContent)
    }
}

/// Errors collected during one pass, reported at the end of it.
#[derive(Debug, Default)]
pub struct ErrorList {
    entries: Vec<(String, BuildError)>,
    seen: FxHashSet<(String, ErrorKind)>,
}

impl ErrorList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error for `path`. A second error of the same kind for the
    /// same path within a pass is dropped.
    pub fn push(&mut self, path: &str, error: BuildError) {
        if self.seen.insert((path.to_owned(), error.kind())) {
            self.entries.push((path.to_owned(), error));
        }
    }

    /// Errors that are not plain rejections.
    pub fn failures(&self) -> impl Iterator<Item = &(String, BuildError)> {
        self.entries.iter().filter(|(_, e)| !e.is_rejection())
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    pub fn contains(&self, path: &str, kind: ErrorKind) -> bool {
        self.seen.contains(&(path.to_owned(), kind))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_kind_per_path_is_dropped() {
        let mut errors = ErrorList::new();
        errors.push("posts/a.md", BuildError::ParseFailure("bad yaml".into()));
        errors.push("posts/a.md", BuildError::ParseFailure("bad yaml again".into()));
        errors.push("posts/a.md", BuildError::GenerationFailure("boom".into()));
        errors.push("posts/b.md", BuildError::ParseFailure("bad yaml".into()));

        assert_eq!(errors.len(), 3);
        assert!(errors.contains("posts/a.md", ErrorKind::ParseFailure));
        assert!(errors.contains("posts/b.md", ErrorKind::ParseFailure));
        assert!(!errors.contains("posts/b.md", ErrorKind::GenerationFailure));
    }

    #[test]
    fn test_rejections_are_not_failures() {
        let mut errors = ErrorList::new();
        errors.push("posts/draft.md", BuildError::InvalidContent("unpublished".into()));
        errors.push("misc/x.md", BuildError::UnknownType("misc".into()));
        errors.push(
            "posts/a.md",
            BuildError::MissingTemplate { kind: "type", name: "post".into() },
        );

        assert_eq!(errors.len(), 3);
        assert_eq!(errors.failure_count(), 1);
        let (path, err) = errors.failures().next().unwrap();
        assert_eq!(path, "posts/a.md");
        assert_eq!(err.kind(), ErrorKind::MissingTemplate);
    }

    #[test]
    fn test_error_display() {
        let err = BuildError::MissingTemplate { kind: "layout", name: "gallery".into() };
        assert_eq!(format!("{err}"), "no `gallery` layout template in theme and no default");

        let err = BuildError::Io(PathBuf::from("site/a.html"), io::Error::other("denied"));
        assert!(format!("{err}").contains("site/a.html"));
    }
}
