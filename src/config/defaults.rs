//! Default values for configuration fields.
//!
//! These functions are used by serde for default deserialization.

// ============================================================================
// [base] Section Defaults
// ============================================================================

pub mod base {
    pub fn url() -> Option<String> {
        None
    }

    pub fn baseurl() -> String {
        "/".into()
    }
}

// ============================================================================
// [build] Section Defaults
// ============================================================================

pub mod build {
    use std::path::PathBuf;

    pub fn root() -> Option<PathBuf> {
        None
    }

    pub fn content() -> PathBuf {
        "content".into()
    }

    pub fn output() -> PathBuf {
        "site".into()
    }

    pub fn cache() -> PathBuf {
        ".cache".into()
    }

    pub fn data() -> PathBuf {
        "data".into()
    }

    pub fn assets() -> PathBuf {
        "assets".into()
    }

    pub fn themes() -> PathBuf {
        "themes".into()
    }

    pub fn theme() -> String {
        "default".into()
    }
}

// ============================================================================
// [watch] Section Defaults
// ============================================================================

pub mod watch {
    pub fn debounce_ms() -> u64 {
        300
    }
}
