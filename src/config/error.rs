//! Errors raised while loading `stagen.toml`.

use std::path::PathBuf;
use thiserror::Error;

/// Why the site configuration could not be used. Any of these stops the
/// command before a build starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read site config `{0}`")]
    Read(PathBuf, #[source] std::io::Error),

    /// Carries the TOML message, which names the offending line and key.
    #[error("stagen.toml is not valid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid site config: {0}")]
    Invalid(String),
}
