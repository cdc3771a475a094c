//! `[build]` section configuration.
//!
//! Directory layout of the site and content selection.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// `[build]` section in stagen.toml - build pipeline configuration.
///
/// # Example
/// ```toml
/// [build]
/// content = "content"      # Source directory
/// output = "site"          # Output directory
/// cache = ".cache"         # Persisted build state
/// theme = "default"        # Directory under `themes`
/// include_unpublished = false
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Site root directory (usually set via CLI `--root`).
    #[serde(default = "defaults::build::root")]
    #[educe(Default = defaults::build::root())]
    pub root: Option<PathBuf>,

    /// Content source directory.
    #[serde(default = "defaults::build::content")]
    #[educe(Default = defaults::build::content())]
    pub content: PathBuf,

    /// Output directory for generated files.
    #[serde(default = "defaults::build::output")]
    #[educe(Default = defaults::build::output())]
    pub output: PathBuf,

    /// Directory holding the persisted dependency, subscriber, output and
    /// snapshot maps.
    #[serde(default = "defaults::build::cache")]
    #[educe(Default = defaults::build::cache())]
    pub cache: PathBuf,

    /// YAML or JSON data files exposed to templates as `site.data`.
    #[serde(default = "defaults::build::data")]
    #[educe(Default = defaults::build::data())]
    pub data: PathBuf,

    /// Static assets copied verbatim into the output directory.
    #[serde(default = "defaults::build::assets")]
    #[educe(Default = defaults::build::assets())]
    pub assets: PathBuf,

    /// Directory containing themes.
    #[serde(default = "defaults::build::themes")]
    #[educe(Default = defaults::build::themes())]
    pub themes: PathBuf,

    /// Active theme name.
    #[serde(default = "defaults::build::theme")]
    #[educe(Default = defaults::build::theme())]
    pub theme: String,

    /// Build content with `published: false` too.
    pub include_unpublished: bool,
}

impl BuildConfig {
    /// Directory of the active theme.
    pub fn theme_dir(&self) -> PathBuf {
        self.themes.join(&self.theme)
    }

    /// Whether `path` lies inside the content directory.
    pub fn is_content(&self, path: &Path) -> bool {
        path.starts_with(&self.content)
    }
}

#[cfg(test)]
mod tests {
    use super::super::SiteConfig;
    use std::path::PathBuf;

    #[test]
    fn test_build_config_defaults() {
        let config: SiteConfig = toml::from_str("").unwrap();

        assert_eq!(config.build.content, PathBuf::from("content"));
        assert_eq!(config.build.output, PathBuf::from("site"));
        assert_eq!(config.build.cache, PathBuf::from(".cache"));
        assert_eq!(config.build.theme, "default");
        assert_eq!(config.build.theme_dir(), PathBuf::from("themes/default"));
        assert!(!config.build.include_unpublished);
    }

    #[test]
    fn test_build_config_custom() {
        let config: SiteConfig = toml::from_str(
            r#"
            [build]
            content = "src"
            output = "public"
            theme = "minimal"
            include_unpublished = true
        "#,
        )
        .unwrap();

        assert_eq!(config.build.content, PathBuf::from("src"));
        assert_eq!(config.build.output, PathBuf::from("public"));
        assert_eq!(config.build.theme_dir(), PathBuf::from("themes/minimal"));
        assert!(config.build.include_unpublished);
    }

    #[test]
    fn test_unknown_build_field_rejected() {
        let result: Result<SiteConfig, _> = toml::from_str("[build]\npandoc = \"pandoc\"");
        assert!(result.is_err());
    }
}
