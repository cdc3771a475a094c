//! Site configuration management for `stagen.toml`.
//!
//! # Sections
//!
//! | Section     | Purpose                                         |
//! |-------------|-------------------------------------------------|
//! | `[base]`    | Site metadata (title, description, url)         |
//! | `[build]`   | Directory layout, theme, content selection      |
//! | `[watch]`   | File watcher tuning                             |
//! | `[extra]`   | User-defined fields, exposed as `site.extra`    |
//! | `[theme_settings.<theme>]` | Settings of one theme, exposed as `site.theme.settings` |
//!
//! # Example
//!
//! ```toml
//! [base]
//! title = "My Blog"
//! url = "https://example.com"
//!
//! [build]
//! output = "public"
//! theme = "minimal"
//!
//! [extra]
//! analytics_id = "UA-12345"
//!
//! [theme_settings.minimal]
//! accent = "teal"
//! ```

mod base;
mod build;
pub mod defaults;
mod error;
mod watch;

use base::BaseConfig;
use build::BuildConfig;
use error::ConfigError;
use watch::WatchConfig;

use crate::cli::Cli;
use anyhow::{Result, bail};
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

/// Root configuration structure representing stagen.toml
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    /// Absolute path to the config file (set after loading)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Basic site information
    #[serde(default)]
    pub base: BaseConfig,

    /// Build settings
    #[serde(default)]
    pub build: BuildConfig,

    /// File watcher settings
    #[serde(default)]
    pub watch: WatchConfig,

    /// User-defined extra fields
    #[serde(default)]
    pub extra: HashMap<String, toml::Value>,

    /// Per-theme settings, keyed by theme name. Only the active theme's
    /// table reaches templates.
    #[serde(default)]
    pub theme_settings: HashMap<String, toml::Value>,
}

impl SiteConfig {
    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: SiteConfig = toml::from_str(content).map_err(ConfigError::from)?;
        Ok(config)
    }

    /// Load configuration from file path
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Read(path.to_path_buf(), err))?;
        let mut config = Self::from_str(&content)?;
        config.config_path = path.to_path_buf();
        Ok(config)
    }

    /// Get the root directory path
    pub fn get_root(&self) -> &Path {
        self.build.root.as_deref().unwrap_or(Path::new("./"))
    }

    /// Update configuration with CLI arguments and resolve every directory
    /// against the site root.
    pub fn update_with_cli(&mut self, cli: &Cli) {
        Self::update_option(&mut self.build.content, cli.content.as_ref());
        Self::update_option(&mut self.build.output, cli.output.as_ref());

        if let Some(args) = cli.build_args()
            && args.all
        {
            self.build.include_unpublished = true;
        }

        let root = cli
            .root
            .clone()
            .unwrap_or_else(|| self.get_root().to_path_buf());
        self.config_path = Self::normalize_path(&root.join(&cli.config));
        self.resolve_paths(&root);
    }

    /// Make all configured directories absolute relative to `root`.
    pub fn resolve_paths(&mut self, root: &Path) {
        let root = Self::normalize_path(root);
        let build = &mut self.build;
        build.content = Self::normalize_path(&root.join(&build.content));
        build.output = Self::normalize_path(&root.join(&build.output));
        build.cache = Self::normalize_path(&root.join(&build.cache));
        build.data = Self::normalize_path(&root.join(&build.data));
        build.assets = Self::normalize_path(&root.join(&build.assets));
        build.themes = Self::normalize_path(&root.join(&build.themes));
        build.root = Some(root);

        if self.base.baseurl.is_empty() {
            self.base.baseurl = defaults::base::baseurl();
        }
    }

    /// Update config option if CLI value is provided
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Normalize a path to absolute, using canonicalize if the path exists
    fn normalize_path(path: &Path) -> PathBuf {
        path.canonicalize().unwrap_or_else(|_| {
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                std::env::current_dir()
                    .map(|cwd| cwd.join(path))
                    .unwrap_or_else(|_| path.to_path_buf())
            }
        })
    }

    /// Validate configuration before a build.
    pub fn validate(&self) -> Result<()> {
        if !self.build.content.is_dir() {
            bail!(ConfigError::Invalid(format!(
                "content directory `{}` not found",
                self.build.content.display()
            )));
        }

        if let Some(url) = &self.base.url
            && !url.starts_with("http")
        {
            bail!(ConfigError::Invalid(
                "[base.url] must start with http:// or https://".into()
            ));
        }

        if self.build.theme.is_empty() {
            bail!(ConfigError::Invalid("[build.theme] must not be empty".into()));
        }

        Ok(())
    }

    /// `site` object handed to templates.
    pub fn site_context(&self) -> serde_json::Value {
        serde_json::json!({
            "title": self.base.title,
            "description": self.base.description,
            "url": self.base.url.clone().unwrap_or_default(),
            "baseurl": self.base.baseurl,
            "extra": serde_json::to_value(&self.extra).unwrap_or_default(),
            "theme": {
                "name": self.build.theme,
                "settings": self
                    .theme_settings
                    .get(&self.build.theme)
                    .and_then(|s| serde_json::to_value(s).ok())
                    .unwrap_or_else(|| serde_json::json!({})),
            },
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
