//! `[watch]` section configuration.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};

/// `[watch]` section in stagen.toml - file watcher settings.
///
/// # Example
/// ```toml
/// [watch]
/// debounce_ms = 500
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct WatchConfig {
    /// Quiet period before a batch of file events is rebuilt.
    #[serde(default = "defaults::watch::debounce_ms")]
    #[educe(Default = defaults::watch::debounce_ms())]
    pub debounce_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::super::SiteConfig;

    #[test]
    fn test_watch_config() {
        let config: SiteConfig = toml::from_str("[watch]\ndebounce_ms = 50").unwrap();
        assert_eq!(config.watch.debounce_ms, 50);
    }

    #[test]
    fn test_watch_config_defaults() {
        let config: SiteConfig = toml::from_str("").unwrap();
        assert_eq!(config.watch.debounce_ms, 300);
    }

    #[test]
    fn test_unknown_field_rejection() {
        let result: Result<SiteConfig, _> = toml::from_str("[watch]\nport = 1");
        assert!(result.is_err());
    }
}
