//! `[base]` section configuration.
//!
//! Site metadata exposed to templates as `site.*`.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};

/// `[base]` section in stagen.toml - basic site metadata.
///
/// # Example
/// ```toml
/// [base]
/// title = "My Blog"
/// description = "Notes on things"
/// url = "https://myblog.com"
/// baseurl = "/"
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct BaseConfig {
    /// Site title.
    #[serde(default)]
    pub title: String,

    /// Site description, used by feeds and meta tags.
    #[serde(default)]
    pub description: String,

    /// Absolute site URL, prefixed to links in feeds.
    #[serde(default = "defaults::base::url")]
    #[educe(Default = defaults::base::url())]
    pub url: Option<String>,

    /// Path prefix the site is served under. Empty is normalized to `/`.
    #[serde(default = "defaults::base::baseurl")]
    #[educe(Default = defaults::base::baseurl())]
    pub baseurl: String,
}
