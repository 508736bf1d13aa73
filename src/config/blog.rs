//! `[blog]` section configuration.
//!
//! Site-level metadata handed to the templates and the rss feed. Read-only
//! for the whole build.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};

/// `[blog]` section in underblog.toml.
///
/// # Example
/// ```toml
/// [blog]
/// title = "Field Notes"
/// description = "Short posts about long problems"
/// link = "https://notes.example.com"
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct BlogMeta {
    /// Site title, exposed to templates as `blog_title()`.
    #[serde(default)]
    pub title: String,

    /// Site description, exposed to templates as `blog_description()`.
    #[serde(default)]
    pub description: String,

    /// Absolute site URL, exposed as `blog_link()`.
    /// The rss feed is only written when this is set.
    #[serde(default)]
    pub link: String,

    /// Language code written into the rss channel.
    #[serde(default = "defaults::blog::language")]
    #[educe(Default = defaults::blog::language())]
    pub language: String,
}

impl BlogMeta {
    /// Sites without a configured link get no feed.
    pub fn has_link(&self) -> bool {
        !self.link.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::super::SiteConfig;

    #[test]
    fn test_blog_config_full() {
        let config = r#"
            [blog]
            title = "Field Notes"
            description = "Short posts"
            link = "https://notes.example.com"
            language = "de"
        "#;
        let config: SiteConfig = toml::from_str(config).unwrap();

        assert_eq!(config.blog.title, "Field Notes");
        assert_eq!(config.blog.description, "Short posts");
        assert_eq!(config.blog.link, "https://notes.example.com");
        assert_eq!(config.blog.language, "de");
        assert!(config.blog.has_link());
    }

    #[test]
    fn test_blog_config_defaults() {
        let config: SiteConfig = toml::from_str("[blog]").unwrap();

        assert_eq!(config.blog.title, "");
        assert_eq!(config.blog.link, "");
        assert_eq!(config.blog.language, "en");
        assert!(!config.blog.has_link());
    }

    #[test]
    fn test_blank_link_means_no_link() {
        let config: SiteConfig = toml::from_str("[blog]\nlink = \"  \"").unwrap();
        assert!(!config.blog.has_link());
    }

    #[test]
    fn test_unknown_field_rejection() {
        let result: Result<SiteConfig, _> = toml::from_str("[blog]\nauthor = \"x\"");
        let err = result.unwrap_err().to_string();
        assert!(err.contains("unknown field"));
    }
}
