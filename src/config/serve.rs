//! `[serve]`: the local preview server started by `underblog serve`.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};

/// Where the preview listens and whether it follows edits.
///
/// The command-line flags of `serve` override each of these.
///
/// ```toml
/// [serve]
/// interface = "0.0.0.0"
/// port = 3000
/// watch = false
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct ServeConfig {
    /// Address to bind. The loopback default keeps drafts off the network.
    #[serde(default = "defaults::serve::interface")]
    #[educe(Default = defaults::serve::interface())]
    pub interface: String,

    /// First port tried; taken ports are skipped upward.
    #[serde(default = "defaults::serve::port")]
    #[educe(Default = defaults::serve::port())]
    pub port: u16,

    /// Rebuild the blog while serving when its sources change.
    #[serde(default = "defaults::r#true")]
    #[educe(Default = true)]
    pub watch: bool,
}

#[cfg(test)]
mod tests {
    use super::super::SiteConfig;

    #[test]
    fn test_serve_config() {
        let config = r#"
            [serve]
            interface = "0.0.0.0"
            port = 3000
            watch = false
        "#;
        let config: SiteConfig = toml::from_str(config).unwrap();

        assert_eq!(config.serve.interface, "0.0.0.0");
        assert_eq!(config.serve.port, 3000);
        assert!(!config.serve.watch);
    }

    #[test]
    fn test_serve_config_defaults() {
        let config: SiteConfig = toml::from_str("").unwrap();

        assert_eq!(config.serve.interface, "127.0.0.1");
        assert_eq!(config.serve.port, 8080);
        assert!(config.serve.watch);
    }

    #[test]
    fn test_unknown_field_rejection() {
        let result: Result<SiteConfig, _> = toml::from_str("[serve]\nunknown_field = 1");
        assert!(result.is_err());
    }

    #[test]
    fn test_port_out_of_range_rejected() {
        let result: Result<SiteConfig, _> = toml::from_str("[serve]\nport = 70000");
        assert!(result.is_err());
    }
}
