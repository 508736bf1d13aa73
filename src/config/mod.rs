//! Site configuration management for `underblog.toml`.
//!
//! # Sections
//!
//! | Section     | Purpose                                          |
//! |-------------|--------------------------------------------------|
//! | `[blog]`    | Blog metadata (title, description, link)         |
//! | `[build]`   | Source/output directories, worker count          |
//! | `[serve]`   | Development server (interface, port, watch)      |
//!
//! The file is optional: a project without one builds with defaults.
//!
//! # Example
//!
//! ```toml
//! [blog]
//! title = "Field Notes"
//! description = "Short posts about long problems"
//! link = "https://notes.example.com"
//!
//! [build]
//! output = "public"
//!
//! [serve]
//! port = 3000
//! ```

mod blog;
mod build;
pub mod defaults;
mod error;
mod paths;
mod serve;

pub use blog::BlogMeta;
pub use paths::SitePaths;

use build::BuildConfig;
use error::ConfigError;
use serve::ServeConfig;

use crate::cli::{Cli, Commands};
use anyhow::{Result, bail};
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use url::Url;

/// Root configuration structure representing underblog.toml
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    /// Absolute project root (set after loading)
    #[serde(skip)]
    pub root: PathBuf,

    /// Absolute path to the config file (set after loading)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Blog metadata
    #[serde(default)]
    pub blog: BlogMeta,

    /// Build settings
    #[serde(default)]
    pub build: BuildConfig,

    /// Development server settings
    #[serde(default)]
    pub serve: ServeConfig,
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
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        Self::from_str(&content)
    }

    /// Load the config selected by `cli`, apply CLI overrides and validate.
    ///
    /// A missing config file yields the defaults. `init` never reads an
    /// existing file: it is about to write one.
    pub fn load(cli: &Cli) -> Result<Self> {
        let root = Self::root_for(cli);
        let config_path = root.join(&cli.config);

        let mut config = if !cli.is_init() && config_path.is_file() {
            Self::from_path(&config_path)?
        } else {
            Self::default()
        };
        config.update_with_cli(cli, &root);
        config.validate()?;
        Ok(config)
    }

    /// `init NAME` scaffolds into `root/NAME`; every other command uses `root`.
    fn root_for(cli: &Cli) -> PathBuf {
        match &cli.command {
            Commands::Init { name: Some(name) } => cli.root.join(name),
            _ => cli.root.clone(),
        }
    }

    /// Source/output layout of this blog.
    pub fn paths(&self) -> SitePaths<'_> {
        SitePaths::new(&self.build.source, &self.build.output)
    }

    /// Update configuration with CLI arguments
    pub fn update_with_cli(&mut self, cli: &Cli, root: &Path) {
        let root = Self::normalize_path(root);
        self.config_path = Self::normalize_path(&root.join(&cli.config));
        self.build.source = Self::normalize_path(&root.join(&self.build.source));
        self.build.output = Self::normalize_path(&root.join(&self.build.output));
        self.root = root;

        if let Commands::Serve {
            interface,
            port,
            watch,
        } = &cli.command
        {
            Self::update_option(&mut self.serve.interface, interface.as_ref());
            Self::update_option(&mut self.serve.port, port.as_ref());
            Self::update_option(&mut self.serve.watch, watch.as_ref());
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
            // For non-existent paths, manually make them absolute
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                std::env::current_dir()
                    .map(|cwd| cwd.join(path))
                    .unwrap_or_else(|_| path.to_path_buf())
            }
        })
    }

    pub fn validate(&self) -> Result<()> {
        let link = self.blog.link.trim();
        if !link.is_empty() && !is_http_url(link) {
            bail!(ConfigError::Validation(format!(
                "[blog.link] `{link}` must be an absolute http:// or https:// URL with a host"
            )));
        }

        if self.build.source == self.build.output {
            bail!(ConfigError::Validation(
                "[build.source] and [build.output] must be different directories".into()
            ));
        }

        Ok(())
    }
}

/// Feed readers need an absolute link, so the host can't be empty.
fn is_http_url(link: &str) -> bool {
    Url::parse(link).is_ok_and(|url| {
        matches!(url.scheme(), "http" | "https") && url.host_str().is_some_and(|host| !host.is_empty())
    })
}

// ============================================================================
// Tests
// ============================================================================
