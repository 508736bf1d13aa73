//! Blog initialization module.
//!
//! Creates a new blog with starter templates and a default configuration.

use crate::{config::SiteConfig, log};
use anyhow::{Context, Result, bail};
use chrono::Local;
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::Path,
};

/// Files to write ignore patterns to
const IGNORE_FILES: &[&str] = &[".gitignore"];

const INDEX_TEMPLATE: &str = include_str!("embed/site/index.html");
const POST_TEMPLATE: &str = include_str!("embed/site/post.html");
const STYLESHEET: &str = include_str!("embed/site/style.css");
const SAMPLE_POST: &str = include_str!("embed/site/hello-world.md");

/// Create a new blog at `config.root`.
///
/// Without a name the target is the current root, which must be empty.
/// Existing files are never overwritten.
pub fn new_blog(config: &SiteConfig, has_name: bool) -> Result<()> {
    let root = &config.root;

    // Safety check: if no name was provided (init in current dir),
    // the directory must be completely empty
    if !has_name && !is_dir_empty(root)? {
        bail!(
            "Current directory is not empty. Use `underblog init <NAME>` to create in a subdirectory."
        );
    }
    if has_name && root.exists() {
        bail!("Path `{}` already exists.", root.display());
    }

    init_site_structure(config)?;
    init_default_config(&config.config_path)?;
    init_ignored_files(root, &[Path::new("dist/")])?;

    log!("init"; "created blog in {}", root.display());
    Ok(())
}

/// Check if a directory is completely empty
fn is_dir_empty(path: &Path) -> Result<bool> {
    if !path.exists() {
        return Ok(true);
    }
    Ok(fs::read_dir(path)?.next().is_none())
}

/// Write default configuration file
fn init_default_config(path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(&SiteConfig::default())?;
    write_new(path, &content)
}

/// Create source directories, templates and a first post.
fn init_site_structure(config: &SiteConfig) -> Result<()> {
    let paths = config.paths();

    for dir in [paths.markdown_dir(), paths.static_dir()] {
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    let sample = format!("{}-hello-world.md", Local::now().date_naive().format("%Y-%m-%d"));
    write_new(&paths.index_template(), INDEX_TEMPLATE)?;
    write_new(&paths.post_template(), POST_TEMPLATE)?;
    write_new(&paths.static_dir().join("style.css"), STYLESHEET)?;
    write_new(&paths.markdown_dir().join(sample), SAMPLE_POST)?;
    Ok(())
}

/// Initialize .gitignore with the given paths, unless one already exists
fn init_ignored_files(root: &Path, paths: &[&Path]) -> Result<()> {
    let content = paths
        .iter()
        .filter_map(|p| p.to_str())
        .collect::<Vec<_>>()
        .join("\n");

    for filename in IGNORE_FILES {
        let path = root.join(filename);
        if !path.exists() {
            fs::write(&path, &content)?;
        }
    }

    Ok(())
}

/// Create `path` with `content`, failing if it already exists.
fn write_new(path: &Path, content: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
