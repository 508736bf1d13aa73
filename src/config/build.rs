//! `[build]` section configuration.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// `[build]` section in underblog.toml - source/output locations and
/// worker count.
///
/// # Example
/// ```toml
/// [build]
/// source = "src"    # holds markdown/, static/, index.html, post.html
/// output = "dist"
/// workers = 4       # 0 = one per CPU
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
    /// Source root, relative to the project root.
    #[serde(default = "defaults::build::source")]
    #[educe(Default = defaults::build::source())]
    pub source: PathBuf,

    /// Output root, relative to the project root.
    #[serde(default = "defaults::build::output")]
    #[educe(Default = defaults::build::output())]
    pub output: PathBuf,

    /// Upper bound on parallel post workers.
    #[serde(default = "defaults::build::workers")]
    #[educe(Default = defaults::build::workers())]
    pub workers: usize,
}
