//! Source and output layout of a blog.
//!
//! Every location the build reads from or writes to is derived here, so the
//! layout lives in one place.
//!
//! ```text
//! SiteConfig
//!     │
//!     └── paths() → SitePaths
//!                       │
//!                       ├── source()            → <source>
//!                       ├── markdown_dir()      → <source>/markdown
//!                       ├── index_template()    → <source>/index.html
//!                       ├── post_template()     → <source>/post.html
//!                       ├── static_dir()        → <source>/static
//!                       ├── output_index()      → <output>/index.html
//!                       ├── output_post(slug)   → <output>/posts/<slug>/index.html
//!                       ├── output_static()     → <output>/static
//!                       └── rss_path()          → <output>/rss.xml
//! ```

use std::path::{Path, PathBuf};

pub const MARKDOWN_DIR: &str = "markdown";
pub const STATIC_DIR: &str = "static";
pub const POSTS_DIR: &str = "posts";
pub const INDEX_TEMPLATE: &str = "index.html";
pub const POST_TEMPLATE: &str = "post.html";
pub const RSS_FILE: &str = "rss.xml";

#[derive(Debug, Clone, Copy)]
pub struct SitePaths<'a> {
    source: &'a Path,
    output: &'a Path,
}

impl<'a> SitePaths<'a> {
    #[inline]
    pub const fn new(source: &'a Path, output: &'a Path) -> Self {
        Self { source, output }
    }

    #[inline]
    pub const fn source(&self) -> &Path {
        self.source
    }

    #[inline]
    pub const fn output(&self) -> &Path {
        self.output
    }

    pub fn markdown_dir(&self) -> PathBuf {
        self.source.join(MARKDOWN_DIR)
    }

    pub fn index_template(&self) -> PathBuf {
        self.source.join(INDEX_TEMPLATE)
    }

    pub fn post_template(&self) -> PathBuf {
        self.source.join(POST_TEMPLATE)
    }

    pub fn static_dir(&self) -> PathBuf {
        self.source.join(STATIC_DIR)
    }

    pub fn output_index(&self) -> PathBuf {
        self.output.join(INDEX_TEMPLATE)
    }

    /// Parent of every per-post directory.
    pub fn output_posts(&self) -> PathBuf {
        self.output.join(POSTS_DIR)
    }

    pub fn output_post(&self, slug: &str) -> PathBuf {
        self.output_posts().join(slug).join("index.html")
    }

    pub fn output_static(&self) -> PathBuf {
        self.output.join(STATIC_DIR)
    }

    pub fn rss_path(&self) -> PathBuf {
        self.output.join(RSS_FILE)
    }
}
