//! Output generation, run once the post list is complete.
//!
//! - **pages**: markdown rendering and tera templates
//! - **assets**: `static/` mirroring
//! - **rss**: the feed, for blogs with a configured link

pub mod assets;
pub mod pages;
pub mod rss;
