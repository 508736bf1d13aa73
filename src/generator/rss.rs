//! rss feed generation.
//!
//! Only blogs with a configured `[blog] link` get a feed: item links must be
//! absolute. The feed is rendered in memory and written with the pages.

use super::pages::PostView;
use crate::{
    config::BlogMeta,
    error::{BuildError, IoContext, Result},
    log,
};
use rss::{ChannelBuilder, GuidBuilder, ItemBuilder, validation::Validate};
use std::{fs, path::Path};

// ============================================================================
// Public API
// ============================================================================

/// Serialize and validate the feed, if the blog has a link.
///
/// Nothing is written: the caller writes the XML together with the pages, so
/// an invalid feed fails the build before the output tree is touched.
pub fn render_feed(meta: &BlogMeta, posts: &[PostView]) -> Result<Option<String>> {
    if !meta.has_link() {
        return Ok(None);
    }
    RssFeed::new(meta, posts).into_xml().map(Some)
}

/// Write a feed produced by [`render_feed`].
pub fn write_feed(xml: &str, path: &Path) -> Result<()> {
    fs::write(path, xml).at(path)?;
    log!("rss"; "{}", path.file_name().unwrap_or_default().to_string_lossy());
    Ok(())
}

// ============================================================================
// RssFeed Implementation
// ============================================================================

struct RssFeed<'a> {
    meta: &'a BlogMeta,
    posts: &'a [PostView],
}

impl<'a> RssFeed<'a> {
    const fn new(meta: &'a BlogMeta, posts: &'a [PostView]) -> Self {
        Self { meta, posts }
    }

    fn into_xml(self) -> Result<String> {
        let base = self.meta.link.trim().trim_end_matches('/');
        let items: Vec<_> = self
            .posts
            .iter()
            .map(|post| post_to_rss_item(post, base))
            .collect();

        let channel = ChannelBuilder::default()
            .title(&self.meta.title)
            .link(self.meta.link.trim())
            .description(&self.meta.description)
            .language(self.meta.language.clone())
            .generator("underblog".to_string())
            .items(items)
            .build();

        channel
            .validate()
            .map_err(|e| BuildError::Feed(format!("validation failed: {e}")))?;
        Ok(channel.to_string())
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Posts carry no time of day; they are published at midnight UTC.
fn post_to_rss_item(post: &PostView, base: &str) -> rss::Item {
    let link = format!("{base}{}", post.url);
    let pub_date = post
        .published
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().to_rfc2822());

    ItemBuilder::default()
        .title(post.title.clone())
        .link(Some(link.clone()))
        .guid(GuidBuilder::default().permalink(true).value(link).build())
        .description(post.body.clone())
        .pub_date(pub_date)
        .build()
}
