//! Post extraction: one markdown source file in, one [`Post`] out.
//!
//! Source files are named `YYYY-MM-DD-<slug>.md` (or `.markdown`). The date
//! prefix orders the index, the rest of the stem becomes the URL slug. The
//! title is the first line of the file with its `# ` marker stripped.
//!
//! ```text
//! 2024-03-05-hello-world.md
//! ├──────────┘└─────────┘
//!     date        slug        → /posts/hello-world/
//! ```

use chrono::NaiveDate;
use regex::Regex;
use std::{path::Path, sync::LazyLock};
use thiserror::Error;

/// Extensions accepted as post sources (without the leading dot).
pub const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown"];

const DATE_FORMAT: &str = "%Y-%m-%d";
const TITLE_MARKER: &str = "# ";

const REASON_BAD_FORMAT: &str = "bad filename format";
const REASON_BAD_DATE: &str = "invalid date";

/// `YYYY-MM-DD-<slug>.<md|markdown>`, slug non-empty.
///
/// Slugs are further checked by [`is_safe_slug`].
static RE_POST_FILENAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^([0-9]{4}-[0-9]{2}-[0-9]{2})-(.+)\.(md|markdown)$").unwrap()
});

/// One blog entry. Immutable once extracted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub slug: String,
    pub date: NaiveDate,
    pub title: String,
    /// Markdown source with the title line removed.
    pub body: String,
}

impl Post {
    /// Site-relative URL of the post page.
    pub fn url(&self) -> String {
        format!("/posts/{}", self.slug)
    }
}

/// A source file whose name can't be turned into a post.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("can't parse filename `{filename}`: {reason}, expected `YYYY-MM-DD-slug.md`")]
pub struct ParseError {
    pub filename: String,
    pub reason: &'static str,
}

impl ParseError {
    fn new(filename: &str, reason: &'static str) -> Self {
        Self {
            filename: filename.to_owned(),
            reason,
        }
    }
}

/// Whether a path has one of the [`MARKDOWN_EXTENSIONS`].
pub fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| MARKDOWN_EXTENSIONS.contains(&ext))
}

/// Parse a post from its file name and content.
///
/// Pure: reads nothing and writes nothing. The caller owns file I/O and
/// rendering.
pub fn extract(filename: &str, content: &str) -> Result<Post, ParseError> {
    let (date, slug) = parse_filename(filename)?;
    let title = extract_title(content);
    let body = strip_title(content, &title);

    Ok(Post {
        slug,
        date,
        title,
        body,
    })
}

/// Split a file name into its date and slug.
pub fn parse_filename(filename: &str) -> Result<(NaiveDate, String), ParseError> {
    let caps = RE_POST_FILENAME
        .captures(filename)
        .ok_or_else(|| ParseError::new(filename, REASON_BAD_FORMAT))?;

    let date = NaiveDate::parse_from_str(&caps[1], DATE_FORMAT)
        .map_err(|_| ParseError::new(filename, REASON_BAD_DATE))?;
    let slug = &caps[2];
    if !is_safe_slug(slug) {
        return Err(ParseError::new(filename, REASON_BAD_FORMAT));
    }

    Ok((date, slug.to_owned()))
}

/// A slug must name exactly one directory below `posts/`.
fn is_safe_slug(slug: &str) -> bool {
    !matches!(slug, "." | "..") && !slug.contains(['/', '\\'])
}

/// First line, with one leading `# ` removed.
fn extract_title(content: &str) -> String {
    let first = content.split('\n').next().unwrap_or_default();
    let first = first.strip_suffix('\r').unwrap_or(first);
    first.strip_prefix(TITLE_MARKER).unwrap_or(first).to_owned()
}

/// Remove the first occurrence of `# <title>`; later repeats stay in the body.
fn strip_title(content: &str, title: &str) -> String {
    content.replacen(&format!("{TITLE_MARKER}{title}"), "", 1)
}
