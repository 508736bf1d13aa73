//! Page rendering: markdown bodies to HTML, HTML through tera templates.
//!
//! Two templates make up a blog:
//!
//! | Template     | Context key | Value                        |
//! |--------------|-------------|------------------------------|
//! | `index.html` | `posts`     | every post, newest first     |
//! | `post.html`  | `post`      | one post                     |
//!
//! Each post exposes `slug`, `url`, `title`, `date` (`YYYY-MM-DD`) and `body`.
//! `body` is already HTML, so templates emit it with `{{ post.body | safe }}`.
//! Templates ending in `.html` are autoescaped, which turns `/` into `&#x2F;`:
//! emit URLs with `| safe` as well.
//! Both templates can call `blog_link()`, `blog_title()` and
//! `blog_description()`.

use crate::{
    config::BlogMeta,
    error::{BuildError, IoContext, Result},
    post::Post,
};
use chrono::NaiveDate;
use pulldown_cmark::{Options, Parser, html};
use serde::Serialize;
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};
use tera::{Context, Tera, Value};

const INDEX_TEMPLATE: &str = "index.html";
const POST_TEMPLATE: &str = "post.html";

/// A post as the templates and the feed see it.
#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    pub slug: String,
    pub url: String,
    pub title: String,
    pub date: String,
    /// Rendered HTML.
    pub body: String,
    #[serde(skip)]
    pub published: NaiveDate,
}

impl PostView {
    pub fn new(post: &Post) -> Self {
        Self {
            slug: post.slug.clone(),
            url: post.url(),
            title: post.title.clone(),
            date: post.date.format("%Y-%m-%d").to_string(),
            body: markdown_to_html(&post.body),
            published: post.date,
        }
    }
}

pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, Parser::new_ext(markdown, options));
    out
}

/// Both blog templates, parsed and bound to the blog metadata.
pub struct Renderer {
    tera: Tera,
    index_path: PathBuf,
    post_path: PathBuf,
}

impl Renderer {
    /// Read and parse both templates.
    ///
    /// Nothing is written here, so a broken template fails the build before
    /// the output tree is touched.
    pub fn load(index_path: &Path, post_path: &Path, meta: &BlogMeta) -> Result<Self> {
        let mut tera = Tera::default();

        for (name, path) in [(INDEX_TEMPLATE, index_path), (POST_TEMPLATE, post_path)] {
            let source = fs::read_to_string(path).at(path)?;
            tera.add_raw_template(name, &source)
                .map_err(|err| BuildError::template(path, err))?;
        }

        tera.register_function("blog_link", constant(&meta.link));
        tera.register_function("blog_title", constant(&meta.title));
        tera.register_function("blog_description", constant(&meta.description));

        Ok(Self {
            tera,
            index_path: index_path.to_path_buf(),
            post_path: post_path.to_path_buf(),
        })
    }

    pub fn render_index(&self, posts: &[PostView]) -> Result<String> {
        let mut context = Context::new();
        context.insert("posts", posts);
        self.tera
            .render(INDEX_TEMPLATE, &context)
            .map_err(|err| BuildError::template(&self.index_path, err))
    }

    pub fn render_post(&self, post: &PostView) -> Result<String> {
        let mut context = Context::new();
        context.insert("post", post);
        self.tera
            .render(POST_TEMPLATE, &context)
            .map_err(|err| BuildError::template(&self.post_path, err))
    }
}

/// A template function that ignores its arguments.
fn constant(value: &str) -> impl tera::Function + 'static {
    let value = Value::String(value.to_owned());
    move |_: &HashMap<String, Value>| -> tera::Result<Value> { Ok(value.clone()) }
}
