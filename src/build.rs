//! Blog building orchestration.
//!
//! # Architecture
//!
//! ```text
//! build_blog()
//!     │
//!     ├── discover()          read_dir(markdown) → WorkItems, file-name order
//!     │
//!     ├── ingest()            WorkerPool ──► PostCollector
//!     │       │               (blocks on the CompletionBarrier)
//!     │       └── into_sorted() → newest first
//!     │
//!     ├── render_pages()      both templates parsed, every page rendered in memory
//!     │
//!     ├── render_feed()       rss.xml serialized and validated in memory
//!     │
//!     ├── StaticPlan::scan()  static/ tree listed
//!     │
//!     └── write output        index, posts/<slug>/, static/, rss.xml
//! ```
//!
//! Nothing under the output directory is touched until every page and the
//! feed have rendered and the static tree has been read, so a failing build
//! leaves the previous generation in place.

use crate::{
    config::{SitePaths, SiteConfig},
    error::{BuildError, IoContext, Result},
    generator::{
        assets::StaticPlan,
        pages::{PostView, Renderer},
        rss::{render_feed, write_feed},
    },
    log,
    pipeline::{
        CancelToken, Completion, CompletionBarrier, PostCollector, WorkItem, WorkQueue,
        WorkerPool, worker_limit,
    },
    post::Post,
};
use rustc_hash::FxHashSet;
use std::{fs, io, path::Path, thread};

/// What a successful build produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildReport {
    pub posts: usize,
    pub assets: usize,
    pub feed: bool,
}

/// Build the whole blog once.
///
/// Runs on a child of `cancel`: a failing worker stops this build's pool
/// without cancelling `cancel` itself.
pub fn build_blog(config: &SiteConfig, cancel: &CancelToken) -> Result<BuildReport> {
    let paths = config.paths();

    let markdown_dir = paths.markdown_dir();
    if !markdown_dir.is_dir() {
        return Err(BuildError::MissingSourceDirectory(markdown_dir));
    }
    fs::create_dir_all(paths.output()).at(paths.output())?;

    let items = discover(&markdown_dir)?;
    log!("build"; "{} entries in {}", items.len(), markdown_dir.display());

    let posts = ingest(items, config.build.workers, cancel.child())?;
    let views: Vec<PostView> = posts.iter().map(PostView::new).collect();

    let renderer = Renderer::load(&paths.index_template(), &paths.post_template(), &config.blog)?;
    let index = renderer.render_index(&views)?;
    let pages = render_pages(&renderer, &views)?;
    let feed = render_feed(&config.blog, &views)?;
    let statics = StaticPlan::scan(&paths.static_dir(), &paths.output_static())?;

    if cancel.is_cancelled() {
        return Err(BuildError::Cancelled);
    }

    clean_generated(&paths)?;
    write_file(&paths.output_index(), &index)?;
    for (slug, html) in &pages {
        write_file(&paths.output_post(slug), html)?;
    }
    log!("posts"; "{} rendered", pages.len());

    let assets = statics.copy()?;
    if assets > 0 {
        log!("static"; "{} files copied", assets);
    }

    if let Some(xml) = &feed {
        write_feed(xml, &paths.rss_path())?;
    }

    log!("build"; "done");
    Ok(BuildReport {
        posts: views.len(),
        assets,
        feed: feed.is_some(),
    })
}

/// One work item per entry of `dir`, positioned in file-name order.
fn discover(dir: &Path) -> Result<Vec<WorkItem>> {
    let mut entries = fs::read_dir(dir)
        .at(dir)?
        .map(|entry| entry.at(dir))
        .collect::<Result<Vec<_>>>()?;
    entries.sort_by_key(fs::DirEntry::file_name);

    Ok(entries
        .into_iter()
        .enumerate()
        .map(|(position, entry)| WorkItem {
            position,
            file_name: entry.file_name().to_string_lossy().into_owned(),
            path: entry.path(),
        })
        .collect())
}

/// Fan the items out to the worker pool and wait for every one of them.
fn ingest(items: Vec<WorkItem>, workers: usize, cancel: CancelToken) -> Result<Vec<Post>> {
    let collector = PostCollector::new();
    let barrier = CompletionBarrier::new(items.len());
    let workers = worker_limit(items.len(), workers);
    let queue = WorkQueue::preload(items);
    let pool = WorkerPool::new(&collector, &barrier, cancel.clone());

    let completion = thread::scope(|scope| {
        pool.spawn(scope, &queue, workers);
        barrier.wait(&cancel)
    });

    // A worker failure cancels the pool too; report the failure, not the cancel
    pool.finish()?;
    match completion {
        Completion::Released => Ok(collector.into_sorted()),
        Completion::Cancelled => {
            log!("build"; "cancelled with {} entries outstanding", barrier.remaining());
            Err(BuildError::Cancelled)
        }
    }
}

/// Render every post page, in list order.
///
/// Two posts sharing a slug both render; the later one overwrites the
/// earlier on disk.
fn render_pages(renderer: &Renderer, views: &[PostView]) -> Result<Vec<(String, String)>> {
    let mut seen = FxHashSet::default();
    views
        .iter()
        .map(|view| {
            if !seen.insert(view.slug.as_str()) {
                log!("warn"; "duplicate slug `{}`, the {} post wins", view.slug, view.date);
            }
            Ok((view.slug.clone(), renderer.render_post(view)?))
        })
        .collect()
}

/// Drop everything the previous build generated below the output root.
fn clean_generated(paths: &SitePaths) -> Result<()> {
    for dir in [paths.output_posts(), paths.output_static()] {
        match fs::remove_dir_all(&dir) {
            Err(err) if err.kind() != io::ErrorKind::NotFound => return Err(BuildError::fs(dir, err)),
            _ => {}
        }
    }
    let rss = paths.rss_path();
    match fs::remove_file(&rss) {
        Err(err) if err.kind() != io::ErrorKind::NotFound => Err(BuildError::fs(rss, err)),
        _ => Ok(()),
    }
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).at(parent)?;
    }
    fs::write(path, content).at(path)
}
