//! File system watcher for live rebuild.
//!
//! Watches the source directory itself (templates), `markdown/`, `static/`
//! and the config file, and rebuilds the whole blog once a burst of changes
//! has gone quiet. After every rebuild the watch set is re-synced, so a
//! `static/` created later or a `[build] source` changed in the config is
//! picked up without a restart.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                      Event Loop                         │
//! │                                                         │
//! │  ┌──────────┐    ┌───────────┐    ┌──────────────────┐  │
//! │  │ notify   │───▶│ Debouncer │───▶│   build_blog()   │  │
//! │  │ events   │    │  (200ms)  │    │  (synchronous)   │  │
//! │  └──────────┘    └───────────┘    └──────────────────┘  │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! States: idle → debouncing → rebuilding → idle. Every relevant event resets
//! the debounce window. Events that arrive while a rebuild runs wait in the
//! channel and start the next window once the rebuild returns.
//!
//! A failed rebuild is logged and the loop keeps going. A watcher error,
//! including one while re-syncing, ends the loop with [`BuildError::Watcher`].

use crate::{
    build::build_blog,
    cli::Cli,
    config::SiteConfig,
    error::{BuildError, Result},
    log,
    pipeline::CancelToken,
};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use rustc_hash::FxHashSet;
use std::{
    path::{Path, PathBuf},
    sync::mpsc::{self, Receiver, RecvTimeoutError},
    time::{Duration, Instant},
};

// =============================================================================
// Constants
// =============================================================================

const DEBOUNCE: Duration = Duration::from_millis(200);

/// How often an idle loop re-checks the cancel token.
const IDLE_POLL: Duration = Duration::from_millis(100);

// =============================================================================
// Path Utilities
// =============================================================================

/// Check if path is a temp/backup file (editor artifacts).
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}

/// `/blog/src/markdown/2024-01-01-x.md` → `src/markdown/2024-01-01-x.md`
fn rel_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}

const fn is_relevant(event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

// =============================================================================
// Debounce State
// =============================================================================

/// Collects changed paths until `window` has passed without a new event.
struct Debouncer {
    pending: FxHashSet<PathBuf>,
    last_event: Option<Instant>,
    window: Duration,
}

impl Debouncer {
    fn new(window: Duration) -> Self {
        Self {
            pending: FxHashSet::default(),
            last_event: None,
            window,
        }
    }

    fn add(&mut self, event: Event) {
        let mut touched = false;
        for path in event.paths {
            if !is_temp_file(&path) {
                touched = true;
                self.pending.insert(path);
            }
        }
        // Temp-only events neither start nor extend the window
        if touched {
            self.last_event = Some(Instant::now());
        }
    }

    fn ready(&self) -> bool {
        !self.pending.is_empty() && self.last_event.is_some_and(|t| t.elapsed() >= self.window)
    }

    /// Changed paths in a stable order, resetting to idle.
    fn take(&mut self) -> Vec<PathBuf> {
        self.last_event = None;
        let mut paths: Vec<_> = self.pending.drain().collect();
        paths.sort();
        paths
    }

    /// How long to block for the next event.
    fn timeout(&self) -> Duration {
        match self.last_event {
            Some(t) if !self.pending.is_empty() => {
                self.window.saturating_sub(t.elapsed()).min(IDLE_POLL)
            }
            _ => IDLE_POLL,
        }
    }
}

// =============================================================================
// Event Loop
// =============================================================================

/// Drive `rebuild` from the events on `rx` until `cancel` fires.
///
/// `rebuild` runs on this thread, so rebuilds never overlap. An error from
/// `rebuild` ends the loop.
fn run_loop(
    rx: &Receiver<notify::Result<Event>>,
    window: Duration,
    cancel: &CancelToken,
    mut rebuild: impl FnMut(&[PathBuf]) -> Result<()>,
) -> Result<()> {
    let mut debouncer = Debouncer::new(window);

    loop {
        if cancel.is_cancelled() {
            return Ok(());
        }

        match rx.recv_timeout(debouncer.timeout()) {
            Ok(Ok(event)) if is_relevant(&event) => debouncer.add(event),
            Ok(Ok(_)) => {}
            Ok(Err(err)) => return Err(BuildError::Watcher(err)),
            Err(RecvTimeoutError::Timeout) => {
                if debouncer.ready() {
                    rebuild(&debouncer.take())?;
                }
            }
            Err(RecvTimeoutError::Disconnected) if cancel.is_cancelled() => return Ok(()),
            Err(RecvTimeoutError::Disconnected) => {
                return Err(BuildError::Watcher(notify::Error::generic(
                    "watcher event channel closed",
                )));
            }
        }
    }
}

// =============================================================================
// Watcher Setup
// =============================================================================

/// A watched path and whether it is watched recursively.
type Target = (PathBuf, bool);

/// Paths to watch, with whether each is a directory. Missing ones are skipped.
///
/// The source directory is watched on its own, non-recursively: that covers
/// the templates and reports `markdown/` or `static/` being created.
fn watch_targets(config: &SiteConfig) -> Vec<Target> {
    let paths = config.paths();
    [
        (paths.source().to_path_buf(), false),
        (paths.markdown_dir(), true),
        (paths.static_dir(), true),
        (config.config_path.clone(), false),
    ]
    .into_iter()
    .filter(|(path, _)| path.exists())
    .collect()
}

/// Targets in `next` but not in `current`, and paths in `current` but not in
/// `next`.
fn diff_targets<'a>(current: &'a [Target], next: &'a [Target]) -> (Vec<&'a Target>, Vec<&'a Path>) {
    let added = next.iter().filter(|t| !current.contains(t)).collect();
    let removed = current
        .iter()
        .filter(|t| !next.contains(t))
        .map(|(path, _)| path.as_path())
        .collect();
    (added, removed)
}

/// What the watcher is currently registered for.
#[derive(Debug, Default)]
struct WatchSet {
    targets: Vec<Target>,
}

impl WatchSet {
    /// Register `watcher` for exactly `targets`.
    fn sync(&mut self, watcher: &mut impl Watcher, targets: Vec<Target>, root: &Path) -> Result<()> {
        let (added, removed) = diff_targets(&self.targets, &targets);
        if added.is_empty() && removed.is_empty() {
            return Ok(());
        }

        for path in removed {
            // Deleted paths are dropped by the backend already
            if let Err(err) = watcher.unwatch(path) {
                log!("watch"; "unwatch {}: {err}", rel_path(path, root));
            }
        }
        for (path, is_dir) in &added {
            let mode = if *is_dir {
                RecursiveMode::Recursive
            } else {
                RecursiveMode::NonRecursive
            };
            watcher.watch(path, mode)?;
        }

        let names: Vec<_> = targets
            .iter()
            .map(|(path, is_dir)| {
                let suffix = if *is_dir { "/" } else { "" };
                format!("{}{suffix}", rel_path(path, root))
            })
            .collect();
        log!("watch"; "watching {}", names.join(", "));

        self.targets = targets;
        Ok(())
    }
}

/// Log a failed rebuild with its full cause chain.
fn log_build_error(trigger: &str, err: BuildError) {
    log!("watch"; "rebuild failed ({trigger})");
    log!("error"; "{:#}", anyhow::Error::from(err));
}

/// Rebuild after a change, reloading the config first when it changed.
fn rebuild_blog(cli: &Cli, config: &mut SiteConfig, cancel: &CancelToken, changed: &[PathBuf]) {
    let trigger = changed
        .iter()
        .map(|p| rel_path(p, &config.root))
        .collect::<Vec<_>>()
        .join(", ");
    log!("watch"; "{trigger} changed, rebuilding...");

    if changed.contains(&config.config_path) {
        match SiteConfig::load(cli) {
            Ok(reloaded) => *config = reloaded,
            Err(err) => log!("watch"; "config not reloaded: {err:#}"),
        }
    }

    match build_blog(config, cancel) {
        Ok(_) | Err(BuildError::Cancelled) => {}
        Err(err) => log_build_error(&trigger, err),
    }
}

// =============================================================================
// Public API
// =============================================================================

/// Watch the blog sources and rebuild on change until `cancel` fires.
pub fn watch_for_changes_blocking(
    cli: &Cli,
    mut config: SiteConfig,
    cancel: &CancelToken,
) -> Result<()> {
    let (tx, rx) = mpsc::channel();
    let mut watcher = notify::recommended_watcher(tx)?;
    let mut watched = WatchSet::default();
    watched.sync(&mut watcher, watch_targets(&config), &config.root)?;

    run_loop(&rx, DEBOUNCE, cancel, |changed| {
        rebuild_blog(cli, &mut config, cancel, changed);
        watched.sync(&mut watcher, watch_targets(&config), &config.root)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, DataChange, ModifyKind, RemoveKind};
    use std::{sync::mpsc::Sender, thread};

    const WINDOW: Duration = Duration::from_millis(60);

    fn modify(path: &str) -> notify::Result<Event> {
        Ok(Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content)))
            .add_path(PathBuf::from(path)))
    }

    /// Run the loop while `script` feeds it events; cancels once `script` returns.
    fn run(
        script: impl FnOnce(&Sender<notify::Result<Event>>) + Send,
    ) -> (Result<()>, Vec<Vec<PathBuf>>) {
        let (tx, rx) = mpsc::channel();
        let cancel = CancelToken::new();
        let mut rebuilds = Vec::new();

        let result = thread::scope(|s| {
            let feeder_cancel = cancel.clone();
            s.spawn(move || {
                script(&tx);
                feeder_cancel.cancel();
            });
            run_loop(&rx, WINDOW, &cancel, |paths| {
                rebuilds.push(paths.to_vec());
                Ok(())
            })
        });
        (result, rebuilds)
    }

    fn quiet() {
        thread::sleep(WINDOW * 5);
    }

    #[test]
    fn test_is_temp_file() {
        assert!(is_temp_file(Path::new("/src/markdown/.post.md.swp")));
        assert!(is_temp_file(Path::new("/src/markdown/post.md~")));
        assert!(is_temp_file(Path::new("/src/post.html.bak")));
        assert!(is_temp_file(Path::new("/src/static/x.tmp")));
        assert!(!is_temp_file(Path::new("/src/markdown/2024-01-01-x.md")));
    }

    #[test]
    fn test_is_relevant() {
        assert!(is_relevant(&Event::new(EventKind::Create(CreateKind::File))));
        assert!(is_relevant(&Event::new(EventKind::Remove(RemoveKind::File))));
        assert!(is_relevant(&modify("x").unwrap()));
        assert!(!is_relevant(&Event::new(EventKind::Access(AccessKind::Read))));
    }

    #[test]
    fn test_burst_coalesces_into_one_rebuild() {
        let (result, rebuilds) = run(|tx| {
            for i in 0..5 {
                tx.send(modify(&format!("/src/markdown/{i}.md"))).unwrap();
                thread::sleep(Duration::from_millis(5));
            }
            quiet();
        });

        result.unwrap();
        assert_eq!(rebuilds.len(), 1);
        assert_eq!(rebuilds[0].len(), 5);
    }

    #[test]
    fn test_separate_bursts_rebuild_separately() {
        let (result, rebuilds) = run(|tx| {
            tx.send(modify("/src/index.html")).unwrap();
            quiet();
            tx.send(modify("/src/post.html")).unwrap();
            quiet();
        });

        result.unwrap();
        assert_eq!(rebuilds, [vec![PathBuf::from("/src/index.html")], vec![PathBuf::from("/src/post.html")]]);
    }

    #[test]
    fn test_each_event_resets_the_window() {
        let (result, rebuilds) = run(|tx| {
            // Spaced below the window, together well beyond it
            for _ in 0..6 {
                tx.send(modify("/src/markdown/a.md")).unwrap();
                thread::sleep(WINDOW / 2);
            }
            quiet();
        });

        result.unwrap();
        assert_eq!(rebuilds.len(), 1);
    }

    #[test]
    fn test_temp_files_and_access_events_are_ignored() {
        let (result, rebuilds) = run(|tx| {
            tx.send(modify("/src/markdown/.a.md.swp")).unwrap();
            tx.send(Ok(Event::new(EventKind::Access(AccessKind::Read))
                .add_path(PathBuf::from("/src/index.html"))))
                .unwrap();
            quiet();
        });

        result.unwrap();
        assert!(rebuilds.is_empty());
    }

    #[test]
    fn test_event_during_rebuild_triggers_another_rebuild() {
        let (tx, rx) = mpsc::channel();
        let cancel = CancelToken::new();
        let mut count = 0;

        let late = tx.clone();
        tx.send(modify("/src/markdown/a.md")).unwrap();
        let stopper = cancel.clone();
        let result = run_loop(&rx, WINDOW, &cancel, |_| {
            count += 1;
            match count {
                // An edit lands while this rebuild is still running
                1 => late.send(modify("/src/markdown/b.md")).unwrap(),
                _ => stopper.cancel(),
            }
            Ok(())
        });

        result.unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_watcher_error_ends_the_loop() {
        let (tx, rx) = mpsc::channel();
        tx.send(Err(notify::Error::generic("inotify limit reached"))).unwrap();

        let result = run_loop(&rx, WINDOW, &CancelToken::new(), |_| panic!("no rebuild"));
        assert!(matches!(result, Err(BuildError::Watcher(_))));
    }

    #[test]
    fn test_closed_channel_without_cancel_is_an_error() {
        let (tx, rx) = mpsc::channel::<notify::Result<Event>>();
        drop(tx);

        let result = run_loop(&rx, WINDOW, &CancelToken::new(), |_| Ok(()));
        assert!(matches!(result, Err(BuildError::Watcher(_))));
    }

    #[test]
    fn test_rebuild_error_ends_the_loop() {
        let (tx, rx) = mpsc::channel();
        tx.send(modify("/src/markdown/a.md")).unwrap();

        let mut calls = 0;
        let result = run_loop(&rx, WINDOW, &CancelToken::new(), |_| {
            calls += 1;
            Err(BuildError::Watcher(notify::Error::generic("watch limit reached")))
        });
        assert!(matches!(result, Err(BuildError::Watcher(_))));
        assert_eq!(calls, 1);
        drop(tx);
    }

    fn site(dir: &Path) -> SiteConfig {
        let mut config = SiteConfig::default();
        config.root = dir.to_path_buf();
        config.build.source = dir.join("src");
        config.config_path = dir.join("underblog.toml");
        config
    }

    #[test]
    fn test_watch_targets_skip_missing_paths() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = site(dir.path());
        let src = config.build.source.clone();
        std::fs::create_dir_all(src.join("markdown")).unwrap();
        std::fs::write(src.join("index.html"), "").unwrap();

        let targets = watch_targets(&config);
        assert_eq!(targets, [(src.clone(), false), (src.join("markdown"), true)]);
    }

    #[test]
    fn test_static_dir_created_later_is_added() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = site(dir.path());
        let src = config.build.source.clone();
        std::fs::create_dir_all(src.join("markdown")).unwrap();
        let before = watch_targets(&config);

        std::fs::create_dir_all(src.join("static")).unwrap();
        let after = watch_targets(&config);

        let (added, removed) = diff_targets(&before, &after);
        assert_eq!(added, [&(src.join("static"), true)]);
        assert!(removed.is_empty());
    }

    #[test]
    fn test_changed_source_replaces_old_targets() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = site(dir.path());
        let old = config.build.source.clone();
        let new = dir.path().join("content");
        std::fs::create_dir_all(old.join("markdown")).unwrap();
        std::fs::create_dir_all(new.join("markdown")).unwrap();
        std::fs::write(&config.config_path, "").unwrap();
        let before = watch_targets(&config);

        config.build.source = new.clone();
        let after = watch_targets(&config);

        let (added, removed) = diff_targets(&before, &after);
        assert_eq!(added, [&(new.clone(), false), &(new.join("markdown"), true)]);
        assert_eq!(removed, [old.as_path(), old.join("markdown").as_path()]);
    }

    #[test]
    fn test_sync_watches_new_static_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = site(dir.path());
        let src = config.build.source.clone();
        std::fs::create_dir_all(src.join("markdown")).unwrap();

        let (tx, rx) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(tx).unwrap();
        let mut watched = WatchSet::default();
        watched.sync(&mut watcher, watch_targets(&config), &config.root).unwrap();

        std::fs::create_dir_all(src.join("static")).unwrap();
        watched.sync(&mut watcher, watch_targets(&config), &config.root).unwrap();
        assert!(watched.targets.contains(&(src.join("static"), true)));

        let logo = src.join("static/logo.svg");
        std::fs::write(&logo, "<svg/>").unwrap();
        let seen = std::iter::from_fn(|| rx.recv_timeout(Duration::from_secs(5)).ok())
            .filter_map(notify::Result::ok)
            .any(|event| event.paths.iter().any(|p| p.ends_with("static/logo.svg")));
        assert!(seen);
    }
}
