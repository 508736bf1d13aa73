//! Development server with live rebuild.
//!
//! A small `tiny_http` server over the build output:
//!
//! - Static file serving from the output directory
//! - Automatic `index.html` resolution for directories
//! - File watching and rebuild (via `watch` module)
//! - Graceful shutdown on Ctrl+C
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────────┐
//! │  Server Thread  │     │   Main Thread    │
//! │  (HTTP Server)  │     │  (Watch Loop)    │
//! └────────┬────────┘     └────────┬─────────┘
//!          │                       │
//!          ▼                       ▼
//!    Handle requests         Detect changes
//!    Serve files             Rebuild blog
//!          │                       │
//!          └───────────┬───────────┘
//!                      ▼
//!              config.build.output
//!                 (dist/ dir)
//! ```
//!
//! The server never talks to the build: it reads whatever the latest build
//! left on disk.

use crate::{
    cli::Cli, config::SiteConfig, log, pipeline::CancelToken, watch::watch_for_changes_blocking,
};
use anyhow::{Context, Result, anyhow};
use std::{
    fs,
    io::Cursor,
    net::{IpAddr, SocketAddr},
    path::{Component, Path, PathBuf},
    sync::Arc,
    thread,
};
use tiny_http::{Header, Request, Response, Server, StatusCode};

/// Try binding to port, retry with incremented port if in use
const MAX_PORT_RETRIES: u16 = 10;

// ============================================================================
// Server Entry Point
// ============================================================================

/// Serve the output directory, and watch the sources if enabled.
///
/// Blocks until Ctrl+C, or until the watcher fails. Ctrl+C fires `cancel`,
/// which also stops a rebuild that is still running.
pub fn serve_blog(cli: &Cli, config: SiteConfig, cancel: &CancelToken) -> Result<()> {
    let interface: IpAddr = config
        .serve
        .interface
        .parse()
        .with_context(|| format!("Invalid interface `{}`", config.serve.interface))?;

    let (server, addr) = try_bind_port(interface, config.serve.port, MAX_PORT_RETRIES)?;
    let server = Arc::new(server);

    // Set up Ctrl+C handler for graceful shutdown
    let server_for_signal = Arc::clone(&server);
    let cancel_for_signal = cancel.clone();
    ctrlc::set_handler(move || {
        log!("serve"; "shutting down...");
        cancel_for_signal.cancel();
        server_for_signal.unblock();
    })
    .context("Failed to set Ctrl+C handler")?;

    log!("serve"; "http://{}", addr);

    let serve_root = config.build.output.clone();
    if !config.serve.watch {
        serve_requests(&server, &serve_root);
        return Ok(());
    }

    let http = {
        let server = Arc::clone(&server);
        thread::spawn(move || serve_requests(&server, &serve_root))
    };

    let watched = watch_for_changes_blocking(cli, config, cancel);

    // A dead watcher takes the server down with it
    server.unblock();
    if http.join().is_err() {
        log!("serve"; "server thread panicked");
    }

    watched.context("File watcher failed")
}

/// Try to bind to a port, retrying with incremented port numbers if in use.
fn try_bind_port(interface: IpAddr, base_port: u16, max_retries: u16) -> Result<(Server, SocketAddr)> {
    let mut last_err = None;

    for offset in 0..max_retries {
        let port = base_port.saturating_add(offset);
        let addr = SocketAddr::new(interface, port);

        match Server::http(addr) {
            Ok(server) => {
                if offset > 0 {
                    log!("serve"; "port {} in use, using {} instead", base_port, port);
                }
                return Ok((server, addr));
            }
            Err(e) => last_err = Some(e),
        }
    }

    Err(anyhow!(
        "Failed to bind after {} attempts (ports {}-{}): {}",
        max_retries,
        base_port,
        base_port.saturating_add(max_retries.saturating_sub(1)),
        last_err.map(|e| e.to_string()).unwrap_or_default()
    ))
}

/// Request loop; returns once the server is unblocked.
fn serve_requests(server: &Server, serve_root: &Path) {
    for request in server.incoming_requests() {
        if let Err(e) = handle_request(request, serve_root) {
            log!("serve"; "request error: {e}");
        }
    }
}

// ============================================================================
// Request Handling
// ============================================================================

/// Handle a single HTTP request.
///
/// Request resolution order:
/// 1. Exact file match → serve file
/// 2. Directory with index.html → serve index.html
/// 3. Nothing found → 404
fn handle_request(request: Request, serve_root: &Path) -> Result<()> {
    match resolve_path(serve_root, request.url()) {
        Some(path) => serve_file(request, &path),
        None => serve_not_found(request),
    }
}

/// Map a request URL to a file under `serve_root`.
///
/// The query string is dropped before percent-decoding. URLs that climb out
/// of `serve_root` with `..` resolve to nothing.
fn resolve_path(serve_root: &Path, url: &str) -> Option<PathBuf> {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let decoded = urlencoding::decode(path).ok()?;
    let request_path = Path::new(decoded.trim_matches('/'));

    if request_path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return None;
    }

    let local_path = serve_root.join(request_path);
    if local_path.is_file() {
        return Some(local_path);
    }

    let index_path = local_path.join("index.html");
    index_path.is_file().then_some(index_path)
}

// ============================================================================
// Response Helpers
// ============================================================================

fn content_type_header(value: &str) -> Result<Header> {
    Header::from_bytes("Content-Type", value)
        .map_err(|()| anyhow!("Invalid Content-Type header `{value}`"))
}

/// Serve a file with appropriate content type.
fn serve_file(request: Request, path: &Path) -> Result<()> {
    let content = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let response =
        Response::from_data(content).with_header(content_type_header(guess_content_type(path))?);

    request.respond(response)?;
    Ok(())
}

/// Serve 404 Not Found response.
fn serve_not_found(request: Request) -> Result<()> {
    const BODY: &str = "404 Not Found";
    let response = Response::new(
        StatusCode(404),
        vec![content_type_header("text/plain; charset=utf-8")?],
        Cursor::new(BODY),
        Some(BODY.len()),
        None,
    );
    request.respond(response)?;
    Ok(())
}

// ============================================================================
// Content Type Detection
// ============================================================================

/// Guess MIME content type from file extension.
///
/// Returns `application/octet-stream` for unknown extensions.
fn guess_content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        // Web content
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js" | "mjs") => "application/javascript; charset=utf-8",
        Some("json") => "application/json; charset=utf-8",
        Some("xml") => "application/xml; charset=utf-8",

        // Images
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",

        // Fonts
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",

        Some("txt") => "text/plain; charset=utf-8",

        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        io::{Read, Write},
        net::{Ipv4Addr, TcpListener, TcpStream},
    };
    use tempfile::TempDir;

    fn dist() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("posts/hello world")).unwrap();
        fs::create_dir_all(root.join("static/css")).unwrap();
        fs::create_dir_all(root.join("empty")).unwrap();
        fs::write(root.join("index.html"), "<h1>index</h1>").unwrap();
        fs::write(root.join("posts/hello world/index.html"), "<h1>hello</h1>").unwrap();
        fs::write(root.join("static/css/style.css"), "body{}").unwrap();
        dir
    }

    #[test]
    fn test_guess_content_type() {
        assert_eq!(guess_content_type(Path::new("a/index.html")), "text/html; charset=utf-8");
        assert_eq!(guess_content_type(Path::new("rss.xml")), "application/xml; charset=utf-8");
        assert_eq!(guess_content_type(Path::new("x.woff2")), "font/woff2");
        assert_eq!(guess_content_type(Path::new("noext")), "application/octet-stream");
    }

    #[test]
    fn test_resolve_root_and_directories() {
        let dir = dist();
        let root = dir.path();

        assert_eq!(resolve_path(root, "/"), Some(root.join("index.html")));
        assert_eq!(
            resolve_path(root, "/posts/hello%20world"),
            Some(root.join("posts/hello world/index.html"))
        );
        assert_eq!(
            resolve_path(root, "/posts/hello%20world/"),
            Some(root.join("posts/hello world/index.html"))
        );
    }

    #[test]
    fn test_resolve_files_and_query_strings() {
        let dir = dist();
        let root = dir.path();

        assert_eq!(
            resolve_path(root, "/static/css/style.css?t=123"),
            Some(root.join("static/css/style.css"))
        );
    }

    #[test]
    fn test_resolve_missing_paths() {
        let dir = dist();
        let root = dir.path();

        assert_eq!(resolve_path(root, "/nope"), None);
        assert_eq!(resolve_path(root, "/empty/"), None);
        assert_eq!(resolve_path(root, "/%FF%FE"), None);
    }

    #[test]
    fn test_resolve_rejects_parent_traversal() {
        let dir = dist();
        let root = dir.path().join("static");

        assert_eq!(resolve_path(&root, "/../index.html"), None);
        assert_eq!(resolve_path(&root, "/css/%2E%2E/%2E%2E/index.html"), None);
    }

    #[test]
    fn test_try_bind_port_skips_taken_port() {
        let taken = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let port = taken.local_addr().unwrap().port();

        let (_server, addr) = try_bind_port(IpAddr::V4(Ipv4Addr::LOCALHOST), port, 10).unwrap();
        assert_ne!(addr.port(), port);
    }

    fn get(addr: SocketAddr, path: &str) -> String {
        let mut stream = TcpStream::connect(addr).unwrap();
        write!(stream, "GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n").unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();
        response
    }

    #[test]
    fn test_serve_requests_end_to_end() {
        let dir = dist();
        let server = Arc::new(Server::http((Ipv4Addr::LOCALHOST, 0)).unwrap());
        let addr = server.server_addr().to_ip().unwrap();

        let handle = {
            let server = Arc::clone(&server);
            let root = dir.path().to_path_buf();
            thread::spawn(move || serve_requests(&server, &root))
        };

        let ok = get(addr, "/posts/hello%20world/");
        assert!(ok.starts_with("HTTP/1.1 200"));
        assert!(ok.contains("text/html; charset=utf-8"));
        assert!(ok.ends_with("<h1>hello</h1>"));

        let missing = get(addr, "/missing");
        assert!(missing.starts_with("HTTP/1.1 404"));
        assert!(missing.ends_with("404 Not Found"));

        server.unblock();
        handle.join().unwrap();
    }
}
