//! Errors that abort a build.
//!
//! Every variant is fatal for the build attempt that produced it. Nothing in
//! the pipeline retries or skips; the caller decides whether the process
//! exits (`build`) or the watch loop logs and waits for the next change.

use crate::post::ParseError;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias for the build pipeline.
pub type Result<T, E = BuildError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("markdown directory not found: `{}`", .0.display())]
    MissingSourceDirectory(PathBuf),

    #[error(transparent)]
    MalformedFilename(#[from] ParseError),

    #[error("template error in `{}`", path.display())]
    Template {
        path: PathBuf,
        #[source]
        source: tera::Error,
    },

    #[error("filesystem error at `{}`", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("file watcher failed")]
    Watcher(#[from] notify::Error),

    #[error("rss feed error: {0}")]
    Feed(String),

    #[error("build cancelled")]
    Cancelled,
}

impl BuildError {
    /// Attach the offending path to an I/O error.
    pub fn fs(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// Attach the offending template file to a tera error.
    pub fn template(path: impl Into<PathBuf>, source: tera::Error) -> Self {
        Self::Template {
            path: path.into(),
            source,
        }
    }
}

/// Adds path context to `io::Result`, mirroring `anyhow::Context` for the
/// typed pipeline errors.
pub trait IoContext<T> {
    fn at(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoContext<T> for std::io::Result<T> {
    fn at(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|err| BuildError::fs(path, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error, ErrorKind};

    #[test]
    fn test_build_error_display_names_path() {
        let err = BuildError::MissingSourceDirectory(PathBuf::from("src/markdown"));
        assert!(err.to_string().contains("src/markdown"));

        let err = BuildError::fs("dist/index.html", Error::new(ErrorKind::Other, "disk full"));
        assert!(err.to_string().contains("dist/index.html"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_io_context_wraps_error() {
        let result: std::io::Result<()> = Err(Error::new(ErrorKind::NotFound, "gone"));
        let err = result.at("src/post.html").unwrap_err();
        assert!(matches!(err, BuildError::Filesystem { ref path, .. } if path.ends_with("post.html")));
    }
}
