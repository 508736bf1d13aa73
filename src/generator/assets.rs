//! Static asset mirroring: `<source>/static` → `<output>/static`, verbatim.

use crate::error::{BuildError, IoContext, Result};
use rayon::prelude::*;
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use walkdir::WalkDir;

/// Files never copied.
const IGNORED_FILES: &[&str] = &[".DS_Store"];

/// The directories and files of one `static/` tree, gathered before copying.
///
/// Scanning happens ahead of the output clean so a source that cannot be
/// read fails the build while the previous output is still intact.
#[derive(Debug, Default)]
pub struct StaticPlan {
    dirs: Vec<PathBuf>,
    files: Vec<(PathBuf, PathBuf)>,
}

impl StaticPlan {
    /// Map every entry under `src` to the same relative path under `dest`.
    ///
    /// A missing `src` yields an empty plan.
    pub fn scan(src: &Path, dest: &Path) -> Result<Self> {
        let mut plan = Self::default();
        if !src.is_dir() {
            return Ok(plan);
        }

        for entry in WalkDir::new(src) {
            let entry = entry.map_err(|err| {
                let path = err.path().unwrap_or(src).to_path_buf();
                BuildError::fs(path, io::Error::from(err))
            })?;
            let name = entry.file_name().to_str().unwrap_or_default();
            if IGNORED_FILES.contains(&name) {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(src) else {
                continue;
            };
            let target = dest.join(rel);
            if entry.file_type().is_dir() {
                plan.dirs.push(target);
            } else if entry.file_type().is_file() {
                plan.files.push((entry.into_path(), target));
            }
        }
        Ok(plan)
    }

    /// Number of files the plan copies.
    #[cfg(test)]
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Create the directories, then copy files in parallel.
    pub fn copy(&self) -> Result<usize> {
        // WalkDir yields parents before children
        for dir in &self.dirs {
            fs::create_dir_all(dir).at(dir)?;
        }

        self.files
            .par_iter()
            .try_for_each(|(from, to): &(PathBuf, PathBuf)| {
                fs::copy(from, to).at(from).map(|_| ())
            })?;

        Ok(self.files.len())
    }
}
