//! Library search-path resolution.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// What to do when an import cannot be found in any search path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolutionPolicy {
    #[default]
    FailOnMissing,
    SkipMissing,
}

/// Ordered list of directories to look for libraries in.
///
/// Earlier entries take precedence. An empty entry stands for the current
/// working directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPaths {
    dirs: Vec<PathBuf>,
}

impl SearchPaths {
    pub fn new<I, P>(dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            dirs: dirs.into_iter().map(Into::into).collect(),
        }
    }

    /// Put `dirs` ahead of the current entries, keeping their relative order.
    pub fn prepend<I, P>(&mut self, dirs: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut merged: Vec<PathBuf> = dirs.into_iter().map(Into::into).collect();
        merged.append(&mut self.dirs);
        self.dirs = merged;
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// Candidate locations for `lib_name`, in search order.
    pub fn candidates<'a>(&'a self, lib_name: &'a str) -> impl Iterator<Item = PathBuf> + 'a {
        self.dirs.iter().map(move |dir| {
            if dir.as_os_str().is_empty() {
                PathBuf::from(lib_name)
            } else {
                dir.join(lib_name)
            }
        })
    }
}

/// Find the first existing `lib_name` across `search_paths`.
///
/// Returns the absolute path of the first hit. When nothing matches, returns
/// `Ok(None)` under [`ResolutionPolicy::SkipMissing`] and
/// [`Error::MissingDependency`] otherwise.
#[must_use = "resolved library path should be used"]
pub fn resolve_library(
    lib_name: &str,
    search_paths: &SearchPaths,
    policy: ResolutionPolicy,
) -> Result<Option<PathBuf>> {
    if let Some(found) = search_paths.candidates(lib_name).find(|p| p.exists()) {
        log::debug!("{} -> {}", lib_name, found.display());
        return Ok(Some(absolute(&found)));
    }

    match policy {
        ResolutionPolicy::SkipMissing => {
            log::warn!("Skipping missing dependency {}", lib_name);
            Ok(None)
        }
        ResolutionPolicy::FailOnMissing => Err(Error::MissingDependency {
            name: lib_name.to_string(),
        }),
    }
}

/// Make `path` absolute without following symlinks, so the file name is kept.
pub(crate) fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
