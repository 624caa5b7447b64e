//! Recursive import-table traversal.

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use crate::config::Blacklist;
use crate::error::{Error, Result};
use crate::inspect::Inspector;
use crate::paths::{absolute, resolve_library, ResolutionPolicy, SearchPaths};

/// Absolute paths of every library an image needs, root image excluded.
pub type DependencySet = BTreeSet<PathBuf>;

/// Walks the import graph of an image and collects the libraries to ship.
pub struct DependencyWalker<'a> {
    inspector: &'a dyn Inspector,
    search_paths: &'a SearchPaths,
    blacklist: &'a Blacklist,
    policy: ResolutionPolicy,
}

impl<'a> DependencyWalker<'a> {
    pub fn new(
        inspector: &'a dyn Inspector,
        search_paths: &'a SearchPaths,
        blacklist: &'a Blacklist,
        policy: ResolutionPolicy,
    ) -> Self {
        Self {
            inspector,
            search_paths,
            blacklist,
            policy,
        }
    }

    /// Collect all transitive dependencies of `image`.
    ///
    /// Blacklisted imports are dropped before resolution, so neither they nor
    /// anything below them is visited. Each resolved library is inspected
    /// once, even when several images import it or the imports form a cycle.
    #[must_use = "dependency set should be processed"]
    pub fn walk(&self, image: &Path) -> Result<DependencySet> {
        let root = absolute(image);
        let mut all_libs = DependencySet::new();
        all_libs.insert(root.clone());

        let mut to_process = vec![root.clone()];
        let mut processed = HashSet::new();

        while let Some(path) = to_process.pop() {
            if !processed.insert(path.clone()) {
                continue;
            }

            let imports = self
                .inspector
                .imports(&path)
                .map_err(|e| Error::Inspector {
                    image: path.clone(),
                    cause: format!("{e:#}"),
                })?;

            let mut found = Vec::new();
            for lib_name in imports {
                if self.blacklist.contains(&lib_name) {
                    log::debug!("{}: {} is blacklisted", path.display(), lib_name);
                    continue;
                }
                let resolved = resolve_library(&lib_name, self.search_paths, self.policy)?;
                if let Some(lib_path) = resolved {
                    all_libs.insert(lib_path.clone());
                    found.push(lib_path);
                }
            }
            // Reversed so the stack pops imports in declared order.
            to_process.extend(found.into_iter().rev());
        }

        all_libs.remove(&root);
        Ok(all_libs)
    }
}
