//! Copying resolved libraries next to the image, with optional compression.

use anyhow::{bail, Context, Result};
use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::DEFAULT_UPX;
use crate::walk::DependencySet;

/// Post-processes a copied library in place.
pub trait Compressor {
    fn compress(&self, path: &Path) -> Result<()>;
}

/// Compresses executables with `upx`.
#[derive(Debug, Clone)]
pub struct Upx {
    program: String,
}

impl Upx {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for Upx {
    fn default() -> Self {
        Self::new(DEFAULT_UPX)
    }
}

impl Compressor for Upx {
    fn compress(&self, path: &Path) -> Result<()> {
        let output = Command::new(&self.program)
            .arg(path)
            .output()
            .with_context(|| format!("could not run '{}'", self.program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("{} exited with {}: {}", self.program, output.status, stderr.trim());
        }
        Ok(())
    }
}

/// What happened to each library during a bundling pass.
#[derive(Debug, Default)]
pub struct BundleReport {
    /// Destination paths that were written.
    pub copied: Vec<PathBuf>,
    /// Libraries already living in the target directory.
    pub skipped: Vec<PathBuf>,
    pub compressed: Vec<PathBuf>,
    /// Per-file copy or compression errors.
    pub failures: Vec<(PathBuf, String)>,
}

impl BundleReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Copy every library in `deps` into `target_dir`, overwriting same-named files.
///
/// A library whose destination is the very same file is left alone. When a
/// compressor is given, each fresh copy is compressed right after it is
/// written. Failures are collected in the report and never stop the batch.
pub fn bundle(
    deps: &DependencySet,
    target_dir: &Path,
    compressor: Option<&dyn Compressor>,
) -> BundleReport {
    let mut report = BundleReport::default();

    for src in deps {
        let dest = match copy_library(src, target_dir) {
            Ok(Some(dest)) => dest,
            Ok(None) => {
                log::debug!("{} is already in place", src.display());
                report.skipped.push(src.clone());
                continue;
            }
            Err(e) => {
                log::warn!("Failed to copy {}: {:#}", src.display(), e);
                report.failures.push((src.clone(), format!("{e:#}")));
                continue;
            }
        };
        log::info!("Copied {} -> {}", src.display(), dest.display());
        report.copied.push(dest.clone());

        if let Some(compressor) = compressor {
            match compressor.compress(&dest) {
                Ok(()) => {
                    log::info!("Compressed {}", dest.display());
                    report.compressed.push(dest);
                }
                Err(e) => {
                    log::warn!("Failed to compress {}: {:#}", dest.display(), e);
                    report.failures.push((dest, format!("{e:#}")));
                }
            }
        }
    }

    report
}

/// Copy `src` into `target_dir`, returning the destination.
///
/// Returns `Ok(None)` when the destination already is `src`, whether by the
/// same path, a symlink, or a hard link.
fn copy_library(src: &Path, target_dir: &Path) -> Result<Option<PathBuf>> {
    let file_name = src
        .file_name()
        .with_context(|| format!("Library path has no file name: {}", src.display()))?;
    let dest = target_dir.join(file_name);

    if dest.exists() && same_file(src, &dest)? {
        return Ok(None);
    }

    fs::copy(src, &dest)
        .with_context(|| format!("Failed to copy {} to {}", src.display(), dest.display()))?;
    Ok(Some(dest))
}

/// Compare by device and inode; paths can differ for the same file.
fn same_file(a: &Path, b: &Path) -> Result<bool> {
    let a = fs::metadata(a).with_context(|| format!("Failed to read metadata: {}", a.display()))?;
    let b = fs::metadata(b).with_context(|| format!("Failed to read metadata: {}", b.display()))?;
    Ok(a.dev() == b.dev() && a.ino() == b.ino())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use tempfile::TempDir;

    /// Fails for file names listed in `fail_on`.
    #[derive(Default)]
    struct FakeCompressor {
        fail_on: Vec<&'static str>,
        seen: RefCell<Vec<PathBuf>>,
    }

    impl Compressor for FakeCompressor {
        fn compress(&self, path: &Path) -> Result<()> {
            self.seen.borrow_mut().push(path.to_path_buf());
            let name = path.file_name().unwrap().to_string_lossy();
            if self.fail_on.iter().any(|f| *f == name) {
                bail!("upx: CantPackException");
            }
            Ok(())
        }
    }

    fn setup() -> (TempDir, PathBuf, PathBuf) {
        let temp = TempDir::new().unwrap();
        let lib = temp.path().join("lib");
        let dist = temp.path().join("dist");
        fs::create_dir_all(&lib).unwrap();
        fs::create_dir_all(&dist).unwrap();
        (temp, lib, dist)
    }

    #[test]
    fn test_copies_and_overwrites() {
        let (_temp, lib, dist) = setup();
        fs::write(lib.join("foo.dll"), b"new foo").unwrap();
        fs::write(dist.join("foo.dll"), b"stale foo").unwrap();

        let deps = DependencySet::from([lib.join("foo.dll")]);
        let report = bundle(&deps, &dist, None);

        assert!(report.is_success());
        assert_eq!(report.copied, vec![dist.join("foo.dll")]);
        assert_eq!(fs::read(dist.join("foo.dll")).unwrap(), b"new foo");
    }

    #[test]
    fn test_same_file_is_skipped() {
        let (_temp, lib, dist) = setup();
        fs::write(dist.join("bar.dll"), b"bar").unwrap();
        fs::write(lib.join("foo.dll"), b"foo").unwrap();

        let deps = DependencySet::from([dist.join("bar.dll"), lib.join("foo.dll")]);
        let compressor = FakeCompressor::default();
        let report = bundle(&deps, &dist, Some(&compressor));

        assert!(report.is_success());
        assert_eq!(report.skipped, vec![dist.join("bar.dll")]);
        assert_eq!(report.copied, vec![dist.join("foo.dll")]);
        assert_eq!(fs::read(dist.join("bar.dll")).unwrap(), b"bar");
        // Only fresh copies are compressed.
        assert_eq!(*compressor.seen.borrow(), vec![dist.join("foo.dll")]);
    }

    #[test]
    fn test_hard_link_destination_is_skipped() {
        let (_temp, lib, dist) = setup();
        fs::write(lib.join("foo.dll"), b"real foo").unwrap();
        fs::hard_link(lib.join("foo.dll"), dist.join("foo.dll")).unwrap();

        let deps = DependencySet::from([lib.join("foo.dll")]);
        let report = bundle(&deps, &dist, None);

        assert!(report.is_success());
        assert!(report.copied.is_empty());
        assert_eq!(report.skipped, vec![lib.join("foo.dll")]);
        assert_eq!(fs::read(lib.join("foo.dll")).unwrap(), b"real foo");
    }

    #[test]
    fn test_symlink_destination_is_skipped() {
        let (_temp, lib, dist) = setup();
        fs::write(lib.join("foo.dll"), b"real foo").unwrap();
        std::os::unix::fs::symlink(lib.join("foo.dll"), dist.join("foo.dll")).unwrap();

        let deps = DependencySet::from([lib.join("foo.dll")]);
        let report = bundle(&deps, &dist, None);

        assert_eq!(report.skipped, vec![lib.join("foo.dll")]);
        assert_eq!(fs::read(lib.join("foo.dll")).unwrap(), b"real foo");
    }

    #[test]
    fn test_compress_failure_does_not_stop_batch() {
        let (_temp, lib, dist) = setup();
        fs::write(lib.join("bar.dll"), b"bar").unwrap();
        fs::write(lib.join("foo.dll"), b"foo").unwrap();

        let deps = DependencySet::from([lib.join("bar.dll"), lib.join("foo.dll")]);
        let compressor = FakeCompressor {
            fail_on: vec!["bar.dll"],
            ..Default::default()
        };
        let report = bundle(&deps, &dist, Some(&compressor));

        assert_eq!(report.copied.len(), 2);
        assert_eq!(report.compressed, vec![dist.join("foo.dll")]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, dist.join("bar.dll"));
        assert!(report.failures[0].1.contains("CantPackException"));
    }

    #[test]
    fn test_copy_failure_recorded() {
        let (_temp, lib, dist) = setup();
        fs::write(lib.join("foo.dll"), b"foo").unwrap();

        let deps = DependencySet::from([lib.join("gone.dll"), lib.join("foo.dll")]);
        let report = bundle(&deps, &dist, None);

        assert_eq!(report.copied, vec![dist.join("foo.dll")]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, lib.join("gone.dll"));
    }

    #[test]
    fn test_upx_missing_program() {
        let (_temp, lib, _dist) = setup();
        fs::write(lib.join("foo.dll"), b"foo").unwrap();

        let err = Upx::new("definitely-not-upx-7c1e")
            .compress(&lib.join("foo.dll"))
            .unwrap_err();
        assert!(err.to_string().contains("could not run"));
    }
}
