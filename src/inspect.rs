//! PE import-table inspection through objdump.

use anyhow::{bail, Context, Result};
use std::path::Path;
use std::process::Command;

use crate::config::DEFAULT_OBJDUMP;

/// Source of the DLL names an image declares in its import table.
pub trait Inspector {
    /// Return the imported library names of `image`, in the order declared.
    fn imports(&self, image: &Path) -> Result<Vec<String>>;
}

/// Runs `objdump -p` and reads the `DLL Name:` entries.
///
/// objdump from a mingw binutils build (or any multi-target build) understands
/// PE images without running them, so this works from a Linux host.
#[derive(Debug, Clone)]
pub struct Objdump {
    program: String,
}

impl Objdump {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for Objdump {
    fn default() -> Self {
        Self::new(DEFAULT_OBJDUMP)
    }
}

impl Inspector for Objdump {
    /// # Errors
    ///
    /// Returns an error if:
    /// - The image does not exist
    /// - The objdump executable cannot be started
    /// - objdump exits unsuccessfully (unreadable or unsupported image)
    fn imports(&self, image: &Path) -> Result<Vec<String>> {
        // Check file exists first for a clear error message
        if !image.exists() {
            bail!("File does not exist: {}", image.display());
        }

        log::debug!("{} -p {}", self.program, image.display());
        let output = Command::new(&self.program)
            .arg("-p")
            .arg(image)
            .output()
            .with_context(|| format!("could not run '{}' - install binutils", self.program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("{} exited with {}: {}", self.program, output.status, stderr.trim());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(parse_objdump_output(&stdout))
    }
}

/// Parse `objdump -p` output to extract imported DLL names.
///
/// Example objdump output:
/// ```text
/// The Import Tables (interpreted .idata section contents)
///  vma:            Hint    Time      Forward  DLL       First
///                  Table   Stamp     Chain    Name      Thunk
///  00012000       0001203c 00000000 00000000 00012a18 000121c4
///
///         DLL Name: libgcc_s_seh-1.dll
///         vma:  Hint/Ord Member-Name Bound-To
/// ```
pub fn parse_objdump_output(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| line.trim_start().strip_prefix("DLL Name:"))
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}
