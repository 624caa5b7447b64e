//! Find and bundle the DLLs a Windows executable needs.
//!
//! Uses `objdump -p` to read PE import tables, so it runs on any host with a
//! PE-aware binutils (typically a mingw cross toolchain). Imports are resolved
//! against an ordered search path and walked recursively; DLLs that ship with
//! Windows are blacklisted and never followed.

mod bundle;
mod config;
mod error;
mod inspect;
mod paths;
mod walk;

pub use bundle::{bundle, BundleReport, Compressor, Upx};
pub use config::{
    Blacklist, Config, DEFAULT_BLACKLIST, DEFAULT_OBJDUMP, DEFAULT_SEARCH_PATHS, DEFAULT_UPX,
    SEARCH_PATH_ENV,
};
pub use error::{Error, Result};
pub use inspect::{parse_objdump_output, Inspector, Objdump};
pub use paths::{resolve_library, ResolutionPolicy, SearchPaths};
pub use walk::{DependencySet, DependencyWalker};
