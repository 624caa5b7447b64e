//! Error kinds raised while resolving dependencies.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(
        "could not find '{name}' in any search path; if it is provided by Windows, \
         add it to the blacklist with --blacklist {name}"
    )]
    MissingDependency { name: String },

    #[error("failed to inspect imports of {}: {cause}", image.display())]
    Inspector { image: PathBuf, cause: String },

    #[error("invalid configuration: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, Error>;
