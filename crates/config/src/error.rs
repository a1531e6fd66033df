//! Configuration error types

use std::io;
use std::path::PathBuf;

use certkeeper_common::UnknownKeyType;
use thiserror::Error;

/// Errors raised while loading configuration.
///
/// All of them are fatal: they are reported before any site is processed.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("failed to read configuration {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file is not valid YAML or does not match the expected shape
    #[error("malformed configuration {}: {source}", .path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The document parsed but failed schema or filesystem checks
    #[error("invalid configuration {}: {message}", .path.display())]
    Invalid { path: PathBuf, message: String },

    /// A key type was requested that cannot be generated
    #[error(transparent)]
    KeyType(#[from] UnknownKeyType),
}
