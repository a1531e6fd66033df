//! Error types
//!
//! One enum per concern, unified by [`CertError`] which also carries the
//! process exit code and the machine-readable kind used in run reports.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use certkeeper_common::Serial;
use certkeeper_config::ConfigError;

/// Process exit codes
pub mod exit {
    pub const SUCCESS: u8 = 0;
    /// Malformed or missing configuration, unsupported key type
    pub const CONFIG: u8 = 1;
    /// A certificate could not be parsed
    pub const PARSE: u8 = 2;
    /// At least one site failed renewal or first issuance
    pub const RENEWAL_FAILED: u8 = 3;
    /// I/O or system failure outside a renewal batch
    pub const RUNTIME: u8 = 4;
}

/// Errors decoding a certificate
#[derive(Debug, Error)]
pub enum ParseError {
    /// Certificate file could not be read
    #[error("failed to read certificate {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// PEM envelope is malformed
    #[error("malformed PEM: {0}")]
    Pem(#[from] pem::PemError),

    /// PEM block is not a certificate
    #[error("expected a CERTIFICATE PEM block, found '{0}'")]
    NotCertificate(String),

    /// DER structure is malformed
    #[error("malformed X.509 certificate: {0}")]
    X509(String),

    /// A CommonName attribute has an undecodable string value
    #[error("undecodable CommonName: {0}")]
    CommonName(String),

    /// The SubjectAltName extension could not be decoded
    #[error("invalid SubjectAltName extension: {0}")]
    SubjectAltName(String),

    /// The validity end does not fit a calendar timestamp
    #[error("notAfter timestamp out of range: {0}")]
    Timestamp(i64),
}

/// Errors from the on-disk certificate store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The `latest_*` links are missing, dangling or unparsable
    #[error("certificate store corrupt at {}: {reason}", .path.display())]
    Corrupt { path: PathBuf, reason: String },

    /// Provisioning refuses to reuse a site directory
    #[error("site directory already exists: {}", .0.display())]
    SiteExists(PathBuf),

    /// A generation cannot be promoted because a file is missing
    #[error("generation {serial} is incomplete: {} missing", .missing.display())]
    IncompleteGeneration { serial: Serial, missing: PathBuf },
}

impl StoreError {
    pub fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        StoreError::Corrupt {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Errors from external tool invocations
#[derive(Debug, Error)]
pub enum ToolError {
    /// The executable could not be started
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The tool ran and reported failure
    #[error("{program} exited with {}: {stderr}", describe_exit(.code))]
    Failed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    /// The tool did not finish in time and was killed
    #[error("{program} timed out after {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    /// The tool reported success without producing an expected file
    #[error("{program} reported success but did not write {}", .path.display())]
    MissingOutput { program: String, path: PathBuf },

    /// Input for the tool could not be prepared
    #[error("failed to prepare {program}: {source}")]
    Prepare {
        program: String,
        #[source]
        source: io::Error,
    },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "a signal".to_string(),
    }
}

/// Top-level error of a certkeeper operation
#[derive(Debug, Error)]
pub enum CertError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Tool(#[from] ToolError),

    /// A common name that cannot be used as a site directory name
    #[error("invalid site name '{0}'")]
    InvalidSiteName(String),

    /// Owner given for a new site does not exist
    #[error("unknown system user '{0}'")]
    UnknownUser(String),

    /// Configured site group does not exist
    #[error("unknown system group '{0}'")]
    UnknownGroup(String),

    /// A system call failed
    #[error("system call failed: {0}")]
    System(#[from] nix::errno::Errno),
}

/// Machine-readable classification of a [`CertError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Config,
    Parse,
    StoreCorrupt,
    Store,
    ExternalTool,
    System,
}

impl CertError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CertError::Config(_)
            | CertError::InvalidSiteName(_)
            | CertError::UnknownUser(_)
            | CertError::UnknownGroup(_) => ErrorKind::Config,
            CertError::Parse(_) => ErrorKind::Parse,
            CertError::Store(StoreError::Corrupt { .. }) => ErrorKind::StoreCorrupt,
            CertError::Store(_) => ErrorKind::Store,
            CertError::Tool(_) => ErrorKind::ExternalTool,
            CertError::System(_) => ErrorKind::System,
        }
    }

    /// Exit code when this error ends the process
    pub fn exit_code(&self) -> u8 {
        match self.kind() {
            ErrorKind::Config => exit::CONFIG,
            ErrorKind::Parse => exit::PARSE,
            ErrorKind::ExternalTool => exit::RENEWAL_FAILED,
            ErrorKind::StoreCorrupt | ErrorKind::Store | ErrorKind::System => exit::RUNTIME,
        }
    }
}

impl From<io::Error> for CertError {
    fn from(e: io::Error) -> Self {
        CertError::Store(StoreError::Io(e))
    }
}
