//! External tool capabilities
//!
//! Everything certkeeper cannot do itself goes through one of these
//! traits: generating keys and CSRs, asking the CA for a certificate,
//! acting on system services, and handing a directory to its owner.
//!
//! The process-backed implementations shell out to `openssl`, `certbot`
//! and `systemctl` through [`ToolRunner`], which enforces a timeout and
//! kills the child when the call is abandoned. Tests substitute fakes.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use certkeeper_common::{DaemonAction, KeyType};

use crate::error::{CertError, ToolError};
use crate::store::Generation;

mod certbot;
mod openssl;
mod ownership;
mod process;
mod systemd;

pub use certbot::Certbot;
pub use openssl::{san_section, OpenSsl};
pub use ownership::SystemOwner;
pub use process::ToolRunner;
pub use systemd::Systemctl;

/// A certificate request handed to the CA client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuanceRequest {
    /// Every identity to validate and include
    pub domains: Vec<String>,
    /// CSR carrying the public key
    pub csr: PathBuf,
    /// Directory served at `/.well-known/acme-challenge/`
    pub webroot: PathBuf,
    /// Where the CA client writes the new generation
    pub output: Generation,
    /// Account contact address
    pub email: String,
    /// Use the CA's staging environment
    pub staging: bool,
    /// Accept the CA's terms of service (first issuance)
    pub agree_tos: bool,
}

/// Input of CSR generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrRequest {
    pub common_name: String,
    pub fqdns: BTreeSet<String>,
    pub key: PathBuf,
    pub output: PathBuf,
}

/// Obtains certificates from the CA
#[async_trait]
pub trait CertificateIssuer: Send + Sync {
    async fn issue(&self, request: &IssuanceRequest) -> Result<(), ToolError>;
}

/// Generates private keys
#[async_trait]
pub trait KeyGenerator: Send + Sync {
    async fn generate_key(&self, key_type: KeyType, output: &Path) -> Result<(), ToolError>;
}

/// Generates certificate signing requests
#[async_trait]
pub trait CsrGenerator: Send + Sync {
    async fn generate_csr(&self, request: &CsrRequest) -> Result<(), ToolError>;
}

/// Applies start/stop/restart to system services
#[async_trait]
pub trait ServiceManager: Send + Sync {
    async fn apply(&self, daemon: &DaemonAction) -> Result<(), ToolError>;
}

/// Assigns ownership of new site directories and keys
pub trait DirectoryOwner: Send + Sync {
    /// Check that `owner` (and the group) can be assigned, without doing it
    fn check(&self, owner: &str) -> Result<(), CertError>;

    fn assign(&self, path: &Path, owner: &str) -> Result<(), CertError>;
}
