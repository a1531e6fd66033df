//! certkeeper library
//!
//! TLS certificate lifecycle tooling for hosts that get their certificates
//! from an ACME CA through `certbot` and webroot validation:
//!
//! - **Parsing**: CommonNames, SubjectAltName DNS names, expiry and the
//!   SubjectPublicKeyInfo hash of X.509 certificates
//! - **TLSA**: DANE `3 1 1` records for every name of a certificate
//! - **Storage**: serially versioned generations per site, deployed
//!   through `latest_*` symlinks that are swapped atomically
//! - **Renewal**: expiry-driven batches with per-site failure isolation
//!   and a single daemon restart at the end
//! - **Provisioning**: site directory, private key, CSR, first issuance
//!
//! # Example
//!
//! ```ignore
//! use certkeeper::{Certificate, tlsa};
//!
//! let cert = Certificate::from_file(Path::new("latest_cert.crt"))?;
//! for record in tlsa::records_for(&cert, tlsa::DEFAULT_PROTOCOL, tlsa::DEFAULT_PORT) {
//!     println!("{}", record);
//! }
//! ```

// ============================================================================
// Module Declarations
// ============================================================================

pub mod certificate;
pub mod daemons;
pub mod error;
pub mod lock;
pub mod provision;
pub mod renewal;
pub mod report;
pub mod store;
pub mod tlsa;
pub mod tools;

// ============================================================================
// Public API Re-exports
// ============================================================================

// Errors
pub use error::{exit, CertError, ErrorKind, ParseError, StoreError, ToolError};

// Certificates
pub use certificate::Certificate;
pub use tlsa::TlsaRecord;

// Storage
pub use store::{CertificateStore, Generation, LinkState, SiteStore};

// Workflows
pub use daemons::{DaemonCoordinator, DaemonOutcome};
pub use provision::{ProvisionRequest, ProvisionTools, Provisioned, Provisioner};
pub use renewal::{renewal_due, RenewalScheduler};
pub use report::{RenewalReport, SiteOutcome, SiteReport};

// Shared types
pub use certkeeper_common::{DaemonAction, KeyType, Serial, ServiceAction, SiteName};
pub use certkeeper_config::{ConfigError, ProvisionConfig, RenewalConfig};
