//! Shared identifiers and types for certkeeper.
//!
//! Used by both the configuration crate and the lifecycle tooling so that
//! a daemon action parsed from YAML is the same value the restart
//! coordinator executes.

pub mod ids;
pub mod types;

pub use ids::{Serial, SiteName};
pub use types::{DaemonAction, KeyType, ServiceAction, UnknownKeyType};
