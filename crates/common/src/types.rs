//! Common types shared across certkeeper crates.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// Daemon actions
// ============================================================================

/// Action applied to a system service after certificates changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceAction {
    Start,
    Stop,
    Restart,
}

impl ServiceAction {
    /// Verb passed to the service manager
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceAction::Start => "start",
            ServiceAction::Stop => "stop",
            ServiceAction::Restart => "restart",
        }
    }
}

impl fmt::Display for ServiceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the ordered daemon list in the renewal configuration
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DaemonAction {
    /// Service unit name, e.g. `nginx`
    pub name: String,
    /// What to do with it
    pub action: ServiceAction,
}

impl DaemonAction {
    pub fn new(name: impl Into<String>, action: ServiceAction) -> Self {
        Self {
            name: name.into(),
            action,
        }
    }
}

impl fmt::Display for DaemonAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.action, self.name)
    }
}

// ============================================================================
// Private keys
// ============================================================================

/// Private key algorithm for newly provisioned sites.
///
/// Only ECDSA on secp384r1 is supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyType {
    #[default]
    Ecdsa,
}

impl KeyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyType::Ecdsa => "ecdsa",
        }
    }

    /// Named curve used for the key
    pub fn curve(&self) -> &'static str {
        match self {
            KeyType::Ecdsa => "secp384r1",
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A key type name that certkeeper cannot generate
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported key type '{0}' (supported: ecdsa)")]
pub struct UnknownKeyType(pub String);

impl FromStr for KeyType {
    type Err = UnknownKeyType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ecdsa" => Ok(KeyType::Ecdsa),
            _ => Err(UnknownKeyType(s.to_string())),
        }
    }
}
