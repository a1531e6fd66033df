//! Type-safe identifier newtypes for certkeeper.
//!
//! These keep a site name from being passed where a domain is expected,
//! and a local generation counter from being confused with the serial
//! number embedded in the X.509 certificate itself.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Name of a managed site.
///
/// A site is named after the CommonName it was provisioned for, and the
/// same string is used as its directory name under the certificates root.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SiteName(String);

impl SiteName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SiteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SiteName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SiteName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Local per-site certificate generation counter.
///
/// Generations start at `0000` on first issuance and grow by one on every
/// successful renewal. Rendered zero-padded to four digits, which is also
/// the prefix of the generation's files on disk.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Serial(u32);

impl Serial {
    /// Generation used for first issuance
    pub const FIRST: Serial = Serial(0);

    pub fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn value(self) -> u32 {
        self.0
    }

    /// The generation that follows this one, `None` once the counter is
    /// exhausted
    pub fn next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

impl fmt::Display for Serial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.0)
    }
}

impl FromStr for Serial {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u32>().map(Self)
    }
}
