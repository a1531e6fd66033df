//! DANE TLSA record generation
//!
//! Records are emitted as `3 1 1`: DANE-EE usage, SubjectPublicKeyInfo
//! selector, SHA-256 matching. Pinning the public key rather than the
//! whole certificate keeps the records valid across renewals that reuse
//! the key.

use std::collections::BTreeSet;
use std::fmt;

use crate::certificate::Certificate;

/// Default transport protocol label
pub const DEFAULT_PROTOCOL: &str = "tcp";

/// Default service port
pub const DEFAULT_PORT: u16 = 443;

/// DANE-EE: domain-issued certificate
pub const USAGE_DOMAIN_ISSUED: u8 = 3;
/// Match on the SubjectPublicKeyInfo
pub const SELECTOR_SPKI: u8 = 1;
/// SHA-256 digest of the selected data
pub const MATCHING_SHA256: u8 = 1;

/// One TLSA resource record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsaRecord {
    pub port: u16,
    pub protocol: String,
    pub fqdn: String,
    pub hash: String,
}

impl fmt::Display for TlsaRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "_{}._{}.{}   IN  TLSA    {} {} {} {}",
            self.port,
            self.protocol,
            self.fqdn,
            USAGE_DOMAIN_ISSUED,
            SELECTOR_SPKI,
            MATCHING_SHA256,
            self.hash
        )
    }
}

/// Build one record per FQDN
pub fn records(
    public_key_hash: &str,
    fqdns: &BTreeSet<String>,
    protocol: &str,
    port: u16,
) -> Vec<TlsaRecord> {
    fqdns
        .iter()
        .map(|fqdn| TlsaRecord {
            port,
            protocol: protocol.to_string(),
            fqdn: fqdn.clone(),
            hash: public_key_hash.to_string(),
        })
        .collect()
}

/// Records for every identity of a parsed certificate
pub fn records_for(cert: &Certificate, protocol: &str, port: u16) -> Vec<TlsaRecord> {
    records(cert.public_key_hash(), cert.fqdns(), protocol, port)
}
