//! Provisioning tool configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use certkeeper_common::KeyType;

use crate::{default_certbot, default_tool_timeout_secs, finish, load_yaml, validate, ConfigError};

/// Configuration of first-time site setup
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProvisionConfig {
    /// Directory holding one sub-directory per site
    pub certs_root: PathBuf,

    /// Base of the webroots, laid out as `<www_root>/<owner>/<site>`
    pub www_root: PathBuf,

    /// Contact address passed to the CA
    #[validate(email)]
    pub admin_email: String,

    /// Key type used when the command line does not name one
    #[serde(default)]
    pub keytype: KeyType,

    /// Group owning new site directories
    #[serde(default = "default_ssl_group")]
    #[validate(length(min = 1))]
    pub ssl_group: String,

    /// Base OpenSSL configuration the CSR extension is layered on
    #[serde(default = "default_openssl_config")]
    pub openssl_config: PathBuf,

    /// openssl executable
    #[serde(default = "default_openssl")]
    #[validate(length(min = 1))]
    pub openssl: String,

    /// certbot executable
    #[serde(default = "default_certbot")]
    #[validate(length(min = 1))]
    pub certbot: String,

    /// Upper bound for every external tool invocation
    #[serde(default = "default_tool_timeout_secs")]
    #[validate(range(min = 1))]
    pub tool_timeout_secs: u64,
}

fn default_ssl_group() -> String {
    "ssl-cert".to_string()
}

fn default_openssl_config() -> PathBuf {
    PathBuf::from("/etc/ssl/openssl.cnf")
}

fn default_openssl() -> String {
    "openssl".to_string()
}

impl ProvisionConfig {
    /// Load and validate a provisioning configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config: ProvisionConfig = load_yaml(path)?;
        finish(path, validate::check_provision(&config))?;

        info!(
            path = %path.display(),
            certs_root = %config.certs_root.display(),
            keytype = %config.keytype,
            "Loaded provisioning configuration"
        );
        Ok(config)
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }
}
