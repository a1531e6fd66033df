//! Configuration loading and validation for certkeeper.
//!
//! Both tools read a small YAML document. The document is parsed, checked
//! against its schema and against the filesystem exactly once at startup;
//! any problem becomes a single [`ConfigError`] before a site is touched.
//!
//! # Example
//!
//! ```yaml
//! certs_root: /etc/letsencrypt/certs
//! www_root: /var/www
//! threshold: 30
//! admin_email: hostmaster@example.com
//! daemons:
//!   - name: nginx
//!     action: restart
//! ```

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use validator::Validate;

mod error;
mod provision;
mod renewal;
pub mod validate;

pub use certkeeper_common::{DaemonAction, KeyType, ServiceAction};
pub use error::ConfigError;
pub use provision::ProvisionConfig;
pub use renewal::RenewalConfig;

/// Default location of the renewal configuration
pub const DEFAULT_RENEW_CONFIG: &str = "/etc/letsencrypt/renew.yaml";

/// Default location of the provisioning configuration
pub const DEFAULT_SETUP_CONFIG: &str = "/etc/letsencrypt/setup.yaml";

/// Default timeout applied to every external tool invocation
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 600;

/// Read, deserialize and schema-check a YAML configuration file
fn load_yaml<T>(path: &Path) -> Result<T, ConfigError>
where
    T: DeserializeOwned + Validate,
{
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let config: T = serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
        path: path.to_path_buf(),
        source,
    })?;

    config.validate().map_err(|e| ConfigError::Invalid {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    debug!(path = %path.display(), "Configuration parsed and schema-checked");
    Ok(config)
}

/// Turn a validation result into the single startup error, logging warnings
fn finish(path: &Path, result: validate::ValidationResult) -> Result<(), ConfigError> {
    for warning in &result.warnings {
        warn!(path = %path.display(), "{}", warning.message);
    }

    if result.errors.is_empty() {
        return Ok(());
    }

    let message = result
        .errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ");
    Err(ConfigError::Invalid {
        path: path.to_path_buf(),
        message,
    })
}

fn default_tool_timeout_secs() -> u64 {
    DEFAULT_TOOL_TIMEOUT_SECS
}

fn default_certbot() -> String {
    "certbot".to_string()
}
