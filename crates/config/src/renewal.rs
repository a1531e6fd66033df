//! Renewal tool configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use certkeeper_common::DaemonAction;

use crate::{default_certbot, default_tool_timeout_secs, finish, load_yaml, validate, ConfigError};

/// File name of the run lock when `lock_file` is not configured
const DEFAULT_LOCK_NAME: &str = ".certkeeper.lock";

/// Configuration of the periodic renewal run
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RenewalConfig {
    /// Directory holding one sub-directory per site
    pub certs_root: PathBuf,

    /// Base of the webroots, laid out as `<www_root>/<owner>/<site>`
    pub www_root: PathBuf,

    /// Renew when a certificate expires within this many days
    #[validate(range(max = 365))]
    pub threshold: u32,

    /// Contact address passed to the CA
    #[validate(email)]
    pub admin_email: String,

    /// Services to act on, in order, after at least one renewal
    pub daemons: Vec<DaemonAction>,

    /// Upper bound for every external tool invocation
    #[serde(default = "default_tool_timeout_secs")]
    #[validate(range(min = 1))]
    pub tool_timeout_secs: u64,

    /// Advisory lock guarding overlapping runs
    #[serde(default)]
    pub lock_file: Option<PathBuf>,

    /// certbot executable
    #[serde(default = "default_certbot")]
    #[validate(length(min = 1))]
    pub certbot: String,

    /// systemctl executable
    #[serde(default = "default_systemctl")]
    #[validate(length(min = 1))]
    pub systemctl: String,
}

fn default_systemctl() -> String {
    "systemctl".to_string()
}

impl RenewalConfig {
    /// Load and validate a renewal configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config: RenewalConfig = load_yaml(path)?;
        finish(path, validate::check_renewal(&config))?;

        info!(
            path = %path.display(),
            certs_root = %config.certs_root.display(),
            threshold_days = config.threshold,
            daemon_count = config.daemons.len(),
            "Loaded renewal configuration"
        );
        Ok(config)
    }

    /// Timeout for a single external tool call
    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    /// Path of the advisory run lock
    pub fn lock_path(&self) -> PathBuf {
        self.lock_file
            .clone()
            .unwrap_or_else(|| self.certs_root.join(DEFAULT_LOCK_NAME))
    }
}
