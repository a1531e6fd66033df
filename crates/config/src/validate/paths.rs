//! Filesystem checks
//!
//! Validates that the directories and files the configuration points at
//! exist before the first external tool is started.

use std::path::Path;

use super::{ErrorCategory, ValidationError, ValidationResult, ValidationWarning};
use crate::{ProvisionConfig, RenewalConfig};

/// Validate renewal paths and daemon entries
pub fn validate_renewal_paths(config: &RenewalConfig) -> ValidationResult {
    let mut result = ValidationResult::new();

    require_dir(&mut result, "certs_root", &config.certs_root);
    warn_missing_dir(&mut result, "www_root", &config.www_root);

    for (index, daemon) in config.daemons.iter().enumerate() {
        let name = daemon.name.trim();
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            result.add_error(ValidationError::new(
                ErrorCategory::Daemon,
                format!(
                    "daemons[{}]: invalid service name {:?}",
                    index, daemon.name
                ),
            ));
        }
    }

    result
}

/// Validate provisioning paths
pub fn validate_provision_paths(config: &ProvisionConfig) -> ValidationResult {
    let mut result = ValidationResult::new();

    require_dir(&mut result, "certs_root", &config.certs_root);
    warn_missing_dir(&mut result, "www_root", &config.www_root);

    if !config.openssl_config.is_file() {
        result.add_error(ValidationError::new(
            ErrorCategory::Path,
            format!(
                "openssl_config: base OpenSSL configuration not found: {}",
                config.openssl_config.display()
            ),
        ));
    }

    result
}

fn require_dir(result: &mut ValidationResult, key: &str, path: &Path) {
    if !path.is_absolute() {
        result.add_error(ValidationError::new(
            ErrorCategory::Path,
            format!("{}: path must be absolute: {}", key, path.display()),
        ));
    } else if !path.is_dir() {
        result.add_error(ValidationError::new(
            ErrorCategory::Path,
            format!("{}: directory not found: {}", key, path.display()),
        ));
    }
}

fn warn_missing_dir(result: &mut ValidationResult, key: &str, path: &Path) {
    if !path.is_dir() {
        result.add_warning(ValidationWarning::new(format!(
            "{}: directory not found: {} (webroot challenges will fail)",
            key,
            path.display()
        )));
    }
}
