//! Configuration linting
//!
//! Flags settings that are legal but unlikely to be what the operator wants.

use super::{ValidationResult, ValidationWarning};
use crate::{ProvisionConfig, RenewalConfig};

/// Let's Encrypt certificates live 90 days
const CERTIFICATE_LIFETIME_DAYS: u32 = 90;

/// Lint renewal configuration
pub fn lint_renewal(config: &RenewalConfig) -> ValidationResult {
    let mut result = ValidationResult::new();

    if config.daemons.is_empty() {
        result.add_warning(ValidationWarning::new(
            "No daemons configured: renewed certificates will not be picked up until services restart",
        ));
    }

    if config.threshold >= CERTIFICATE_LIFETIME_DAYS {
        result.add_warning(ValidationWarning::new(format!(
            "threshold of {} days is not below the {}-day certificate lifetime: every run will renew",
            config.threshold, CERTIFICATE_LIFETIME_DAYS
        )));
    } else if config.threshold == 0 {
        result.add_warning(ValidationWarning::new(
            "threshold of 0 days renews only certificates that already expired",
        ));
    }

    let mut seen = std::collections::HashSet::new();
    for daemon in &config.daemons {
        if !seen.insert((&daemon.name, daemon.action)) {
            result.add_warning(ValidationWarning::new(format!(
                "Daemon entry '{}' is listed more than once",
                daemon
            )));
        }
    }

    result
}

/// Lint provisioning configuration
pub fn lint_provision(config: &ProvisionConfig) -> ValidationResult {
    let mut result = ValidationResult::new();

    if config.tool_timeout_secs < 30 {
        result.add_warning(ValidationWarning::new(format!(
            "tool_timeout_secs of {} is short for a webroot challenge round-trip",
            config.tool_timeout_secs
        )));
    }

    result
}
