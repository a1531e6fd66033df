//! Semantic validation beyond the schema
//!
//! The derive-based schema check catches malformed values; the checks here
//! look at the filesystem and at combinations of values. Errors abort
//! startup, warnings are logged.

mod lint;
mod paths;

pub use lint::{lint_provision, lint_renewal};
pub use paths::{validate_provision_paths, validate_renewal_paths};

use std::fmt;

use crate::{ProvisionConfig, RenewalConfig};

/// Category of a validation error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// A required file or directory is missing or of the wrong kind
    Path,
    /// A daemon entry cannot be executed
    Daemon,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Path => f.write_str("path"),
            ErrorCategory::Daemon => f.write_str("daemon"),
        }
    }
}

/// A problem that prevents the configuration from being used
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub category: ErrorCategory,
    pub message: String,
}

impl ValidationError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.category, self.message)
    }
}

/// A suspicious but usable setting
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub message: String,
}

impl ValidationWarning {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Accumulated outcome of all checks
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Run every renewal check
pub fn check_renewal(config: &RenewalConfig) -> ValidationResult {
    let mut result = validate_renewal_paths(config);
    result.merge(lint_renewal(config));
    result
}

/// Run every provisioning check
pub fn check_provision(config: &ProvisionConfig) -> ValidationResult {
    let mut result = validate_provision_paths(config);
    result.merge(lint_provision(config));
    result
}
