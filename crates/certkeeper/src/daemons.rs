//! Daemon restart coordination.
//!
//! After a batch issued at least one certificate, every configured service
//! is told to pick up the new files. Entries run in configuration order and
//! a failing entry never stops the ones after it.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use certkeeper_common::{DaemonAction, ServiceAction};

use crate::tools::ServiceManager;

/// Result of one daemon action
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DaemonOutcome {
    pub name: String,
    pub action: ServiceAction,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Applies the daemon list through a [`ServiceManager`]
pub struct DaemonCoordinator {
    manager: Arc<dyn ServiceManager>,
}

impl DaemonCoordinator {
    pub fn new(manager: Arc<dyn ServiceManager>) -> Self {
        Self { manager }
    }

    /// Apply every entry in order and record each outcome
    pub async fn restart_all(&self, daemons: &[DaemonAction]) -> Vec<DaemonOutcome> {
        let start = Instant::now();
        info!(count = daemons.len(), "Restarting daemons");

        let mut outcomes = Vec::with_capacity(daemons.len());
        for daemon in daemons {
            let outcome = match self.manager.apply(daemon).await {
                Ok(()) => {
                    debug!(service = %daemon.name, action = %daemon.action, "Daemon action applied");
                    DaemonOutcome {
                        name: daemon.name.clone(),
                        action: daemon.action,
                        success: true,
                        error: None,
                    }
                }
                Err(e) => {
                    warn!(
                        service = %daemon.name,
                        action = %daemon.action,
                        error = %e,
                        "Daemon action failed"
                    );
                    DaemonOutcome {
                        name: daemon.name.clone(),
                        action: daemon.action,
                        success: false,
                        error: Some(e.to_string()),
                    }
                }
            };
            outcomes.push(outcome);
        }

        let failed = outcomes.iter().filter(|o| !o.success).count();
        info!(
            applied = outcomes.len() - failed,
            failed,
            elapsed_ms = start.elapsed().as_millis(),
            "Daemon restarts complete"
        );
        outcomes
    }
}
