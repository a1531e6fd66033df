use async_trait::async_trait;
use tracing::info;

use certkeeper_common::DaemonAction;

use super::{ServiceManager, ToolRunner};
use crate::error::ToolError;

/// Service control through `systemctl <action> <name>`
#[derive(Debug, Clone)]
pub struct Systemctl {
    program: String,
    runner: ToolRunner,
}

impl Systemctl {
    pub fn new(program: impl Into<String>, runner: ToolRunner) -> Self {
        Self {
            program: program.into(),
            runner,
        }
    }
}

#[async_trait]
impl ServiceManager for Systemctl {
    async fn apply(&self, daemon: &DaemonAction) -> Result<(), ToolError> {
        info!(service = %daemon.name, action = %daemon.action, "Applying service action");
        self.runner
            .run(&self.program, [daemon.action.as_str(), daemon.name.as_str()])
            .await
    }
}
