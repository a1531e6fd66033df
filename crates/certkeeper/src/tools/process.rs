//! Bounded child process execution.

use std::ffi::{OsStr, OsString};
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::error::ToolError;

/// Runs external tools with a timeout.
///
/// The child is spawned with `kill_on_drop`, so a timeout, or the caller
/// dropping the future (Ctrl-C), terminates it.
#[derive(Debug, Clone)]
pub struct ToolRunner {
    timeout: Duration,
}

impl ToolRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run `program` with `args`, succeeding only on exit status 0
    pub async fn run<I, S>(&self, program: &str, args: I) -> Result<(), ToolError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<OsString> = args.into_iter().map(|a| a.as_ref().to_os_string()).collect();
        let rendered = render(program, &args);

        debug!(command = %rendered, "Running external command");
        let start = Instant::now();

        let mut command = Command::new(program);
        command
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = match timeout(self.timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(source)) => {
                return Err(ToolError::Spawn {
                    program: program.to_string(),
                    source,
                });
            }
            Err(_) => {
                warn!(
                    command = %rendered,
                    timeout_secs = self.timeout.as_secs(),
                    "External command timed out, killed"
                );
                return Err(ToolError::Timeout {
                    program: program.to_string(),
                    timeout: self.timeout,
                });
            }
        };

        debug!(
            command = %rendered,
            exit_code = ?output.status.code(),
            elapsed_ms = start.elapsed().as_millis(),
            "External command finished"
        );

        if output.status.success() {
            Ok(())
        } else {
            Err(ToolError::Failed {
                program: program.to_string(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

/// Shell-like rendering of a command line for logs
fn render(program: &str, args: &[OsString]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        line.push_str(&arg.to_string_lossy());
    }
    line
}
