use tracing::{info, warn};

use crate::cloud::RemoteExecutor;
use crate::config::PollSettings;
use crate::error::{Error, Result};
use crate::poll::{poll_until, PollState};

/// Captured output of a remote command that finished successfully
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs shell commands on one host and waits for them to finish
pub struct RemoteCommandChannel<'a> {
    executor: &'a dyn RemoteExecutor,
    polling: PollSettings,
}

impl<'a> RemoteCommandChannel<'a> {
    pub fn new(executor: &'a dyn RemoteExecutor, polling: PollSettings) -> Self {
        Self { executor, polling }
    }

    /// Submit `command` once and poll its invocation to a terminal state
    ///
    /// Cancelled, timed out and failed invocations become
    /// [`Error::CommandFailed`] and are never resubmitted.
    pub fn execute(&self, host_id: &str, command: &str) -> Result<CommandOutput> {
        info!("Executing {}", command);
        let invocation_id = self.executor.send_command(host_id, command)?;
        self.wait(host_id, &invocation_id, command)
    }

    /// Poll an already submitted invocation until it is terminal
    ///
    /// A terminal invocation keeps its outcome, so waiting on it again
    /// yields the same result without submitting anything.
    pub fn wait(
        &self,
        host_id: &str,
        invocation_id: &str,
        command: &str,
    ) -> Result<CommandOutput> {
        let operation = format!("command '{}' on {}", command, host_id);
        let outcome = poll_until(&self.polling, &operation, || {
            let invocation = self.executor.get_invocation(invocation_id, host_id)?;
            if invocation.status.is_terminal() {
                Ok(PollState::Ready(invocation))
            } else {
                Ok(PollState::Pending(invocation.status.to_string()))
            }
        })?;

        if outcome.status.is_failure() {
            warn!(status = %outcome.status, "Failed to execute {}", command);
            return Err(Error::CommandFailed {
                command: command.to_string(),
                status: outcome.status.to_string(),
                detail: outcome.status_detail,
                stdout: outcome.stdout,
                stderr: outcome.stderr,
            });
        }

        info!("Done: {}", command);
        Ok(CommandOutput {
            stdout: outcome.stdout,
            stderr: outcome.stderr,
        })
    }
}
