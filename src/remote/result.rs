//! Command results and their rendering

use serde::Serialize;

use crate::ssh::{ExecOutput, SshError};

/// Substring the remote tools print when a path is absent
pub const MISSING_PATH_SIGNATURE: &str = "No such file or directory";

/// Outcome of one remote command.
///
/// Transport failures are folded in with `succeeded = false` and the error
/// text in `stderr`, so callers render both kinds the same way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult {
    pub command: String,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<u32>,
    pub succeeded: bool,
    pub looks_like_missing_path: bool,
}

impl CommandResult {
    pub fn from_exec(command: impl Into<String>, output: ExecOutput) -> Self {
        let succeeded = output.success();
        let looks_like_missing_path = !succeeded
            && (output.stderr.contains(MISSING_PATH_SIGNATURE)
                || output.stdout.contains(MISSING_PATH_SIGNATURE));

        Self {
            command: command.into(),
            stdout: output.stdout,
            stderr: output.stderr,
            exit_code: output.exit_code,
            succeeded,
            looks_like_missing_path,
        }
    }

    pub fn transport_failure(command: impl Into<String>, error: &SshError) -> Self {
        let stderr = error.to_string();
        Self {
            command: command.into(),
            looks_like_missing_path: stderr.contains(MISSING_PATH_SIGNATURE),
            stdout: String::new(),
            stderr,
            exit_code: None,
            succeeded: false,
        }
    }

    /// Text the user should see: stdout on success, otherwise the error text
    pub fn output(&self) -> &str {
        if self.succeeded || self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        }
    }

    /// Display form with terminal escape sequences removed
    pub fn render(&self) -> String {
        strip_ansi_escapes::strip_str(self.output())
    }
}
