//! One-shot command execution over an SSH exec channel
//!
//! Every call opens its own authenticated connection, runs exactly one command
//! and disconnects. The whole sequence (connect, auth, exec, drain) is bounded
//! by the target's timeout.

use std::time::Duration;

use russh::client::Handle;
use russh::{ChannelMsg, Disconnect};
use tokio::time::timeout;
use tracing::{debug, warn};

use super::client::{ClientHandler, SshClient};
use super::config::SshTarget;
use super::error::SshError;

/// Raw output of a remote process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    pub exit_code: Option<u32>,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Run `command` on `target` and collect its output
pub async fn exec_command(target: &SshTarget, command: &str) -> Result<ExecOutput, SshError> {
    let limit = Duration::from_secs(target.timeout_secs);

    match timeout(limit, exec_inner(target, command)).await {
        Ok(result) => result,
        Err(_) => {
            warn!(
                "Remote command timed out after {:?} on {}",
                limit,
                target.display_name()
            );
            Err(SshError::Timeout(format!(
                "Command timed out after {} seconds",
                limit.as_secs()
            )))
        }
    }
}

async fn exec_inner(target: &SshTarget, command: &str) -> Result<ExecOutput, SshError> {
    let handle = SshClient::new(target.clone()).connect().await?;

    let result = run_on_handle(&handle, command).await;

    if let Err(e) = handle
        .disconnect(Disconnect::ByApplication, "", "English")
        .await
    {
        debug!("Disconnect error (non-fatal): {}", e);
    }

    result
}

async fn run_on_handle(
    handle: &Handle<ClientHandler>,
    command: &str,
) -> Result<ExecOutput, SshError> {
    let mut channel = handle
        .channel_open_session()
        .await
        .map_err(|e| SshError::Channel(format!("Failed to open exec channel: {}", e)))?;

    debug!("Remote exec: {}", command);

    channel
        .exec(true, command)
        .await
        .map_err(|e| SshError::Channel(format!("Failed to execute command: {}", e)))?;

    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let mut exit_code: Option<u32> = None;

    // Exit status usually arrives after EOF, so drain until Close
    loop {
        match channel.wait().await {
            Some(ChannelMsg::Data { data }) => stdout.extend_from_slice(&data),
            Some(ChannelMsg::ExtendedData { data, ext: 1 }) => stderr.extend_from_slice(&data),
            Some(ChannelMsg::ExitStatus { exit_status }) => exit_code = Some(exit_status),
            Some(ChannelMsg::Close) | None => break,
            Some(_) => {}
        }
    }

    let output = ExecOutput {
        exit_code,
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
    };

    debug!(
        "Remote exec completed: exit={:?} stdout_len={} stderr_len={}",
        output.exit_code,
        output.stdout.len(),
        output.stderr.len()
    );

    Ok(output)
}
