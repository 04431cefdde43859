//! Remote shell operations
//!
//! Ties the command builder, the transport and the session path together.
//! Every call is one round-trip: validate, build, execute, then update the
//! session only if the operation was a successful change of directory.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::command::{validate_target, CommandRequest, RemoteOperation};
use super::docker::{build_docker_command, DockerOperation};
use super::error::RemoteError;
use super::path::join_session_path;
use super::result::CommandResult;
use super::session::RemoteSession;
use crate::ssh::{RemoteTransport, SshTarget};

/// What one operation did, ready to be shown to the user
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationOutcome {
    pub result: CommandResult,
    pub output: String,
    pub message: Option<String>,
    pub current_path: String,
    pub path_changed: bool,
}

impl OperationOutcome {
    fn new(result: CommandResult, session: &RemoteSession) -> Self {
        Self {
            output: result.render(),
            result,
            message: None,
            current_path: session.current_path().to_string(),
            path_changed: false,
        }
    }
}

pub struct RemoteShell {
    transport: Arc<dyn RemoteTransport>,
    template: SshTarget,
}

impl RemoteShell {
    /// `template` supplies port, auth and timeout; host and principal come
    /// from each session.
    pub fn new(transport: Arc<dyn RemoteTransport>, template: SshTarget) -> Self {
        Self {
            transport,
            template,
        }
    }

    pub fn template(&self) -> &SshTarget {
        &self.template
    }

    /// Run a raw command. Never fails: transport errors become a failed result.
    pub async fn execute(&self, target: &SshTarget, command: &str) -> CommandResult {
        debug!("Executing on {}: {}", target.display_name(), command);

        match self.transport.run(target, command).await {
            Ok(output) => CommandResult::from_exec(command, output),
            Err(e) => {
                warn!("Remote command failed on {}: {}", target.display_name(), e);
                CommandResult::transport_failure(command, &e)
            }
        }
    }

    /// Perform one file-manager operation in the session's current directory
    pub async fn run(
        &self,
        session: &mut RemoteSession,
        operation: RemoteOperation,
        target: Option<&str>,
    ) -> Result<OperationOutcome, RemoteError> {
        if operation == RemoteOperation::ChangeDir {
            return self.change_dir(session, target).await;
        }

        let ssh_target = session.target(&self.template)?;
        let request = CommandRequest::new(operation, target, session.current_path())?;
        let result = self.execute(&ssh_target, &request.build()).await;

        Ok(OperationOutcome::new(result, session))
    }

    /// Try `cd <path>` and move the session there if it worked.
    ///
    /// The path stays unchanged on any failure. A missing-path failure gets
    /// a fixed message; anything else (not a directory, permission denied,
    /// unreachable host) is reported verbatim.
    pub async fn change_dir(
        &self,
        session: &mut RemoteSession,
        target: Option<&str>,
    ) -> Result<OperationOutcome, RemoteError> {
        let ssh_target = session.target(&self.template)?;
        let request = CommandRequest::new(RemoteOperation::ChangeDir, target, session.current_path())?;
        let result = self.execute(&ssh_target, &request.build()).await;

        let mut outcome = OperationOutcome::new(result, session);
        if outcome.result.looks_like_missing_path {
            outcome.message = Some("Directory does not exist.".to_string());
        } else if outcome.result.succeeded {
            let component = request.target.as_deref().unwrap_or_default();
            let new_path = session.enter(component).to_string();
            info!("Remote session on {} moved to {}", ssh_target.display_name(), new_path);

            outcome.message = Some(format!("Changed directory to: {}", new_path));
            outcome.current_path = new_path;
            outcome.path_changed = true;
        } else {
            outcome.message = Some(outcome.output.clone());
        }

        Ok(outcome)
    }

    /// Fetch a file's content for editing; the caller shows `stdout`
    pub async fn open_for_edit(
        &self,
        session: &RemoteSession,
        target: Option<&str>,
    ) -> Result<CommandResult, RemoteError> {
        let ssh_target = session.target(&self.template)?;
        let request = CommandRequest::new(RemoteOperation::EditFile, target, session.current_path())?;
        Ok(self.execute(&ssh_target, &request.build()).await)
    }

    /// Overwrite the remote file with `content`.
    ///
    /// The content is staged in a local temporary file that is removed when
    /// this returns, whether or not the copy succeeded. Returns the remote path.
    pub async fn commit_edit(
        &self,
        session: &RemoteSession,
        target: Option<&str>,
        content: &str,
    ) -> Result<String, RemoteError> {
        let ssh_target = session.target(&self.template)?;
        let component = validate_target(RemoteOperation::EditFile, target)?;
        let remote_path = join_session_path(session.current_path(), component);

        let staged = tempfile::Builder::new().prefix("hub-edit-").tempfile()?;
        tokio::fs::write(staged.path(), content).await?;

        debug!(
            "Uploading {} bytes to {}:{}",
            content.len(),
            ssh_target.display_name(),
            remote_path
        );

        self.transport
            .copy(&ssh_target, staged.path(), &remote_path)
            .await
            .map_err(|e| {
                warn!("Upload to {} failed: {}", remote_path, e);
                RemoteError::Upload(e.to_string())
            })?;

        info!("Updated {} on {}", remote_path, ssh_target.display_name());
        Ok(remote_path)
    }

    /// Run one docker control command; the session path is not used
    pub async fn docker(
        &self,
        session: &RemoteSession,
        operation: DockerOperation,
        name: Option<&str>,
        image: Option<&str>,
    ) -> Result<OperationOutcome, RemoteError> {
        let ssh_target = session.target(&self.template)?;
        let command = build_docker_command(operation, name, image)?;
        let result = self.execute(&ssh_target, &command).await;
        Ok(OperationOutcome::new(result, session))
    }
}
