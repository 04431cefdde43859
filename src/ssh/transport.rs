//! Transport seam between the remote-shell logic and the wire
//!
//! The remote tools only need two things from a host: run a command, and copy
//! a local file onto it. [`SshTransport`] provides both over russh; tests
//! substitute an in-memory implementation.

use std::path::Path;

use async_trait::async_trait;

use super::config::SshTarget;
use super::error::SshError;
use super::exec::{exec_command, ExecOutput};
use super::transfer::upload_file;

#[async_trait]
pub trait RemoteTransport: Send + Sync {
    /// Run one command, bounded by `target.timeout_secs`
    async fn run(&self, target: &SshTarget, command: &str) -> Result<ExecOutput, SshError>;

    /// Copy a local file to `remote_path`, bounded by `target.timeout_secs`
    async fn copy(
        &self,
        target: &SshTarget,
        local_path: &Path,
        remote_path: &str,
    ) -> Result<(), SshError>;
}

/// russh-backed transport; stateless, one connection per call
#[derive(Debug, Default, Clone, Copy)]
pub struct SshTransport;

#[async_trait]
impl RemoteTransport for SshTransport {
    async fn run(&self, target: &SshTarget, command: &str) -> Result<ExecOutput, SshError> {
        exec_command(target, command).await
    }

    async fn copy(
        &self,
        target: &SshTarget,
        local_path: &Path,
        remote_path: &str,
    ) -> Result<(), SshError> {
        upload_file(target, local_path, remote_path).await.map(|_| ())
    }
}
