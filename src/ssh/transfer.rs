//! File copy over the SFTP subsystem
//!
//! Stands in for `scp <local> <principal>@<host>:<remote>`: the local file is
//! streamed to the remote path, which is created or truncated. Like command
//! execution, the copy opens its own connection and is bounded by the target's
//! timeout.

use std::path::Path;
use std::time::Duration;

use russh::Disconnect;
use russh_sftp::client::SftpSession;
use russh_sftp::protocol::OpenFlags;
use tokio::io::AsyncWriteExt;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::client::SshClient;
use super::config::SshTarget;
use super::error::SshError;

/// Copy `local_path` to `remote_path` on `target`, overwriting unconditionally.
///
/// Returns the number of bytes written.
pub async fn upload_file(
    target: &SshTarget,
    local_path: &Path,
    remote_path: &str,
) -> Result<u64, SshError> {
    let limit = Duration::from_secs(target.timeout_secs);

    match timeout(limit, upload_inner(target, local_path, remote_path)).await {
        Ok(result) => result,
        Err(_) => {
            warn!(
                "Upload of {} timed out after {:?} on {}",
                remote_path,
                limit,
                target.display_name()
            );
            Err(SshError::Timeout(format!(
                "Upload timed out after {} seconds",
                limit.as_secs()
            )))
        }
    }
}

async fn upload_inner(
    target: &SshTarget,
    local_path: &Path,
    remote_path: &str,
) -> Result<u64, SshError> {
    let content = tokio::fs::read(local_path).await?;
    let handle = SshClient::new(target.clone()).connect().await?;

    let channel = handle
        .channel_open_session()
        .await
        .map_err(|e| SshError::Channel(format!("Failed to open SFTP channel: {}", e)))?;
    channel
        .request_subsystem(true, "sftp")
        .await
        .map_err(|e| SshError::Channel(format!("Failed to request SFTP subsystem: {}", e)))?;

    let result = async {
        let sftp = SftpSession::new(channel.into_stream()).await?;
        let resolved = resolve_remote_path(&sftp, remote_path).await?;
        debug!("Writing {} bytes to {}", content.len(), resolved);

        let mut file = sftp
            .open_with_flags(
                &resolved,
                OpenFlags::CREATE | OpenFlags::TRUNCATE | OpenFlags::WRITE,
            )
            .await?;
        file.write_all(&content).await?;
        file.flush().await?;
        file.shutdown().await?;

        if let Err(e) = sftp.close().await {
            debug!("SFTP close error (non-fatal): {}", e);
        }
        Ok::<u64, SshError>(content.len() as u64)
    }
    .await;

    if let Err(e) = handle
        .disconnect(Disconnect::ByApplication, "", "English")
        .await
    {
        debug!("Disconnect error (non-fatal): {}", e);
    }

    if let Ok(bytes) = &result {
        info!("Uploaded {} bytes to {}:{}", bytes, target.display_name(), remote_path);
    }
    result
}

/// SFTP does not expand `~`; resolve it against the login directory
async fn resolve_remote_path(sftp: &SftpSession, path: &str) -> Result<String, SshError> {
    if path != "~" && !path.starts_with("~/") {
        return Ok(path.to_string());
    }

    let home = sftp.canonicalize(".").await?;
    Ok(expand_home(path, &home))
}

fn expand_home(path: &str, home: &str) -> String {
    match path.strip_prefix("~/") {
        Some(rest) => crate::remote::path::join_remote_path(home, rest),
        None if path == "~" => home.to_string(),
        None => path.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("~", "/home/dev"), "/home/dev");
        assert_eq!(expand_home("~/notes.txt", "/home/dev"), "/home/dev/notes.txt");
        assert_eq!(expand_home("~/a/b", "/home/dev/"), "/home/dev/a/b");
        assert_eq!(expand_home("/etc/hosts", "/home/dev"), "/etc/hosts");
    }

    #[tokio::test]
    async fn test_upload_to_silent_server_times_out() {
        let addr = crate::test_support::silent_listener().await;
        let mut target = SshTarget::new("127.0.0.1", "nobody");
        target.port = addr.port();
        target.timeout_secs = 1;

        let staged = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(staged.path(), "edited\n").unwrap();

        let started = std::time::Instant::now();
        let err = upload_file(&target, staged.path(), "~/notes.txt")
            .await
            .unwrap_err();

        assert!(err.is_timeout(), "unexpected error: {}", err);
        assert_eq!(err.to_string(), "Upload timed out after 1 seconds");
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_missing_local_file_fails_before_connecting() {
        let target = SshTarget::new("127.0.0.1", "nobody");
        let err = upload_file(&target, Path::new("/nonexistent/staged.txt"), "~/x")
            .await
            .unwrap_err();
        assert!(matches!(err, SshError::Io(_)));
    }
}
