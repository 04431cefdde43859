//! Per-browser-session remote state

use serde::Serialize;

use super::error::RemoteError;
use super::path::join_session_path;
use crate::ssh::SshTarget;

pub const HOME_PATH: &str = "~";

/// Which host the browser is talking to, and where it currently is.
///
/// `current_path` starts at `~` and changes only through
/// [`RemoteSession::enter`], which the shell calls after a successful
/// `cd` into the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSession {
    pub host: String,
    pub principal: String,
    current_path: String,
}

impl Default for RemoteSession {
    fn default() -> Self {
        Self {
            host: String::new(),
            principal: String::new(),
            current_path: HOME_PATH.to_string(),
        }
    }
}

impl RemoteSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_path(&self) -> &str {
        &self.current_path
    }

    pub fn is_connected(&self) -> bool {
        !self.host.is_empty() && !self.principal.is_empty()
    }

    /// Point the session at `principal@host`.
    ///
    /// Switching to a different host or login resets the path to `~`; the old
    /// path means nothing on the new machine.
    pub fn retarget(&mut self, host: &str, principal: &str) -> Result<(), RemoteError> {
        let host = host.trim();
        let principal = principal.trim();
        if host.is_empty() || principal.is_empty() {
            return Err(RemoteError::MissingConnection);
        }

        if host != self.host || principal != self.principal {
            self.host = host.to_string();
            self.principal = principal.to_string();
            self.current_path = HOME_PATH.to_string();
        }
        Ok(())
    }

    /// Build the SSH target for this session from the configured defaults
    pub fn target(&self, template: &SshTarget) -> Result<SshTarget, RemoteError> {
        if !self.is_connected() {
            return Err(RemoteError::MissingConnection);
        }
        Ok(SshTarget {
            host: self.host.clone(),
            principal: self.principal.clone(),
            ..template.clone()
        })
    }

    pub(crate) fn enter(&mut self, component: &str) -> &str {
        self.current_path = join_session_path(&self.current_path, component);
        &self.current_path
    }
}
