//! Command builder for the remote shell tool
//!
//! Operations form a closed set. The user-supplied target is validated and
//! single-quoted; the session path is quoted with its leading `~` left bare.

use serde::{Deserialize, Serialize};

use super::error::RemoteError;
use super::path::{join_session_path, quote_remote_path, shell_escape};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RemoteOperation {
    Pwd,
    List,
    Read,
    ChangeDir,
    Mkdir,
    CreateFile,
    EditFile,
    RemoveFile,
    RemoveDir,
}

impl RemoteOperation {
    pub const ALL: [RemoteOperation; 9] = [
        RemoteOperation::Pwd,
        RemoteOperation::List,
        RemoteOperation::ChangeDir,
        RemoteOperation::Mkdir,
        RemoteOperation::CreateFile,
        RemoteOperation::EditFile,
        RemoteOperation::Read,
        RemoteOperation::RemoveFile,
        RemoteOperation::RemoveDir,
    ];

    /// Menu label shown by the dashboard
    pub fn label(self) -> &'static str {
        match self {
            RemoteOperation::Pwd => "Know Current Directory",
            RemoteOperation::List => "List Files & Directories",
            RemoteOperation::Read => "Read File",
            RemoteOperation::ChangeDir => "Change Directory",
            RemoteOperation::Mkdir => "Create Directory",
            RemoteOperation::CreateFile => "Create File",
            RemoteOperation::EditFile => "Edit File",
            RemoteOperation::RemoveFile => "Remove File",
            RemoteOperation::RemoveDir => "Remove Directory",
        }
    }

    pub fn requires_target(self) -> bool {
        !matches!(self, RemoteOperation::Pwd | RemoteOperation::List)
    }
}

/// One shell operation against the session's working directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    pub operation: RemoteOperation,
    pub target: Option<String>,
    pub base_path: String,
}

impl CommandRequest {
    /// Validate `target` for `operation` and capture the base path.
    ///
    /// The target is ignored for operations that take none.
    pub fn new(
        operation: RemoteOperation,
        target: Option<&str>,
        base_path: &str,
    ) -> Result<Self, RemoteError> {
        let target = if operation.requires_target() {
            Some(validate_target(operation, target)?.to_string())
        } else {
            None
        };

        Ok(Self {
            operation,
            target,
            base_path: base_path.to_string(),
        })
    }

    /// Path the operation refers to: `join(base, target)`, or the base itself
    pub fn target_path(&self) -> String {
        match &self.target {
            Some(target) => join_session_path(&self.base_path, target),
            None => self.base_path.clone(),
        }
    }

    /// Render the exact command string sent to the remote shell.
    ///
    /// For `ChangeDir` this is only the `cd` check; the session is not touched.
    pub fn build(&self) -> String {
        let base = quote_remote_path(&self.base_path);
        let target = self.target.as_deref().map(shell_escape).unwrap_or_default();

        match self.operation {
            RemoteOperation::Pwd => format!("cd {} && pwd", base),
            RemoteOperation::List => format!("cd {} && ls -l", base),
            RemoteOperation::Read | RemoteOperation::EditFile => {
                format!("cat {}", quote_remote_path(&self.target_path()))
            }
            RemoteOperation::ChangeDir => format!("cd {}", quote_remote_path(&self.target_path())),
            RemoteOperation::Mkdir => format!("cd {} && mkdir {}", base, target),
            RemoteOperation::CreateFile => format!("cd {} && touch {}", base, target),
            RemoteOperation::RemoveFile => format!("cd {} && rm -f {}", base, target),
            RemoteOperation::RemoveDir => format!("cd {} && rmdir {}", base, target),
        }
    }
}

/// Check a user-supplied name or path component.
///
/// Surrounding whitespace is trimmed. Control characters are rejected, and so
/// is a leading `-` which the remote tools would parse as an option.
pub fn validate_target(
    operation: RemoteOperation,
    target: Option<&str>,
) -> Result<&str, RemoteError> {
    let target = target.map(str::trim).unwrap_or_default();

    if target.is_empty() {
        return Err(RemoteError::MissingTarget {
            operation: operation.label(),
        });
    }
    if target.chars().any(char::is_control) {
        return Err(RemoteError::InvalidTarget(
            "control characters are not allowed".to_string(),
        ));
    }
    if target.starts_with('-') {
        return Err(RemoteError::InvalidTarget(format!(
            "'{}' must not start with '-'",
            target
        )));
    }

    Ok(target)
}
