//! Remote Linux and Docker tools
//!
//! # Layout
//! - `command`: closed set of file-manager operations and their shell form
//! - `docker`: fixed docker vocabulary
//! - `session`: per-browser host, login and working directory
//! - `shell`: executes operations and applies directory changes
//! - `result`: captured output and the missing-path check

mod command;
mod docker;
mod error;
pub mod path;
mod result;
mod session;
mod shell;

pub use command::{validate_target, CommandRequest, RemoteOperation};
pub use docker::{build_docker_command, DockerOperation, DockerRequest};
pub use error::RemoteError;
pub use result::{CommandResult, MISSING_PATH_SIGNATURE};
pub use session::{RemoteSession, HOME_PATH};
pub use shell::{OperationOutcome, RemoteShell};
