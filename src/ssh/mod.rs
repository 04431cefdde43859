//! SSH module - one-shot remote execution and file copy
//!
//! # Features
//! - Password, key file, agent and `ssh`-style default authentication
//! - Host key verification via ~/.ssh/known_hosts
//! - Exec channel with captured stdout/stderr/exit status
//! - SFTP upload for the edit round-trip
//!
//! Connections are never pooled: each call connects, does one thing and
//! disconnects.

mod client;
mod config;
mod error;
mod exec;
pub mod known_hosts;
mod transfer;
mod transport;

pub use client::{ClientHandler, SshClient};
pub use config::{AuthMethod, SshTarget, DEFAULT_TIMEOUT_SECS};
pub use error::SshError;
pub use exec::{exec_command, ExecOutput};
pub use known_hosts::{get_known_hosts, HostKeyVerification, KnownHostsStore};
pub use transfer::upload_file;
pub use transport::{RemoteTransport, SshTransport};
