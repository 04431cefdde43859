//! Errors raised while talking to a remote host

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SshError {
    /// TCP connect or SSH handshake did not complete
    #[error("Could not connect: {0}")]
    Connect(String),

    /// The server key is unknown in strict mode or differs from known_hosts
    #[error("Host key rejected: {0}")]
    HostKey(String),

    /// Every credential was refused
    #[error("Login refused: {0}")]
    Auth(String),

    #[error("Could not load private key: {0}")]
    Key(String),

    #[error("ssh-agent: {0}")]
    Agent(String),

    #[error("Channel error: {0}")]
    Channel(String),

    #[error("File copy failed: {0}")]
    Transfer(String),

    /// The whole call ran past the target's time limit
    #[error("{0}")]
    Timeout(String),

    #[error("SSH protocol error: {0}")]
    Protocol(String),

    #[error("Local IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SshError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, SshError::Timeout(_))
    }
}

impl From<russh::Error> for SshError {
    fn from(err: russh::Error) -> Self {
        SshError::Protocol(err.to_string())
    }
}

impl From<russh::keys::Error> for SshError {
    fn from(err: russh::keys::Error) -> Self {
        SshError::Key(err.to_string())
    }
}

impl From<russh_sftp::client::error::Error> for SshError {
    fn from(err: russh_sftp::client::error::Error) -> Self {
        SshError::Transfer(err.to_string())
    }
}
