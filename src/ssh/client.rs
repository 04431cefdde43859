//! Connecting and logging in with russh
//!
//! [`SshClient::connect`] turns the target's [`AuthMethod`] into an ordered
//! list of credentials and offers them one by one. `AuthMethod::Default`
//! mirrors the `ssh` binary: ssh-agent keys first, then the unencrypted
//! identities in `~/.ssh`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use russh::client::{self, Handle};
use russh::keys::key::PrivateKeyWithHashAlg;
use russh::keys::PublicKey;
use tracing::{debug, info, warn};

use super::config::{AuthMethod, SshTarget};
use super::error::SshError;
use super::known_hosts::{get_known_hosts, HostKeyVerification};

/// Identity files tried by [`AuthMethod::Default`], in `ssh` order
const DEFAULT_IDENTITIES: &[&str] = &["id_ed25519", "id_ecdsa", "id_rsa"];

/// One thing offered to the server during login
#[derive(Debug, Clone, PartialEq, Eq)]
enum Credential {
    Password(String),
    KeyFile {
        path: PathBuf,
        passphrase: Option<String>,
    },
    Agent,
}

impl Credential {
    fn describe(&self) -> String {
        match self {
            Credential::Password(_) => "password".to_string(),
            Credential::KeyFile { path, .. } => format!("key {}", path.display()),
            Credential::Agent => "ssh-agent".to_string(),
        }
    }
}

/// Expand `auth` into the credentials to offer, in order.
///
/// `agent_advertised` is whether `SSH_AUTH_SOCK` is set; `ssh_dir` is where
/// the default identities are looked up.
fn credential_plan(auth: &AuthMethod, agent_advertised: bool, ssh_dir: &Path) -> Vec<Credential> {
    match auth {
        AuthMethod::Password { password } => vec![Credential::Password(password.clone())],
        AuthMethod::Key {
            key_path,
            passphrase,
        } => vec![Credential::KeyFile {
            path: PathBuf::from(key_path),
            passphrase: passphrase.clone(),
        }],
        AuthMethod::Agent => vec![Credential::Agent],
        AuthMethod::Default => {
            let mut plan = Vec::new();
            if agent_advertised {
                plan.push(Credential::Agent);
            }
            plan.extend(
                DEFAULT_IDENTITIES
                    .iter()
                    .map(|name| ssh_dir.join(name))
                    .filter(|path| path.is_file())
                    .map(|path| Credential::KeyFile {
                        path,
                        passphrase: None,
                    }),
            );
            plan
        }
    }
}

/// SSH client for one target
pub struct SshClient {
    target: SshTarget,
}

impl SshClient {
    pub fn new(target: SshTarget) -> Self {
        Self { target }
    }

    /// Connect and authenticate, returning the live handle.
    ///
    /// The caller owns the handle for exactly one operation and is expected to
    /// disconnect it afterwards; nothing is pooled. No timeout is applied here:
    /// callers bound the whole call.
    pub async fn connect(self) -> Result<Handle<ClientHandler>, SshError> {
        let target = &self.target;
        info!("Connecting to SSH server at {}", target.display_name());

        let handler = ClientHandler::new(
            target.host.clone(),
            target.port,
            target.strict_host_key_checking,
        );

        let mut handle = client::connect(
            Arc::new(client::Config::default()),
            (target.host.as_str(), target.port),
            handler,
        )
        .await
        .map_err(|e| match e {
            SshError::Connect(_) | SshError::HostKey(_) => e,
            other => SshError::Connect(other.to_string()),
        })?;

        debug!("SSH handshake completed");

        let ssh_dir = dirs::home_dir()
            .map(|h| h.join(".ssh"))
            .unwrap_or_else(|| PathBuf::from("~/.ssh"));
        let agent_advertised = std::env::var_os("SSH_AUTH_SOCK").is_some();
        let plan = credential_plan(&target.auth, agent_advertised, &ssh_dir);
        login(&mut handle, &target.principal, &plan, target.auth.is_fallback()).await?;

        info!("SSH authentication successful for {}", target.display_name());
        Ok(handle)
    }
}

/// Offer each credential until one is accepted.
///
/// With `fallback` set, a credential that cannot even be tried (unreadable
/// key, no agent) is skipped; otherwise its error is returned as is.
async fn login(
    handle: &mut Handle<ClientHandler>,
    principal: &str,
    plan: &[Credential],
    fallback: bool,
) -> Result<(), SshError> {
    if plan.is_empty() {
        return Err(SshError::Auth(
            "no ssh-agent and no default identity in ~/.ssh".to_string(),
        ));
    }

    let mut refused = Vec::new();
    for credential in plan {
        match offer(handle, principal, credential).await {
            Ok(true) => {
                debug!("Accepted {}", credential.describe());
                return Ok(());
            }
            Ok(false) => refused.push(credential.describe()),
            Err(e) if fallback => {
                debug!("Skipping {}: {}", credential.describe(), e);
                refused.push(format!("{} ({})", credential.describe(), e));
            }
            Err(e) => return Err(e),
        }
    }

    Err(SshError::Auth(format!(
        "{} refused {}",
        principal,
        refused.join(", ")
    )))
}

async fn offer(
    handle: &mut Handle<ClientHandler>,
    principal: &str,
    credential: &Credential,
) -> Result<bool, SshError> {
    match credential {
        Credential::Password(password) => Ok(handle
            .authenticate_password(principal, password)
            .await
            .map_err(|e| SshError::Auth(e.to_string()))?
            .success()),
        Credential::KeyFile { path, passphrase } => {
            let key = russh::keys::load_secret_key(path, passphrase.as_deref())
                .map_err(|e| SshError::Key(format!("{}: {}", path.display(), e)))?;
            let key = PrivateKeyWithHashAlg::new(Arc::new(key), None);
            Ok(handle
                .authenticate_publickey(principal, key)
                .await
                .map_err(|e| SshError::Auth(e.to_string()))?
                .success())
        }
        Credential::Agent => agent::offer_agent_keys(handle, principal).await,
    }
}

#[cfg(unix)]
mod agent {
    use std::future::Future;

    use russh::client::Handle;
    use russh::keys::agent::client::AgentClient;
    use russh::keys::ssh_key;
    use russh::{AgentAuthError, CryptoVec, Signer};
    use tokio::net::UnixStream;
    use tracing::{debug, warn};

    use super::{ClientHandler, SshError};

    /// Forwards sign requests to the agent.
    ///
    /// The key is cloned into the future so it does not borrow the request
    /// across the await, which keeps the future `Send`.
    struct AgentKeySigner<'a> {
        agent: &'a mut AgentClient<UnixStream>,
    }

    impl Signer for AgentKeySigner<'_> {
        type Error = AgentAuthError;

        fn auth_publickey_sign(
            &mut self,
            key: &ssh_key::PublicKey,
            hash_alg: Option<ssh_key::HashAlg>,
            to_sign: CryptoVec,
        ) -> impl Future<Output = Result<CryptoVec, Self::Error>> + Send {
            let key = key.clone();
            async move {
                Ok(self.agent.sign_request(&key, hash_alg, to_sign).await?)
            }
        }
    }

    /// Offer every key the agent holds; true once the server accepts one
    pub(super) async fn offer_agent_keys(
        handle: &mut Handle<ClientHandler>,
        principal: &str,
    ) -> Result<bool, SshError> {
        let mut agent = AgentClient::connect_env()
            .await
            .map_err(|e| SshError::Agent(format!("cannot reach SSH_AUTH_SOCK: {}", e)))?;
        let keys = agent
            .request_identities()
            .await
            .map_err(|e| SshError::Agent(format!("cannot list keys: {}", e)))?;
        debug!("ssh-agent holds {} key(s)", keys.len());

        for key in keys {
            let comment = key.comment().to_string();
            let mut signer = AgentKeySigner { agent: &mut agent };
            match handle
                .authenticate_publickey_with(principal, key, None, &mut signer)
                .await
            {
                Ok(result) if result.success() => return Ok(true),
                Ok(_) => debug!("Server refused agent key {}", comment),
                Err(e) => warn!("ssh-agent could not sign with {}: {}", comment, e),
            }
        }
        Ok(false)
    }
}

#[cfg(not(unix))]
mod agent {
    use russh::client::Handle;

    use super::{ClientHandler, SshError};

    pub(super) async fn offer_agent_keys(
        _handle: &mut Handle<ClientHandler>,
        _principal: &str,
    ) -> Result<bool, SshError> {
        Err(SshError::Agent(
            "only Unix agent sockets are supported".to_string(),
        ))
    }
}

/// Client handler for russh callbacks
///
/// Verifies the server key against ~/.ssh/known_hosts.
pub struct ClientHandler {
    host: String,
    port: u16,
    /// - true: reject unknown keys
    /// - false: auto-accept and save unknown keys (still reject changed)
    strict: bool,
}

impl ClientHandler {
    pub fn new(host: String, port: u16, strict: bool) -> Self {
        Self { host, port, strict }
    }
}

impl client::Handler for ClientHandler {
    type Error = SshError;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        let known_hosts = get_known_hosts();

        match known_hosts.verify(&self.host, self.port, server_public_key) {
            HostKeyVerification::Verified => {
                debug!("Host key verified for {}:{}", self.host, self.port);
                Ok(true)
            }
            HostKeyVerification::Unknown { fingerprint } => {
                if self.strict {
                    warn!(
                        "Unknown host key for {}:{} (fingerprint: {}). Strict mode enabled, rejecting.",
                        self.host, self.port, fingerprint
                    );
                    return Err(SshError::HostKey(format!(
                        "Host key verification failed: unknown host {}:{}. Fingerprint: {}. \
                         Add to known_hosts or disable strict mode.",
                        self.host, self.port, fingerprint
                    )));
                }

                info!(
                    "New host {}:{}, auto-adding to known_hosts (fingerprint: {})",
                    self.host, self.port, fingerprint
                );
                if let Err(e) = known_hosts.add_host(&self.host, self.port, server_public_key) {
                    warn!("Failed to save host key: {}", e);
                }
                Ok(true)
            }
            HostKeyVerification::Changed {
                expected_fingerprint,
                actual_fingerprint,
            } => {
                warn!(
                    "HOST KEY CHANGED for {}:{}! Expected {}, got {}",
                    self.host, self.port, expected_fingerprint, actual_fingerprint
                );
                Err(SshError::HostKey(format!(
                    "HOST KEY VERIFICATION FAILED: Key for {}:{} has changed! \
                     Expected: {}, Actual: {}. \
                     If the key change is legitimate, remove the old key from ~/.ssh/known_hosts",
                    self.host, self.port, expected_fingerprint, actual_fingerprint
                )))
            }
        }
    }
}
