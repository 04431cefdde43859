//! SSH target configuration

use serde::{Deserialize, Serialize};

/// Default wall-clock bound for one remote operation (connect + auth + run)
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// One remote endpoint plus the credentials used to reach it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SshTarget {
    /// Remote host address
    pub host: String,

    /// SSH port (default: 22)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Login identity
    pub principal: String,

    /// Authentication method
    #[serde(default)]
    pub auth: AuthMethod,

    /// Timeout in seconds, applied to every call as a whole
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Strict host key checking
    /// - true: reject connections to unknown hosts
    /// - false: auto-accept unknown hosts, still reject changed keys
    #[serde(default)]
    pub strict_host_key_checking: bool,
}

/// Authentication methods supported
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthMethod {
    /// Password authentication
    Password { password: String },

    /// SSH key authentication
    Key {
        /// Path to private key file
        key_path: String,
        /// Optional passphrase for encrypted keys
        passphrase: Option<String>,
    },

    /// SSH agent authentication
    Agent,

    /// Same lookup order as the `ssh` binary: agent first, then the
    /// unencrypted identities in `~/.ssh`
    #[default]
    Default,
}

impl AuthMethod {
    /// Whether unusable credentials are skipped rather than reported
    pub fn is_fallback(&self) -> bool {
        matches!(self, AuthMethod::Default)
    }

    pub fn password(password: impl Into<String>) -> Self {
        Self::Password {
            password: password.into(),
        }
    }

    pub fn key(key_path: impl Into<String>, passphrase: Option<String>) -> Self {
        Self::Key {
            key_path: key_path.into(),
            passphrase,
        }
    }
}

impl SshTarget {
    pub fn new(host: impl Into<String>, principal: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            principal: principal.into(),
            ..Default::default()
        }
    }

    /// `principal@host`, or `principal@host:port` for non-standard ports
    pub fn display_name(&self) -> String {
        if self.port == 22 {
            format!("{}@{}", self.principal, self.host)
        } else {
            format!("{}@{}:{}", self.principal, self.host, self.port)
        }
    }
}

fn default_port() -> u16 {
    22
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for SshTarget {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 22,
            principal: String::new(),
            auth: AuthMethod::Default,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            strict_host_key_checking: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_defaults() {
        let target = SshTarget::new("10.0.0.5", "deploy");
        assert_eq!(target.port, 22);
        assert_eq!(target.timeout_secs, 30);
        assert!(matches!(target.auth, AuthMethod::Default));
        assert_eq!(target.display_name(), "deploy@10.0.0.5");
    }

    #[test]
    fn test_auth_method_serde_tag() {
        let json = r#"{"type":"key","key_path":"/home/me/.ssh/id_ed25519","passphrase":null}"#;
        let auth: AuthMethod = serde_json::from_str(json).unwrap();
        assert!(matches!(auth, AuthMethod::Key { .. }));

        let target: SshTarget =
            serde_json::from_str(r#"{"host":"h","principal":"p","port":2222}"#).unwrap();
        assert_eq!(target.display_name(), "p@h:2222");
        assert!(matches!(target.auth, AuthMethod::Default));
    }
}
