//! Configuration Types
//!
//! Every section defaults sensibly so a missing or partial config file still
//! yields a usable dashboard; tools whose credentials are absent report that
//! when used.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::ssh::{AuthMethod, SshTarget, DEFAULT_TIMEOUT_SECS};

/// Current config file format version
pub const CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub version: u32,
    pub server: ServerConfig,
    pub ssh: SshDefaults,
    pub llm: LlmConfig,
    pub search: SearchConfig,
    pub telephony: TelephonyConfig,
    pub mail: MailConfig,
    pub twitter: TwitterConfig,
    /// Where `marks.csv` and `ledger.redb` live; `<config_dir>/data` if unset
    pub data_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            server: ServerConfig::default(),
            ssh: SshDefaults::default(),
            llm: LlmConfig::default(),
            search: SearchConfig::default(),
            telephony: TelephonyConfig::default(),
            mail: MailConfig::default(),
            twitter: TwitterConfig::default(),
            data_dir: None,
        }
    }
}

impl AppConfig {
    /// Apply API keys, mail credentials and `HUB_BIND` from the process
    /// environment; see [`AppConfig::apply_overrides`] for the names
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("GEMINI_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Some(key) = get("SERPAPI_API_KEY") {
            self.search.api_key = Some(key);
        }
        if let Some(sid) = get("TWILIO_ACCOUNT_SID") {
            self.telephony.account_sid = Some(sid);
        }
        if let Some(token) = get("TWILIO_AUTH_TOKEN") {
            self.telephony.auth_token = Some(token);
        }
        if let Some(user) = get("SMTP_USERNAME") {
            self.mail.username = Some(user);
        }
        if let Some(password) = get("SMTP_PASSWORD") {
            self.mail.password = Some(password);
        }
        if let Some(token) = get("TWITTER_ACCESS_TOKEN") {
            self.twitter.access_token = Some(token);
        }
        if let Some(bind) = get("HUB_BIND") {
            self.server.bind = bind;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address of the dashboard
    pub bind: String,
    /// Seconds a client may take to send one request
    pub read_timeout_secs: u64,
    /// Browser sessions unused for this long are forgotten
    pub session_idle_secs: u64,
    pub max_sessions: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8501".to_string(),
            read_timeout_secs: 15,
            session_idle_secs: 30 * 60,
            max_sessions: 1000,
        }
    }
}

/// Connection settings shared by every remote session; host and login come
/// from the dashboard form
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SshDefaults {
    pub port: u16,
    pub auth: AuthMethod,
    pub timeout_secs: u64,
    pub strict_host_key_checking: bool,
}

impl Default for SshDefaults {
    fn default() -> Self {
        Self {
            port: 22,
            auth: AuthMethod::Default,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            strict_host_key_checking: false,
        }
    }
}

impl SshDefaults {
    pub fn template(&self) -> SshTarget {
        SshTarget {
            port: self.port,
            auth: self.auth.clone(),
            timeout_secs: self.timeout_secs,
            strict_host_key_checking: self.strict_host_key_checking,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    /// Base URL of the generative language API
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-1.5-flash".to_string(),
            temperature: 0.7,
            endpoint: "https://generativelanguage.googleapis.com".to_string(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub api_key: Option<String>,
    pub endpoint: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: "https://serpapi.com/search.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelephonyConfig {
    pub account_sid: Option<String>,
    pub auth_token: Option<String>,
    /// Provider number messages and calls originate from
    pub from_number: Option<String>,
    /// The owner's phone, recipient of every message and call
    pub to_number: Option<String>,
    pub endpoint: String,
}

impl Default for TelephonyConfig {
    fn default() -> Self {
        Self {
            account_sid: None,
            auth_token: None,
            from_number: None,
            to_number: None,
            endpoint: "https://api.twilio.com".to_string(),
        }
    }
}

/// SMTP relay used by the email sender
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    pub relay: String,
    pub port: u16,
    /// Upgrade with STARTTLS; only a local test relay should turn this off
    pub starttls: bool,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Sender address; the login name when unset
    pub from: Option<String>,
    pub timeout_secs: u64,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            relay: "smtp.gmail.com".to_string(),
            port: 587,
            starttls: true,
            username: None,
            password: None,
            from: None,
            timeout_secs: 30,
        }
    }
}

/// X (Twitter) API v2 access
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TwitterConfig {
    /// OAuth 2.0 user-context token with the `tweet.write` scope
    pub access_token: Option<String>,
    pub endpoint: String,
}

impl Default for TwitterConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            endpoint: "https://api.twitter.com".to_string(),
        }
    }
}
