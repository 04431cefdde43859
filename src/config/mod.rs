//! Configuration Management Module
//!
//! One JSON file holds the server address, SSH defaults and the credentials
//! of the hosted services. Environment variables override the secrets.

pub mod storage;
pub mod types;

pub use storage::{config_dir, config_file, default_data_dir, log_dir, ConfigStorage, StorageError};
pub use types::{
    AppConfig, LlmConfig, MailConfig, SearchConfig, ServerConfig, SshDefaults, TelephonyConfig,
    TwitterConfig, CONFIG_VERSION,
};
