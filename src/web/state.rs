//! Shared application state handed to every request

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use super::session::SessionStore;
use crate::config::{AppConfig, StorageError};
use crate::llm::{GeminiClient, LanguageModel, LlmError, RetryPolicy};
use crate::remote::RemoteShell;
use crate::ssh::{RemoteTransport, SshTransport};
use crate::tools::{
    CodeAssistant, DocumentLoader, LedgerError, LedgerStore, Mailer, MarksPredictor,
    PdfToTextLoader, SearchEngine, SerpApiClient, Summarizer, ToolError, TweetPoster,
    TwilioClient, WebsiteQa,
};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Config error: {0}")]
    Config(#[from] StorageError),

    #[error("Language model setup failed: {0}")]
    Llm(#[from] LlmError),

    #[error("Tool setup failed: {0}")]
    Tool(#[from] ToolError),

    #[error("Ledger setup failed: {0}")]
    Ledger(#[from] LedgerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The collaborators that talk to the outside world
pub struct Services {
    pub transport: Arc<dyn RemoteTransport>,
    pub model: Arc<dyn LanguageModel>,
    pub loader: Arc<dyn DocumentLoader>,
    pub search: Arc<dyn SearchEngine>,
}

impl Services {
    /// Real SSH, Gemini, pdftotext and SerpApi
    pub fn from_config(config: &AppConfig) -> Result<Self, StartupError> {
        Ok(Self {
            transport: Arc::new(SshTransport),
            model: Arc::new(GeminiClient::new(&config.llm)?),
            loader: Arc::new(PdfToTextLoader::default()),
            search: Arc::new(SerpApiClient::new(config.search.clone())?),
        })
    }
}

pub struct AppState {
    pub shell: RemoteShell,
    pub summarizer: Summarizer,
    pub website: WebsiteQa,
    pub code: CodeAssistant,
    pub messaging: TwilioClient,
    pub mailer: Mailer,
    pub tweets: TweetPoster,
    pub marks: MarksPredictor,
    pub ledger: Arc<LedgerStore>,
    pub search: Arc<dyn SearchEngine>,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(
        config: &AppConfig,
        data_dir: &Path,
        services: Services,
        retry: RetryPolicy,
    ) -> Result<Self, StartupError> {
        let Services {
            transport,
            model,
            loader,
            search,
        } = services;

        Ok(Self {
            shell: RemoteShell::new(transport, config.ssh.template()),
            summarizer: Summarizer::new(loader, model.clone())?.with_retry(retry.clone()),
            website: WebsiteQa::new(model.clone())?.with_retry(retry.clone()),
            code: CodeAssistant::new(model).with_retry(retry),
            messaging: TwilioClient::new(config.telephony.clone())?,
            mailer: Mailer::new(config.mail.clone()),
            tweets: TweetPoster::new(config.twitter.clone())?,
            marks: MarksPredictor::new(data_dir),
            ledger: Arc::new(LedgerStore::open(data_dir)?),
            search,
            sessions: SessionStore::with_limits(
                Duration::from_secs(config.server.session_idle_secs),
                config.server.max_sessions,
            ),
        })
    }
}
