//! Automation Hub - a browser dashboard of small operations tools
//!
//! The core is a remote Linux file manager and Docker panel driven over SSH,
//! with a per-browser working directory. Around it sit language-model
//! helpers (PDF summaries, website Q&A, code fixes), messaging over SMS,
//! email and X, a marks predictor, a bank ledger and web search.

// mimalloc handles the many short-lived request and response buffers well
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

pub mod config;
pub mod llm;
pub mod remote;
pub mod ssh;
pub mod tools;
pub mod web;

#[cfg(test)]
mod test_support;

use std::fs::OpenOptions;
use std::io::Write;
use std::sync::Arc;

use config::{AppConfig, ConfigStorage};
use llm::RetryPolicy;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use web::{AppState, Services, StartupError, WebServer};

/// Append a line to `<config_dir>/logs/startup.log`
fn write_startup_log(message: &str) {
    if let Ok(log_dir) = config::log_dir() {
        let _ = std::fs::create_dir_all(&log_dir);

        let log_file = log_dir.join("startup.log");
        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(&log_file) {
            let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
            let _ = writeln!(file, "[{}] {}", timestamp, message);
        }
    }
}

/// Initialize logging
fn init_logging() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn load_config() -> Result<AppConfig, StartupError> {
    let storage = ConfigStorage::new()?;
    let mut config = storage.load().await?;
    if !storage.exists().await {
        storage.save(&config).await?;
        tracing::info!("Wrote default config to {:?}", storage.path());
    }
    config.apply_env();
    Ok(config)
}

async fn serve() -> Result<(), StartupError> {
    let config = load_config().await?;
    write_startup_log("Config loaded");

    let data_dir = match &config.data_dir {
        Some(dir) => dir.clone(),
        None => config::default_data_dir()?,
    };
    tokio::fs::create_dir_all(&data_dir).await?;
    tracing::info!("Data directory: {:?}", data_dir);

    if config.llm.api_key.is_none() {
        tracing::warn!("No language model API key configured; AI tools will fail");
    }

    let services = Services::from_config(&config)?;
    let state = Arc::new(AppState::new(
        &config,
        &data_dir,
        services,
        RetryPolicy::default(),
    )?);
    write_startup_log("Application state initialized");

    let server = WebServer::with_read_timeout(std::time::Duration::from_secs(
        config.server.read_timeout_secs,
    ));
    let addr = server.start(&config.server.bind, state).await?;
    write_startup_log(&format!("Listening on http://{}", addr));

    tokio::signal::ctrl_c().await?;
    tracing::info!("Interrupt received");
    server.stop().await;
    Ok(())
}

pub fn run() {
    write_startup_log("Automation Hub starting...");

    init_logging();

    tracing::info!("Starting Automation Hub...");
    write_startup_log("Logging initialized");

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            let msg = format!("Failed to start async runtime: {}", e);
            tracing::error!("{}", msg);
            write_startup_log(&msg);
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(serve()) {
        let msg = format!("Automation Hub stopped with an error: {}", e);
        tracing::error!("{}", msg);
        write_startup_log(&msg);
        std::process::exit(1);
    }

    write_startup_log("Automation Hub stopped");
}
