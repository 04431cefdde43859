//! Web dashboard: HTTP server, routes and per-browser sessions

mod error;
mod http;
mod routes;
mod server;
mod session;
mod state;

pub use error::ApiError;
pub use server::WebServer;
pub use session::{BrowserSession, SessionStore, SESSION_COOKIE};
pub use state::{AppState, Services, StartupError};
