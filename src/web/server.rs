//! Dashboard HTTP server
//!
//! Lightweight HTTP/1.1 server on a tokio `TcpListener`. Each connection
//! carries one request; the browser session is resolved from the
//! `hub_session` cookie before dispatch and the cookie is set on first visit.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use super::http::{read_request, RequestError, Response};
use super::routes;
use super::session::SESSION_COOKIE;
use super::state::AppState;

/// How long a client may take to send its whole request
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(15);

pub struct WebServer {
    read_timeout: Duration,
    addr: Mutex<Option<SocketAddr>>,
    /// Send `true` to request shutdown
    shutdown_tx: Mutex<Option<watch::Sender<bool>>>,
}

impl Default for WebServer {
    fn default() -> Self {
        Self::new()
    }
}

impl WebServer {
    pub fn new() -> Self {
        Self::with_read_timeout(DEFAULT_READ_TIMEOUT)
    }

    pub fn with_read_timeout(read_timeout: Duration) -> Self {
        Self {
            read_timeout,
            addr: Mutex::new(None),
            shutdown_tx: Mutex::new(None),
        }
    }

    /// Bind `bind` and start serving. If already running, returns the
    /// existing address.
    pub async fn start(&self, bind: &str, state: Arc<AppState>) -> std::io::Result<SocketAddr> {
        let mut addr_guard = self.addr.lock().await;
        if let Some(addr) = *addr_guard {
            return Ok(addr);
        }

        let listener = TcpListener::bind(bind).await?;
        let addr = listener.local_addr()?;
        info!("[WebServer] Listening on http://{}", addr);

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let read_timeout = self.read_timeout;

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, _addr)) => {
                                tokio::spawn(handle_connection(stream, state.clone(), read_timeout));
                            }
                            Err(e) => {
                                warn!("[WebServer] Accept error: {}", e);
                            }
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            info!("[WebServer] Shutting down");
                            break;
                        }
                    }
                }
            }
        });

        *addr_guard = Some(addr);
        *self.shutdown_tx.lock().await = Some(shutdown_tx);
        Ok(addr)
    }

    pub async fn addr(&self) -> Option<SocketAddr> {
        *self.addr.lock().await
    }

    /// Returns false if the server was not running
    pub async fn stop(&self) -> bool {
        let mut addr_guard = self.addr.lock().await;
        if addr_guard.is_none() {
            return false;
        }

        if let Some(tx) = self.shutdown_tx.lock().await.take() {
            let _ = tx.send(true);
        }

        *addr_guard = None;
        info!("[WebServer] Server stopped");
        true
    }
}

/// Read one request, dispatch it within its browser session, respond.
async fn handle_connection(stream: TcpStream, state: Arc<AppState>, read_timeout: Duration) {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    let read = match tokio::time::timeout(read_timeout, read_request(&mut reader)).await {
        Ok(read) => read,
        Err(_) => {
            debug!("[WebServer] Client did not finish its request in {:?}", read_timeout);
            let response = Response::error(408, "Request timeout");
            let _ = writer.write_all(&response.to_bytes()).await;
            let _ = writer.shutdown().await;
            return;
        }
    };

    let response = match read {
        Ok(request) => {
            let (id, session, created) = state.sessions.resolve(request.cookie(SESSION_COOKIE));
            let response = routes::handle(&state, &session, &request).await;
            if created {
                response.with_header(
                    "Set-Cookie",
                    format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, id),
                )
            } else {
                response
            }
        }
        Err(RequestError::Closed) => return,
        Err(RequestError::TooLarge) => Response::error(413, "Request too large"),
        Err(RequestError::Malformed(reason)) => Response::error(400, reason),
    };

    let _ = writer.write_all(&response.to_bytes()).await;
    let _ = writer.shutdown().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::testing::test_state;
    use tokio::io::AsyncReadExt;

    async fn exchange(addr: SocketAddr, raw: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(raw.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    fn session_cookie(response: &str) -> Option<String> {
        response
            .lines()
            .find_map(|line| line.strip_prefix("Set-Cookie: hub_session="))
            .and_then(|rest| rest.split(';').next())
            .map(str::to_string)
    }

    #[tokio::test]
    async fn test_serves_and_keeps_session_cookie() {
        let temp = tempfile::tempdir().unwrap();
        let (state, _, _) = test_state(temp.path());
        let server = WebServer::new();
        let addr = server.start("127.0.0.1:0", state.clone()).await.unwrap();
        assert_eq!(server.start("127.0.0.1:0", state.clone()).await.unwrap(), addr);

        let body = r#"{"host":"10.0.0.5","principal":"ops","operation":"changeDir","target":"logs"}"#;
        let first = exchange(
            addr,
            &format!(
                "POST /api/linux/execute HTTP/1.1\r\nHost: x\r\nContent-Length: {}\r\n\r\n{}",
                body.len(),
                body
            ),
        )
        .await;
        assert!(first.starts_with("HTTP/1.1 200 OK\r\n"));
        let cookie = session_cookie(&first).unwrap();

        let second = exchange(
            addr,
            &format!(
                "GET /api/session HTTP/1.1\r\nCookie: hub_session={}\r\n\r\n",
                cookie
            ),
        )
        .await;
        assert!(session_cookie(&second).is_none());
        assert!(second.contains(r#""currentPath":"~/logs""#));

        let stranger = exchange(addr, "GET /api/session HTTP/1.1\r\n\r\n").await;
        assert!(stranger.contains(r#""currentPath":"~""#));
        assert_eq!(state.sessions.len(), 2);

        assert!(server.stop().await);
        assert!(!server.stop().await);
        assert!(server.addr().await.is_none());
    }

    #[tokio::test]
    async fn test_malformed_request() {
        let temp = tempfile::tempdir().unwrap();
        let (state, _, _) = test_state(temp.path());
        let server = WebServer::new();
        let addr = server.start("127.0.0.1:0", state).await.unwrap();

        let response = exchange(addr, "NONSENSE\r\n\r\n").await;
        assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        server.stop().await;
    }

    #[tokio::test]
    async fn test_stalled_client_gets_timeout() {
        let temp = tempfile::tempdir().unwrap();
        let (state, _, _) = test_state(temp.path());
        let server = WebServer::with_read_timeout(Duration::from_millis(200));
        let addr = server.start("127.0.0.1:0", state.clone()).await.unwrap();

        let started = std::time::Instant::now();
        let response = exchange(addr, "GET /api/session HTTP/1.1\r\nHost: x").await;

        assert!(response.starts_with("HTTP/1.1 408 Request Timeout\r\n"));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(state.sessions.is_empty());
        server.stop().await;
    }
}
