//! Helpers shared by the unit tests

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// A request as seen by [`serve_once`]
#[derive(Debug)]
pub struct CapturedRequest {
    pub head: String,
    pub body: String,
}

/// Serve exactly one canned HTTP response on a loopback port.
///
/// Returns the base URL and a receiver that yields the request once served.
pub async fn serve_once(
    status: &'static str,
    content_type: &'static str,
    body: impl Into<Vec<u8>>,
) -> (String, oneshot::Receiver<CapturedRequest>) {
    let body = body.into();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];

        let (head_end, length) = loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break (buf.len(), 0);
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(end) = find_head_end(&buf) {
                let head = String::from_utf8_lossy(&buf[..end]).to_string();
                break (end, content_length(&head));
            }
        };
        while buf.len() < head_end + 4 + length {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }

        let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
        let body_start = (head_end + 4).min(buf.len());
        let request_body = String::from_utf8_lossy(&buf[body_start..]).to_string();

        let mut response = format!(
            "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            status,
            content_type,
            body.len()
        )
        .into_bytes();
        response.extend_from_slice(&body);
        stream.write_all(&response).await.unwrap();
        stream.shutdown().await.ok();

        let _ = tx.send(CapturedRequest {
            head,
            body: request_body,
        });
    });

    (format!("http://{}", addr), rx)
}

fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

fn content_length(head: &str) -> usize {
    head.lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse().ok())
        .unwrap_or(0)
}

/// Accept TCP connections and never answer, holding each socket open.
///
/// An SSH client connecting here waits forever for the server banner.
pub async fn silent_listener() -> std::net::SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    addr
}

/// What [`smtp_relay`] received
#[derive(Debug, Default)]
pub struct DeliveredMail {
    /// Command lines other than the message itself
    pub envelope: Vec<String>,
    pub data: String,
}

/// A plaintext SMTP relay that accepts one session and records it
pub async fn smtp_relay() -> (u16, oneshot::Receiver<DeliveredMail>) {
    use tokio::io::{AsyncBufReadExt, BufReader};

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let (reader, mut writer) = stream.into_split();
        let mut lines = BufReader::new(reader).lines();
        let mut delivered = DeliveredMail::default();

        writer.write_all(b"220 relay.test ESMTP\r\n").await.unwrap();
        while let Ok(Some(line)) = lines.next_line().await {
            let command = line.to_ascii_uppercase();
            let reply: &[u8] = if command.starts_with("DATA") {
                writer.write_all(b"354 End data with <CR><LF>.<CR><LF>\r\n").await.unwrap();
                while let Ok(Some(data_line)) = lines.next_line().await {
                    if data_line == "." {
                        break;
                    }
                    delivered.data.push_str(&data_line);
                    delivered.data.push('\n');
                }
                b"250 Queued\r\n"
            } else if command.starts_with("QUIT") {
                writer.write_all(b"221 Bye\r\n").await.ok();
                break;
            } else {
                delivered.envelope.push(line.clone());
                if command.starts_with("EHLO") || command.starts_with("HELO") {
                    b"250 relay.test\r\n"
                } else {
                    b"250 OK\r\n"
                }
            };
            writer.write_all(reply).await.unwrap();
        }

        let _ = tx.send(delivered);
    });

    (port, rx)
}
