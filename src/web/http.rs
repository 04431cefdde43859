//! Minimal HTTP/1.1 request reader and response builder
//!
//! One request per connection (`Connection: close`). Bodies are read by
//! `Content-Length` only; chunked uploads are rejected.

use std::collections::HashMap;

use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

/// Largest accepted request body
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Longest accepted request line or header line
pub const MAX_LINE_BYTES: usize = 8 * 1024;

const MAX_HEADER_LINES: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    Closed,
    Malformed(&'static str),
    TooLarge,
}

#[derive(Debug, Clone, Default)]
pub struct Request {
    pub method: String,
    pub path: String,
    pub query: HashMap<String, String>,
    /// Header names are lowercased
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl Request {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// Value of cookie `name`, if sent
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.header("cookie")?
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.trim())
    }
}

/// Read one request: request line, headers until the blank line, then the body
pub async fn read_request<R>(reader: &mut R) -> Result<Request, RequestError>
where
    R: AsyncBufRead + Unpin,
{
    let mut request_line = String::new();
    if read_bounded_line(reader, &mut request_line).await? == 0 {
        return Err(RequestError::Closed);
    }

    // Parse method and target from "POST /path?query HTTP/1.1"
    let mut parts = request_line.split_whitespace();
    let (method, target) = match (parts.next(), parts.next()) {
        (Some(method), Some(target)) => (method.to_ascii_uppercase(), target),
        _ => return Err(RequestError::Malformed("Malformed request line")),
    };

    let (raw_path, raw_query) = target.split_once('?').unwrap_or((target, ""));
    let path =
        percent_decode(raw_path, false).ok_or(RequestError::Malformed("Invalid URL encoding"))?;
    let query = parse_query(raw_query);

    let mut headers = HashMap::new();
    for _ in 0..MAX_HEADER_LINES {
        let mut line = String::new();
        match read_bounded_line(reader, &mut line).await {
            Ok(0) | Err(RequestError::Closed) => break,
            Ok(_) => {}
            Err(e) => return Err(e),
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }

    if headers
        .get("transfer-encoding")
        .is_some_and(|v| v.eq_ignore_ascii_case("chunked"))
    {
        return Err(RequestError::Malformed("Chunked bodies are not supported"));
    }

    let length = match headers.get("content-length") {
        Some(value) => value
            .parse::<usize>()
            .map_err(|_| RequestError::Malformed("Invalid Content-Length"))?,
        None => 0,
    };
    if length > MAX_BODY_BYTES {
        return Err(RequestError::TooLarge);
    }

    let mut body = vec![0u8; length];
    reader
        .read_exact(&mut body)
        .await
        .map_err(|_| RequestError::Malformed("Truncated body"))?;

    Ok(Request {
        method,
        path,
        query,
        headers,
        body,
    })
}

/// `read_line` that gives up past [`MAX_LINE_BYTES`] instead of buffering
/// an endless line
async fn read_bounded_line<R>(reader: &mut R, line: &mut String) -> Result<usize, RequestError>
where
    R: AsyncBufRead + Unpin,
{
    let read = (&mut *reader)
        .take(MAX_LINE_BYTES as u64 + 1)
        .read_line(line)
        .await
        .map_err(|_| RequestError::Closed)?;
    if line.len() > MAX_LINE_BYTES {
        return Err(RequestError::TooLarge);
    }
    Ok(read)
}

fn parse_query(raw: &str) -> HashMap<String, String> {
    raw.split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            Some((percent_decode(key, true)?, percent_decode(value, true)?))
        })
        .collect()
}

/// Percent-decoding; in query strings `+` also means a space
pub fn percent_decode(input: &str, plus_as_space: bool) -> Option<String> {
    let mut out = Vec::with_capacity(input.len());
    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                if i + 2 >= bytes.len() {
                    return None;
                }
                let hi = char::from(bytes[i + 1]).to_digit(16)?;
                let lo = char::from(bytes[i + 2]).to_digit(16)?;
                out.push((hi * 16 + lo) as u8);
                i += 3;
            }
            b'+' if plus_as_space => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8(out).ok()
}

#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
    pub headers: Vec<(&'static str, String)>,
}

impl Response {
    pub fn new(status: u16, content_type: &'static str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            content_type,
            body: body.into(),
            headers: Vec::new(),
        }
    }

    pub fn json<T: Serialize>(status: u16, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Self::new(status, "application/json", body),
            Err(e) => Self::error(500, &format!("Failed to encode response: {}", e)),
        }
    }

    pub fn html(body: &'static str) -> Self {
        Self::new(200, "text/html; charset=utf-8", body)
    }

    /// `{"error": message}`
    pub fn error(status: u16, message: &str) -> Self {
        let body = serde_json::json!({ "error": message }).to_string();
        Self::new(status, "application/json", body)
    }

    pub fn with_header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut header = format!(
            "HTTP/1.1 {} {}\r\n\
             Content-Type: {}\r\n\
             Content-Length: {}\r\n\
             Cache-Control: no-cache\r\n\
             Connection: close\r\n",
            self.status,
            reason_phrase(self.status),
            self.content_type,
            self.body.len()
        );
        for (name, value) in &self.headers {
            header.push_str(&format!("{}: {}\r\n", name, value));
        }
        header.push_str("\r\n");

        let mut resp = header.into_bytes();
        resp.extend_from_slice(&self.body);
        resp
    }
}

pub fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        408 => "Request Timeout",
        409 => "Conflict",
        413 => "Payload Too Large",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    async fn parse(raw: &str) -> Result<Request, RequestError> {
        let mut reader = BufReader::new(raw.as_bytes());
        read_request(&mut reader).await
    }

    #[tokio::test]
    async fn test_read_post_with_body() {
        let raw = "POST /api/code/fix HTTP/1.1\r\nHost: x\r\nContent-Type: application/json\r\nContent-Length: 13\r\nCookie: theme=dark; hub_session=abc\r\n\r\n{\"code\":\"x\"}\nEXTRA";
        let request = parse(raw).await.unwrap();

        assert_eq!(request.method, "POST");
        assert_eq!(request.path, "/api/code/fix");
        assert_eq!(request.header("Content-Type"), Some("application/json"));
        assert_eq!(request.body, b"{\"code\":\"x\"}\n");
        assert_eq!(request.cookie("hub_session"), Some("abc"));
        assert_eq!(request.cookie("missing"), None);
    }

    #[tokio::test]
    async fn test_read_query_string() {
        let raw = "GET /api/blogs?category=Linux&q=a+b%26c HTTP/1.1\r\n\r\n";
        let request = parse(raw).await.unwrap();

        assert_eq!(request.path, "/api/blogs");
        assert_eq!(request.query_param("category"), Some("Linux"));
        assert_eq!(request.query_param("q"), Some("a b&c"));
        assert!(request.body.is_empty());
    }

    #[tokio::test]
    async fn test_rejections() {
        assert_eq!(parse("").await.unwrap_err(), RequestError::Closed);
        assert!(matches!(
            parse("GARBAGE\r\n\r\n").await,
            Err(RequestError::Malformed(_))
        ));
        assert_eq!(
            parse("POST / HTTP/1.1\r\nContent-Length: 99999999\r\n\r\n")
                .await
                .unwrap_err(),
            RequestError::TooLarge
        );
        assert!(matches!(
            parse("POST / HTTP/1.1\r\nContent-Length: 10\r\n\r\nshort").await,
            Err(RequestError::Malformed("Truncated body"))
        ));
    }

    #[tokio::test]
    async fn test_overlong_lines_are_refused() {
        let long_target = format!("GET /{} HTTP/1.1\r\n\r\n", "a".repeat(MAX_LINE_BYTES * 4));
        assert_eq!(parse(&long_target).await.unwrap_err(), RequestError::TooLarge);

        let long_header = format!(
            "GET / HTTP/1.1\r\nX-Filler: {}\r\n\r\n",
            "b".repeat(MAX_LINE_BYTES)
        );
        assert_eq!(parse(&long_header).await.unwrap_err(), RequestError::TooLarge);

        let fits = format!("GET /{} HTTP/1.1\r\n\r\n", "c".repeat(1000));
        assert_eq!(parse(&fits).await.unwrap().path.len(), 1001);
    }

    #[test]
    fn test_percent_decode() {
        assert_eq!(percent_decode("/a%20b", false).as_deref(), Some("/a b"));
        assert_eq!(percent_decode("a+b", false).as_deref(), Some("a+b"));
        assert_eq!(percent_decode("a+b", true).as_deref(), Some("a b"));
        assert_eq!(percent_decode("%2", false), None);
        assert_eq!(percent_decode("%zz", false), None);
    }

    #[test]
    fn test_response_bytes() {
        let response = Response::error(409, "Insufficient balance or user not found.")
            .with_header("Set-Cookie", "hub_session=1; Path=/");
        let text = String::from_utf8(response.to_bytes()).unwrap();

        assert!(text.starts_with("HTTP/1.1 409 Conflict\r\n"));
        assert!(text.contains("Set-Cookie: hub_session=1; Path=/\r\n"));
        assert!(text.ends_with("\r\n\r\n{\"error\":\"Insufficient balance or user not found.\"}"));
    }
}
