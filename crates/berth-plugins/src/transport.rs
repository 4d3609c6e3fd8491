//! Wire transport used by the plugin client.
//!
//! The [`Transport`] trait is the seam between retry policy and the
//! network; [`HttpTransport`] is the production implementation.

use std::fmt;
use std::time::Duration;

use berth_common::constants::PLUGIN_MIMETYPE;
use berth_common::error::{BerthError, Result};
use reqwest::header::{ACCEPT, CONTENT_TYPE};

/// Status code and body of a plugin answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body, unparsed.
    pub body: Vec<u8>,
}

impl RawResponse {
    /// Returns `true` for `200 OK`.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Failure below the application layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The plugin could not be reached. Retried by the client.
    Connect(String),
    /// The plugin accepted the request but did not answer in time.
    Timeout(String),
    /// The response body could not be read.
    Body(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect(msg) => write!(f, "connect: {msg}"),
            Self::Timeout(msg) => write!(f, "timeout: {msg}"),
            Self::Body(msg) => write!(f, "body: {msg}"),
        }
    }
}

/// Sends one request to a plugin.
pub trait Transport: Send + Sync + fmt::Debug {
    /// Posts `body` to `path` and returns whatever the plugin answered
    /// within `timeout`.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] when no HTTP answer was obtained.
    fn post(
        &self,
        path: &str,
        body: Vec<u8>,
        timeout: Duration,
    ) -> std::result::Result<RawResponse, TransportError>;
}

/// Plain-HTTP transport bound to one `host:port`.
///
/// TLS is never negotiated and proxies are ignored: plugins are expected to
/// live on the local host.
#[derive(Debug)]
pub struct HttpTransport {
    http: reqwest::blocking::Client,
    host: String,
}

impl HttpTransport {
    /// Creates a transport for `host` (`host:port`).
    ///
    /// # Errors
    ///
    /// Returns `BerthError::Config` if the HTTP client cannot be built.
    pub fn new(host: impl Into<String>) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .no_proxy()
            .build()
            .map_err(|e| BerthError::Config {
                message: format!("failed to build plugin HTTP client: {e}"),
            })?;
        Ok(Self {
            http,
            host: host.into(),
        })
    }
}

impl Transport for HttpTransport {
    fn post(
        &self,
        path: &str,
        body: Vec<u8>,
        timeout: Duration,
    ) -> std::result::Result<RawResponse, TransportError> {
        let url = format!("http://{}{path}", self.host);
        let response = self
            .http
            .post(url)
            .timeout(timeout)
            .header(ACCEPT, PLUGIN_MIMETYPE)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .map_err(|e| {
                if !e.is_connect() && e.is_timeout() {
                    TransportError::Timeout(e.to_string())
                } else {
                    TransportError::Connect(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .map_err(|e| TransportError::Body(e.to_string()))?;
        Ok(RawResponse {
            status,
            body: body.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread::JoinHandle;

    use super::*;

    /// Accepts a single connection, answers it with `status` and `body`,
    /// and hands back the raw request text.
    fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr").to_string();
        let handle = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept");
            let request = read_request(&mut stream);
            let reply = format!(
                "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(reply.as_bytes()).expect("write");
            request
        });
        (addr, handle)
    }

    fn read_request(stream: &mut std::net::TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0_u8; 1024];
        loop {
            let n = stream.read(&mut chunk).expect("read");
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(split) = text.find("\r\n\r\n") {
                let content_length = text[..split]
                    .lines()
                    .find_map(|l| {
                        let (k, v) = l.split_once(':')?;
                        k.eq_ignore_ascii_case("content-length")
                            .then(|| v.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= split + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    #[test]
    fn post_sends_method_path_and_accept_header() {
        let (addr, server) = serve_once("200 OK", "{}");
        let transport = HttpTransport::new(addr).expect("transport");

        let resp = transport
            .post(
                "/VolumeDriver.Create",
                br#"{"Name":"data"}"#.to_vec(),
                Duration::from_secs(5),
            )
            .expect("post");
        assert!(resp.is_ok());
        assert_eq!(resp.body, b"{}");

        let request = server.join().expect("server");
        assert!(request.starts_with("POST /VolumeDriver.Create HTTP/1.1"));
        assert!(
            request
                .to_ascii_lowercase()
                .contains(&format!("accept: {PLUGIN_MIMETYPE}"))
        );
        assert!(request.ends_with(r#"{"Name":"data"}"#));
    }

    #[test]
    fn post_returns_error_status_with_body() {
        let (addr, server) = serve_once("500 Internal Server Error", "no such volume");
        let transport = HttpTransport::new(addr).expect("transport");

        let resp = transport
            .post("/VolumeDriver.Path", Vec::new(), Duration::from_secs(5))
            .expect("post");
        assert_eq!(resp.status, 500);
        assert_eq!(resp.body, b"no such volume");
        let _ = server.join().expect("server");
    }

    #[test]
    fn silent_plugin_hits_the_request_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr").to_string();
        let server = std::thread::spawn(move || {
            let (stream, _) = listener.accept().expect("accept");
            std::thread::sleep(std::time::Duration::from_secs(1));
            drop(stream);
        });

        let transport = HttpTransport::new(addr).expect("transport");
        let err = transport
            .post("/VolumeDriver.Mount", Vec::new(), Duration::from_millis(200))
            .unwrap_err();
        assert!(matches!(err, TransportError::Timeout(_)), "got {err:?}");
        server.join().expect("server");
    }

    #[test]
    fn post_to_closed_port_is_a_connect_error() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr").to_string();
        drop(listener);

        let transport = HttpTransport::new(addr).expect("transport");
        let err = transport
            .post("/Plugin.Activate", Vec::new(), Duration::from_secs(5))
            .unwrap_err();
        assert!(matches!(err, TransportError::Connect(_)), "got {err:?}");
    }
}
