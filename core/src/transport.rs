//! The capability the gateway uses to perform HTTP round-trips.
//!
//! # Design
//! One trait, two shapes. Plain functions and closures implement
//! `Transport` directly, which suits tests and hosts that already own an
//! HTTP stack. `UreqTransport` wraps a blocking `ureq` agent. Either way a
//! non-2xx status is data, not an error; only a failure to obtain any
//! status, or a body that cannot be read, is reported as `TransportError`.
//! Bodies are decoded lossily so that non-UTF-8 bytes never erase the
//! payload.

use ureq::typestate::WithBody;
use ureq::RequestBuilder;

use crate::error::TransportError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

pub trait Transport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<F> Transport for F
where
    F: Fn(&HttpRequest) -> Result<HttpResponse, TransportError>,
{
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self(request)
    }
}

/// Largest response body `UreqTransport` reads by default.
pub const DEFAULT_BODY_LIMIT: u64 = 10 * 1024 * 1024;

/// Blocking transport backed by a `ureq::Agent`.
///
/// The agent is configured so that 4xx/5xx responses come back as data
/// and reach the gateway's classification.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
    body_limit: u64,
}

impl UreqTransport {
    pub fn new() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self {
            agent,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    /// Cap the number of body bytes read per response.
    pub fn with_body_limit(mut self, limit: u64) -> Self {
        self.body_limit = limit;
        self
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = request.url.as_str();
        let body = request.body.as_deref();
        let result = match request.method {
            HttpMethod::Get => with_headers(self.agent.get(url), &request.headers).call(),
            HttpMethod::Delete => send(
                with_headers(self.agent.delete(url).force_send_body(), &request.headers),
                body,
            ),
            HttpMethod::Post => send(with_headers(self.agent.post(url), &request.headers), body),
            HttpMethod::Put => send(with_headers(self.agent.put(url), &request.headers), body),
        };

        let mut response = result.map_err(|e| TransportError::Unreachable(e.to_string()))?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let bytes = response
            .body_mut()
            .with_config()
            .limit(self.body_limit)
            .read_to_vec()
            .map_err(|e| TransportError::UnreadableBody {
                status,
                reason: e.to_string(),
            })?;
        let body = String::from_utf8_lossy(&bytes).into_owned();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn with_headers<B>(mut builder: RequestBuilder<B>, headers: &[(String, String)]) -> RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

fn send(
    builder: RequestBuilder<WithBody>,
    body: Option<&str>,
) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    match body {
        Some(body) => builder.send(body.as_bytes()),
        None => builder.send_empty(),
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};

    use super::*;

    /// Answer one connection with `response` and hand back the raw request.
    fn serve_once(response: &'static [u8]) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 1024];
            loop {
                let n = stream.read(&mut buf).unwrap();
                raw.extend_from_slice(&buf[..n]);
                if n == 0 || request_complete(&raw) {
                    break;
                }
            }
            stream.write_all(response).unwrap();
            stream.flush().unwrap();
            String::from_utf8_lossy(&raw).into_owned()
        });
        (url, handle)
    }

    fn request_complete(raw: &[u8]) -> bool {
        let text = String::from_utf8_lossy(raw);
        let Some(end) = text.find("\r\n\r\n") else {
            return false;
        };
        let length = text[..end]
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        raw.len() >= end + 4 + length
    }

    fn request(url: &str) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: url.to_string(),
            headers: Vec::new(),
            body: None,
        }
    }

    #[test]
    fn closures_are_transports() {
        let transport = |req: &HttpRequest| -> Result<HttpResponse, TransportError> {
            Ok(HttpResponse {
                status: 200,
                headers: Vec::new(),
                body: req.url.clone(),
            })
        };
        let resp = transport.execute(&request("/echo")).unwrap();
        assert_eq!(resp.body, "/echo");
    }

    #[test]
    fn ureq_reports_refused_connection_as_unreachable() {
        // Bind then drop to get a port nothing listens on.
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let err = UreqTransport::new()
            .execute(&request(&format!("http://127.0.0.1:{port}/items")))
            .unwrap_err();
        assert!(matches!(err, TransportError::Unreachable(_)));
    }

    #[test]
    fn non_utf8_body_is_decoded_lossily() {
        let (url, server) =
            serve_once(b"HTTP/1.1 200 OK\r\nContent-Length: 9\r\nConnection: close\r\n\r\ncaf\xe9 data");
        let resp = UreqTransport::new()
            .execute(&request(&format!("{url}/menu")))
            .unwrap();
        server.join().unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body, "caf\u{FFFD} data");
    }

    #[test]
    fn oversized_body_is_reported_with_status() {
        let (url, server) =
            serve_once(b"HTTP/1.1 500 Internal Server Error\r\nContent-Length: 16\r\nConnection: close\r\n\r\n0123456789abcdef");
        let err = UreqTransport::new()
            .with_body_limit(4)
            .execute(&request(&format!("{url}/big")))
            .unwrap_err();
        server.join().unwrap();
        assert!(matches!(err, TransportError::UnreadableBody { status: 500, .. }));
    }

    #[test]
    fn delete_sends_its_body() {
        let (url, server) =
            serve_once(b"HTTP/1.1 204 No Content\r\nConnection: close\r\n\r\n");
        let resp = UreqTransport::new()
            .execute(&HttpRequest {
                method: HttpMethod::Delete,
                url: format!("{url}/items/1"),
                headers: vec![("Content-Type".to_string(), "application/json".to_string())],
                body: Some("{}".to_string()),
            })
            .unwrap();
        let raw = server.join().unwrap();
        assert_eq!(resp.status, 204);
        assert!(raw.starts_with("DELETE /items/1 "));
        assert!(raw.ends_with("\r\n\r\n{}"));
    }
}
