//! Request descriptors: one pending or in-flight call plus its metadata.

use uuid::Uuid;

use crate::http::{find_header, set_header, HttpMethod, HttpRequest};

/// A request handed to the gateway.
///
/// Headers stay mutable until the gateway dispatches the descriptor. The
/// two `handles_*` flags record which error cases the caller deals with
/// itself; the gateway falls back to its generic notices for the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    pub id: Uuid,
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    /// Must not refresh or extend the authentication session.
    pub is_background: bool,
    /// Caller handles structured faults and not-found itself.
    pub handles_errors: bool,
    /// Caller handles unrecognised non-2xx responses itself.
    pub handles_unknown_errors: bool,
}

impl RequestDescriptor {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            is_background: false,
            handles_errors: false,
            handles_unknown_errors: false,
        }
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        set_header(&mut self.headers, name, value);
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn background(mut self) -> Self {
        self.is_background = true;
        self
    }

    pub fn handle_errors(mut self) -> Self {
        self.handles_errors = true;
        self
    }

    pub fn handle_unknown_errors(mut self) -> Self {
        self.handles_unknown_errors = true;
        self
    }

    /// Case-insensitive header lookup.
    pub fn get_header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        set_header(&mut self.headers, name, value);
    }

    pub fn to_request(&self) -> HttpRequest {
        HttpRequest {
            method: self.method,
            url: self.url.clone(),
            headers: self.headers.clone(),
            body: self.body.clone(),
        }
    }
}
