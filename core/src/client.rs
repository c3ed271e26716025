//! REST helpers that build request descriptors for a JSON API.
//!
//! # Design
//! `RestClient` holds only a `base_url` and carries no state between calls.
//! Each helper produces a `RequestDescriptor` with the conventional JSON
//! headers already set; the caller adjusts it if needed and hands it to
//! `Gateway::submit`.

use serde::Serialize;

use crate::descriptor::RequestDescriptor;
use crate::error::GatewayError;
use crate::http::HttpMethod;

const JSON: &str = "application/json";

/// Stateless descriptor builder for a JSON API rooted at `base_url`.
#[derive(Debug, Clone)]
pub struct RestClient {
    base_url: String,
}

impl RestClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub fn get(&self, path: &str) -> RequestDescriptor {
        RequestDescriptor::new(HttpMethod::Get, self.url(path)).header("Accept", JSON)
    }

    /// Like `get`, but the request will not extend the session.
    pub fn get_in_background(&self, path: &str) -> RequestDescriptor {
        self.get(path).background()
    }

    pub fn post<T: Serialize>(&self, path: &str, data: &T) -> Result<RequestDescriptor, GatewayError> {
        self.post_with_headers(path, data, Vec::new())
    }

    /// POST with caller headers. `Content-Type` and `Accept` default to JSON
    /// only when the caller did not set them.
    pub fn post_with_headers<T: Serialize>(
        &self,
        path: &str,
        data: &T,
        headers: Vec<(String, String)>,
    ) -> Result<RequestDescriptor, GatewayError> {
        let mut desc = RequestDescriptor::new(HttpMethod::Post, self.url(path)).body(to_json(data)?);
        desc.headers = headers;
        if desc.get_header("Content-Type").is_none() {
            desc.set_header("Content-Type", JSON);
        }
        if desc.get_header("Accept").is_none() {
            desc.set_header("Accept", JSON);
        }
        Ok(desc)
    }

    pub fn post_in_background<T: Serialize>(
        &self,
        path: &str,
        data: &T,
    ) -> Result<RequestDescriptor, GatewayError> {
        Ok(self.post(path, data)?.background())
    }

    pub fn put<T: Serialize>(&self, path: &str, data: &T) -> Result<RequestDescriptor, GatewayError> {
        Ok(RequestDescriptor::new(HttpMethod::Put, self.url(path))
            .header("Content-Type", JSON)
            .header("Accept", JSON)
            .body(to_json(data)?))
    }

    pub fn delete(&self, path: &str) -> RequestDescriptor {
        RequestDescriptor::new(HttpMethod::Delete, self.url(path))
            .header("Content-Type", JSON)
            .header("Accept", JSON)
            .body("{}")
    }
}

fn to_json<T: Serialize>(data: &T) -> Result<String, GatewayError> {
    serde_json::to_string(data).map_err(|e| GatewayError::Serialization(e.to_string()))
}
