//! Transport seam between the request client and the wire.

use super::descriptor::{Method, RequestDescriptor};
use crate::error::{Error, Result};
use serde::de::DeserializeOwned;

/// Raw response as seen by response interceptors and status classification.
#[derive(Clone, Debug)]
pub struct WireResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl WireResponse {
    /// First header with the given name, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Whether the content type indicates a JSON body.
    pub fn is_json(&self) -> bool {
        self.header("content-type")
            .map(|ct| ct.contains("application/json"))
            .unwrap_or(false)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body)
            .map_err(|e| Error::DeserializationError(format!("response body: {}", e)))
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// One network dispatch, without timeout, retry, or classification; the
/// client layers those on top. Implemented by [`HttpTransport`] for real
/// traffic and by scripted doubles in tests.
pub trait Transport: Send + Sync {
    async fn send(&self, url: &str, descriptor: &RequestDescriptor) -> Result<WireResponse>;
}

/// Production transport over a shared `reqwest` client.
#[derive(Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transport for HttpTransport {
    async fn send(&self, url: &str, descriptor: &RequestDescriptor) -> Result<WireResponse> {
        let mut request = match descriptor.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
            Method::Put => self.client.put(url),
            Method::Delete => self.client.delete(url),
        };

        for (name, value) in &descriptor.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &descriptor.body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| Error::ServerError {
            status: None,
            message: format!("network request failed: {}", e),
        })?;

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
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::ServerError {
                status: None,
                message: format!("failed to read response body: {}", e),
            })?
            .to_vec();

        Ok(WireResponse {
            status,
            headers,
            body,
        })
    }
}
