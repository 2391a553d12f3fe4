//! Timeout-bounded, retried, interceptable request client.
//!
//! One logical call runs as: merge the per-call descriptor over the client
//! defaults, run the request interceptors once, then dispatch with a
//! timeout. A 2xx response is returned (decoded as JSON when the content
//! type says so); a 4xx is terminal on first occurrence; a 5xx or
//! transport-level failure is retried with exponential backoff up to the
//! configured bound. A timeout is terminal and never retried.
//!
//! Retries re-dispatch the already-intercepted descriptor rather than
//! re-running the interceptor chain, so interceptors that attach headers
//! run exactly once per logical call.
//!
//! The client is unaware of caching; callers wanting memoized reads go
//! through [`crate::store::CacheStore`] themselves.

pub mod descriptor;
pub mod interceptor;
pub mod transport;

pub use descriptor::{Method, RequestDescriptor};
pub use interceptor::{bearer_interceptor, RequestInterceptor, ResponseInterceptor};
pub use transport::{HttpTransport, Transport, WireResponse};

use crate::error::{Error, Result};
use interceptor::{apply_request, apply_response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Client-wide defaults, overridable per call through the descriptor.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub retries: u32,
    pub retry_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            base_url: "http://localhost:8000/api".to_string(),
            timeout: Duration::from_secs(30),
            retries: 3,
            retry_delay: Duration::from_secs(1),
        }
    }
}

/// Structured error body sent by the server alongside non-2xx statuses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: String,
    #[serde(default)]
    error_code: Option<String>,
}

/// Server pagination envelope for list endpoints.
///
/// The items field accepts the server's collection-specific spellings.
/// Only `items`, `total`, and `has_next` are load-bearing; `page` and
/// `per_page` are echoed by the server, not required for correctness.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PageEnvelope<T> {
    #[serde(default = "Vec::new", alias = "photos", alias = "persons")]
    pub items: Vec<T>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub per_page: u32,
    #[serde(default)]
    pub has_next: bool,
}

/// Request client over a pluggable transport.
///
/// # Example
///
/// ```ignore
/// use fetch_kit::client::{bearer_interceptor, ClientConfig, RequestClient};
///
/// let mut client = RequestClient::new(ClientConfig::default());
/// client.add_request_interceptor(bearer_interceptor(|| read_token()));
///
/// let page = client.photos::<Photo>(1, 50).await?;
/// ```
pub struct RequestClient<T: Transport = HttpTransport> {
    transport: T,
    config: ClientConfig,
    request_interceptors: Vec<RequestInterceptor>,
    response_interceptors: Vec<ResponseInterceptor>,
}

impl RequestClient<HttpTransport> {
    pub fn new(config: ClientConfig) -> Self {
        Self::with_transport(HttpTransport::new(), config)
    }
}

impl<T: Transport> RequestClient<T> {
    pub fn with_transport(transport: T, config: ClientConfig) -> Self {
        RequestClient {
            transport,
            config,
            request_interceptors: Vec::new(),
            response_interceptors: Vec::new(),
        }
    }

    /// Register a request interceptor. Interceptors run in registration
    /// order, once per logical call.
    pub fn add_request_interceptor(&mut self, interceptor: RequestInterceptor) {
        self.request_interceptors.push(interceptor);
    }

    pub fn add_response_interceptor(&mut self, interceptor: ResponseInterceptor) {
        self.response_interceptors.push(interceptor);
    }

    /// Execute a call and return the raw response.
    ///
    /// This is the full pipeline: interceptors, timeout, retry, and status
    /// classification. Non-JSON payloads (image bytes, archives) come back
    /// untouched.
    pub async fn send_raw(&self, descriptor: RequestDescriptor) -> Result<WireResponse> {
        let descriptor = apply_request(&self.request_interceptors, descriptor);
        let timeout = descriptor.timeout.unwrap_or(self.config.timeout);
        let retries = descriptor.retries.unwrap_or(self.config.retries);
        let retry_delay = descriptor.retry_delay.unwrap_or(self.config.retry_delay);
        let url = self.build_url(&descriptor)?;

        let mut attempt = 0u32;
        loop {
            debug!(
                "» {} {} (attempt {}/{})",
                descriptor.method,
                url,
                attempt + 1,
                retries + 1
            );

            match self.dispatch(&url, &descriptor, timeout).await {
                Ok(response) => {
                    debug!("✓ {} {} -> {}", descriptor.method, url, response.status);
                    return Ok(response);
                }
                Err(e) if e.is_retryable() && attempt < retries => {
                    let delay = retry_delay * 2u32.pow(attempt);
                    debug!("✗ {} {} failed ({}), retrying in {:?}", descriptor.method, url, e, delay);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// One attempt: dispatch with a timeout, run response interceptors,
    /// classify the status.
    async fn dispatch(
        &self,
        url: &str,
        descriptor: &RequestDescriptor,
        timeout: Duration,
    ) -> Result<WireResponse> {
        let raw = match tokio::time::timeout(timeout, self.transport.send(url, descriptor)).await {
            Ok(result) => result?,
            // The in-flight call is abandoned; whatever it eventually
            // resolves to is dropped with its future.
            Err(_) => return Err(Error::Timeout(timeout)),
        };

        classify(apply_response(&self.response_interceptors, raw))
    }

    fn build_url(&self, descriptor: &RequestDescriptor) -> Result<String> {
        let joined = format!(
            "{}{}",
            self.config.base_url.trim_end_matches('/'),
            descriptor.path
        );
        let mut url = reqwest::Url::parse(&joined)
            .map_err(|e| Error::ConfigError(format!("invalid request URL {}: {}", joined, e)))?;

        if !descriptor.query.is_empty() {
            url.query_pairs_mut().extend_pairs(
                descriptor
                    .query
                    .iter()
                    .map(|(k, v)| (k.as_str(), v.as_str())),
            );
        }
        Ok(url.into())
    }

    /// Execute a call and decode the JSON body.
    pub async fn request<R: DeserializeOwned>(&self, descriptor: RequestDescriptor) -> Result<R> {
        let response = self.send_raw(descriptor).await?;
        if !response.is_json() {
            return Err(Error::DeserializationError(format!(
                "expected JSON response, got content type {:?}",
                response.header("content-type").unwrap_or("<none>")
            )));
        }
        response.json()
    }

    pub async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R> {
        self.request(RequestDescriptor::get(path)).await
    }

    pub async fn post<B: Serialize, R: DeserializeOwned>(&self, path: &str, body: &B) -> Result<R> {
        let body = serde_json::to_value(body)
            .map_err(|e| Error::SerializationError(format!("request body: {}", e)))?;
        self.request(RequestDescriptor::post(path).with_body(body)).await
    }

    pub async fn put<B: Serialize, R: DeserializeOwned>(&self, path: &str, body: &B) -> Result<R> {
        let body = serde_json::to_value(body)
            .map_err(|e| Error::SerializationError(format!("request body: {}", e)))?;
        self.request(RequestDescriptor::put(path).with_body(body)).await
    }

    /// DELETE, tolerating an empty 204 body.
    pub async fn delete(&self, path: &str) -> Result<()> {
        self.send_raw(RequestDescriptor::delete(path)).await?;
        Ok(())
    }

    // Named domain calls. These only fix endpoint, method, and query
    // encoding; the item types stay generic because the domain schema is
    // opaque to this layer.

    pub async fn photos<R: DeserializeOwned>(
        &self,
        page: u32,
        per_page: u32,
    ) -> Result<PageEnvelope<R>> {
        self.request(
            RequestDescriptor::get("/photos")
                .with_query("page", page)
                .with_query("per_page", per_page),
        )
        .await
    }

    pub async fn person_photos<R: DeserializeOwned>(
        &self,
        person_id: &str,
        page: u32,
        per_page: u32,
    ) -> Result<PageEnvelope<R>> {
        self.request(
            RequestDescriptor::get(format!("/persons/{}/photos", person_id))
                .with_query("page", page)
                .with_query("per_page", per_page),
        )
        .await
    }

    pub async fn photo<R: DeserializeOwned>(&self, photo_id: &str) -> Result<R> {
        self.get(&format!("/photos/{}", photo_id)).await
    }

    pub async fn persons<R: DeserializeOwned>(&self) -> Result<PageEnvelope<R>> {
        self.get("/persons").await
    }

    pub async fn person<R: DeserializeOwned>(&self, person_id: &str) -> Result<R> {
        self.get(&format!("/persons/{}", person_id)).await
    }

    pub async fn search_persons<R: DeserializeOwned>(&self, query: &str) -> Result<R> {
        self.request(RequestDescriptor::get("/persons/search").with_query("query", query))
            .await
    }

    pub async fn health<R: DeserializeOwned>(&self) -> Result<R> {
        self.get("/health").await
    }
}

/// Map a response status onto the failure taxonomy.
///
/// 2xx passes through; 4xx is a client failure built from the structured
/// error body when one parses; 5xx is a server failure eligible for retry.
fn classify(response: WireResponse) -> Result<WireResponse> {
    match response.status {
        200..=299 => Ok(response),
        status @ 400..=499 => {
            let (message, code) = error_body(&response, status);
            Err(Error::ClientError {
                status,
                code,
                message,
            })
        }
        status => {
            let (message, _) = error_body(&response, status);
            Err(Error::ServerError {
                status: Some(status),
                message,
            })
        }
    }
}

/// Pull `{ detail, error_code }` out of an error response, falling back to
/// a synthesized `"HTTP <status>: <reason>"` message.
fn error_body(response: &WireResponse, status: u16) -> (String, Option<String>) {
    if let Ok(body) = serde_json::from_slice::<ErrorBody>(&response.body) {
        return (body.detail, body.error_code);
    }
    let reason = reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown");
    (format!("HTTP {}: {}", status, reason), None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    fn json_response(status: u16, body: serde_json::Value) -> WireResponse {
        WireResponse {
            status,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: body.to_string().into_bytes(),
        }
    }

    /// Transport answering from a script, one response per attempt. The
    /// last script entry repeats once the script is exhausted.
    struct ScriptedTransport {
        script: Mutex<VecDeque<WireResponse>>,
        last: WireResponse,
        attempts: AtomicU32,
        seen: Mutex<Vec<RequestDescriptor>>,
    }

    impl ScriptedTransport {
        fn new(script: Vec<WireResponse>, last: WireResponse) -> Self {
            ScriptedTransport {
                script: Mutex::new(script.into()),
                last,
                attempts: AtomicU32::new(0),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn always(response: WireResponse) -> Self {
            Self::new(Vec::new(), response)
        }

        fn attempts(&self) -> u32 {
            self.attempts.load(Ordering::SeqCst)
        }
    }

    impl Transport for ScriptedTransport {
        async fn send(&self, _url: &str, descriptor: &RequestDescriptor) -> crate::Result<WireResponse> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            self.seen
                .lock()
                .expect("Failed to lock seen")
                .push(descriptor.clone());
            let next = self
                .script
                .lock()
                .expect("Failed to lock script")
                .pop_front();
            Ok(next.unwrap_or_else(|| self.last.clone()))
        }
    }

    /// Transport whose calls never settle.
    struct StalledTransport {
        attempts: AtomicU32,
    }

    impl Transport for StalledTransport {
        async fn send(&self, _url: &str, _descriptor: &RequestDescriptor) -> crate::Result<WireResponse> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            futures::future::pending().await
        }
    }

    fn fast_config() -> ClientConfig {
        ClientConfig {
            base_url: "http://test.local/api".to_string(),
            timeout: Duration::from_millis(100),
            retries: 2,
            retry_delay: Duration::from_millis(10),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_failure_retried_to_bound() {
        let transport = ScriptedTransport::always(json_response(
            503,
            json!({"detail": "overloaded", "error_code": "EXTERNAL_SERVICE_ERROR"}),
        ));
        let client = RequestClient::with_transport(transport, fast_config());

        let result: crate::Result<serde_json::Value> = client.get("/photos").await;

        // 1 initial + 2 retries.
        assert_eq!(client.transport.attempts(), 3);
        match result {
            Err(Error::ServerError { status, message }) => {
                assert_eq!(status, Some(503));
                assert_eq!(message, "overloaded");
            }
            other => panic!("expected ServerError, got {:?}", other.err()),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_failure_is_terminal() {
        let transport = ScriptedTransport::always(json_response(
            404,
            json!({"detail": "photo not found", "error_code": "NOT_FOUND"}),
        ));
        let client = RequestClient::with_transport(transport, fast_config());

        let result: crate::Result<serde_json::Value> = client.get("/photos/missing").await;

        assert_eq!(client.transport.attempts(), 1);
        match result {
            Err(Error::ClientError { status, code, message }) => {
                assert_eq!(status, 404);
                assert_eq!(code.as_deref(), Some("NOT_FOUND"));
                assert_eq!(message, "photo not found");
            }
            other => panic!("expected ClientError, got {:?}", other.err()),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_terminal_regardless_of_retries() {
        let transport = StalledTransport {
            attempts: AtomicU32::new(0),
        };
        let client = RequestClient::with_transport(
            transport,
            ClientConfig {
                timeout: Duration::from_millis(50),
                retries: 5,
                ..fast_config()
            },
        );

        let result: crate::Result<serde_json::Value> = client.get("/slow").await;

        assert_eq!(client.transport.attempts.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(Error::Timeout(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovery_after_transient_failure() {
        let transport = ScriptedTransport::new(
            vec![json_response(500, json!({"detail": "hiccup"}))],
            json_response(200, json!({"ok": true})),
        );
        let client = RequestClient::with_transport(transport, fast_config());

        let value: serde_json::Value = client.get("/flaky").await.expect("Failed to recover");
        assert_eq!(value, json!({"ok": true}));
        assert_eq!(client.transport.attempts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unparseable_error_body_synthesizes_message() {
        let transport = ScriptedTransport::always(WireResponse {
            status: 502,
            headers: vec![("content-type".to_string(), "text/html".to_string())],
            body: b"<html>bad gateway</html>".to_vec(),
        });
        let client = RequestClient::with_transport(
            transport,
            ClientConfig {
                retries: 0,
                ..fast_config()
            },
        );

        let result: crate::Result<serde_json::Value> = client.get("/x").await;
        match result {
            Err(Error::ServerError { message, .. }) => {
                assert_eq!(message, "HTTP 502: Bad Gateway");
            }
            other => panic!("expected ServerError, got {:?}", other.err()),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_interceptors_run_once_per_logical_call() {
        let transport = ScriptedTransport::new(
            vec![json_response(500, json!({"detail": "hiccup"}))],
            json_response(200, json!({})),
        );
        let mut client = RequestClient::with_transport(transport, fast_config());
        client.add_request_interceptor(bearer_interceptor(|| Some("tok".to_string())));

        let _: serde_json::Value = client.get("/photos").await.expect("Failed to fetch");

        // Both attempts carried exactly one Authorization header: the
        // retry re-dispatched the already-intercepted descriptor.
        let seen = client.transport.seen.lock().expect("Failed to lock seen");
        assert_eq!(seen.len(), 2);
        for descriptor in seen.iter() {
            let auth_headers = descriptor
                .headers
                .iter()
                .filter(|(n, _)| n.eq_ignore_ascii_case("authorization"))
                .count();
            assert_eq!(auth_headers, 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_encoding() {
        let transport = ScriptedTransport::always(json_response(200, json!({})));
        let client = RequestClient::with_transport(transport, fast_config());

        let _: serde_json::Value = client
            .request(RequestDescriptor::get("/persons/search").with_query("query", "a b&c"))
            .await
            .expect("Failed to fetch");

        let url = client
            .build_url(&RequestDescriptor::get("/persons/search").with_query("query", "a b&c"))
            .expect("Failed to build URL");
        assert_eq!(url, "http://test.local/api/persons/search?query=a+b%26c");
    }

    #[tokio::test(start_paused = true)]
    async fn test_pagination_envelope_accepts_server_spellings() {
        let transport = ScriptedTransport::always(json_response(
            200,
            json!({
                "photos": [{"id": "p1"}, {"id": "p2"}],
                "total": 10,
                "page": 1,
                "per_page": 2,
                "has_next": true
            }),
        ));
        let client = RequestClient::with_transport(transport, fast_config());

        let page: PageEnvelope<serde_json::Value> =
            client.photos(1, 2).await.expect("Failed to fetch");
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total, 10);
        assert!(page.has_next);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_json_success_rejected_by_typed_request() {
        let transport = ScriptedTransport::always(WireResponse {
            status: 200,
            headers: vec![("content-type".to_string(), "image/jpeg".to_string())],
            body: vec![0xff, 0xd8],
        });
        let client = RequestClient::with_transport(transport, fast_config());

        let typed: crate::Result<serde_json::Value> = client.get("/photos/p1/download").await;
        assert!(matches!(typed, Err(Error::DeserializationError(_))));

        // The raw path hands the bytes back untouched.
        let raw = client
            .send_raw(RequestDescriptor::get("/photos/p1/download"))
            .await
            .expect("Failed to fetch raw");
        assert_eq!(raw.body, vec![0xff, 0xd8]);
    }
}
