use async_trait::async_trait;
use exn::ResultExt;
use std::time::Duration;

use crate::client::InvalidationRequest;
use crate::error::{ErrorKind, Result};

/// Status and body of a response; headers are not needed by callers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Sends a prepared [`InvalidationRequest`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(&self, request: &InvalidationRequest) -> Result<HttpResponse>;
}

/// [`Transport`] backed by a `reqwest` client with rustls.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
}
impl HttpTransport {
    /// Requests that take longer than `timeout` fail with [`ErrorKind::Network`].
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .or_raise(|| ErrorKind::Network("could not build HTTP client".to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, request: &InvalidationRequest) -> Result<HttpResponse> {
        let mut builder = self.client.post(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let response = builder
            .body(request.body.clone())
            .send()
            .await
            .or_raise(|| ErrorKind::Network(format!("POST {}", request.url)))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .or_raise(|| ErrorKind::Network(format!("reading response from {}", request.url)))?;
        Ok(HttpResponse { status, body })
    }
}

/// Logs requests instead of sending them and reports them as accepted.
#[derive(Clone, Copy, Debug, Default)]
pub struct DryRunTransport;

#[async_trait]
impl Transport for DryRunTransport {
    async fn post(&self, request: &InvalidationRequest) -> Result<HttpResponse> {
        tracing::info!(url = %request.url, path = %request.path, "Dry run; not sending invalidation");
        tracing::debug!(body = %request.body, "Invalidation batch");
        Ok(HttpResponse { status: 201, body: String::new() })
    }
}

/// Records every request and answers with a fixed response.
#[cfg(any(test, feature = "mock"))]
pub struct MockTransport {
    status: u16,
    body: String,
    fail: bool,
    requests: tokio::sync::Mutex<Vec<InvalidationRequest>>,
}
#[cfg(any(test, feature = "mock"))]
impl MockTransport {
    pub fn responding(status: u16, body: impl Into<String>) -> Self {
        Self { status, body: body.into(), fail: false, requests: Default::default() }
    }

    /// Every request fails with [`ErrorKind::Network`].
    pub fn unreachable() -> Self {
        Self { fail: true, ..Self::responding(0, "") }
    }

    pub async fn requests(&self) -> Vec<InvalidationRequest> {
        self.requests.lock().await.clone()
    }
}
#[cfg(any(test, feature = "mock"))]
impl Default for MockTransport {
    fn default() -> Self {
        Self::responding(201, "<Invalidation><Status>InProgress</Status></Invalidation>")
    }
}

#[cfg(any(test, feature = "mock"))]
#[async_trait]
impl Transport for MockTransport {
    async fn post(&self, request: &InvalidationRequest) -> Result<HttpResponse> {
        self.requests.lock().await.push(request.clone());
        if self.fail {
            exn::bail!(ErrorKind::Network(format!("POST {}", request.url)));
        }
        Ok(HttpResponse { status: self.status, body: self.body.clone() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Credentials;
    use time::OffsetDateTime;

    fn request(endpoint: &str) -> InvalidationRequest {
        let credentials = Credentials::new("AKID", "secret");
        InvalidationRequest::build(endpoint, "E1", &credentials, &["a.css"], OffsetDateTime::UNIX_EPOCH).unwrap()
    }

    #[tokio::test]
    async fn test_stalled_endpoint_times_out() {
        // Accepts connections and never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());
        let silent = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        let transport = HttpTransport::new(Duration::from_millis(200)).unwrap();

        let req = request(&endpoint);
        let post = transport.post(&req);
        let err = tokio::time::timeout(Duration::from_secs(10), post)
            .await
            .expect("request must fail within the configured timeout")
            .unwrap_err();
        assert!(matches!(&*err, ErrorKind::Network(_)));
        assert!(err.is_retryable());
        silent.abort();
    }

    #[tokio::test]
    async fn test_dry_run_accepts_without_sending() {
        let response = DryRunTransport.post(&request("https://cdn.invalid")).await.unwrap();
        assert_eq!(response.status, 201);
    }
}
