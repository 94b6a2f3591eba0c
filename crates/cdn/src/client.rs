use std::fmt;
use std::sync::Arc;
use time::OffsetDateTime;

use crate::error::Result;
use crate::payload::invalidation_batch;
use crate::sign::{authorization, http_date, signature};
use crate::transport::Transport;

pub const DEFAULT_ENDPOINT: &str = "https://cloudfront.amazonaws.com";
const API_VERSION: &str = "2010-11-01";
const ACCEPTED: u16 = 201;

/// Static key pair shared with the object store.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}
impl Credentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self { access_key_id: access_key_id.into(), secret_access_key: secret_access_key.into() }
    }
}
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

/// A fully signed invalidation request, ready to send.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvalidationRequest {
    pub url: String,
    /// Request path relative to the endpoint, as reported on failure.
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}
impl InvalidationRequest {
    /// Builds and signs the request for `keys` as of `now`.
    ///
    /// Deterministic for a fixed `now`: the caller reference and signature
    /// are both derived from it.
    pub fn build<S: AsRef<str>>(
        endpoint: &str,
        distribution_id: &str,
        credentials: &Credentials,
        keys: &[S],
        now: OffsetDateTime,
    ) -> Result<Self> {
        let path = format!("/{API_VERSION}/distribution/{distribution_id}/invalidation");
        let date = http_date(now)?;
        let signature = signature(&credentials.secret_access_key, &date)?;
        let caller_reference = format!("{distribution_id}_{}", now.unix_timestamp());
        Ok(Self {
            url: format!("{}{path}", endpoint.trim_end_matches('/')),
            path,
            headers: vec![
                ("x-amz-date".to_string(), date),
                ("Content-Type".to_string(), "text/xml".to_string()),
                ("Authorization".to_string(), authorization(&credentials.access_key_id, &signature)),
            ],
            body: invalidation_batch(keys, &caller_reference),
        })
    }
}

/// Everything needed to diagnose a rejected invalidation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvalidationFailure {
    pub status: u16,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub request_body: String,
    pub response_body: String,
}
impl fmt::Display for InvalidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalidation request to {} rejected with status {}", self.path, self.status)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvalidationOutcome {
    /// There was nothing to invalidate; no request was sent.
    Skipped,
    /// The distribution accepted the batch.
    Accepted { paths: usize },
    /// The distribution answered with anything other than `201 Created`.
    Rejected(InvalidationFailure),
}
impl InvalidationOutcome {
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}
impl fmt::Display for InvalidationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skipped => f.write_str("nothing to invalidate"),
            Self::Accepted { paths } => write!(f, "invalidation accepted for {paths} path(s)"),
            Self::Rejected(failure) => failure.fmt(f),
        }
    }
}

/// Sends invalidation batches for a single distribution.
pub struct InvalidationClient {
    distribution_id: String,
    endpoint: String,
    credentials: Credentials,
    transport: Arc<dyn Transport>,
}
impl InvalidationClient {
    pub fn new(distribution_id: impl Into<String>, credentials: Credentials, transport: Arc<dyn Transport>) -> Self {
        Self {
            distribution_id: distribution_id.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            credentials,
            transport,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn distribution_id(&self) -> &str {
        &self.distribution_id
    }

    /// Invalidates `keys` in one request.
    ///
    /// An empty key set sends nothing. A response other than `201` is not an
    /// error: it is returned as [`InvalidationOutcome::Rejected`] so that the
    /// caller can report it. Only transport failures are errors.
    pub async fn invalidate<S: AsRef<str>>(&self, keys: &[S]) -> Result<InvalidationOutcome> {
        if keys.is_empty() {
            tracing::debug!(distribution = %self.distribution_id, "No changed objects; skipping invalidation");
            return Ok(InvalidationOutcome::Skipped);
        }
        let request = InvalidationRequest::build(
            &self.endpoint,
            &self.distribution_id,
            &self.credentials,
            keys,
            OffsetDateTime::now_utc(),
        )?;
        tracing::info!(distribution = %self.distribution_id, paths = keys.len(), "Invalidating changed objects");
        let response = self.transport.post(&request).await?;
        if response.status == ACCEPTED {
            tracing::info!(distribution = %self.distribution_id, paths = keys.len(), "Invalidation accepted");
            return Ok(InvalidationOutcome::Accepted { paths: keys.len() });
        }
        let failure = InvalidationFailure {
            status: response.status,
            path: request.path,
            headers: request.headers,
            request_body: request.body,
            response_body: response.body,
        };
        tracing::error!(
            status = failure.status,
            path = %failure.path,
            headers = ?failure.headers,
            request_body = %failure.request_body,
            response_body = %failure.response_body,
            "Invalidation request rejected"
        );
        Ok(InvalidationOutcome::Rejected(failure))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::transport::MockTransport;

    fn credentials() -> Credentials {
        Credentials::new("AKID", "secret")
    }

    fn at(unix: i64) -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(unix).unwrap()
    }

    #[test]
    fn test_build_request() {
        let request = InvalidationRequest::build(DEFAULT_ENDPOINT, "E123", &credentials(), &["css/app.css"], at(1_736_067_787))
            .unwrap();
        assert_eq!(request.url, "https://cloudfront.amazonaws.com/2010-11-01/distribution/E123/invalidation");
        assert_eq!(request.path, "/2010-11-01/distribution/E123/invalidation");
        assert_eq!(
            request.headers,
            vec![
                ("x-amz-date".to_string(), "Sun, 05 Jan 2025 09:03:07 GMT".to_string()),
                ("Content-Type".to_string(), "text/xml".to_string()),
                ("Authorization".to_string(), "AWS AKID:VaIAt9zov4q2qQMq9Xzwm8cK+SY=".to_string()),
            ]
        );
        assert!(request.body.contains("<Path>/css/app.css</Path>"));
        assert!(request.body.contains("<CallerReference>E123_1736067787</CallerReference>"));
    }

    #[test]
    fn test_build_is_deterministic() {
        let keys = ["a.css", "b.js"];
        let first = InvalidationRequest::build("http://localhost:9000/", "E1", &credentials(), &keys, at(1_700_000_000));
        let second = InvalidationRequest::build("http://localhost:9000/", "E1", &credentials(), &keys, at(1_700_000_000));
        assert_eq!(first.unwrap(), second.unwrap());
    }

    #[test]
    fn test_credentials_debug_redacted() {
        assert!(!format!("{:?}", credentials()).contains("\"secret\""));
    }

    #[tokio::test]
    async fn test_empty_keys_sends_nothing() {
        let transport = Arc::new(MockTransport::default());
        let client = InvalidationClient::new("E123", credentials(), transport.clone());
        let outcome = client.invalidate::<String>(&[]).await.unwrap();
        assert_eq!(outcome, InvalidationOutcome::Skipped);
        assert!(transport.requests().await.is_empty());
    }

    #[tokio::test]
    async fn test_one_post_per_batch() {
        let transport = Arc::new(MockTransport::default());
        let client = InvalidationClient::new("E123", credentials(), transport.clone());
        let outcome = client.invalidate(&["a.css", "b.js", "images/c.png"]).await.unwrap();
        assert_eq!(outcome, InvalidationOutcome::Accepted { paths: 3 });
        let requests = transport.requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].body.matches("<Path>").count(), 3);
    }

    #[tokio::test]
    async fn test_custom_endpoint() {
        let transport = Arc::new(MockTransport::default());
        let client = InvalidationClient::new("E9", credentials(), transport.clone()).with_endpoint("http://localhost:4566");
        client.invalidate(&["a.css"]).await.unwrap();
        assert_eq!(
            transport.requests().await[0].url,
            "http://localhost:4566/2010-11-01/distribution/E9/invalidation"
        );
    }

    #[tokio::test]
    async fn test_non_created_is_rejected() {
        let transport = Arc::new(MockTransport::responding(403, "<Error><Code>AccessDenied</Code></Error>"));
        let client = InvalidationClient::new("E123", credentials(), transport);
        let outcome = client.invalidate(&["a.css"]).await.unwrap();
        let InvalidationOutcome::Rejected(failure) = outcome else {
            panic!("expected rejection, got {outcome:?}");
        };
        assert_eq!(failure.status, 403);
        assert_eq!(failure.path, "/2010-11-01/distribution/E123/invalidation");
        assert!(failure.request_body.contains("<Path>/a.css</Path>"));
        assert!(failure.response_body.contains("AccessDenied"));
        assert_eq!(failure.headers.len(), 3);
    }

    #[tokio::test]
    async fn test_ok_is_not_created() {
        let transport = Arc::new(MockTransport::responding(200, ""));
        let client = InvalidationClient::new("E123", credentials(), transport);
        assert!(client.invalidate(&["a.css"]).await.unwrap().is_rejected());
    }

    #[tokio::test]
    async fn test_transport_error() {
        let transport = Arc::new(MockTransport::unreachable());
        let client = InvalidationClient::new("E123", credentials(), transport);
        let err = client.invalidate(&["a.css"]).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Network(_)));
        assert!(err.is_retryable());
    }
}
