//! Request/response HTTP abstraction for region-to-region calls.
//!
//! Every remote interaction in Gridlink (agent hand-off, event delivery,
//! grid directory lookups) goes through the [`Transport`] trait, so the
//! components can be exercised against a recording fake in tests and
//! against [`HttpTransport`] (`reqwest`) in production. Bodies are JSON
//! maps in both directions.
//!
//! The trait call is the synchronous variant from the caller's point of
//! view (it awaits the response). The fire-and-forget variant is obtained
//! by running the call on a [`Dispatcher`](crate::dispatch::Dispatcher).

use std::time::Duration;

use async_trait::async_trait;

/// HTTP verb of a transport request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Create.
    Post,
    /// Replace / update.
    Put,
    /// Read.
    Get,
    /// Remove.
    Delete,
}

impl Method {
    /// Upper-case verb, for logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Get => "GET",
            Self::Delete => "DELETE",
        }
    }
}

impl core::fmt::Display for Method {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One request to a remote endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    /// HTTP verb.
    pub method: Method,
    /// Absolute URL.
    pub url: String,
    /// JSON body, if any.
    pub body: Option<serde_json::Value>,
    /// Per-request timeout; `None` uses the transport's default.
    pub timeout: Option<Duration>,
}

impl TransportRequest {
    /// A request without body or timeout.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            body: None,
            timeout: None,
        }
    }

    /// Attach a JSON body.
    #[must_use]
    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Set (or clear) the timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Failures of a single transport call.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The endpoint could not be reached (refused, DNS, reset).
    #[error("{url} unreachable: {message}")]
    Unreachable {
        /// Target URL.
        url: String,
        /// Description from the HTTP client.
        message: String,
    },

    /// The call did not complete in time.
    #[error("{url} timed out")]
    Timeout {
        /// Target URL.
        url: String,
    },

    /// The endpoint answered with a non-success status.
    #[error("{url} returned {status}: {body}")]
    Status {
        /// Target URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// The endpoint answered with something that is not JSON.
    #[error("{url} returned a malformed body: {message}")]
    Malformed {
        /// Target URL.
        url: String,
        /// Parser message.
        message: String,
    },
}

/// A request/response channel to remote region servers.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one request and return the decoded JSON response body.
    ///
    /// An empty response body decodes to `null`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the endpoint is unreachable, times
    /// out, answers with a non-success status, or returns malformed JSON.
    async fn send(&self, request: TransportRequest) -> Result<serde_json::Value, TransportError>;
}

/// [`Transport`] over HTTP using `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    default_timeout: Option<Duration>,
}

impl HttpTransport {
    /// Create a transport with an optional default per-request timeout.
    pub fn new(default_timeout: Option<Duration>) -> Self {
        Self {
            client: reqwest::Client::new(),
            default_timeout,
        }
    }

    fn classify(url: &str, error: &reqwest::Error) -> TransportError {
        if error.is_timeout() {
            TransportError::Timeout {
                url: url.to_owned(),
            }
        } else {
            TransportError::Unreachable {
                url: url.to_owned(),
                message: error.to_string(),
            }
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: TransportRequest) -> Result<serde_json::Value, TransportError> {
        let TransportRequest {
            method,
            url,
            body,
            timeout,
        } = request;

        let mut builder = match method {
            Method::Post => self.client.post(&url),
            Method::Put => self.client.put(&url),
            Method::Get => self.client.get(&url),
            Method::Delete => self.client.delete(&url),
        };
        if let Some(limit) = timeout.or(self.default_timeout) {
            builder = builder.timeout(limit);
        }
        if let Some(body) = &body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Self::classify(&url, &e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Self::classify(&url, &e))?;

        if !status.is_success() {
            // Hand-off endpoints answer refusals with a JSON body and a
            // 4xx status; surface that body instead of discarding it.
            if let Ok(value) = serde_json::from_str::<serde_json::Value>(&text) {
                if value.get("success").is_some() {
                    return Ok(value);
                }
            }
            return Err(TransportError::Status {
                url,
                status: status.as_u16(),
                body: text,
            });
        }

        if text.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }

        serde_json::from_str(&text).map_err(|e| TransportError::Malformed {
            url,
            message: e.to_string(),
        })
    }
}

/// Join a base URI and a path without doubling or dropping the slash.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_url_normalises_slashes() {
        assert_eq!(join_url("http://a:9000/", "/agent/x/"), "http://a:9000/agent/x/");
        assert_eq!(join_url("http://a:9000", "agent/x/"), "http://a:9000/agent/x/");
    }

    #[test]
    fn request_builder_sets_fields() {
        let request = TransportRequest::new(Method::Delete, "http://a/agent/1/")
            .with_body(serde_json::json!({ "k": 1 }))
            .with_timeout(Some(Duration::from_secs(10)));
        assert_eq!(request.method, Method::Delete);
        assert_eq!(request.timeout, Some(Duration::from_secs(10)));
        assert!(request.body.is_some());
    }

    #[test]
    fn method_display_is_upper_case() {
        assert_eq!(Method::Put.to_string(), "PUT");
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_an_error() {
        // Port 9 (discard) on loopback is closed in test environments.
        let transport = HttpTransport::new(Some(Duration::from_secs(2)));
        let result = transport
            .send(TransportRequest::new(Method::Get, "http://127.0.0.1:9/health"))
            .await;
        assert!(matches!(
            result,
            Err(TransportError::Unreachable { .. } | TransportError::Timeout { .. })
        ));
    }
}
