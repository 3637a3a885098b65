//! The reqwest-backed [`Transport`] implementation.

use async_trait::async_trait;
use redcap::{Transport, TransportFailure, WireRequest, WireResponse};

/// Executes wire requests over a shared [`reqwest::Client`].
///
/// Cheap to clone; the inner client pools connections.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    /// Creates a transport with reqwest's default client (no timeout).
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps a caller-configured client, e.g. one with timeouts, proxies,
    /// or a custom TLS setup.
    pub fn from_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: WireRequest) -> Result<WireResponse, TransportFailure> {
        let response = self
            .http
            .post(&request.url)
            .header(reqwest::header::CONTENT_TYPE, request.content_type)
            .body(request.body)
            .send()
            .await
            .map_err(|err| TransportFailure {
                cause: error_chain(&err),
                url: Some(request.url.clone()),
            })?;

        let status = response.status();
        let url = response.url().to_string();
        // Best-effort: a failed body read on an error response must not
        // mask the status we already have.
        let body = match response.bytes().await {
            Ok(bytes) => Some(bytes.to_vec()),
            Err(err) => {
                tracing::warn!(status = status.as_u16(), error = %err, "body read failed");
                None
            }
        };

        Ok(WireResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            url: Some(url),
            body,
        })
    }
}

/// Flattens an error and its source chain into one cause string, so
/// classification heuristics see the OS-level detail (`ECONNREFUSED`,
/// `timed out`, DNS messages) reqwest buries in its sources.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}
