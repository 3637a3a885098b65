//! Transport port for the single REDCap endpoint.
//!
//! The compatibility layer never performs HTTP itself: it serialises one
//! form-encoded POST into a [`WireRequest`] and hands it to an injected
//! [`Transport`]. Infrastructure crates implement the trait (see
//! `redcap-transport` for the reqwest-backed one); tests implement it with
//! scripted in-process doubles.
//!
//! The client applies no timeout of its own — a caller needing one must
//! inject a transport that enforces it.

use async_trait::async_trait;
use thiserror::Error;

/// Content type of every request this layer produces.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// One outgoing request: always a POST of a form-encoded body to the
/// project's single endpoint URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireRequest {
    /// Endpoint URL.
    pub url: String,
    /// HTTP method. Always `POST` for REDCap.
    pub method: &'static str,
    /// Body content type.
    pub content_type: &'static str,
    /// Percent-encoded form body, token included.
    pub body: String,
}

impl WireRequest {
    /// Builds the standard form POST.
    pub fn post_form(url: impl Into<String>, body: String) -> Self {
        Self {
            url: url.into(),
            method: "POST",
            content_type: FORM_CONTENT_TYPE,
            body,
        }
    }
}

/// A completed HTTP exchange, however the status turned out.
///
/// `body` is a best-effort read: a failure while draining the body of an
/// error response must not mask the status, so it degrades to `None`
/// rather than failing the exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireResponse {
    /// HTTP status code.
    pub status: u16,
    /// Status reason phrase, empty when the transport had none.
    pub status_text: String,
    /// Final request URL, when the transport knew it.
    pub url: Option<String>,
    /// Response body bytes, when readable.
    pub body: Option<Vec<u8>>,
}

impl WireResponse {
    /// True for 2xx statuses.
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The body as bytes, when readable.
    pub fn body_bytes(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// The body as text (lossy UTF-8), when readable.
    pub fn body_text(&self) -> Option<String> {
        self.body
            .as_deref()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }
}

/// The transport could not produce any HTTP response: DNS failure, refused
/// connection, TLS failure, timeout.
///
/// `cause` is the transport's raw description; the client classifies it
/// into [`crate::RedcapError::Network`] untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("transport failure: {cause}")]
pub struct TransportFailure {
    /// Raw cause, as reported by the transport.
    pub cause: String,
    /// Request URL, when known.
    pub url: Option<String>,
}

/// Executes one HTTP exchange. Injected at client construction, never
/// selected internally.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Performs the exchange, resolving with a [`WireResponse`] for *any*
    /// completed HTTP status and rejecting only when no response exists.
    async fn execute(&self, request: WireRequest) -> Result<WireResponse, TransportFailure>;
}
