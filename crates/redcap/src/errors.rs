//! Error taxonomy for the REDCap compatibility layer.
//!
//! [`RedcapError`] covers the three network-adjacent failure channels every
//! operation can produce. The channel records *where* the failure was
//! observed, not its cause:
//!
//! - [`RedcapError::Network`] — no HTTP response exists yet (DNS failure,
//!   refused connection, TLS failure, timeout, transport-level panic).
//! - [`RedcapError::Http`] — the HTTP exchange completed but the status is
//!   400 or above.
//! - [`RedcapError::Api`] — the HTTP exchange returned a success status but
//!   the JSON payload carries `{"error": ..., "code"?: ...}` — REDCap's
//!   signature for an application-level failure smuggled through a 200.
//!
//! Classification predicates (`is_retryable`, `is_auth_error`, …) are derived
//! from the carried data, never stored. No error is recovered, merged, or
//! downgraded inside this crate; every operation surfaces the typed kind to
//! its caller. Mapping these kinds to outward HTTP statuses is the embedding
//! service's concern.
//!
//! Local, pre-network failures have their own types: [`FormatError`] from
//! branded-identifier construction, [`VersionParseError`] and
//! [`UnsupportedVersionError`] from version resolution.

use thiserror::Error;

use crate::version::Version;

// ---------------------------------------------------------------------------
// Network-adjacent failure kinds
// ---------------------------------------------------------------------------

/// Failure of one REDCap operation, tagged by the channel it was observed on.
///
/// Exactly one kind is produced per failed operation; a caller can match on
/// the variant or use the derived predicates below.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RedcapError {
    /// The transport failed before any HTTP response existed.
    #[error("network failure: {cause}")]
    Network {
        /// Raw cause reported by the transport (e.g. `"connection refused"`).
        cause: String,
        /// Request URL, when the transport knew it.
        url: Option<String>,
    },

    /// The HTTP exchange completed with a status of 400 or above.
    #[error("HTTP {status} {status_text}")]
    Http {
        /// HTTP status code (400–599).
        status: u16,
        /// Status reason phrase (e.g. `"Too Many Requests"`).
        status_text: String,
        /// Best-effort read of the response body, for diagnostics.
        body: Option<String>,
        /// Request URL, when known.
        url: Option<String>,
    },

    /// A success status whose JSON payload carried an `error` key.
    #[error("REDCap API error: {message}")]
    Api {
        /// The `error` value from the payload.
        message: String,
        /// The optional `code` value from the payload.
        code: Option<i64>,
        /// HTTP status the payload arrived with, when known.
        status: Option<u16>,
    },
}

impl RedcapError {
    /// True for HTTP 401 or 403.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Self::Http { status: 401 | 403, .. })
    }

    /// True for HTTP 429.
    pub fn is_rate_limit_error(&self) -> bool {
        matches!(self, Self::Http { status: 429, .. })
    }

    /// True when retrying the same request may succeed.
    ///
    /// HTTP 429 and any 5xx are retryable. A network failure is retryable
    /// only for timeouts and refused connections — DNS failures usually
    /// signal misconfiguration and are not retried. API-level errors are
    /// never retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http { status, .. } => *status == 429 || (500..=599).contains(status),
            Self::Network { .. } => self.is_timeout() || self.is_connection_refused(),
            Self::Api { .. } => false,
        }
    }

    /// True when a [`RedcapError::Network`] cause looks like a timeout.
    pub fn is_timeout(&self) -> bool {
        self.cause_contains(&["timeout", "timed out"])
    }

    /// True when a [`RedcapError::Network`] cause looks like a DNS failure.
    pub fn is_dns_error(&self) -> bool {
        self.cause_contains(&["dns", "name resolution", "failed to lookup", "getaddrinfo"])
    }

    /// True when a [`RedcapError::Network`] cause looks like a refused
    /// connection.
    pub fn is_connection_refused(&self) -> bool {
        self.cause_contains(&["connection refused", "econnrefused"])
    }

    /// True when a [`RedcapError::Api`] message reports an invalid token.
    pub fn is_invalid_token(&self) -> bool {
        self.message_matches(|m| {
            m.contains("token") && (m.contains("invalid") || m.contains("not valid"))
        })
    }

    /// True when a [`RedcapError::Api`] message reports missing permissions.
    pub fn is_permission_error(&self) -> bool {
        self.message_matches(|m| m.contains("permission") || m.contains("privileges"))
    }

    /// True when a [`RedcapError::Api`] message reports rejected field data.
    pub fn is_validation_error(&self) -> bool {
        self.message_matches(|m| {
            m.contains("validation") || m.contains("could not be validated")
        })
    }

    fn cause_contains(&self, needles: &[&str]) -> bool {
        match self {
            Self::Network { cause, .. } => {
                let cause = cause.to_ascii_lowercase();
                needles.iter().any(|n| cause.contains(n))
            }
            _ => false,
        }
    }

    fn message_matches(&self, predicate: impl Fn(&str) -> bool) -> bool {
        match self {
            Self::Api { message, .. } => predicate(&message.to_ascii_lowercase()),
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Local, pre-network failures
// ---------------------------------------------------------------------------

/// A value offered to a branded-identifier constructor violated its format.
///
/// Produced before any network access; `pattern` names the violated format
/// in human-readable terms.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} {value:?}: expected {pattern}")]
pub struct FormatError {
    /// The identifier kind (e.g. `"token"`, `"record id"`).
    pub kind: &'static str,
    /// Description of the required format.
    pub pattern: &'static str,
    /// The rejected input, verbatim.
    pub value: String,
}

/// A version string did not have the `major.minor.patch` shape.
///
/// Carries the original input so callers can report exactly what the server
/// (or configuration) produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unparseable REDCap version {input:?}: expected three dot-separated non-negative integers")]
pub struct VersionParseError {
    /// The rejected input, verbatim.
    pub input: String,
}

/// No registered capability adapter covers the resolved server version.
///
/// `nearest_min`/`nearest_max` carry the closest supported bounds when the
/// registry knows them, so callers can say "upgrade to at least X" or
/// "versions from Y on are not yet supported".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unsupported REDCap version {version}")]
pub struct UnsupportedVersionError {
    /// The version that failed to match any registered range.
    pub version: Version,
    /// Lowest supported version, when the registry is non-empty.
    pub nearest_min: Option<Version>,
    /// Exclusive upper bound of the newest supported band, when bounded.
    pub nearest_max: Option<Version>,
}
