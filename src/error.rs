// Error handling module
// Defines the switch error taxonomy and the HTTP failure it wraps

use reqwest::Method;
use thiserror::Error;

/// Maximum length for response bodies rendered in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Errors surfaced by the switch, the session manager and the controller
#[derive(Error, Debug)]
pub enum SwitchError {
    /// Required configuration missing or invalid at construction
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Credentials rejected or network failure during password grant
    #[error("Authentication failed: {0}")]
    AuthError(HttpFailure),

    /// Refresh token rejected or network failure during renewal
    #[error("Token refresh failed: {0}")]
    RefreshError(HttpFailure),

    /// Read/write of DNS server settings failed
    #[error("AdGuard DNS API error: {0}")]
    ApiError(HttpFailure),
}

impl SwitchError {
    /// HTTP status of the failed call, when the server answered
    pub fn status(&self) -> Option<u16> {
        self.http_failure().and_then(HttpFailure::status)
    }

    /// Response body of the failed call, when the server answered
    pub fn body(&self) -> Option<&str> {
        self.http_failure().and_then(HttpFailure::body)
    }

    pub fn http_failure(&self) -> Option<&HttpFailure> {
        match self {
            SwitchError::ConfigError(_) => None,
            SwitchError::AuthError(failure)
            | SwitchError::RefreshError(failure)
            | SwitchError::ApiError(failure) => Some(failure),
        }
    }
}

/// A failed HTTP exchange with the AdGuard DNS API
#[derive(Error, Debug)]
pub enum HttpFailure {
    /// Server answered with a non-2xx status
    #[error("{method} {url} returned {status}: {}", truncate_body(.body))]
    Status {
        method: Method,
        url: String,
        status: u16,
        body: String,
    },

    /// Request could not be assembled (invalid header, body serialization)
    #[error("request to {url} could not be built: {source}")]
    Build {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Request never produced a response (DNS, TLS, connect, timeout...)
    #[error("{method} {url} failed: {source}")]
    Transport {
        method: Method,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// 2xx response whose body did not have the expected shape
    #[error("{method} {url} returned an unexpected body: {reason}")]
    InvalidBody {
        method: Method,
        url: String,
        reason: String,
    },
}

impl HttpFailure {
    pub fn status(&self) -> Option<u16> {
        match self {
            HttpFailure::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn body(&self) -> Option<&str> {
        match self {
            HttpFailure::Status { body, .. } => Some(body.as_str()),
            _ => None,
        }
    }

    /// Method of the failed call; unknown when the request was never built
    pub fn method(&self) -> Option<&Method> {
        match self {
            HttpFailure::Build { .. } => None,
            HttpFailure::Status { method, .. }
            | HttpFailure::Transport { method, .. }
            | HttpFailure::InvalidBody { method, .. } => Some(method),
        }
    }

    pub fn url(&self) -> &str {
        match self {
            HttpFailure::Build { url, .. }
            | HttpFailure::Status { url, .. }
            | HttpFailure::Transport { url, .. }
            | HttpFailure::InvalidBody { url, .. } => url,
        }
    }

    /// Whether the server itself rejected the request
    pub fn is_rejection(&self) -> bool {
        matches!(self, HttpFailure::Status { .. })
    }
}

/// Truncate a response body to avoid flooding logs and messages
fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LENGTH {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY_LENGTH;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
}

/// Result type alias for switch operations
pub type Result<T> = std::result::Result<T, SwitchError>;
