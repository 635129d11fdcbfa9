//! Error types for API calls.

use std::fmt;

/// Errors from an API call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The server answered with a non-success status.
    Status { status: u16, body: String },
    /// The request never produced a response (network, DNS, CORS).
    Transport { reason: String },
    /// The response body could not be decoded.
    Decode { reason: String },
    /// The request could not be built.
    InvalidRequest { reason: String },
}

impl ApiError {
    /// Returns the HTTP status, if the server answered.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns true for a `401 Unauthorized` response.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status { status, body } if body.is_empty() => {
                write!(f, "server responded with status {status}")
            }
            Self::Status { status, body } => {
                write!(f, "server responded with status {status}: {body}")
            }
            Self::Transport { reason } => write!(f, "request failed: {reason}"),
            Self::Decode { reason } => write!(f, "failed to decode response: {reason}"),
            Self::InvalidRequest { reason } => write!(f, "invalid request: {reason}"),
        }
    }
}

impl std::error::Error for ApiError {}
