//! Typed failures raised by the API and download clients.
//!
//! Callers that talk to an operator collapse every variant into one
//! message via [`ClientError::user_message`]; the variant itself is kept
//! for logging.

use thiserror::Error;

/// Message shown for any failed data load or mutating action.
pub const GENERIC_FAILURE_MESSAGE: &str =
    "Request failed. Ensure the backend is running and you are logged in.";

/// Message shown for any failed download.
pub const DOWNLOAD_FAILURE_MESSAGE: &str = "Download failed. Make sure you are logged in.";

#[derive(Debug, Error)]
pub enum ClientError {
    /// The transport failed before any response arrived (refused, DNS, timeout).
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a non-success status.
    #[error("API error {status}")]
    Api { status: u16 },

    /// The server answered with success but the body did not decode.
    #[error("failed to parse response: {0}")]
    Parse(String),

    /// A binary fetch or its save step failed.
    #[error("download failed: {reason}")]
    Download { status: Option<u16>, reason: String },
}

impl ClientError {
    pub fn network(err: impl std::fmt::Display) -> Self {
        Self::Network(err.to_string())
    }

    pub fn parse(err: impl std::fmt::Display) -> Self {
        Self::Parse(err.to_string())
    }

    pub fn download_status(status: u16) -> Self {
        Self::Download {
            status: Some(status),
            reason: format!("status {}", status),
        }
    }

    pub fn download_io(err: impl std::fmt::Display) -> Self {
        Self::Download {
            status: None,
            reason: err.to_string(),
        }
    }

    /// HTTP status carried by the error, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status } => Some(*status),
            Self::Download { status, .. } => *status,
            Self::Network(_) | Self::Parse(_) => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status(), Some(401) | Some(403))
    }

    /// The single operator-facing message for this failure.
    ///
    /// 401, 500 and an unreachable backend all read the same.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Download { .. } => DOWNLOAD_FAILURE_MESSAGE,
            _ => GENERIC_FAILURE_MESSAGE,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Network(format!("request timeout: {}", err))
        } else if err.is_connect() {
            Self::Network(format!("connection failed: {}", err))
        } else if err.is_decode() {
            Self::Parse(err.to_string())
        } else {
            Self::Network(format!("request failed: {}", err))
        }
    }
}
