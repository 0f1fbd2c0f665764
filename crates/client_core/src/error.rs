use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to {endpoint} timed out")]
    Timeout { endpoint: String },
    #[error("network failure calling {endpoint}: {message}")]
    Network { endpoint: String, message: String },
    #[error("{endpoint} responded with {status}: {detail}")]
    Status {
        endpoint: String,
        status: StatusCode,
        detail: String,
    },
    #[error("failed to decode response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },
    #[error("invalid request url: {0}")]
    InvalidUrl(String),
}

impl TransportError {
    pub fn from_reqwest(endpoint: impl Into<String>, err: reqwest::Error) -> Self {
        let endpoint = endpoint.into();
        if err.is_timeout() {
            Self::Timeout { endpoint }
        } else if err.is_decode() {
            Self::Decode {
                endpoint,
                message: err.to_string(),
            }
        } else if let Some(status) = err.status() {
            Self::Status {
                endpoint,
                status,
                detail: err.to_string(),
            }
        } else {
            Self::Network {
                endpoint,
                message: err.to_string(),
            }
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }
}

/// Input rejected locally, before any transport call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("message is empty")]
    EmptyMessage,
}
