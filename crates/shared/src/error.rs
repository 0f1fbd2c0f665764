use serde::{Deserialize, Serialize};

/// Error envelope returned by the backend on non-success responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub detail: String,
}

impl ApiErrorBody {
    /// Best-effort decode; the backend is not guaranteed to send the envelope.
    pub fn parse(body: &str) -> Option<Self> {
        serde_json::from_str::<Self>(body).ok()
    }
}
