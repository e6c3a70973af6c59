use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum QuotaError {
    #[error("Missing authIndex")]
    MissingAuthIndex,

    #[error("Missing chatgpt_account_id in id_token")]
    MissingAccountId,

    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    /// The round trip to the management service did not complete.
    #[error("request failed: {0}")]
    Transport(String),

    /// The management service itself rejected the request.
    #[error("management API returned HTTP {status}: {message}")]
    Management { status: u16, message: String },

    /// The proxied upstream call completed with a non-2xx status.
    #[error("{message}")]
    Upstream { status: u16, message: String },

    #[error("empty response body")]
    EmptyResponse,

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl QuotaError {
    /// Upstream HTTP status, when the failure came from a non-2xx answer.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for QuotaError {
    fn from(error: reqwest::Error) -> Self {
        Self::Transport(error.to_string())
    }
}

impl From<serde_json::Error> for QuotaError {
    fn from(error: serde_json::Error) -> Self {
        Self::InvalidResponse(error.to_string())
    }
}
