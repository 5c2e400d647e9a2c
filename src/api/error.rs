use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not authenticated")]
    Unauthorized,
    #[error("HTTP {status}: {detail}")]
    Status { status: u16, detail: String },
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ApiError {
    /// Human readable reason suitable for an inline error bubble.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Status { detail, .. } if !detail.is_empty() => detail.clone(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
