use thiserror::Error;

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("IP lookup failed with status {0}")]
    Status(u16),

    #[error("Malformed lookup response: {0}")]
    MalformedResponse(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl LookupError {
    /// Stable label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RateLimited => "rate_limited",
            Self::Status(_) => "status",
            Self::MalformedResponse(_) => "malformed_response",
            Self::Http(_) => "http_error",
        }
    }
}
