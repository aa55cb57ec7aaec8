use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    #[error("backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not reach backend: {0}")]
    Connectivity(String),

    #[error("unexpected backend failure: {0}")]
    Unexpected(String),
}

impl BackendError {
    /// Worth retrying: rate limiting, server errors and lost connectivity.
    pub fn is_transient(&self) -> bool {
        match self {
            BackendError::Status { status, .. } => *status == 429 || *status >= 500,
            BackendError::Connectivity(_) => true,
            BackendError::Unexpected(_) => false,
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() {
            BackendError::Connectivity(err.to_string())
        } else {
            BackendError::Unexpected(err.to_string())
        }
    }
}
