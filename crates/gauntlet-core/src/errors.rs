use thiserror::Error;

/// Synchronous rejections surfaced at run-creation time. Rejection is
/// fail-fast: a run that cannot be admitted is never queued.
#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error("rate limit exceeded for client '{0}'")]
    RateLimited(String),

    #[error("run concurrency limit reached, retry later")]
    ConcurrencyExceeded,

    #[error("unknown suite '{0}'")]
    InvalidSuite(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl AdmissionError {
    pub fn reason_code(&self) -> &'static str {
        match self {
            AdmissionError::RateLimited(_) => "RATE_LIMITED",
            AdmissionError::ConcurrencyExceeded => "CONCURRENCY_EXCEEDED",
            AdmissionError::InvalidSuite(_) => "INVALID_SUITE",
            AdmissionError::Storage(_) => "STORAGE_ERROR",
        }
    }
}

/// Configuration loading failure with a stable, user-facing message.
#[derive(Debug, Error)]
#[error("config error: {0}")]
pub struct ConfigError(pub String);
