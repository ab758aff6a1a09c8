use thiserror::Error;

/// Message shown when the polling deadline elapses.
pub const TIMEOUT_MESSAGE: &str = "Analysis timed out. Please try again.";

/// Failures surfaced by an analysis job. `Display` is the user-facing message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    /// Bad local input; never reaches the network.
    #[error("{0}")]
    Validation(String),

    /// Network or HTTP-level failure.
    #[error("{0}")]
    Transport(String),

    /// The service answered successfully but the body was unusable.
    #[error("{0}")]
    Protocol(String),

    /// The service reported the job as failed.
    #[error("{0}")]
    ServerReported(String),

    #[error("Analysis timed out. Please try again.")]
    Timeout,
}

impl JobError {
    pub fn http_status(status: u16) -> Self {
        JobError::Transport(format!("HTTP error! status: {}", status))
    }

    pub fn missing_request_id() -> Self {
        JobError::Protocol(
            "service accepted the request but returned no identifier".to_string(),
        )
    }

    /// Short tag used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            JobError::Validation(_) => "validation",
            JobError::Transport(_) => "transport",
            JobError::Protocol(_) => "protocol",
            JobError::ServerReported(_) => "server",
            JobError::Timeout => "timeout",
        }
    }
}
