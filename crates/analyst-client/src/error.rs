use analysis_core::JobError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("HTTP error! status: {status}")]
    Status {
        status: reqwest::StatusCode,
        message: Option<String>,
    },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Rejected by service: {0}")]
    Rejected(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type ClientResult<T> = Result<T, ClientError>;

impl From<ClientError> for JobError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Status {
                status,
                message: Some(message),
            } => JobError::Transport(format!(
                "HTTP error! status: {} ({})",
                status.as_u16(),
                message
            )),
            ClientError::Status { status, .. } => JobError::http_status(status.as_u16()),
            ClientError::RequestFailed(e) => JobError::Transport(e.to_string()),
            ClientError::Serialization(e) => {
                JobError::Transport(format!("malformed response body: {}", e))
            }
            ClientError::InvalidRequest(message) => JobError::Validation(message),
            ClientError::InvalidResponse(message) => JobError::Protocol(message),
            ClientError::Rejected(message) => JobError::ServerReported(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_maps_to_transport() {
        let err = ClientError::Status {
            status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            message: None,
        };
        assert_eq!(
            JobError::from(err),
            JobError::Transport("HTTP error! status: 500".to_string())
        );
    }

    #[test]
    fn test_status_keeps_service_message() {
        let err = ClientError::Status {
            status: reqwest::StatusCode::BAD_REQUEST,
            message: Some("Missing required fields".to_string()),
        };
        assert_eq!(
            JobError::from(err).to_string(),
            "HTTP error! status: 400 (Missing required fields)"
        );
    }

    #[test]
    fn test_malformed_body_is_transport() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err = JobError::from(ClientError::Serialization(parse_err));
        assert_eq!(err.kind(), "transport");
    }

    #[test]
    fn test_rejection_is_server_reported() {
        let err = JobError::from(ClientError::Rejected("quota exceeded".into()));
        assert_eq!(err, JobError::ServerReported("quota exceeded".into()));
    }
}
