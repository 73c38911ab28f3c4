// Failure kinds of a gateway completion call
use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("request error: {0}")]
    Transport(String),

    #[error("http error {status}: {body}")]
    Http { status: StatusCode, body: String },

    #[error("invalid response body: {0}")]
    InvalidResponse(String),

    #[error("response is missing field `{0}`")]
    MissingField(&'static str),
}

impl CompletionError {
    /// Whether another attempt with the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            CompletionError::Connection(_)
            | CompletionError::Timeout(_)
            | CompletionError::Transport(_) => true,
            CompletionError::Http { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            CompletionError::InvalidRequest(_)
            | CompletionError::InvalidResponse(_)
            | CompletionError::MissingField(_) => false,
        }
    }
}

impl From<reqwest::Error> for CompletionError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            CompletionError::Timeout(e.to_string())
        } else if e.is_connect() {
            CompletionError::Connection(e.to_string())
        } else {
            CompletionError::Transport(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_statuses() {
        let http = |code: u16| CompletionError::Http {
            status: StatusCode::from_u16(code).unwrap(),
            body: String::new(),
        };
        assert!(http(500).is_retryable());
        assert!(http(503).is_retryable());
        assert!(http(429).is_retryable());
        assert!(!http(401).is_retryable());
        assert!(!http(404).is_retryable());
    }

    #[test]
    fn test_shape_errors_are_not_retryable() {
        assert!(!CompletionError::MissingField("message.assistant").is_retryable());
        assert!(!CompletionError::InvalidResponse("eof".to_string()).is_retryable());
        assert!(!CompletionError::InvalidRequest("zero".to_string()).is_retryable());
        assert!(CompletionError::Timeout("slow".to_string()).is_retryable());
    }
}
