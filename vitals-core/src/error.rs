use serde::Deserialize;
use thiserror::Error;

/// Failure surfaced by queries and mutations. Always handed back to the
/// caller as a value; consumer code never sees a panic out of this layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The request never produced an HTTP response.
    #[error("network error: {0}")]
    Network(String),
    /// The backend answered with a non-success status.
    #[error("HTTP {status}: {}", message.as_deref().unwrap_or("(no message)"))]
    Status { status: u16, message: Option<String> },
    /// The response body did not match the expected shape.
    #[error("unexpected response format: {0}")]
    Decode(String),
}

impl ApiError {
    /// HTTP status code, if the backend produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// Human-readable message for error listings.
    pub fn message(&self) -> String {
        match self {
            ApiError::Status {
                message: Some(message),
                ..
            } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Error body the backend attaches to non-2xx responses. Extra fields
/// (`username`, callback URLs, ...) are ignored.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Sign-up can fail before any request is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignUpError {
    /// Local validation: the two password fields differ. Never sent to the
    /// server.
    #[error("passwords do not match")]
    PasswordMismatch,
    #[error(transparent)]
    Api(#[from] ApiError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_body() {
        let json = r#"{"status": 403, "message": "bad password", "username": "alice"}"#;
        let body: ErrorBody = serde_json::from_str(json).unwrap();
        assert_eq!(body.status, Some(403));
        assert_eq!(body.message.as_deref(), Some("bad password"));
    }

    #[test]
    fn parse_error_body_without_message() {
        let body: ErrorBody = serde_json::from_str("{}").unwrap();
        assert_eq!(body.status, None);
        assert_eq!(body.message, None);
    }

    #[test]
    fn status_accessor_only_for_http_errors() {
        let err = ApiError::Status {
            status: 401,
            message: None,
        };
        assert!(err.is_unauthorized());
        assert_eq!(ApiError::Network("timed out".into()).status(), None);
    }

    #[test]
    fn message_prefers_backend_text() {
        let err = ApiError::Status {
            status: 409,
            message: Some("username already exists".into()),
        };
        assert_eq!(err.message(), "username already exists");

        let err = ApiError::Status {
            status: 500,
            message: None,
        };
        assert_eq!(err.message(), "HTTP 500: (no message)");
    }
}
