//! Domain error types for the Glass timeline client.
//!
//! Uses thiserror for ergonomic error handling with automatic Display implementations.

/// Fallback text when the backend gives no usable reason.
pub const GENERIC_FAILURE_MESSAGE: &str = "Request failed";

/// Client-level errors.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Request never reached the backend or the connection broke mid-flight
    #[error("Network error: {0}")]
    Transport(String),

    /// Backend answered with a non-2xx status
    #[error("{message}")]
    Api { status: u16, message: String },

    /// Response body did not match the expected envelope
    #[error("Invalid response: {0}")]
    Decode(String),

    /// Caller supplied something the client cannot send
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Local file access failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Build an application-level error from a failed response.
    ///
    /// The backend `message` wins, then the HTTP reason phrase, then the
    /// generic fallback.
    pub fn api(status: u16, message: Option<String>, reason: Option<&str>) -> Self {
        let message = message
            .filter(|m| !m.trim().is_empty())
            .or_else(|| reason.filter(|r| !r.is_empty()).map(str::to_string))
            .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string());
        ClientError::Api { status, message }
    }

    /// Text shown to the user in a notification.
    pub fn user_message(&self, fallback: &str) -> String {
        let message = self.to_string();
        if message.trim().is_empty() {
            fallback.to_string()
        } else {
            message
        }
    }

    /// Whether the failure happened below the HTTP layer.
    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Transport(_))
    }
}

/// Convenience type alias for Results with ClientError.
pub type ClientResult<T> = Result<T, ClientError>;

// Conversion implementations for common error types

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(format!("JSON parsing error: {}", err))
    }
}
