/// Errors raised while opening or reading a converse stream.
///
/// These are fatal for the current turn and are never retried by this crate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The service answered with a non-success HTTP status.
    #[error("HTTP error! status: {status}: {body}")]
    Status { status: u16, body: String },
    /// The response carried no readable body.
    #[error("no response body")]
    MissingBody,
    /// Connecting, sending, or reading the body failed.
    #[error("transport error: {message}")]
    Transport { message: String },
}

impl TransportError {
    /// Creates a status error.
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            body: body.into(),
        }
    }

    /// Creates a transport-level error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Returns the HTTP status code when the failure came from a response status.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::MissingBody | Self::Transport { .. } => None,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(value: reqwest::Error) -> Self {
        Self::transport(value.to_string())
    }
}

/// Top-level error type for the public API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HarnessError {
    /// Invalid client or adapter configuration.
    #[error("config error: {0}")]
    Config(String),
    /// The chat context did not satisfy the turn preconditions.
    #[error("validation error: {0}")]
    Validation(String),
    /// Opening or reading the converse stream failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The service reported an `error` event for the current turn.
    #[error("agent builder error ({code}): {message}")]
    Remote { code: String, message: String },
}

impl HarnessError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn remote(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Remote {
            code: code.into(),
            message: message.into(),
        }
    }
}
