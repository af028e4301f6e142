use thiserror::Error;

/// Typed outcome of a failed call to an external service.
///
/// Every variant is recoverable: the chat reports it as a retryable apology
/// and rolls back to the state it was in before the call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("server returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// The service answered but refused the operation (`ok: false`,
    /// `status: "error"`, bad credentials).
    #[error("request rejected: {0}")]
    Rejected(String),
}

impl ApiError {
    /// Failures of the transport or the payload, as opposed to a refusal.
    pub fn is_network(&self) -> bool {
        !matches!(self, Self::Rejected(_))
    }

    /// Message from the service that may be shown to the user as is.
    pub fn user_message(&self) -> Option<&str> {
        match self {
            Self::Rejected(message) if !message.trim().is_empty() => Some(message),
            _ => None,
        }
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
