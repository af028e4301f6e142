//! Session error types

use fichas_client::ApiError;
use fichas_core::ValidationError;
use fichas_state::TransitionError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    /// A request is outstanding; input is refused until it resolves.
    #[error("A request is already in flight")]
    Busy,

    #[error("Input is empty")]
    EmptyInput,

    #[error("Not logged in")]
    NotAuthenticated,

    #[error("No conversation selected")]
    NoConversationSelected,

    #[error("Invalid transition: {0}")]
    Transition(#[from] TransitionError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session event channel closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, SessionError>;
