use serde::Serialize;
use thiserror::Error;

/// Errors surfaced by the chat SDK.
///
/// Synchronous preconditions (`NotReady`) fail the call directly;
/// asynchronous failures (navigation errors, page-reported errors,
/// serialization failures) are delivered through the listener's error
/// channel instead of the original call site. `initialize()` is the one
/// call that reports its own failure to the caller.
#[derive(Debug, Clone, Error)]
pub enum ChatError {
    #[error("Failed to initialize chat: {0}")]
    InitializationFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("JavaScript bridge error: {0}")]
    Bridge(String),

    #[error("Chat widget is not ready. Please call initialize() first.")]
    NotReady,

    #[error("Invalid user data: {0}")]
    InvalidUserData(String),

    #[error("Operation timed out")]
    Timeout,

    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Implement Serialize so errors can cross an embedding frontend boundary
impl Serialize for ChatError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ChatError>;
