//! Error types for the offline agent.

use thiserror::Error;

/// Result type for agent operations.
pub type AgentResult<T> = Result<T, AgentError>;

/// Errors raised by the agent and by the host primitives it drives.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AgentError {
    /// Errors coming from the platform cache store.
    #[error("cache error: {0}")]
    Cache(String),

    /// The live network fetch was rejected.
    #[error("network error: {0}")]
    Network(String),

    /// The notification surface refused to display or close a notification.
    #[error("notification error: {0}")]
    Notification(String),

    /// Window clients could not be enumerated, focused or opened.
    #[error("clients error: {0}")]
    Clients(String),

    /// A manifest entry or navigation target cannot be resolved against the scope.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// Network and cache both missed; the request fails.
    #[error("offline and no cached response for {url}")]
    Unrecoverable {
        /// URL of the failed request.
        url: String,
    },
}
