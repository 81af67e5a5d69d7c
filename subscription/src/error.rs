//! Error types for the opcua-subscription crate.

use ua_types::StatusCode;

/// Failures of the request/response exchange with the server.
///
/// Transport implementations return this; the subscription wraps it in
/// [`SubscriptionError::Transport`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The request could not be sent or the response could not be read
    #[error("Network error: {0}")]
    Network(String),

    /// No response arrived in time
    #[error("Request timed out")]
    Timeout,

    /// The session or channel carrying requests is closed
    #[error("Transport channel closed")]
    ChannelClosed,

    /// The server answered the whole service call with a fault
    #[error("Service fault: {0}")]
    ServiceFault(StatusCode),
}

/// Errors surfaced by subscription operations.
#[derive(Debug, thiserror::Error)]
pub enum SubscriptionError {
    /// The exchange with the server failed
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The server reported a non-good status for the operation
    #[error("Server returned bad status: {0}")]
    BadStatus(StatusCode),

    /// No monitored item is registered under this client handle
    #[error("Unknown client handle: {0}")]
    UnknownHandle(u32),

    /// A caller-supplied client handle is already in use
    #[error("Client handle {0} is already registered")]
    DuplicateClientHandle(u32),

    /// The subscription was never created on the server
    #[error("Subscription is not ready")]
    NotReady,

    /// The subscription has been deleted
    #[error("Subscription has been deleted")]
    Deleted,

    /// An event filter could not be built
    #[error("Event filter error: {0}")]
    EventFilter(String),

    /// Invalid configuration provided
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<StatusCode> for SubscriptionError {
    fn from(status: StatusCode) -> Self {
        SubscriptionError::BadStatus(status)
    }
}

/// Error type returned by application callbacks.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

/// Convenience type alias for Results using SubscriptionError.
pub type Result<T> = std::result::Result<T, SubscriptionError>;
