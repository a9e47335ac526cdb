//! Publishing error types.

use edlcast_edl::EventId;
use thiserror::Error;

/// Publishing errors.
#[derive(Debug, Error)]
pub enum PublishError {
    /// An event was handed to emission twice.
    #[error("Event {event_id} was already emitted")]
    DoubleEmission { event_id: EventId },

    /// Nothing to schedule.
    #[error("Event store is empty")]
    EmptyStore,

    /// The scheduler was run before.
    #[error("Scheduler already started")]
    AlreadyStarted,

    /// Translation service call failed.
    #[error("Translation failed: {0}")]
    Translation(String),

    /// Record delivery failed.
    #[error("Sink error: {0}")]
    Sink(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Event model error.
    #[error(transparent)]
    Edl(#[from] edlcast_edl::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for PublishError {
    fn from(e: serde_json::Error) -> Self {
        PublishError::Sink(e.to_string())
    }
}

impl From<reqwest::Error> for PublishError {
    fn from(e: reqwest::Error) -> Self {
        PublishError::Translation(e.to_string())
    }
}

/// Result type for publishing operations.
pub type Result<T> = std::result::Result<T, PublishError>;
