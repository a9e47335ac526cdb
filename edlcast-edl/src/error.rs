use edlcast_timecode::TimecodeError;
use thiserror::Error;

use crate::event::EventId;

#[derive(Error, Debug)]
pub enum Error {
    #[error("EDL parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Event {event_id}: no adjustment entry for clip '{clip}'")]
    AdjustmentMissing { event_id: EventId, clip: String },

    #[error("Event {event_id}: cannot rebase clip '{clip}': {source}")]
    Rebase {
        event_id: EventId,
        clip: String,
        source: TimecodeError,
    },

    #[error("Event {event_id}: invalid state transition from {from} to {to}")]
    InvalidTransition {
        event_id: EventId,
        from: String,
        to: String,
    },

    #[error("Event {event_id} was already emitted")]
    AlreadyEmitted { event_id: EventId },

    #[error("Event {0} already exists")]
    DuplicateEvent(EventId),

    #[error("Event {0} not found")]
    UnknownEvent(EventId),

    #[error(transparent)]
    Timecode(#[from] TimecodeError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
