//! Error types for timecode operations.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for timecode operations.
pub type Result<T> = std::result::Result<T, TimecodeError>;

/// Errors that can occur during timecode operations.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum TimecodeError {
    /// Invalid timecode format in string.
    #[error("Invalid timecode format: {message}")]
    InvalidFormat {
        /// Description of the format error.
        message: String,
    },

    /// Invalid timecode component value.
    #[error("Invalid timecode component: {component} = {value} (max {max})")]
    InvalidComponent {
        /// Name of the invalid component (minutes, seconds, frames).
        component: String,
        /// The invalid value that was provided.
        value: u32,
        /// The maximum allowed value for this component.
        max: u32,
    },

    /// Subtraction went below zero after borrowing from every unit.
    #[error("Invalid offset: {minuend} - {subtrahend} is negative")]
    InvalidOffset {
        /// Left operand, formatted.
        minuend: String,
        /// Right operand, formatted.
        subtrahend: String,
    },

    /// Rebased offset is larger than any plausible in-clip position.
    #[error("Suspicious offset {offset}: hours exceed {limit}")]
    SuspiciousOffset {
        /// The offending offset, formatted.
        offset: String,
        /// The per-unit limit that was exceeded.
        limit: u32,
    },
}

impl TimecodeError {
    /// Create an invalid format error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Create an invalid component error.
    pub fn invalid_component(component: impl Into<String>, value: u32, max: u32) -> Self {
        Self::InvalidComponent {
            component: component.into(),
            value,
            max,
        }
    }

    /// Create an invalid offset error.
    pub fn invalid_offset(minuend: impl Into<String>, subtrahend: impl Into<String>) -> Self {
        Self::InvalidOffset {
            minuend: minuend.into(),
            subtrahend: subtrahend.into(),
        }
    }

    /// Create a suspicious offset error.
    pub fn suspicious_offset(offset: impl Into<String>, limit: u32) -> Self {
        Self::SuspiciousOffset {
            offset: offset.into(),
            limit,
        }
    }
}
