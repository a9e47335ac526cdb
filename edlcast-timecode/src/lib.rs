//! Timecode support for edit decision lists.
//!
//! EDL events carry four `H:M:S:F` timecodes. This crate provides the value
//! type, the borrow arithmetic used to rebase source positions, and the
//! whole-second conversion used for scheduling.
//!
//! # Quick Start
//!
//! ```rust
//! use edlcast_timecode::Timecode;
//!
//! let reference: Timecode = "0:10:0:0".parse().unwrap();
//! let recorded: Timecode = "0:05:0:0".parse().unwrap();
//!
//! let offset = reference.subtract(&recorded).unwrap();
//! assert_eq!(offset.to_string(), "00:05:00:00");
//! assert_eq!(offset.elapsed_seconds(), 300);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]

pub mod error;
pub mod timecode;

pub use error::{Result, TimecodeError};
pub use timecode::{Timecode, FRAMES_PER_SECOND, MAX_REBASED_HOURS};

/// Parse a timecode string.
///
/// Convenience wrapper over [`Timecode::from_str`](std::str::FromStr).
pub fn parse_timecode(s: &str) -> Result<Timecode> {
    s.parse()
}
