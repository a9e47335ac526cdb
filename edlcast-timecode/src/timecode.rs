//! EDL timecode implementation.
//!
//! This module provides the `H:M:S:F` timecode used by edit decision lists:
//! - String parsing (padded or unpadded fields) and `HH:MM:SS:FF` formatting
//! - Component-wise subtraction with borrow at a fixed 30 fps
//! - Rebasing of recorded source positions against a clip reference point
//! - Whole-second conversion for scheduling

use crate::error::{Result, TimecodeError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Frames per second assumed by the borrow arithmetic.
pub const FRAMES_PER_SECOND: u32 = 30;

/// Largest hours value a rebased in-clip offset may carry.
pub const MAX_REBASED_HOURS: u32 = 1;

/// EDL timecode representation.
///
/// Fields compare lexicographically (hours first), which matches
/// chronological order for well-formed values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timecode {
    /// Hours (unbounded)
    pub hours: u32,
    /// Minutes (0-59)
    pub minutes: u32,
    /// Seconds (0-59)
    pub seconds: u32,
    /// Frames (0-29)
    pub frames: u32,
}

impl Timecode {
    /// Create a new timecode, validating every component.
    pub fn new(hours: u32, minutes: u32, seconds: u32, frames: u32) -> Result<Self> {
        let tc = Self {
            hours,
            minutes,
            seconds,
            frames,
        };
        tc.validate()?;
        Ok(tc)
    }

    /// Validate the timecode components.
    pub fn validate(&self) -> Result<()> {
        if self.minutes > 59 {
            return Err(TimecodeError::invalid_component("minutes", self.minutes, 59));
        }
        if self.seconds > 59 {
            return Err(TimecodeError::invalid_component("seconds", self.seconds, 59));
        }
        if self.frames >= FRAMES_PER_SECOND {
            return Err(TimecodeError::invalid_component(
                "frames",
                self.frames,
                FRAMES_PER_SECOND - 1,
            ));
        }
        Ok(())
    }

    /// Whole seconds since zero.
    ///
    /// The frame field is not rounded into the result; schedules are computed
    /// at one-second resolution.
    #[must_use]
    pub fn elapsed_seconds(&self) -> u64 {
        u64::from(self.hours) * 3600 + u64::from(self.minutes) * 60 + u64::from(self.seconds)
    }

    /// Compute `self - other` component-wise, borrowing from the next larger
    /// unit whenever a difference goes negative.
    ///
    /// Fails with [`TimecodeError::InvalidOffset`] when the hours difference
    /// is still negative after borrowing.
    pub fn subtract(&self, other: &Self) -> Result<Self> {
        let (frames, borrow) = borrow_sub(self.frames, other.frames, 0, FRAMES_PER_SECOND);
        let (seconds, borrow) = borrow_sub(self.seconds, other.seconds, borrow, 60);
        let (minutes, borrow) = borrow_sub(self.minutes, other.minutes, borrow, 60);
        let hours = i64::from(self.hours) - i64::from(other.hours) - borrow;

        if hours < 0 {
            return Err(TimecodeError::invalid_offset(
                self.to_string(),
                other.to_string(),
            ));
        }

        Ok(Self {
            hours: hours as u32,
            minutes,
            seconds,
            frames,
        })
    }

    /// Rebase a recorded source position against this reference point.
    ///
    /// Returns `self - recorded`, rejecting results whose hours exceed
    /// [`MAX_REBASED_HOURS`]: an in-clip offset that large almost always
    /// means the reference entry was mistyped. Minutes are not bounded, so
    /// `0:10:0:0` rebased against `0:05:0:0` gives `00:05:00:00`.
    pub fn rebase(&self, recorded: &Self) -> Result<Self> {
        let offset = self.subtract(recorded)?;
        if offset.hours > MAX_REBASED_HOURS {
            return Err(TimecodeError::suspicious_offset(
                offset.to_string(),
                MAX_REBASED_HOURS,
            ));
        }
        Ok(offset)
    }

    /// Check if timecode is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.hours == 0 && self.minutes == 0 && self.seconds == 0 && self.frames == 0
    }
}

/// Subtract with an incoming borrow; returns the normalized digit and the
/// borrow owed to the next unit.
fn borrow_sub(lhs: u32, rhs: u32, borrow_in: i64, base: u32) -> (u32, i64) {
    let diff = i64::from(lhs) - i64::from(rhs) - borrow_in;
    if diff < 0 {
        ((diff + i64::from(base)) as u32, 1)
    } else {
        (diff as u32, 0)
    }
}

impl fmt::Display for Timecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}:{:02}",
            self.hours, self.minutes, self.seconds, self.frames
        )
    }
}

impl FromStr for Timecode {
    type Err = TimecodeError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let parts: Vec<&str> = s.split(':').collect();

        if parts.len() != 4 {
            return Err(TimecodeError::invalid_format(format!(
                "Expected format H:M:S:F, got '{s}'"
            )));
        }

        let field = |idx: usize, name: &str| -> Result<u32> {
            parts[idx].parse().map_err(|_| {
                TimecodeError::invalid_format(format!("Invalid {name}: '{}'", parts[idx]))
            })
        };

        Self::new(
            field(0, "hours")?,
            field(1, "minutes")?,
            field(2, "seconds")?,
            field(3, "frames")?,
        )
    }
}

impl TryFrom<String> for Timecode {
    type Error = TimecodeError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Timecode> for String {
    fn from(tc: Timecode) -> Self {
        tc.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn tc(s: &str) -> Timecode {
        s.parse().unwrap()
    }

    #[test]
    fn test_timecode_parse() {
        let tc: Timecode = "01:30:45:12".parse().unwrap();
        assert_eq!(tc.hours, 1);
        assert_eq!(tc.minutes, 30);
        assert_eq!(tc.seconds, 45);
        assert_eq!(tc.frames, 12);

        let unpadded: Timecode = "0:10:0:0".parse().unwrap();
        assert_eq!(unpadded, Timecode::new(0, 10, 0, 0).unwrap());
    }

    #[test]
    fn test_timecode_parse_errors() {
        assert!("01:30:45".parse::<Timecode>().is_err());
        assert!("01:30:45;12".parse::<Timecode>().is_err());
        assert!("aa:00:00:00".parse::<Timecode>().is_err());
        assert!(matches!(
            "00:60:00:00".parse::<Timecode>(),
            Err(TimecodeError::InvalidComponent { .. })
        ));
        assert!(matches!(
            "00:00:00:30".parse::<Timecode>(),
            Err(TimecodeError::InvalidComponent { .. })
        ));
    }

    #[test]
    fn test_timecode_display() {
        assert_eq!(tc("1:2:3:4").to_string(), "01:02:03:04");
    }

    #[test]
    fn test_elapsed_seconds_ignores_frames() {
        assert_eq!(tc("01:02:03:29").elapsed_seconds(), 3723);
        assert_eq!(tc("00:00:00:00").elapsed_seconds(), 0);
    }

    #[test]
    fn test_subtract_without_borrow() {
        let diff = tc("0:10:0:0").subtract(&tc("0:05:0:0")).unwrap();
        assert_eq!(diff, tc("0:05:0:0"));
    }

    #[test]
    fn test_subtract_borrows_through_every_unit() {
        let diff = tc("01:00:00:00").subtract(&tc("00:00:00:01")).unwrap();
        assert_eq!(diff, tc("00:59:59:29"));

        let diff = tc("00:01:00:10").subtract(&tc("00:00:30:20")).unwrap();
        assert_eq!(diff, tc("00:00:29:20"));
    }

    #[test]
    fn test_subtract_underflow() {
        let err = tc("00:00:01:00").subtract(&tc("00:00:01:01")).unwrap_err();
        assert!(matches!(err, TimecodeError::InvalidOffset { .. }));
    }

    #[test]
    fn test_rebase_guard() {
        let offset = tc("00:01:10:00").rebase(&tc("00:00:20:15")).unwrap();
        assert_eq!(offset, tc("00:00:49:15"));

        let offset = tc("0:10:0:0").rebase(&tc("0:05:0:0")).unwrap();
        assert_eq!(offset, tc("00:05:00:00"));

        let offset = tc("01:59:00:00").rebase(&tc("00:00:30:00")).unwrap();
        assert_eq!(offset, tc("01:58:30:00"));

        let err = tc("02:00:00:00").rebase(&tc("00:00:00:00")).unwrap_err();
        assert!(matches!(err, TimecodeError::SuspiciousOffset { limit: 1, .. }));
    }

    #[test]
    fn test_rebase_underflow_is_not_suspicious() {
        let err = tc("00:00:05:00").rebase(&tc("00:00:06:00")).unwrap_err();
        assert!(matches!(err, TimecodeError::InvalidOffset { .. }));
    }

    #[test]
    fn test_timecode_ordering() {
        assert!(tc("01:00:00:00") > tc("00:59:59:29"));
        assert!(tc("00:00:01:00") > tc("00:00:00:29"));
    }

    #[test]
    fn test_timecode_serializes_as_string() {
        let json = serde_json::to_string(&tc("0:1:2:3")).unwrap();
        assert_eq!(json, "\"00:01:02:03\"");
        let decoded: Timecode = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, tc("0:1:2:3"));
        assert!(serde_json::from_str::<Timecode>("\"bogus\"").is_err());
    }

    fn arb_timecode() -> impl Strategy<Value = Timecode> {
        (0u32..24, 0u32..60, 0u32..60, 0u32..FRAMES_PER_SECOND).prop_map(
            |(hours, minutes, seconds, frames)| Timecode {
                hours,
                minutes,
                seconds,
                frames,
            },
        )
    }

    proptest! {
        #[test]
        fn prop_subtract_round_trips(a in arb_timecode(), b in arb_timecode()) {
            let (a, delta) = if a >= b { (a, b) } else { (b, a) };
            let rest = a.subtract(&delta).unwrap();
            prop_assert_eq!(a.subtract(&rest).unwrap(), delta);
        }

        #[test]
        fn prop_subtract_below_zero_fails(a in arb_timecode(), b in arb_timecode()) {
            prop_assume!(a < b);
            prop_assert!(a.subtract(&b).is_err());
        }
    }
}
