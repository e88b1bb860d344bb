//! Simulation time representation with femtosecond precision and delta cycles.
//!
//! [`SimTime`] tracks both simulated time (in femtoseconds) and the delta
//! cycle index within a single time step. Writes issued during a delta become
//! visible in the next one, which is what keeps same-edge reads ahead of
//! same-edge writes.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Femtoseconds per picosecond.
pub const FS_PER_PS: u64 = 1_000;
/// Femtoseconds per nanosecond.
pub const FS_PER_NS: u64 = 1_000_000;
/// Femtoseconds per microsecond.
pub const FS_PER_US: u64 = 1_000_000_000;
/// Femtoseconds per millisecond.
pub const FS_PER_MS: u64 = 1_000_000_000_000;
/// Femtoseconds per second.
pub const FS_PER_S: u64 = FS_PER_MS * 1_000;

/// A simulation time point with femtosecond resolution and delta cycle tracking.
///
/// Events are ordered first by femtosecond timestamp, then by delta cycle index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SimTime {
    /// Simulated time in femtoseconds.
    pub fs: u64,
    /// Delta cycle index within the current time step.
    pub delta: u32,
}

impl SimTime {
    /// Creates a time point at time zero, delta zero.
    pub fn zero() -> Self {
        Self { fs: 0, delta: 0 }
    }

    /// Creates a time from a nanosecond value with delta 0.
    pub fn from_ns(ns: u64) -> Self {
        Self {
            fs: ns * FS_PER_NS,
            delta: 0,
        }
    }

    /// Creates a time from a femtosecond value with delta 0.
    pub fn from_fs(fs: u64) -> Self {
        Self { fs, delta: 0 }
    }

    /// Returns the next delta cycle at the same simulated time.
    pub fn next_delta(&self) -> Self {
        Self {
            fs: self.fs,
            delta: self.delta + 1,
        }
    }

    /// Returns the first delta of the time step `duration_fs` from now.
    ///
    /// A zero duration yields the next delta instead, so a zero-length wait
    /// still lets pending writes land.
    pub fn after(&self, duration_fs: u64) -> Self {
        if duration_fs == 0 {
            self.next_delta()
        } else {
            Self {
                fs: self.fs + duration_fs,
                delta: 0,
            }
        }
    }

    /// Converts the femtosecond timestamp to nanoseconds (truncated).
    pub fn to_ns(&self) -> u64 {
        self.fs / FS_PER_NS
    }
}

impl Default for SimTime {
    fn default() -> Self {
        Self::zero()
    }
}

impl Ord for SimTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.fs.cmp(&other.fs).then(self.delta.cmp(&other.delta))
    }
}

impl PartialOrd for SimTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", FormatFs(self.fs))?;
        if self.delta > 0 {
            write!(f, "+d{}", self.delta)?;
        }
        Ok(())
    }
}

/// Displays a femtosecond count in the largest unit that divides it exactly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FormatFs(pub u64);

impl fmt::Display for FormatFs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fs = self.0;
        if fs == 0 {
            write!(f, "0 fs")
        } else if fs % FS_PER_MS == 0 {
            write!(f, "{} ms", fs / FS_PER_MS)
        } else if fs % FS_PER_US == 0 {
            write!(f, "{} us", fs / FS_PER_US)
        } else if fs % FS_PER_NS == 0 {
            write!(f, "{} ns", fs / FS_PER_NS)
        } else if fs % FS_PER_PS == 0 {
            write!(f, "{} ps", fs / FS_PER_PS)
        } else {
            write!(f, "{fs} fs")
        }
    }
}

/// Error returned when a duration string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid duration '{input}': {reason}")]
pub struct ParseDurationError {
    /// The input string that failed to parse.
    pub input: String,
    /// Why it was rejected.
    pub reason: String,
}

/// Parses a human-readable duration string into femtoseconds.
///
/// Supports units: `fs`, `ps`, `ns`, `us`, `ms`, `s`.
/// Examples: `"2ns"`, `"5 ns"`, `"1us"`, `"500ps"`.
pub fn parse_duration(s: &str) -> Result<u64, ParseDurationError> {
    let s = s.trim();
    let err = |reason: &str| ParseDurationError {
        input: s.to_string(),
        reason: reason.to_string(),
    };
    if s.is_empty() {
        return Err(err("empty duration string"));
    }

    let digit_end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    if digit_end == 0 {
        return Err(err("no numeric value"));
    }

    let number: u64 = s[..digit_end]
        .parse()
        .map_err(|_| err("number out of range"))?;

    let multiplier = match s[digit_end..].trim() {
        "fs" => 1,
        "ps" => FS_PER_PS,
        "ns" => FS_PER_NS,
        "us" => FS_PER_US,
        "ms" => FS_PER_MS,
        "s" => FS_PER_S,
        "" => return Err(err("missing unit (use fs, ps, ns, us, ms, or s)")),
        _ => return Err(err("unknown unit (use fs, ps, ns, us, ms, or s)")),
    };

    number
        .checked_mul(multiplier)
        .ok_or_else(|| err("duration overflows 64-bit femtoseconds"))
}
