//! Simulation error types for the cooperative scheduler.
//!
//! All errors that can occur while building or running a simulation are
//! represented as variants of [`SimError`].

use std::io;

/// Errors that can occur during simulation setup or execution.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// The simulation passed the watchdog limit before the main task finished.
    #[error("time limit exceeded: {limit_fs} fs")]
    TimeLimitExceeded {
        /// The time limit in femtoseconds.
        limit_fs: u64,
    },

    /// Every task is suspended and nothing is scheduled to wake any of them.
    #[error("simulation stalled at {time_fs} fs: no pending events")]
    Stalled {
        /// Time in femtoseconds when the event queue ran dry.
        time_fs: u64,
    },

    /// Too many delta cycles at a single time step, indicating a zero-time loop.
    #[error("delta cycle limit exceeded at {fs} fs (max {max_deltas} deltas)")]
    DeltaCycleLimit {
        /// The time in femtoseconds where the limit was hit.
        fs: u64,
        /// The maximum number of delta cycles allowed.
        max_deltas: u32,
    },

    /// A task reported a failed check through [`SimKernel::fail`](crate::SimKernel::fail).
    #[error("assertion failed at {time_fs} fs: {message}")]
    AssertionFailed {
        /// Time in femtoseconds when the assertion failed.
        time_fs: u64,
        /// The assertion failure message.
        message: String,
    },

    /// Two tasks drove different values onto one signal in the same delta.
    #[error("signal '{signal}' has multiple drivers at {time_fs} fs")]
    MultipleDrivers {
        /// Name of the contested signal.
        signal: String,
        /// Time in femtoseconds of the conflicting writes.
        time_fs: u64,
    },

    /// A clock was configured with a period that cannot toggle at 50% duty.
    #[error("invalid clock period: {period_fs} fs (must be even and non-zero)")]
    InvalidClockPeriod {
        /// The rejected period in femtoseconds.
        period_fs: u64,
    },

    /// A spawned task was dropped before producing its output.
    #[error("task was cancelled before completing")]
    TaskCancelled,

    /// A signal reference could not be resolved.
    #[error("invalid signal reference: {reason}")]
    InvalidSignalRef {
        /// Description of why the signal reference is invalid.
        reason: String,
    },

    /// An I/O error occurred while writing waveform data.
    #[error("waveform I/O error: {0}")]
    WaveformIo(#[from] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_limit_exceeded_display() {
        let e = SimError::TimeLimitExceeded {
            limit_fs: 1_000_000,
        };
        assert_eq!(e.to_string(), "time limit exceeded: 1000000 fs");
    }

    #[test]
    fn stalled_display() {
        let e = SimError::Stalled { time_fs: 42 };
        assert_eq!(
            e.to_string(),
            "simulation stalled at 42 fs: no pending events"
        );
    }

    #[test]
    fn assertion_failed_display() {
        let e = SimError::AssertionFailed {
            time_fs: 500,
            message: "tready is not 1".into(),
        };
        assert_eq!(e.to_string(), "assertion failed at 500 fs: tready is not 1");
    }

    #[test]
    fn multiple_drivers_display() {
        let e = SimError::MultipleDrivers {
            signal: "s_axis_tvalid".into(),
            time_fs: 7,
        };
        assert_eq!(
            e.to_string(),
            "signal 's_axis_tvalid' has multiple drivers at 7 fs"
        );
    }

    #[test]
    fn delta_cycle_limit_display() {
        let e = SimError::DeltaCycleLimit {
            fs: 100,
            max_deltas: 10000,
        };
        assert_eq!(
            e.to_string(),
            "delta cycle limit exceeded at 100 fs (max 10000 deltas)"
        );
    }

    #[test]
    fn waveform_io_display() {
        let e = SimError::WaveformIo(io::Error::new(io::ErrorKind::NotFound, "file not found"));
        assert!(e.to_string().contains("waveform I/O error"));
    }
}
