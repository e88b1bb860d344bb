//! Simulated-time cooperative scheduler for stream verification.
//!
//! This crate provides the substrate the harness runs on: a set of 4-state
//! signals, an event queue ordered by femtosecond time and delta cycle, and a
//! single-threaded executor for `!Send` futures. Device models and bus
//! drivers are ordinary async tasks that wait on clock edges or timers and
//! drive signals.
//!
//! # Usage
//!
//! ```ignore
//! use strobe_sim::{Clock, SimKernel, FS_PER_NS};
//!
//! let kernel = SimKernel::new();
//! let clk = kernel.signal("aclk", 1)?;
//! Clock::new(clk.clone(), 2 * FS_PER_NS)?.start();
//! kernel.run_until_complete(async move { clk.rising_edges(4).await })?;
//! kernel.shutdown();
//! ```
//!
//! # Modules
//!
//! - `error`: Simulation error types
//! - `time`: Femtosecond-precision time with delta cycles, duration parsing
//! - `value`: Signal IDs and runtime state
//! - `kernel`: Event queue, delta-cycle loop, and task executor
//! - `task`: Task wakers and join handles
//! - `trigger`: Timer and edge futures
//! - `signal`: Signal handles
//! - `clock`: Free-running clock driver
//! - `waveform`: Waveform recording (VCD format)

#![warn(missing_docs)]

pub mod clock;
pub mod error;
pub mod kernel;
pub mod signal;
pub mod task;
pub mod time;
pub mod trigger;
pub mod value;
pub mod waveform;

pub use clock::Clock;
pub use error::SimError;
pub use kernel::{SimKernel, DEFAULT_MAX_DELTA};
pub use signal::Signal;
pub use task::JoinHandle;
pub use time::{
    parse_duration, FormatFs, ParseDurationError, SimTime, FS_PER_MS, FS_PER_NS, FS_PER_PS,
    FS_PER_S, FS_PER_US,
};
pub use trigger::{check_edge, Edge, EdgeTrigger, Timer};
pub use value::{SimSignalId, SimSignalState};
pub use waveform::{VcdRecorder, WaveformRecorder};
