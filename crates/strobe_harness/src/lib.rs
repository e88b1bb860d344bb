//! Scenario harness for the width-converting stream device.
//!
//! Each scenario gets its own [`Testbench`]: a fresh kernel, the configured
//! device model, its clock domains, and on demand a source driver and sink
//! monitor with protocol checkers on both buses. [`run_scenarios`] runs the
//! selected [`Scenario`]s in order and returns one [`ScenarioReport`] each.
//!
//! Failures fall into the [`ScenarioError`] taxonomy and end only the
//! scenario that raised them.

#![warn(missing_docs)]

pub mod compare;
pub mod domain;
pub mod error;
pub mod report;
pub mod runner;
pub mod scenario;
pub mod testbench;

pub use compare::{expect_frame_eq, expect_framing, expect_held, expect_signal, expect_within};
pub use domain::{reset_all, ClockDomain};
pub use error::ScenarioError;
pub use report::{ScenarioReport, Status, Summary};
pub use runner::{run_scenario, run_scenarios, waveform_path, ScenarioFilter};
pub use scenario::{Phase, PhaseTracker, Scenario};
pub use testbench::{device_params, Testbench};

pub use strobe_dut::DeviceParams;
