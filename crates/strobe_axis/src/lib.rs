//! Byte-stream bus components for the Strobe harness.
//!
//! An [`AxisBus`] bundles the named signals of one valid/ready stream
//! interface. [`AxisSource`] drives frames onto it a word per cycle,
//! [`AxisSink`] reassembles them on the far side while pacing `tready`
//! from a [`PauseSequence`], and [`ProtocolChecker`] watches the handshake
//! rules from the side.
//!
//! All components run as tasks on a [`strobe_sim::SimKernel`] and sample
//! their bus on the rising edge of its clock.

#![warn(missing_docs)]

pub mod bus;
pub mod checker;
pub mod error;
pub mod frame;
pub mod pause;
pub mod sink;
pub mod source;

pub use bus::AxisBus;
pub use checker::{ProtocolChecker, Violation};
pub use error::AxisError;
pub use frame::{tag_mask, AxisFrame, Completion, ReceivedFrame};
pub use pause::{PauseSequence, PAUSE_BLOCK_LEN};
pub use sink::AxisSink;
pub use source::AxisSource;
