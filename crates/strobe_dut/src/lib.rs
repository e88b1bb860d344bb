//! Behavioural models of the width-converting stream device.
//!
//! The harness reaches a device only through its signals. [`DutPorts`]
//! declares that boundary on a kernel from a set of [`DeviceParams`], and a
//! [`Device`] implementation attaches processes that drive it:
//!
//! - [`WidthConverter`]: one clock, two words of buffering, no tags.
//! - [`StreamFifo`]: a configurable depth, optional tags and occupancy
//!   output, one or two clock domains.
//!
//! Both models hold `s_axis_tready` and `m_axis_tvalid` low while reset is
//! asserted, react to reset without a clock edge, and leave `m_axis_tdata`
//! undefined whenever `m_axis_tvalid` is low.

#![warn(missing_docs)]

mod buffer;
pub mod converter;
pub mod error;
pub mod fifo;
pub mod model;
pub mod params;
pub mod ports;

pub use converter::WidthConverter;
pub use error::DutError;
pub use fifo::StreamFifo;
pub use model::Device;
pub use params::{DeviceParams, MAX_TAG_BITS};
pub use ports::{DomainPorts, DutPorts};
