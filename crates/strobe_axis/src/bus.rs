//! Typed handle bundling the signals of one stream bus instance.

use strobe_sim::{SimKernel, Signal};

use crate::error::AxisError;

/// The named signals of one stream interface plus the clock and active-low
/// reset it is sampled on.
///
/// Built once per testbench and shared by the driver, monitor, and checker
/// of that bus.
#[derive(Clone, Debug)]
pub struct AxisBus {
    /// Data word, byte 0 on the low lane.
    pub tdata: Signal,
    /// Word presented.
    pub tvalid: Signal,
    /// Receiver ready.
    pub tready: Signal,
    /// Final word of a frame.
    pub tlast: Signal,
    /// Destination tag, if the device carries one.
    pub tdest: Option<Signal>,
    /// User sideband tag, if the device carries one.
    pub tuser: Option<Signal>,
    /// Clock the bus is sampled on.
    pub clock: Signal,
    /// Active-low reset of the bus's clock domain.
    pub reset: Signal,
    name: String,
    width: u32,
}

impl AxisBus {
    /// Looks up `<prefix>_tdata`, `<prefix>_tvalid`, `<prefix>_tready`,
    /// `<prefix>_tlast` and, when declared, `<prefix>_tdest` and
    /// `<prefix>_tuser`.
    pub fn from_prefix(
        kernel: &SimKernel,
        prefix: &str,
        clock: &Signal,
        reset: &Signal,
    ) -> Result<Self, AxisError> {
        let required = |suffix: &str| {
            let name = format!("{prefix}_{suffix}");
            kernel
                .find_signal(&name)
                .ok_or(AxisError::MissingSignal(name))
        };
        let tdata = required("tdata")?;
        if tdata.width() % 8 != 0 {
            return Err(AxisError::InvalidWidth {
                name: tdata.name(),
                bits: tdata.width(),
            });
        }
        Ok(Self {
            width: tdata.width() / 8,
            tdata,
            tvalid: required("tvalid")?,
            tready: required("tready")?,
            tlast: required("tlast")?,
            tdest: kernel.find_signal(&format!("{prefix}_tdest")),
            tuser: kernel.find_signal(&format!("{prefix}_tuser")),
            clock: clock.clone(),
            reset: reset.clone(),
            name: prefix.to_string(),
        })
    }

    /// Returns the bus prefix.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the data width in bytes.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the destination tag width in bits, 0 if absent.
    pub fn dest_bits(&self) -> u32 {
        self.tdest.as_ref().map_or(0, Signal::width)
    }

    /// Returns the user tag width in bits, 0 if absent.
    pub fn user_bits(&self) -> u32 {
        self.tuser.as_ref().map_or(0, Signal::width)
    }

    /// True unless the reset line is a driven `1`.
    ///
    /// An undriven reset counts as asserted.
    pub fn in_reset(&self) -> bool {
        !self.reset.is_high()
    }
}
