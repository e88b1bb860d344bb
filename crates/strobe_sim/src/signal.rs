//! Signal handles used by tasks to read, drive, and wait on wires.

use std::fmt;

use strobe_common::{Logic, LogicVec};

use crate::kernel::SimKernel;
use crate::trigger::{Edge, EdgeTrigger};
use crate::value::SimSignalId;

/// A handle to one simulation signal.
///
/// Reads see the value as of the current delta cycle. Writes land one delta
/// later, so a task that drives and then reads in the same step sees the
/// old value.
#[derive(Clone)]
pub struct Signal {
    id: SimSignalId,
    width: u32,
    kernel: SimKernel,
}

impl Signal {
    pub(crate) fn new(id: SimSignalId, width: u32, kernel: SimKernel) -> Self {
        Self { id, width, kernel }
    }

    /// Returns the kernel-wide signal ID.
    pub fn id(&self) -> SimSignalId {
        self.id
    }

    /// Returns the bit width.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the declared name.
    pub fn name(&self) -> String {
        self.kernel.signal_name(self.id)
    }

    /// Returns the kernel that owns this signal.
    pub fn kernel(&self) -> &SimKernel {
        &self.kernel
    }

    /// Returns the full current value.
    pub fn value(&self) -> LogicVec {
        self.kernel.signal_value(self.id)
    }

    /// Returns bit 0, the whole value of a 1-bit control signal.
    pub fn logic(&self) -> Logic {
        self.kernel.signal_bit0(self.id)
    }

    /// True if bit 0 is a driven `1`.
    pub fn is_high(&self) -> bool {
        self.logic().is_high()
    }

    /// Returns the value as an integer, or `None` if any bit is X/Z.
    pub fn to_u64(&self) -> Option<u64> {
        self.value().to_u64()
    }

    /// Drives a new value, resized to the signal width.
    pub fn set(&self, value: impl Into<LogicVec>) {
        self.kernel.schedule_write(self.id, value.into());
    }

    /// Drives bit 0 and zeroes the rest.
    pub fn set_logic(&self, value: Logic) {
        self.set(value);
    }

    /// Drives a boolean level.
    pub fn set_bool(&self, value: bool) {
        self.set_logic(Logic::from_bool(value));
    }

    /// Drives an integer value.
    pub fn set_u64(&self, value: u64) {
        self.set(LogicVec::from_u64(value, self.width));
    }

    /// Drives byte lanes, byte 0 on the low lane.
    pub fn set_bytes(&self, bytes: &[u8]) {
        self.set(LogicVec::from_bytes(bytes));
    }

    /// Drives every bit to X.
    pub fn set_unknown(&self) {
        self.set(LogicVec::unknown(self.width));
    }

    /// Waits for the next rising edge.
    pub fn rising_edge(&self) -> EdgeTrigger {
        self.kernel.first_edge(&[(self, Edge::Rising)])
    }

    /// Waits for the next falling edge.
    pub fn falling_edge(&self) -> EdgeTrigger {
        self.kernel.first_edge(&[(self, Edge::Falling)])
    }

    /// Waits for the next edge in either direction.
    pub fn any_edge(&self) -> EdgeTrigger {
        self.kernel.first_edge(&[(self, Edge::Any)])
    }

    /// Waits for `count` rising edges.
    pub async fn rising_edges(&self, count: u32) {
        for _ in 0..count {
            self.rising_edge().await;
        }
    }
}

impl fmt::Debug for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("name", &self.name())
            .field("width", &self.width)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::FS_PER_NS;

    #[test]
    fn integer_and_byte_writes() {
        let kernel = SimKernel::new();
        let data = kernel.signal("tdata", 16).unwrap();
        let k = kernel.clone();
        let (word, bytes) = kernel
            .run_until_complete(async move {
                data.set_u64(0xBEEF);
                k.timer(FS_PER_NS).await;
                let word = data.to_u64();
                data.set_bytes(&[0x12, 0x34]);
                k.timer(FS_PER_NS).await;
                (word, data.value().to_bytes())
            })
            .unwrap();
        assert_eq!(word, Some(0xBEEF));
        assert_eq!(bytes, Some(vec![0x12, 0x34]));
    }

    #[test]
    fn narrow_write_is_zero_extended() {
        let kernel = SimKernel::new();
        let data = kernel.signal("tdata", 8).unwrap();
        let k = kernel.clone();
        let value = kernel
            .run_until_complete(async move {
                data.set_bool(true);
                k.timer(0).await;
                data.to_u64()
            })
            .unwrap();
        assert_eq!(value, Some(1));
    }

    #[test]
    fn unknown_write_reads_back_as_none() {
        let kernel = SimKernel::new();
        let data = kernel.signal("tdata", 8).unwrap();
        let k = kernel.clone();
        let value = kernel
            .run_until_complete(async move {
                data.set_u64(5);
                k.timer(0).await;
                data.set_unknown();
                k.timer(0).await;
                data.to_u64()
            })
            .unwrap();
        assert_eq!(value, None);
    }

    #[test]
    fn counts_rising_edges() {
        let kernel = SimKernel::new();
        let clk = kernel.signal("clk", 1).unwrap();
        let driver = clk.clone();
        let k = kernel.clone();
        kernel.spawn(async move {
            for _ in 0..4 {
                driver.set_bool(false);
                k.timer(FS_PER_NS).await;
                driver.set_bool(true);
                k.timer(FS_PER_NS).await;
            }
        });
        let k = kernel.clone();
        let t = kernel
            .run_until_complete(async move {
                clk.rising_edges(3).await;
                k.now().fs
            })
            .unwrap();
        assert_eq!(t, 5 * FS_PER_NS);
    }

    #[test]
    fn debug_shows_name() {
        let kernel = SimKernel::new();
        let sig = kernel.signal("m_axis_tready", 1).unwrap();
        assert!(format!("{sig:?}").contains("m_axis_tready"));
    }
}
