//! Elaboration-time parameters of the device under test.

use crate::error::DutError;

/// Widest tag field the models carry.
pub const MAX_TAG_BITS: u32 = 32;

/// Read-only parameters the harness elaborates a device with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceParams {
    /// Input (slave) bus width in bytes.
    pub in_width: u32,
    /// Output (master) bus width in bytes.
    pub out_width: u32,
    /// Buffer depth in input words; `None` for the plain converter.
    pub depth: Option<u32>,
    /// Destination tag width in bits, 0 for none.
    pub dest_bits: u32,
    /// User tag width in bits, 0 for none.
    pub user_bits: u32,
    /// Whether a `data_count` occupancy output exists.
    pub occupancy: bool,
    /// Clock domain names, input side first. One entry means a shared
    /// `aclk`/`arstn` pair; with two, each name prefixes its own pair.
    pub domains: Vec<String>,
}

impl Default for DeviceParams {
    fn default() -> Self {
        Self {
            in_width: 1,
            out_width: 1,
            depth: None,
            dest_bits: 0,
            user_bits: 0,
            occupancy: false,
            domains: vec!["aclk".to_string()],
        }
    }
}

impl DeviceParams {
    /// Checks the integer-ratio precondition and parameter ranges.
    pub fn validate(&self) -> Result<(), DutError> {
        if self.in_width == 0 || self.out_width == 0 {
            return Err(DutError::InvalidParams(format!(
                "bus widths must be non-zero (in {}, out {})",
                self.in_width, self.out_width
            )));
        }
        let (wide, narrow) = (self.wide_width(), self.in_width.min(self.out_width));
        if wide % narrow != 0 {
            return Err(DutError::IncompatibleWidths {
                input: self.in_width,
                output: self.out_width,
            });
        }
        for (name, bits) in [("dest_bits", self.dest_bits), ("user_bits", self.user_bits)] {
            if bits > MAX_TAG_BITS {
                return Err(DutError::InvalidParams(format!(
                    "{name} of {bits} exceeds {MAX_TAG_BITS}"
                )));
            }
        }
        if !(1..=2).contains(&self.domains.len()) {
            return Err(DutError::InvalidParams(format!(
                "expected one or two clock domains, got {}",
                self.domains.len()
            )));
        }
        if let Some(depth) = self.depth {
            if depth == 0 {
                return Err(DutError::InvalidParams("depth must be at least 1".into()));
            }
            if (depth as usize * self.in_width as usize) % self.out_width as usize != 0 {
                return Err(DutError::InvalidParams(format!(
                    "depth {depth} of {}-byte words is not a whole number of {}-byte output words",
                    self.in_width, self.out_width
                )));
            }
        }
        Ok(())
    }

    /// Returns the wider of the two bus widths in bytes.
    pub fn wide_width(&self) -> u32 {
        self.in_width.max(self.out_width)
    }

    /// True when the input and output sides have separate clocks.
    pub fn is_dual_clock(&self) -> bool {
        self.domains.len() == 2
    }

    /// True when either tag field is present.
    pub fn has_tags(&self) -> bool {
        self.dest_bits > 0 || self.user_bits > 0
    }

    /// Bytes the device can hold before it deasserts `s_axis_tready`.
    ///
    /// The plain converter holds two of its wider words.
    pub fn capacity_bytes(&self) -> usize {
        match self.depth {
            Some(depth) => depth as usize * self.in_width as usize,
            None => 2 * self.wide_width() as usize,
        }
    }

    /// Bit width of `data_count`, wide enough to hold the depth.
    pub fn count_bits(&self) -> u32 {
        let depth = self.depth.unwrap_or(1).max(1);
        u32::BITS - depth.leading_zeros()
    }
}
