//! Simulation signal identifiers and per-signal runtime state.

use serde::{Deserialize, Serialize};
use strobe_common::LogicVec;

/// Opaque ID for a simulation signal.
///
/// Signals live in one flat namespace per kernel and are never removed, so
/// an ID stays valid for the kernel's lifetime.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct SimSignalId(u32);

impl SimSignalId {
    /// Creates a `SimSignalId` from a raw index.
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw index.
    pub fn as_raw(self) -> u32 {
        self.0
    }
}

/// The runtime state of a simulation signal.
#[derive(Clone, Debug)]
pub struct SimSignalState {
    /// Current signal value.
    pub value: LogicVec,
    /// Name used in diagnostics and waveform output.
    pub name: String,
    /// Bit width of this signal.
    pub width: u32,
}

impl SimSignalState {
    /// Creates a new signal state initialized to all-X (unknown).
    pub fn new_unknown(name: String, width: u32) -> Self {
        Self {
            value: LogicVec::unknown(width),
            name,
            width,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strobe_common::Logic;

    #[test]
    fn sim_signal_id_roundtrip() {
        let id = SimSignalId::from_raw(42);
        assert_eq!(id.as_raw(), 42);
        assert_eq!(id, SimSignalId::from_raw(42));
        assert_ne!(id, SimSignalId::from_raw(43));
    }

    #[test]
    fn new_signal_is_unknown() {
        let s = SimSignalState::new_unknown("tdata".into(), 16);
        assert_eq!(s.width, 16);
        assert_eq!(s.value.width(), 16);
        assert!((0..16).all(|i| s.value.get(i) == Logic::X));
    }
}
