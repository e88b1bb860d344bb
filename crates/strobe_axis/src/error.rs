//! Error types for stream driving and monitoring.

use strobe_sim::SimError;

/// Errors reported by the bus driver, monitor, and frame completions.
#[derive(Debug, thiserror::Error)]
pub enum AxisError {
    /// A bus signal required by the handle is not declared.
    #[error("bus signal '{0}' is not declared")]
    MissingSignal(String),

    /// The data bus is not a whole number of bytes wide.
    #[error("bus '{name}' data width of {bits} bits is not a whole number of bytes")]
    InvalidWidth {
        /// Name of the data signal.
        name: String,
        /// Its width in bits.
        bits: u32,
    },

    /// A frame with no bytes cannot be framed with a last-word marker.
    #[error("cannot send an empty frame")]
    EmptyFrame,

    /// The bus violated the handshake or framing rules.
    #[error("protocol violation on '{signal}' at cycle {cycle}: {reason}")]
    ProtocolViolation {
        /// Offending signal.
        signal: String,
        /// Active clock edge count since the monitor started.
        cycle: u64,
        /// What was observed.
        reason: String,
    },

    /// The driver or monitor task stopped while a caller was waiting on it.
    #[error("{0} stopped before the transfer finished")]
    Closed(&'static str),

    /// The underlying simulation failed.
    #[error(transparent)]
    Sim(#[from] SimError),
}
