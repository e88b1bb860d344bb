//! Errors raised while parameterizing or wiring a device model.

use strobe_axis::AxisError;
use strobe_sim::SimError;

/// Errors from device parameters, port declaration, or model attachment.
#[derive(Debug, thiserror::Error)]
pub enum DutError {
    /// Neither bus width evenly divides the other.
    #[error("bus widths {input} and {output} bytes are not related by an integer ratio")]
    IncompatibleWidths {
        /// Input (slave) width in bytes.
        input: u32,
        /// Output (master) width in bytes.
        output: u32,
    },

    /// A parameter is out of range or not supported by the model.
    #[error("invalid device parameter: {0}")]
    InvalidParams(String),

    /// Binding the declared ports into bus handles failed.
    #[error(transparent)]
    Axis(#[from] AxisError),

    /// Declaring a port failed.
    #[error(transparent)]
    Sim(#[from] SimError),
}
