//! Scenario failure taxonomy.

use strobe_axis::AxisError;
use strobe_config::ConfigError;
use strobe_dut::DutError;
use strobe_sim::{FormatFs, SimError};

/// Why a scenario failed. Every failure ends the scenario that raised it.
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    /// The configuration was rejected before any stimulus was applied.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The device model could not be built or wired.
    #[error("device setup failed: {0}")]
    Device(#[from] DutError),

    /// A bus broke the handshake or framing rules.
    #[error("protocol violation on '{signal}' at cycle {cycle}: {reason}")]
    Protocol {
        /// Offending signal.
        signal: String,
        /// Active clock edge count on that bus.
        cycle: u64,
        /// What was observed.
        reason: String,
    },

    /// Received data or tags differ from what was sent.
    #[error("data mismatch in {context}: expected {expected}, observed {observed}")]
    DataIntegrity {
        /// Which frame or field.
        context: String,
        /// Sent value.
        expected: String,
        /// Received value.
        observed: String,
    },

    /// An expected signal state was not observed within its window.
    #[error("'{signal}' expected {expected} {window}, observed {observed}")]
    Liveness {
        /// Watched signal, or `watchdog` for a scenario that never finished.
        signal: String,
        /// Expected state.
        expected: String,
        /// Last observed state.
        observed: String,
        /// Observation window, e.g. `within 8 cycles`.
        window: String,
    },

    /// A stream component stopped or was misused.
    #[error(transparent)]
    Stream(AxisError),

    /// The simulation itself failed.
    #[error("simulation error: {0}")]
    Simulation(#[from] SimError),
}

impl ScenarioError {
    /// Short category name used in reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Device(_) => "device",
            Self::Protocol { .. } => "protocol",
            Self::DataIntegrity { .. } => "data_integrity",
            Self::Liveness { .. } => "liveness",
            Self::Stream(_) => "stream",
            Self::Simulation(_) => "simulation",
        }
    }

    /// Maps kernel run failures that mean "never got there" onto liveness.
    pub(crate) fn from_run(error: SimError) -> Self {
        match error {
            SimError::TimeLimitExceeded { limit_fs } => Self::Liveness {
                signal: "watchdog".to_string(),
                expected: "scenario completion".to_string(),
                observed: "still running".to_string(),
                window: format!("within {}", FormatFs(limit_fs)),
            },
            SimError::Stalled { time_fs } => Self::Liveness {
                signal: "scheduler".to_string(),
                expected: "scenario completion".to_string(),
                observed: format!("no pending activity at {}", FormatFs(time_fs)),
                window: "before the event queue emptied".to_string(),
            },
            other => Self::Simulation(other),
        }
    }
}

impl From<AxisError> for ScenarioError {
    fn from(error: AxisError) -> Self {
        match error {
            AxisError::ProtocolViolation {
                signal,
                cycle,
                reason,
            } => Self::Protocol {
                signal,
                cycle,
                reason,
            },
            AxisError::Sim(sim) => Self::from_run(sim),
            other => Self::Stream(other),
        }
    }
}
