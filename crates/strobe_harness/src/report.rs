//! Per-scenario outcomes, printable as text or serializable as JSON.

use std::fmt;

use serde::Serialize;
use strobe_sim::FormatFs;

use crate::error::ScenarioError;
use crate::scenario::Scenario;

/// Outcome of one scenario.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Every check held.
    Passed,
    /// A check failed or the scenario could not run.
    Failed,
    /// The device lacks what the scenario exercises.
    Skipped,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Status::Passed => "PASS",
            Status::Failed => "FAIL",
            Status::Skipped => "SKIP",
        };
        f.write_str(label)
    }
}

/// What one scenario did.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ScenarioReport {
    /// Scenario name.
    pub scenario: String,
    /// Outcome.
    pub status: Status,
    /// Simulated time at which the scenario ended, in femtoseconds.
    pub end_time_fs: u64,
    /// The same time in readable units.
    pub end_time: String,
    /// Frames compared end to end.
    pub frames_checked: u32,
    /// Failure category, see [`ScenarioError::kind`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    /// Failure message or skip reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ScenarioReport {
    /// A passing run.
    pub fn passed(scenario: Scenario, end_time_fs: u64, frames_checked: u32) -> Self {
        Self {
            scenario: scenario.name().to_string(),
            status: Status::Passed,
            end_time_fs,
            end_time: FormatFs(end_time_fs).to_string(),
            frames_checked,
            error_kind: None,
            message: None,
        }
    }

    /// A failed run.
    pub fn failed(scenario: Scenario, end_time_fs: u64, error: &ScenarioError) -> Self {
        Self {
            scenario: scenario.name().to_string(),
            status: Status::Failed,
            end_time_fs,
            end_time: FormatFs(end_time_fs).to_string(),
            frames_checked: 0,
            error_kind: Some(error.kind().to_string()),
            message: Some(error.to_string()),
        }
    }

    /// A scenario not run, with the reason.
    pub fn skipped(scenario: Scenario, reason: impl Into<String>) -> Self {
        Self {
            scenario: scenario.name().to_string(),
            status: Status::Skipped,
            end_time_fs: 0,
            end_time: FormatFs(0).to_string(),
            frames_checked: 0,
            error_kind: None,
            message: Some(reason.into()),
        }
    }
}

impl fmt::Display for ScenarioReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Status::Passed => {
                return write!(
                    f,
                    "{}  {} ({}, {} frames)",
                    self.status, self.scenario, self.end_time, self.frames_checked
                )
            }
            Status::Failed => write!(f, "{}  {} ({})", self.status, self.scenario, self.end_time)?,
            Status::Skipped => write!(f, "{}  {}", self.status, self.scenario)?,
        }
        match &self.message {
            Some(message) => write!(f, ": {message}"),
            None => Ok(()),
        }
    }
}

/// Counts of each outcome.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Scenarios that passed.
    pub passed: usize,
    /// Scenarios that failed.
    pub failed: usize,
    /// Scenarios skipped.
    pub skipped: usize,
}

impl Summary {
    /// Tallies a set of reports.
    pub fn of(reports: &[ScenarioReport]) -> Self {
        reports.iter().fold(Self::default(), |mut summary, report| {
            match report.status {
                Status::Passed => summary.passed += 1,
                Status::Failed => summary.failed += 1,
                Status::Skipped => summary.skipped += 1,
            }
            summary
        })
    }

    /// True when nothing failed. Skips do not count against a run.
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} passed, {} failed, {} skipped",
            self.passed, self.failed, self.skipped
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strobe_sim::FS_PER_NS;

    #[test]
    fn text_lines() {
        let pass = ScenarioReport::passed(Scenario::WidthConversion, 40 * FS_PER_NS, 3);
        assert_eq!(pass.to_string(), "PASS  width_conversion (40 ns, 3 frames)");

        let skip = ScenarioReport::skipped(Scenario::FullEmpty, "device has no occupancy output");
        assert_eq!(
            skip.to_string(),
            "SKIP  full_empty: device has no occupancy output"
        );

        let error = ScenarioError::DataIntegrity {
            context: "frame 2 tdest".into(),
            expected: "0x1".into(),
            observed: "0x3".into(),
        };
        let fail = ScenarioReport::failed(Scenario::TaggedSingleWord, 9 * FS_PER_NS, &error);
        assert_eq!(
            fail.to_string(),
            "FAIL  tagged_single_word (9 ns): data mismatch in frame 2 tdest: expected 0x1, observed 0x3"
        );
        assert_eq!(fail.error_kind.as_deref(), Some("data_integrity"));
    }

    #[test]
    fn summary_ignores_skips() {
        let reports = vec![
            ScenarioReport::passed(Scenario::WidthConversion, 1, 1),
            ScenarioReport::skipped(Scenario::FullEmpty, "n/a"),
        ];
        let summary = Summary::of(&reports);
        assert_eq!(
            summary,
            Summary {
                passed: 1,
                failed: 0,
                skipped: 1
            }
        );
        assert!(summary.all_passed());
        assert_eq!(summary.to_string(), "1 passed, 0 failed, 1 skipped");
    }
}
