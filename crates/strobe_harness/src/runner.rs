//! Runs the scenario suite, one fresh testbench per scenario.

use std::path::{Path, PathBuf};

use strobe_config::{prepare_config, StrobeConfig};

use crate::error::ScenarioError;
use crate::report::ScenarioReport;
use crate::scenario::Scenario;
use crate::testbench::{device_params, Testbench};

/// Selects which scenarios run. An empty filter selects all.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScenarioFilter {
    /// Exact scenario name.
    pub name: Option<String>,
    /// Substring the scenario name must contain.
    pub substring: Option<String>,
}

impl ScenarioFilter {
    /// Selects exactly one scenario.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            substring: None,
        }
    }

    /// True if `scenario` passes every given criterion.
    pub fn matches(&self, scenario: Scenario) -> bool {
        self.name.as_deref().map_or(true, |n| scenario.name() == n)
            && self
                .substring
                .as_deref()
                .map_or(true, |s| scenario.name().contains(s))
    }
}

/// Runs every selected scenario in order and reports each.
///
/// The configuration is validated once up front, so an unusable
/// configuration fails the whole run before any simulation is built.
/// Scenarios the device cannot support are reported as skipped.
pub fn run_scenarios(
    config: &StrobeConfig,
    filter: &ScenarioFilter,
) -> Result<Vec<ScenarioReport>, ScenarioError> {
    let config = prepare_config(config.clone())?;
    let params = device_params(&config);
    tracing::info!(
        model = ?config.device.model,
        in_width = params.in_width,
        out_width = params.out_width,
        seed = config.harness.seed,
        "running scenarios"
    );

    let reports = Scenario::ALL
        .into_iter()
        .filter(|s| filter.matches(*s))
        .map(|scenario| match scenario.requires(&params) {
            Ok(()) => run_scenario(&config, scenario),
            Err(reason) => {
                tracing::info!(%scenario, %reason, "skipped");
                ScenarioReport::skipped(scenario, reason)
            }
        })
        .collect();
    Ok(reports)
}

/// Builds a testbench for `scenario`, runs it, and reports the outcome.
pub fn run_scenario(config: &StrobeConfig, scenario: Scenario) -> ScenarioReport {
    let span = tracing::info_span!("scenario", name = scenario.name());
    let _entered = span.enter();

    let tb = match Testbench::new(config) {
        Ok(tb) => tb,
        Err(error) => {
            tracing::error!(%error, "testbench setup failed");
            return ScenarioReport::failed(scenario, 0, &error);
        }
    };
    if let Some(path) = &config.harness.waveform {
        let path = waveform_path(path, scenario);
        if let Err(error) = tb.record_waveform(&path) {
            tracing::error!(%error, path = %path.display(), "cannot record waveform");
            return ScenarioReport::failed(scenario, 0, &error);
        }
    }

    let outcome = scenario.run(&tb);
    let end_fs = tb.kernel().now().fs;
    match outcome {
        Ok(frames) => {
            tracing::info!(frames, "passed");
            ScenarioReport::passed(scenario, end_fs, frames)
        }
        Err(error) => {
            tracing::error!(kind = error.kind(), %error, "failed");
            ScenarioReport::failed(scenario, end_fs, &error)
        }
    }
}

/// `waves/run.vcd` becomes `waves/run_<scenario>.vcd`.
pub fn waveform_path(base: &Path, scenario: Scenario) -> PathBuf {
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "strobe".to_string());
    let name = match base.extension() {
        Some(ext) => format!("{stem}_{}.{}", scenario.name(), ext.to_string_lossy()),
        None => format!("{stem}_{}", scenario.name()),
    };
    base.with_file_name(name)
}
