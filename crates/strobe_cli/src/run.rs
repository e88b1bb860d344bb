//! `strobe run`: execute scenarios and report each one.

use serde::Serialize;
use strobe_config::StrobeConfig;
use strobe_harness::{run_scenarios, Scenario, ScenarioFilter, ScenarioReport, Summary};

use crate::{GlobalArgs, ReportFormat, RunArgs};

/// JSON document printed by `--format json`.
#[derive(Serialize)]
struct RunReport<'a> {
    seed: u64,
    scenarios: &'a [ScenarioReport],
    summary: Summary,
}

/// Runs the `strobe run` command.
///
/// Returns exit code 0 if no scenario failed, 1 otherwise. Skipped
/// scenarios do not fail the run.
pub fn run(args: &RunArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    if let Some(name) = &args.name {
        if Scenario::from_name(name).is_none() {
            return Err(format!("unknown scenario '{name}' (see `strobe list`)").into());
        }
    }
    let config = apply_overrides(global.load_config()?, args);
    let filter = ScenarioFilter {
        name: args.name.clone(),
        substring: args.filter.clone(),
    };

    let reports = run_scenarios(&config, &filter)?;
    if reports.is_empty() && !global.quiet {
        eprintln!("warning: no scenarios match the given filter");
    }
    let summary = Summary::of(&reports);

    match args.format {
        ReportFormat::Text => {
            if !global.quiet {
                for report in &reports {
                    println!("{report}");
                }
                println!();
                println!("test result: {summary}");
            }
        }
        ReportFormat::Json => {
            let doc = RunReport {
                seed: config.harness.seed,
                scenarios: &reports,
                summary,
            };
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
    }

    Ok(if summary.all_passed() { 0 } else { 1 })
}

fn apply_overrides(mut config: StrobeConfig, args: &RunArgs) -> StrobeConfig {
    if let Some(seed) = args.seed {
        config.harness.seed = seed;
    }
    if let Some(path) = &args.waveform {
        config.harness.waveform = Some(path.clone());
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn args() -> RunArgs {
        RunArgs {
            name: None,
            filter: None,
            format: ReportFormat::Json,
            seed: None,
            waveform: None,
        }
    }

    fn global_with(config: &str) -> (tempfile::TempDir, GlobalArgs) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("strobe.toml");
        std::fs::write(&path, config).unwrap();
        let global = GlobalArgs {
            quiet: true,
            verbose: false,
            config: Some(path),
        };
        (dir, global)
    }

    #[test]
    fn overrides_replace_config_values() {
        let mut a = args();
        a.seed = Some(99);
        a.waveform = Some(PathBuf::from("w.vcd"));
        let config = apply_overrides(StrobeConfig::default(), &a);
        assert_eq!(config.harness.seed, 99);
        assert_eq!(config.harness.waveform, Some(PathBuf::from("w.vcd")));
    }

    #[test]
    fn unknown_scenario_is_an_error() {
        let (_dir, global) = global_with("");
        let mut a = args();
        a.name = Some("bogus".into());
        let err = run(&a, &global).unwrap_err();
        assert!(err.to_string().contains("unknown scenario 'bogus'"));
    }

    #[test]
    fn passing_run_exits_zero() {
        let (_dir, global) = global_with("[device]\nin_width = 1\nout_width = 2\n");
        let mut a = args();
        a.filter = Some("reset".into());
        assert_eq!(run(&a, &global).unwrap(), 0);
    }

    #[test]
    fn failing_run_exits_one() {
        let (_dir, global) =
            global_with("[device]\nin_width = 1\nout_width = 4\n\n[harness]\nwatchdog = \"20ns\"\n");
        let mut a = args();
        a.name = Some("random_backpressure".into());
        assert_eq!(run(&a, &global).unwrap(), 1);
    }

    #[test]
    fn bad_widths_fail_before_running() {
        let (_dir, global) = global_with("[device]\nin_width = 3\nout_width = 2\n");
        let err = run(&args(), &global).unwrap_err();
        assert!(err.to_string().contains("incompatible bus widths"));
    }
}
