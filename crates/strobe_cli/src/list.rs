//! `strobe list`: name every scenario.

use strobe_harness::{device_params, DeviceParams, Scenario};

use crate::GlobalArgs;

/// Runs the `strobe list` command.
///
/// Scenarios the configured device cannot run are marked with the reason.
pub fn run(global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let params = device_params(&global.load_config()?);
    for line in listing(&params) {
        println!("{line}");
    }
    Ok(0)
}

fn listing(params: &DeviceParams) -> Vec<String> {
    Scenario::ALL
        .into_iter()
        .map(|scenario| {
            let mut line = format!("{:<22}{}", scenario.name(), scenario.description());
            if let Err(reason) = scenario.requires(params) {
                line.push_str(&format!(" (skipped: {reason})"));
            }
            line
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marks_unsupported_scenarios() {
        let lines = listing(&DeviceParams::default());
        assert_eq!(lines.len(), Scenario::ALL.len());
        assert!(lines[0].starts_with("width_conversion      roundtrip"));
        assert!(lines[2].ends_with("(skipped: device has no occupancy output)"));
        assert!(!lines[4].contains("skipped"));
    }
}
