//! `strobe check`: validate a configuration without simulating.

use strobe_config::StrobeConfig;
use strobe_sim::FormatFs;

use crate::GlobalArgs;

/// Runs the `strobe check` command.
///
/// Loading validates the configuration, so reaching the summary means it
/// is usable. Errors propagate and exit with code 1.
pub fn run(global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let config = global.load_config()?;
    if !global.quiet {
        for line in describe(&config) {
            println!("{line}");
        }
    }
    Ok(0)
}

fn describe(config: &StrobeConfig) -> Vec<String> {
    let device = &config.device;
    let mut lines = vec![format!(
        "device: {:?}, {} -> {} bytes",
        device.model, device.in_width, device.out_width
    )
    .to_lowercase()];
    if let Some(depth) = device.depth {
        lines.push(format!("  depth: {depth} input words"));
    }
    if device.dest_bits > 0 || device.user_bits > 0 {
        lines.push(format!(
            "  tags: tdest {} bits, tuser {} bits",
            device.dest_bits, device.user_bits
        ));
    }
    if device.occupancy {
        lines.push("  occupancy output: yes".to_string());
    }
    for domain in &config.domains {
        lines.push(format!(
            "domain {}: period {}, reset hold {}",
            domain.name,
            FormatFs(domain.period_fs),
            FormatFs(domain.reset_hold_fs)
        ));
    }
    let harness = &config.harness;
    lines.push(format!(
        "harness: seed {}, watchdog {}, {} frames",
        harness.seed,
        FormatFs(harness.watchdog_fs),
        harness.frames
    ));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use strobe_config::load_config_from_str;

    #[test]
    fn describes_a_dual_clock_fifo() {
        let config = load_config_from_str(
            r#"
[device]
model = "fifo"
in_width = 4
out_width = 1
depth = 16
dest_bits = 2
occupancy = true

[[domains]]
name = "s_axis"
period = "4ns"

[[domains]]
name = "m_axis"
period = "10ns"
"#,
        )
        .unwrap();
        let lines = describe(&config);
        assert_eq!(lines[0], "device: fifo, 4 -> 1 bytes");
        assert!(lines.contains(&"  depth: 16 input words".to_string()));
        assert!(lines.contains(&"  tags: tdest 2 bits, tuser 0 bits".to_string()));
        assert!(lines.contains(&"domain m_axis: period 10 ns, reset hold 5 ns".to_string()));
        assert_eq!(lines.last().unwrap(), "harness: seed 1, watchdog 1 ms, 256 frames");
    }

    #[test]
    fn invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("strobe.toml");
        std::fs::write(&path, "[device]\nmodel = \"fifo\"\n").unwrap();
        let global = GlobalArgs {
            quiet: true,
            verbose: false,
            config: Some(path),
        };
        let err = run(&global).unwrap_err();
        assert!(err.to_string().contains("device.depth"));
    }
}
