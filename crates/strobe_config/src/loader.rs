//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::{DeviceModel, DomainConfig, StrobeConfig};
use std::collections::HashSet;
use std::path::Path;

/// File name looked up in a project directory.
pub const CONFIG_FILE_NAME: &str = "strobe.toml";

/// Widest tag field the bus model carries.
const MAX_TAG_BITS: u32 = 32;

/// Loads and validates `<project_dir>/strobe.toml`.
pub fn load_config(project_dir: &Path) -> Result<StrobeConfig, ConfigError> {
    load_config_file(&project_dir.join(CONFIG_FILE_NAME))
}

/// Loads and validates a configuration file at an explicit path.
pub fn load_config_file(path: &Path) -> Result<StrobeConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `strobe.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<StrobeConfig, ConfigError> {
    let config: StrobeConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    prepare_config(config)
}

/// Fills in the default clock domain if none is given, then validates.
///
/// Configurations built in code go through here as well, so a testbench is
/// never assembled from parameters a file could not express.
pub fn prepare_config(mut config: StrobeConfig) -> Result<StrobeConfig, ConfigError> {
    if config.domains.is_empty() {
        config.domains.push(DomainConfig::default());
    }
    validate_config(&config)?;
    Ok(config)
}

/// Validates that configuration values are present and consistent.
pub fn validate_config(config: &StrobeConfig) -> Result<(), ConfigError> {
    validate_widths(config.device.in_width, config.device.out_width)?;
    validate_device(config)?;
    validate_domains(config)?;

    let harness = &config.harness;
    if harness.watchdog_fs == 0 {
        return Err(ConfigError::ValidationError(
            "harness.watchdog must be greater than zero".to_string(),
        ));
    }
    if harness.frames == 0 {
        return Err(ConfigError::ValidationError(
            "harness.frames must be at least 1".to_string(),
        ));
    }
    if harness.backpressure_words == 0 {
        return Err(ConfigError::ValidationError(
            "harness.backpressure_words must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// Checks the integer-ratio precondition between the two bus widths.
pub fn validate_widths(input: u32, output: u32) -> Result<(), ConfigError> {
    if input == 0 || output == 0 {
        return Err(ConfigError::ValidationError(format!(
            "bus widths must be non-zero (input {input}, output {output})"
        )));
    }
    if input.max(output) % input.min(output) != 0 {
        return Err(ConfigError::IncompatibleWidths { input, output });
    }
    Ok(())
}

fn validate_device(config: &StrobeConfig) -> Result<(), ConfigError> {
    let device = &config.device;
    for (field, bits) in [("dest_bits", device.dest_bits), ("user_bits", device.user_bits)] {
        if bits > MAX_TAG_BITS {
            return Err(ConfigError::ValidationError(format!(
                "device.{field} is {bits}, at most {MAX_TAG_BITS} is supported"
            )));
        }
    }

    match device.model {
        DeviceModel::Converter => {
            if device.occupancy {
                return Err(ConfigError::ValidationError(
                    "the converter model has no occupancy output".to_string(),
                ));
            }
            if device.dest_bits > 0 || device.user_bits > 0 {
                return Err(ConfigError::ValidationError(
                    "the converter model carries no tdest/tuser tags".to_string(),
                ));
            }
            if device.depth.is_some() {
                return Err(ConfigError::ValidationError(
                    "device.depth only applies to the fifo model".to_string(),
                ));
            }
        }
        DeviceModel::Fifo => {
            let depth = device
                .depth
                .ok_or_else(|| ConfigError::MissingField("device.depth".to_string()))?;
            if depth == 0 {
                return Err(ConfigError::ValidationError(
                    "device.depth must be at least 1".to_string(),
                ));
            }
            let capacity_bytes = u64::from(depth) * u64::from(device.in_width);
            if capacity_bytes % u64::from(device.out_width) != 0 {
                return Err(ConfigError::ValidationError(format!(
                    "fifo capacity of {capacity_bytes} bytes is not a whole number of {}-byte output words",
                    device.out_width
                )));
            }
        }
    }
    Ok(())
}

fn validate_domains(config: &StrobeConfig) -> Result<(), ConfigError> {
    let domains = &config.domains;
    if domains.is_empty() {
        return Err(ConfigError::MissingField("domains".to_string()));
    }
    if domains.len() > 2 {
        return Err(ConfigError::ValidationError(format!(
            "at most two clock domains are supported, found {}",
            domains.len()
        )));
    }
    if domains.len() == 2 && config.device.model == DeviceModel::Converter {
        return Err(ConfigError::ValidationError(
            "the converter model has a single clock domain".to_string(),
        ));
    }

    let mut names = HashSet::new();
    for (index, domain) in domains.iter().enumerate() {
        if domain.name.is_empty() {
            return Err(ConfigError::MissingField(format!("domains[{index}].name")));
        }
        if !names.insert(domain.name.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "duplicate clock domain '{}'",
                domain.name
            )));
        }
        if domain.period_fs == 0 || domain.period_fs % 2 != 0 {
            return Err(ConfigError::ValidationError(format!(
                "clock domain '{}' period must be an even, non-zero number of femtoseconds",
                domain.name
            )));
        }
        if domain.reset_hold_fs == 0 {
            return Err(ConfigError::ValidationError(format!(
                "clock domain '{}' reset_hold must be greater than zero",
                domain.name
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use strobe_sim::{FS_PER_MS, FS_PER_NS, FS_PER_US};

    #[test]
    fn empty_file_uses_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.device.model, DeviceModel::Converter);
        assert_eq!(config.device.in_width, 1);
        assert_eq!(config.device.out_width, 1);
        assert_eq!(config.domains.len(), 1);
        assert_eq!(config.domains[0].period_fs, 2 * FS_PER_NS);
        assert_eq!(config.harness.watchdog_fs, FS_PER_MS);
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[device]
model = "fifo"
in_width = 4
out_width = 1
depth = 16
dest_bits = 4
user_bits = 8
occupancy = true

[[domains]]
name = "s_axis"
period = "2ns"
reset_hold = "5ns"

[[domains]]
name = "m_axis"
period = "6ns"
reset_hold = "12ns"

[harness]
seed = 42
watchdog = "500us"
frames = 64
backpressure_words = 512
fill_cycles = 2
waveform = "out/strobe.vcd"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.device.model, DeviceModel::Fifo);
        assert_eq!(config.device.depth, Some(16));
        assert_eq!(config.device.dest_bits, 4);
        assert!(config.device.occupancy);
        assert_eq!(config.domains.len(), 2);
        assert_eq!(config.domains[1].name, "m_axis");
        assert_eq!(config.domains[1].period_fs, 6 * FS_PER_NS);
        assert_eq!(config.domains[1].reset_hold_fs, 12 * FS_PER_NS);
        assert_eq!(config.harness.seed, 42);
        assert_eq!(config.harness.watchdog_fs, 500 * FS_PER_US);
        assert_eq!(config.harness.frames, 64);
        assert_eq!(
            config.harness.waveform.as_deref(),
            Some(Path::new("out/strobe.vcd"))
        );
    }

    #[test]
    fn non_integer_ratio_is_rejected_before_anything_runs() {
        let toml = "[device]\nin_width = 3\nout_width = 2\n";
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::IncompatibleWidths {
                input: 3,
                output: 2
            }
        ));
    }

    #[test]
    fn integer_ratios_are_accepted() {
        for (input, output) in [(1, 4), (4, 1), (2, 2), (2, 8), (16, 4)] {
            assert!(validate_widths(input, output).is_ok(), "{input}/{output}");
        }
    }

    #[test]
    fn zero_width_is_rejected() {
        let err = validate_widths(0, 4).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn fifo_requires_depth() {
        let err = load_config_from_str("[device]\nmodel = \"fifo\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(ref f) if f == "device.depth"));
    }

    #[test]
    fn fifo_capacity_must_fill_whole_output_words() {
        let toml = "[device]\nmodel = \"fifo\"\nin_width = 1\nout_width = 4\ndepth = 6\n";
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn converter_rejects_fifo_features() {
        for body in ["occupancy = true", "dest_bits = 2", "depth = 4"] {
            let toml = format!("[device]\n{body}\n");
            let err = load_config_from_str(&toml).unwrap_err();
            assert!(matches!(err, ConfigError::ValidationError(_)), "{body}");
        }
    }

    #[test]
    fn oversized_tags_are_rejected() {
        let toml = "[device]\nmodel = \"fifo\"\ndepth = 4\nuser_bits = 33\n";
        assert!(matches!(
            load_config_from_str(toml).unwrap_err(),
            ConfigError::ValidationError(_)
        ));
    }

    #[test]
    fn at_most_two_domains() {
        let toml = r#"
[device]
model = "fifo"
depth = 4

[[domains]]
name = "a"
[[domains]]
name = "b"
[[domains]]
name = "c"
"#;
        assert!(matches!(
            load_config_from_str(toml).unwrap_err(),
            ConfigError::ValidationError(_)
        ));
    }

    #[test]
    fn converter_is_single_clock() {
        let toml = "[[domains]]\nname = \"a\"\n[[domains]]\nname = \"b\"\n";
        assert!(matches!(
            load_config_from_str(toml).unwrap_err(),
            ConfigError::ValidationError(_)
        ));
    }

    #[test]
    fn duplicate_domain_names_are_rejected() {
        let toml = "[device]\nmodel = \"fifo\"\ndepth = 4\n[[domains]]\nname = \"a\"\n[[domains]]\nname = \"a\"\n";
        assert!(matches!(
            load_config_from_str(toml).unwrap_err(),
            ConfigError::ValidationError(_)
        ));
    }

    #[test]
    fn odd_or_zero_period_is_rejected() {
        for period in ["\"0ns\"", "3"] {
            let toml = format!("[[domains]]\nname = \"a\"\nperiod = {period}\n");
            assert!(
                matches!(
                    load_config_from_str(&toml).unwrap_err(),
                    ConfigError::ValidationError(_)
                ),
                "{period}"
            );
        }
    }

    #[test]
    fn invalid_toml_errors() {
        let err = load_config_from_str("this is not valid toml {{{}}}").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[device]\nin_width = 2\nout_width = 8\n",
        )
        .unwrap();
        let config = load_config(dir.path()).unwrap();
        assert_eq!(config.device.out_width, 8);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }

    #[test]
    fn prepare_adds_default_domain() {
        let config = prepare_config(StrobeConfig::default()).unwrap();
        assert_eq!(config.domains.len(), 1);
        assert_eq!(config.domains[0].name, "aclk");
    }
}
