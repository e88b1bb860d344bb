//! Configuration types deserialized from `strobe.toml`.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};
use std::path::PathBuf;
use strobe_sim::{parse_duration, FS_PER_MS, FS_PER_NS};

/// The top-level harness configuration parsed from `strobe.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StrobeConfig {
    /// Parameters of the device under test.
    #[serde(default)]
    pub device: DeviceConfig,
    /// Clock domains, input side first. Empty means one default domain.
    #[serde(default)]
    pub domains: Vec<DomainConfig>,
    /// Scenario suite settings.
    #[serde(default)]
    pub harness: HarnessConfig,
}

impl StrobeConfig {
    /// Returns the wider of the two bus widths in bytes.
    pub fn wide_width(&self) -> u32 {
        self.device.in_width.max(self.device.out_width)
    }

    /// Returns the input-side clock domain.
    pub fn input_domain(&self) -> Option<&DomainConfig> {
        self.domains.first()
    }

    /// Returns the output-side clock domain, shared with the input side for
    /// single-domain devices.
    pub fn output_domain(&self) -> Option<&DomainConfig> {
        self.domains.last()
    }
}

/// Which reference device model the harness drives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceModel {
    /// Single-clock width converter without tags or occupancy output.
    #[default]
    Converter,
    /// Buffering width-converting FIFO with optional tags, occupancy, and a
    /// second clock domain.
    Fifo,
}

/// Compile-time parameters of the device under test.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    /// Device model selection.
    #[serde(default)]
    pub model: DeviceModel,
    /// Input (slave) bus width in bytes.
    #[serde(default = "default_width")]
    pub in_width: u32,
    /// Output (master) bus width in bytes.
    #[serde(default = "default_width")]
    pub out_width: u32,
    /// Buffer depth in input words (fifo only).
    #[serde(default)]
    pub depth: Option<u32>,
    /// Width of the destination tag in bits; 0 means no `tdest`.
    #[serde(default)]
    pub dest_bits: u32,
    /// Width of the user tag in bits; 0 means no `tuser`.
    #[serde(default)]
    pub user_bits: u32,
    /// Whether the device exposes an occupancy count.
    #[serde(default)]
    pub occupancy: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            model: DeviceModel::default(),
            in_width: default_width(),
            out_width: default_width(),
            depth: None,
            dest_bits: 0,
            user_bits: 0,
            occupancy: false,
        }
    }
}

/// One clock/reset pair.
#[derive(Debug, Clone, Deserialize)]
pub struct DomainConfig {
    /// Domain name, used as the signal prefix for dual-clock devices.
    #[serde(default = "default_domain_name")]
    pub name: String,
    /// Clock period in femtoseconds (`"2ns"` in the file).
    #[serde(
        default = "default_period",
        rename = "period",
        deserialize_with = "deserialize_duration"
    )]
    pub period_fs: u64,
    /// Reset pulse length in femtoseconds (`"5ns"` in the file).
    #[serde(
        default = "default_reset_hold",
        rename = "reset_hold",
        deserialize_with = "deserialize_duration"
    )]
    pub reset_hold_fs: u64,
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            name: default_domain_name(),
            period_fs: default_period(),
            reset_hold_fs: default_reset_hold(),
        }
    }
}

/// Scenario suite settings.
#[derive(Debug, Clone, Deserialize)]
pub struct HarnessConfig {
    /// Seed for stimulus data and backpressure patterns.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Simulated-time limit per scenario in femtoseconds.
    #[serde(
        default = "default_watchdog",
        rename = "watchdog",
        deserialize_with = "deserialize_duration"
    )]
    pub watchdog_fs: u64,
    /// Frame count of the roundtrip and tagged scenarios.
    #[serde(default = "default_frames")]
    pub frames: u32,
    /// Word count of the randomized backpressure frame.
    #[serde(default = "default_backpressure_words")]
    pub backpressure_words: u32,
    /// Fill/drain repetitions of the full/empty scenario.
    #[serde(default = "default_fill_cycles")]
    pub fill_cycles: u32,
    /// Optional VCD output path.
    #[serde(default)]
    pub waveform: Option<PathBuf>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            watchdog_fs: default_watchdog(),
            frames: default_frames(),
            backpressure_words: default_backpressure_words(),
            fill_cycles: default_fill_cycles(),
            waveform: None,
        }
    }
}

fn default_width() -> u32 {
    1
}

fn default_domain_name() -> String {
    "aclk".to_string()
}

fn default_period() -> u64 {
    2 * FS_PER_NS
}

fn default_reset_hold() -> u64 {
    5 * FS_PER_NS
}

fn default_seed() -> u64 {
    1
}

fn default_watchdog() -> u64 {
    FS_PER_MS
}

fn default_frames() -> u32 {
    256
}

fn default_backpressure_words() -> u32 {
    1024
}

fn default_fill_cycles() -> u32 {
    4
}

/// Deserializes a duration given as a string with a unit (`"5ns"`) or as a
/// bare integer count of femtoseconds.
fn deserialize_duration<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    struct DurationVisitor;

    impl Visitor<'_> for DurationVisitor {
        type Value = u64;

        fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            formatter.write_str("a duration like \"2ns\" or an integer femtosecond count")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            parse_duration(v).map_err(E::custom)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            u64::try_from(v).map_err(|_| E::custom("duration must not be negative"))
        }
    }

    deserializer.deserialize_any(DurationVisitor)
}
