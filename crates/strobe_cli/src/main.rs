//! Strobe CLI: runs the stream-device scenario suite.
//!
//! `strobe run` executes scenarios against the device described by
//! `strobe.toml`, `strobe list` names the scenarios, and `strobe check`
//! validates a configuration without simulating anything.

#![warn(missing_docs)]

mod check;
mod list;
mod run;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use strobe_config::{load_config_file, prepare_config, StrobeConfig, CONFIG_FILE_NAME};
use tracing_subscriber::EnvFilter;

/// Strobe: a verification harness for width-converting stream devices.
#[derive(Parser, Debug)]
#[command(name = "strobe", version, about = "Stream device verification harness")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a `strobe.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run scenarios against the configured device.
    Run(RunArgs),
    /// List the scenarios and whether the device supports each.
    List,
    /// Validate the configuration and print the resolved device.
    Check,
}

/// Arguments for the `strobe run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Run only the scenario with this exact name.
    pub name: Option<String>,

    /// Substring filter for scenario names.
    #[arg(long)]
    pub filter: Option<String>,

    /// Report format.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,

    /// Override the stimulus and backpressure seed.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Record a VCD waveform per scenario, named after this path.
    #[arg(long)]
    pub waveform: Option<PathBuf>,
}

/// Report output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable terminal output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Optional path to a custom config file.
    pub config: Option<PathBuf>,
}

impl GlobalArgs {
    /// Loads the configuration file.
    ///
    /// An explicit `--config` must exist. Without one, `./strobe.toml` is
    /// used if present and built-in defaults otherwise.
    pub fn load_config(&self) -> Result<StrobeConfig, Box<dyn std::error::Error>> {
        let config = match &self.config {
            Some(path) => load_config_file(path)?,
            None => {
                let default = Path::new(CONFIG_FILE_NAME);
                if default.is_file() {
                    load_config_file(default)?
                } else {
                    tracing::debug!("no {CONFIG_FILE_NAME} found, using defaults");
                    prepare_config(StrobeConfig::default())?
                }
            }
        };
        Ok(config)
    }
}

/// Picks the log filter: `-v` and `-q` win over `RUST_LOG`, which wins over
/// the `info` default.
fn log_filter(quiet: bool, verbose: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new("debug")
    } else if quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(cli.quiet, cli.verbose))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        config: cli.config,
    };

    let result = match cli.command {
        Command::Run(ref args) => run::run(args, &global),
        Command::List => list::run(&global),
        Command::Check => check::run(&global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_run_default() {
        let cli = Cli::parse_from(["strobe", "run"]);
        match cli.command {
            Command::Run(ref args) => {
                assert!(args.name.is_none());
                assert!(args.filter.is_none());
                assert_eq!(args.format, ReportFormat::Text);
                assert!(args.seed.is_none());
                assert!(args.waveform.is_none());
            }
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn parse_run_with_args() {
        let cli = Cli::parse_from([
            "strobe",
            "run",
            "full_empty",
            "--format",
            "json",
            "--seed",
            "42",
            "--waveform",
            "out/run.vcd",
        ]);
        match cli.command {
            Command::Run(ref args) => {
                assert_eq!(args.name.as_deref(), Some("full_empty"));
                assert_eq!(args.format, ReportFormat::Json);
                assert_eq!(args.seed, Some(42));
                assert_eq!(args.waveform, Some(PathBuf::from("out/run.vcd")));
            }
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn parse_run_filter() {
        let cli = Cli::parse_from(["strobe", "run", "--filter", "reset"]);
        match cli.command {
            Command::Run(ref args) => assert_eq!(args.filter.as_deref(), Some("reset")),
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::parse_from(["strobe", "--quiet", "--config", "/tmp/s.toml", "check"]);
        assert!(cli.quiet);
        assert!(!cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/s.toml")));
        assert!(matches!(cli.command, Command::Check));
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["strobe", "list", "-v"]);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Command::List));
    }

    #[test]
    fn rejects_unknown_format() {
        assert!(Cli::try_parse_from(["strobe", "run", "--format", "xml"]).is_err());
    }

    #[test]
    fn verbose_wins_over_quiet() {
        assert_eq!(log_filter(true, true).to_string(), "debug");
        assert_eq!(log_filter(true, false).to_string(), "error");
    }

    #[test]
    fn explicit_config_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let global = GlobalArgs {
            quiet: true,
            verbose: false,
            config: Some(dir.path().join("missing.toml")),
        };
        assert!(global.load_config().is_err());
    }

    #[test]
    fn explicit_config_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("strobe.toml");
        std::fs::write(&path, "[device]\nin_width = 2\nout_width = 8\n").unwrap();
        let global = GlobalArgs {
            quiet: true,
            verbose: false,
            config: Some(path),
        };
        let config = global.load_config().unwrap();
        assert_eq!(config.device.out_width, 8);
        assert_eq!(config.domains.len(), 1);
    }
}
