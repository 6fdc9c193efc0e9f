//! Command-line interface definitions for autoclick.

use std::{path::PathBuf, time::Duration};

use autoclick_engine::{DEFAULT_BACKEND_URL, EngineConfig, SAMPLE_PERIOD};
use clap::{Args, Parser, Subcommand};
use config::{DelayClickStep, SessionMode, SpeedUnit};
use logging::LogArgs;

/// Command-line interface for the `autoclick` binary.
#[derive(Parser, Debug)]
#[command(
    name = "autoclick",
    about = "Timed click sequencing against an automation backend",
    version
)]
pub struct Cli {
    /// Logging controls shared across autoclick binaries.
    #[command(flatten)]
    pub log: LogArgs,

    /// Path to the persisted configuration (default: ~/.autoclick/config.json).
    #[arg(long = "config", global = true, value_name = "PATH")]
    pub config_path: Option<PathBuf>,

    /// What to do.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run an interactive session reading commands from stdin.
    Run(RunArgs),
    /// Inspect or edit the persisted configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Show the effective period for an interval.
    Resolve(ResolveArgs),
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Base URL of the automation backend.
    #[arg(long, default_value = DEFAULT_BACKEND_URL, value_name = "URL")]
    pub backend_url: String,

    /// Timeout for the start request.
    #[arg(
        long,
        value_parser = humantime::parse_duration,
        default_value = "5s",
        value_name = "DURATION"
    )]
    pub backend_timeout: Duration,

    /// Upper bound on the neutralizing request sent by stop.
    #[arg(
        long,
        value_parser = humantime::parse_duration,
        default_value = "2s",
        value_name = "DURATION"
    )]
    pub stop_timeout: Duration,

    /// How often the configuration and counter are saved.
    #[arg(
        long,
        value_parser = humantime::parse_duration,
        default_value = "5s",
        value_name = "DURATION"
    )]
    pub autosave: Duration,

    /// Quiet period after which the click counter resets.
    #[arg(
        long,
        value_parser = humantime::parse_duration,
        default_value = "5s",
        value_name = "DURATION"
    )]
    pub inactivity: Duration,

    /// Start a session immediately with the persisted configuration.
    #[arg(long)]
    pub start: bool,
}

impl RunArgs {
    /// Engine tunables for these arguments.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            backend_url: self.backend_url.clone(),
            backend_timeout: self.backend_timeout,
            stop_timeout: self.stop_timeout,
            autosave_period: self.autosave,
            inactivity_limit: self.inactivity,
            sample_period: SAMPLE_PERIOD,
        }
    }
}

/// `config` subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommand {
    /// Print the persisted configuration.
    Show,
    /// Change configuration fields; omitted fields keep their values.
    Set(SetArgs),
    /// Append a step to the click plan.
    AddStep {
        /// Delay before the step, in milliseconds.
        #[arg(long, default_value_t = config::DEFAULT_STEP_DELAY_MS)]
        delay: u64,
        /// Clicks in the step.
        #[arg(long, default_value_t = config::DEFAULT_STEP_COUNT)]
        count: u32,
    },
    /// Remove the step at a zero-based index.
    RemoveStep {
        /// Step index.
        index: usize,
    },
    /// Zero the persisted click counter.
    ResetCounter,
}

/// Arguments for `config set`.
#[derive(Args, Debug, Clone, Default)]
pub struct SetArgs {
    /// Title of the target window.
    #[arg(long)]
    pub window_title: Option<String>,

    /// Trigger mode (KEY, MOUSE, AUTO, MANUAL).
    #[arg(long)]
    pub mode: Option<SessionMode>,

    /// Interval between clicks; non-numeric, zero or negative values become 100.
    #[arg(long, allow_hyphen_values = true)]
    pub interval: Option<String>,

    /// Unit of the interval (MS, MC, NN).
    #[arg(long)]
    pub speed_mode: Option<SpeedUnit>,

    /// Replace the click plan with these steps, each `DELAY:COUNT`.
    #[arg(long = "step", value_parser = parse_step, value_name = "DELAY:COUNT")]
    pub steps: Vec<DelayClickStep>,
}

/// Arguments for the `resolve` subcommand.
#[derive(Args, Debug, Clone)]
pub struct ResolveArgs {
    /// Raw interval text.
    #[arg(allow_hyphen_values = true)]
    pub interval: String,

    /// Unit of the interval (MS, MC, NN).
    #[arg(long, default_value = "MS")]
    pub speed_mode: SpeedUnit,
}

/// Parse a `DELAY:COUNT` step; a missing count means one click.
pub fn parse_step(s: &str) -> Result<DelayClickStep, String> {
    let (delay, count) = s.split_once(':').unwrap_or((s, "1"));
    let delay = delay
        .trim()
        .parse::<i64>()
        .map_err(|_| format!("invalid delay in step '{s}'"))?;
    let count = count
        .trim()
        .parse::<i64>()
        .map_err(|_| format!("invalid count in step '{s}'"))?;
    Ok(DelayClickStep::from_loose(Some(delay), Some(count)))
}

#[cfg(test)]
mod tests {
    use autoclick_engine::DEFAULT_AUTOSAVE_PERIOD;

    use super::*;

    #[test]
    fn step_parsing() {
        assert_eq!(parse_step("250:3"), Ok(DelayClickStep::new(250, 3)));
        assert_eq!(parse_step("40"), Ok(DelayClickStep::new(40, 1)));
        assert_eq!(parse_step("10:0"), Ok(DelayClickStep::new(10, 1)));
        assert_eq!(parse_step("-5:2"), Ok(DelayClickStep::new(0, 2)));
        assert!(parse_step("soon:2").is_err());
    }

    #[test]
    fn parses_config_set() {
        let cli = Cli::parse_from([
            "autoclick",
            "config",
            "set",
            "--window-title",
            "Game",
            "--mode",
            "auto",
            "--interval",
            "250",
            "--speed-mode",
            "MC",
            "--step",
            "0:5",
            "--step",
            "100:2",
        ]);
        let Commands::Config(ConfigCommand::Set(args)) = cli.command else {
            panic!("expected config set");
        };
        assert_eq!(args.window_title.as_deref(), Some("Game"));
        assert_eq!(args.mode, Some(SessionMode::Auto));
        assert_eq!(args.speed_mode, Some(SpeedUnit::Microseconds));
        assert_eq!(args.steps.len(), 2);
    }

    #[test]
    fn run_args_map_to_engine_config() {
        let cli = Cli::parse_from([
            "autoclick",
            "--config",
            "/tmp/ac.json",
            "run",
            "--backend-url",
            "http://127.0.0.1:9000/api",
            "--stop-timeout",
            "500ms",
        ]);
        assert_eq!(cli.config_path, Some(PathBuf::from("/tmp/ac.json")));
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        let cfg = args.engine_config();
        assert_eq!(cfg.backend_url, "http://127.0.0.1:9000/api");
        assert_eq!(cfg.stop_timeout, Duration::from_millis(500));
        assert_eq!(cfg.autosave_period, DEFAULT_AUTOSAVE_PERIOD);
    }
}
