use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use footfall_core::driver::DriverConfig;

fn parse_duration(input: &str) -> Result<Duration, String> {
    let s = input.trim();
    if s.is_empty() {
        return Err("duration cannot be empty (expected e.g. 10s, 250ms, 1m)".to_string());
    }

    // Bare numbers are seconds, matching the flag format the shop tooling
    // has always used.
    if s.chars().all(|ch| ch.is_ascii_digit()) {
        let secs: u64 = s
            .parse()
            .map_err(|_| format!("invalid duration '{s}' (expected e.g. 10s, 250ms, 1m)"))?;
        return Ok(Duration::from_secs(secs));
    }

    humantime::parse_duration(s)
        .map_err(|_| format!("invalid duration '{s}' (expected e.g. 10s, 250ms, 1m)"))
}

fn parse_positive_duration(input: &str) -> Result<Duration, String> {
    let d = parse_duration(input)?;
    if d.is_zero() {
        return Err(format!("invalid duration '{}' (must be positive)", input.trim()));
    }
    Ok(d)
}

fn parse_concurrency(input: &str) -> Result<usize, String> {
    let parsed: Option<usize> = input.trim().parse().ok();
    match parsed {
        Some(value) if value > 0 => Ok(value),
        _ => Err(format!(
            "invalid concurrency '{input}' (expected a positive integer)"
        )),
    }
}

fn parse_fraction(input: &str) -> Result<f64, String> {
    let parsed: Option<f64> = input.trim().parse().ok();
    match parsed {
        Some(value) if (0.0..=1.0).contains(&value) => Ok(value),
        _ => Err(format!(
            "invalid fraction '{input}' (expected a value in [0, 1])"
        )),
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable request lines and statistics blocks.
    HumanReadable,
    /// Emit JSON progress lines (NDJSON) to stdout.
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "footfall",
    version,
    about = "Synthetic shopper traffic for the demo shop API",
    long_about = "footfall drives weighted shopper scenarios (browse, view, search, purchase) against a shop HTTP API in concurrent batches, and reports running statistics.\n\nThe run starts with a health probe of the target; no load is generated when the target is unreachable.",
    after_help = "Examples:\n  footfall run\n  footfall run --target http://localhost:3000 --duration 30s\n  footfall run --concurrency 10 --interval 50ms --output json\n\nDocs: https://github.com/footfall-rs/footfall"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Drive load against a shop target and report statistics
    #[command(
        long_about = "Probe the target's /health endpoint, then issue batches of concurrent scenario requests until the duration elapses or the run is interrupted.\n\nCLI flags override the built-in defaults."
    )]
    Run(RunArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Base url of the shop under load (default: http://localhost:3000)
    #[arg(long, value_name = "URL")]
    pub target: Option<String>,

    /// Base pause between batches; actual pauses are jittered up to 2x (default: 100ms)
    #[arg(long, value_parser = parse_positive_duration)]
    pub interval: Option<Duration>,

    /// Requests issued concurrently per batch (default: 5)
    #[arg(long, value_parser = parse_concurrency)]
    pub concurrency: Option<usize>,

    /// Total run duration; 0 runs until interrupted (default: 0)
    #[arg(long, value_parser = parse_duration)]
    pub duration: Option<Duration>,

    /// Error-rate fraction above which the final summary warns (default: 0.1)
    #[arg(long, value_parser = parse_fraction)]
    pub error_threshold: Option<f64>,

    /// Pause between periodic statistics reports (default: 10s)
    #[arg(long, value_parser = parse_positive_duration)]
    pub stats_interval: Option<Duration>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::HumanReadable)]
    pub output: OutputFormat,
}

impl RunArgs {
    pub fn driver_config(&self) -> DriverConfig {
        let defaults = DriverConfig::default();
        DriverConfig {
            base_url: self.target.clone().unwrap_or(defaults.base_url),
            request_interval: self.interval.unwrap_or(defaults.request_interval),
            max_concurrent: self.concurrency.unwrap_or(defaults.max_concurrent),
            test_duration: self
                .duration
                .filter(|d| !d.is_zero())
                .or(defaults.test_duration),
            error_threshold: self.error_threshold.unwrap_or(defaults.error_threshold),
            stats_interval: self.stats_interval.unwrap_or(defaults.stats_interval),
        }
    }
}
