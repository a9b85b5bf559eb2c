//! Command-line configuration and logging setup.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::{Env, Target};
use nvdash::metrics::DEFAULT_CPU_SAMPLE_INTERVAL;

/// Fastest allowed dashboard refresh period.
pub const MIN_REFRESH: Duration = Duration::from_millis(250);
/// Slowest allowed dashboard refresh period.
pub const MAX_REFRESH: Duration = Duration::from_millis(60_000);
/// Step for the `+`/`-` keys.
pub const REFRESH_STEP: Duration = Duration::from_millis(500);

#[derive(Debug, Parser)]
#[command(
    name = "nvdash",
    version,
    about = "Terminal dashboard for NVIDIA GPUs and the processes using them"
)]
pub struct Cli {
    /// Dashboard refresh period in milliseconds.
    #[arg(long, default_value_t = 3000, value_parser = clap::value_parser!(u64).range(250..=60_000))]
    pub interval_ms: u64,

    /// Delay between the two CPU readings taken per process, in milliseconds.
    #[arg(long, default_value_t = DEFAULT_CPU_SAMPLE_INTERVAL.as_millis() as u64, value_parser = clap::value_parser!(u64).range(1..=5_000))]
    pub cpu_sample_ms: u64,

    /// Print a single snapshot and exit.
    #[arg(long)]
    pub once: bool,

    /// With --once, print the snapshot as JSON.
    #[arg(long, requires = "once")]
    pub json: bool,

    /// Write log records to this file.
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn cpu_sample_interval(&self) -> Duration {
        Duration::from_millis(self.cpu_sample_ms)
    }
}

/// Set up `env_logger`.
///
/// The dashboard draws over the whole terminal, so unless records go to a
/// file it only logs when `RUST_LOG` asks for it.
pub fn init_logging(log_file: Option<&Path>, dashboard: bool) -> Result<()> {
    let default_filter = match (dashboard, log_file) {
        (true, None) => "off",
        (_, Some(_)) => "info",
        (false, None) => "warn",
    };

    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or(default_filter));
    if let Some(path) = log_file {
        let file = File::create(path)
            .with_context(|| format!("Failed to create log file {}", path.display()))?;
        builder.target(Target::Pipe(Box::new(file)));
    }

    builder
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn default_intervals() {
        let cli = Cli::try_parse_from(["nvdash"]).unwrap();
        assert_eq!(cli.refresh_interval(), Duration::from_secs(3));
        assert_eq!(cli.cpu_sample_interval(), DEFAULT_CPU_SAMPLE_INTERVAL);
        assert_eq!(DEFAULT_CPU_SAMPLE_INTERVAL, Duration::from_millis(50));
        assert!(!cli.once);
        assert!(!cli.json);
    }

    #[test]
    fn rejects_out_of_range_intervals() {
        assert!(Cli::try_parse_from(["nvdash", "--interval-ms", "10"]).is_err());
        assert!(Cli::try_parse_from(["nvdash", "--cpu-sample-ms", "0"]).is_err());
    }

    #[test]
    fn json_requires_once() {
        assert!(Cli::try_parse_from(["nvdash", "--json"]).is_err());
        let cli = Cli::try_parse_from(["nvdash", "--once", "--json"]).unwrap();
        assert!(cli.once && cli.json);
    }
}
