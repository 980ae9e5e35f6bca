//! Command-line arguments.

use clap::error::ErrorKind;
use clap::{ArgAction, CommandFactory, Parser};
use log::LevelFilter;

use crate::config::{ConfigError, RunConfig};

/// Generate `ROW,COL` lines for every cell of a grid where a predicate holds.
///
/// Example: data-maker -r 5000 -c 5000 -f '0.3 < random.gauss(mu=0.5, sigma=0.4) < 0.6'
#[derive(Debug, Parser)]
#[command(name = "data-maker", author, version)]
pub struct Cli {
    /// Row count.
    #[arg(short, long, value_name = "INT", value_parser = clap::value_parser!(u64).range(1..))]
    pub rows: Option<u64>,

    /// Column count.
    #[arg(short, long, value_name = "INT", value_parser = clap::value_parser!(u64).range(1..))]
    pub columns: Option<u64>,

    /// Predicate over r, c, nr, nc (e.g. `r == c`, `random() < 0.1`).
    #[arg(short, long, value_name = "EXPR")]
    pub function: Option<String>,

    /// Random seed (0 or absent: derived from the current time).
    #[arg(long, value_name = "INT")]
    pub seed: Option<u64>,

    /// Only estimate the bit count and density by sampling.
    #[arg(long)]
    pub dry_run: bool,

    /// Increase log verbosity (-v: info, -vv: debug).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    /// Validate the arguments into a [`RunConfig`].
    ///
    /// Failures are reported as clap usage errors, so `Error::exit` prints the
    /// usage text and exits with status 2.
    pub fn into_config(self) -> Result<RunConfig, clap::Error> {
        let (Some(rows), Some(columns), Some(function)) = (self.rows, self.columns, self.function) else {
            return Err(usage_error(ErrorKind::MissingRequiredArgument, ConfigError::Missing));
        };
        let config = RunConfig::new(rows, columns, function)
            .map_err(|e| usage_error(ErrorKind::ValueValidation, e))?
            .with_seed(self.seed)
            .with_dry_run(self.dry_run);
        Ok(config)
    }
}

fn usage_error(kind: ErrorKind, err: ConfigError) -> clap::Error {
    Cli::command().error(kind, err)
}
