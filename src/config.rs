//! Run configuration.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Seed of the run's random source.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Seed {
    /// Given on the command line.
    Explicit(u64),
    /// Derived from the wall clock, in microseconds since the UNIX epoch.
    Clock(u64),
}

impl Seed {
    /// Use `explicit` unless it is absent or zero, otherwise read the clock.
    pub fn resolve(explicit: Option<u64>) -> Self {
        match explicit {
            Some(seed) if seed != 0 => Seed::Explicit(seed),
            _ => Seed::from_clock(),
        }
    }

    pub fn from_clock() -> Self {
        let micros = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as u64)
            .unwrap_or_default();
        Seed::Clock(micros)
    }

    pub fn value(self) -> u64 {
        match self {
            Seed::Explicit(seed) | Seed::Clock(seed) => seed,
        }
    }
}

impl fmt::Display for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// Validated parameters of a single run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    rows: u64,
    columns: u64,
    function: String,
    seed: Seed,
    dry_run: bool,
}

impl RunConfig {
    /// Create a configuration for a full run with a clock-derived seed.
    pub fn new(rows: u64, columns: u64, function: impl Into<String>) -> Result<Self, ConfigError> {
        let function = function.into();
        if rows == 0 {
            return Err(ConfigError::ZeroDimension("rows"));
        }
        if columns == 0 {
            return Err(ConfigError::ZeroDimension("columns"));
        }
        if function.trim().is_empty() {
            return Err(ConfigError::EmptyFunction);
        }
        Ok(RunConfig {
            rows,
            columns,
            function,
            seed: Seed::from_clock(),
            dry_run: false,
        })
    }

    /// Seed the run with `seed`; `None` or `Some(0)` keeps a clock-derived seed.
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = Seed::resolve(seed);
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn columns(&self) -> u64 {
        self.columns
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn seed(&self) -> Seed {
        self.seed
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    /// Number of cells in the full grid, if it fits in `u64`.
    pub fn cells(&self) -> Option<u64> {
        self.rows.checked_mul(self.columns)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Rows, columns or function not given.
    Missing,
    /// A grid dimension is zero.
    ZeroDimension(&'static str),
    /// The predicate expression is blank.
    EmptyFunction,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing => write!(f, "rows, columns and function arguments are required"),
            ConfigError::ZeroDimension(what) => write!(f, "{} must be a positive integer", what),
            ConfigError::EmptyFunction => write!(f, "function must not be empty"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_seed() {
        assert_eq!(Seed::resolve(Some(42)), Seed::Explicit(42));
        assert_eq!(Seed::resolve(Some(42)).to_string(), "42");
    }

    #[test]
    fn test_zero_or_missing_seed_uses_clock() {
        assert!(matches!(Seed::resolve(Some(0)), Seed::Clock(_)));
        assert!(matches!(Seed::resolve(None), Seed::Clock(_)));
        // Any time after 2001 is well above 1e15 microseconds.
        assert!(Seed::from_clock().value() > 1_000_000_000_000_000);
    }

    #[test]
    fn test_new_validates() {
        assert_eq!(RunConfig::new(0, 3, "True"), Err(ConfigError::ZeroDimension("rows")));
        assert_eq!(RunConfig::new(3, 0, "True"), Err(ConfigError::ZeroDimension("columns")));
        assert_eq!(RunConfig::new(3, 3, "  "), Err(ConfigError::EmptyFunction));
    }

    #[test]
    fn test_builder() {
        let config = RunConfig::new(2, 5, "r == c")
            .unwrap()
            .with_seed(Some(7))
            .with_dry_run(true);
        assert_eq!(config.rows(), 2);
        assert_eq!(config.columns(), 5);
        assert_eq!(config.function(), "r == c");
        assert_eq!(config.seed(), Seed::Explicit(7));
        assert!(config.dry_run());
        assert_eq!(config.cells(), Some(10));
    }

    #[test]
    fn test_cells_overflow() {
        let config = RunConfig::new(u64::MAX, 2, "True").unwrap();
        assert_eq!(config.cells(), None);
    }
}
