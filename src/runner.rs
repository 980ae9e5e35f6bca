//! Single-run driver.
//!
//! Seeds the random source, compiles the predicate, then either estimates the
//! density or streams every selected coordinate. Coordinates and estimates go
//! to `out`; the seed and the final counts go to `diag`.
//!
//! Coordinates are buffered here rather than by the caller, so the reported
//! bit count is the number of complete lines `out` accepted, even when the
//! reader goes away mid-run.

use std::fmt;
use std::io::{self, Write};
use std::time::Instant;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::config::RunConfig;
use crate::estimate::{DensityEstimate, Estimator};
use crate::eval::EvalError;
use crate::generator::{generate, Coordinate};
use crate::parser::ParseError;
use crate::predicate::Predicate;
use crate::utils::{format_float, group_thousands};

/// What a finished run produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Dry run: projected size of the full grid.
    Estimated {
        seed: u64,
        estimate: DensityEstimate,
        bit_count: u64,
    },
    /// Full run: number of coordinates written.
    Generated { seed: u64, bit_count: u64, density: f64 },
}

impl Outcome {
    pub fn seed(&self) -> u64 {
        match self {
            Outcome::Estimated { seed, .. } | Outcome::Generated { seed, .. } => *seed,
        }
    }

    pub fn bit_count(&self) -> u64 {
        match self {
            Outcome::Estimated { bit_count, .. } | Outcome::Generated { bit_count, .. } => *bit_count,
        }
    }

    pub fn density(&self) -> f64 {
        match self {
            Outcome::Estimated { estimate, .. } => estimate.density(),
            Outcome::Generated { density, .. } => *density,
        }
    }
}

/// Execute one run described by `config`.
pub fn run<W, E>(config: &RunConfig, out: &mut W, diag: &mut E) -> Result<Outcome, RunError>
where
    W: Write + ?Sized,
    E: Write + ?Sized,
{
    let seed = config.seed().value();
    writeln!(diag, "Seed: {}", seed)?;

    let predicate = Predicate::compile(config.function())?;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    if config.dry_run() {
        log::info!("Estimating density of '{}'", predicate.source());
        let estimate = Estimator::default().estimate(&predicate, &mut rng)?;
        let bit_count = estimate.projected_bits(config.rows(), config.columns());
        writeln!(out, "Estimated bit count: {}", group_thousands(bit_count))?;
        writeln!(out, "Estimated density: {}", format_float(estimate.density()))?;
        out.flush()?;
        return Ok(Outcome::Estimated {
            seed,
            estimate,
            bit_count,
        });
    }

    log::info!(
        "Generating {}x{} grid for '{}'",
        config.rows(),
        config.columns(),
        predicate.source()
    );
    let time_total = Instant::now();

    let mut sink = LineSink::new(out);
    let mut closed = false;
    for coordinate in generate(config.rows(), config.columns(), &predicate, &mut rng) {
        let coordinate = match coordinate {
            Ok(coordinate) => coordinate,
            Err(e) => {
                // Lines selected before the failing cell still reach the output.
                if let Err(write_err) = sink.finish() {
                    log::warn!("Could not write pending coordinates: {}", write_err);
                }
                return Err(e.into());
            }
        };
        match sink.push(coordinate) {
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                closed = true;
                break;
            }
            other => other?,
        }
    }
    if !closed {
        match sink.finish() {
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => closed = true,
            other => other?,
        }
    }
    let bit_count = sink.delivered();
    if closed {
        log::warn!("Output closed after {} coordinates, stopping", bit_count);
    }

    let cells = config.rows() as f64 * config.columns() as f64;
    let density = bit_count as f64 / cells;
    writeln!(diag, "Bit count: {}", group_thousands(bit_count))?;
    writeln!(diag, "Density: {}", format_float(density))?;

    log::info!("Generated {} coordinates in {:.3} s", bit_count, time_total.elapsed().as_secs_f64());

    Ok(Outcome::Generated {
        seed,
        bit_count,
        density,
    })
}

const SINK_CAPACITY: usize = 64 * 1024;

/// Line buffer in front of `out` that counts the lines actually written.
struct LineSink<'a, W: ?Sized> {
    out: &'a mut W,
    buf: Vec<u8>,
    /// Complete lines accepted by `out`.
    delivered: u64,
}

impl<'a, W> LineSink<'a, W>
where
    W: Write + ?Sized,
{
    fn new(out: &'a mut W) -> Self {
        LineSink {
            out,
            buf: Vec::with_capacity(SINK_CAPACITY),
            delivered: 0,
        }
    }

    fn push(&mut self, coordinate: Coordinate) -> io::Result<()> {
        writeln!(self.buf, "{}", coordinate)?;
        if self.buf.len() >= SINK_CAPACITY {
            self.drain()?;
        }
        Ok(())
    }

    /// Write out the whole buffer, counting newlines as `out` accepts them.
    fn drain(&mut self) -> io::Result<()> {
        let mut written = 0;
        let result = loop {
            if written == self.buf.len() {
                break Ok(());
            }
            match self.out.write(&self.buf[written..]) {
                Ok(0) => break Err(io::Error::from(io::ErrorKind::WriteZero)),
                Ok(n) => {
                    self.delivered += self.buf[written..written + n].iter().filter(|&&b| b == b'\n').count() as u64;
                    written += n;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => break Err(e),
            }
        };
        self.buf.drain(..written);
        result
    }

    fn finish(&mut self) -> io::Result<()> {
        self.drain()?;
        self.out.flush()
    }

    fn delivered(&self) -> u64 {
        self.delivered
    }
}

/// Error that ends a run.
#[derive(Debug)]
pub enum RunError {
    /// The predicate expression does not compile.
    Compile(ParseError),
    /// The predicate failed on some cell.
    Eval(EvalError),
    /// Writing output failed.
    Io(io::Error),
}

impl From<ParseError> for RunError {
    fn from(e: ParseError) -> Self {
        RunError::Compile(e)
    }
}

impl From<EvalError> for RunError {
    fn from(e: EvalError) -> Self {
        RunError::Eval(e)
    }
}

impl From<io::Error> for RunError {
    fn from(e: io::Error) -> Self {
        RunError::Io(e)
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::Compile(e) => write!(f, "invalid function: {}", e),
            RunError::Eval(e) => write!(f, "function failed: {}", e),
            RunError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RunError::Compile(e) => Some(e),
            RunError::Eval(e) => Some(e),
            RunError::Io(e) => Some(e),
        }
    }
}
