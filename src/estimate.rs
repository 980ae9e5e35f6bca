//! Density estimation by sampling a small grid.
//!
//! Instead of enumerating the full grid, the predicate is run several times over
//! a fixed 100×100 sample grid and the observed densities are averaged. All runs
//! continue the same random stream, so an estimate is reproducible for a given
//! seed while the individual runs still differ from each other.

use rand::Rng;

use crate::eval::EvalError;
use crate::generator::generate;
use crate::predicate::CellPredicate;

pub const SAMPLE_RUNS: usize = 5;
pub const SAMPLE_ROWS: u64 = 100;
pub const SAMPLE_COLS: u64 = 100;

/// Sampling plan for [`Estimator::estimate`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Estimator {
    runs: usize,
    rows: u64,
    cols: u64,
}

impl Default for Estimator {
    fn default() -> Self {
        Estimator {
            runs: SAMPLE_RUNS,
            rows: SAMPLE_ROWS,
            cols: SAMPLE_COLS,
        }
    }
}

impl Estimator {
    /// # Panics
    ///
    /// Panics if `runs` is zero.
    pub fn with_runs(mut self, runs: usize) -> Self {
        assert!(runs > 0, "Estimator needs at least one run");
        self.runs = runs;
        self
    }

    /// # Panics
    ///
    /// Panics if the grid is empty or its cell count does not fit in `u64`.
    pub fn with_grid(mut self, rows: u64, cols: u64) -> Self {
        assert!(rows > 0 && cols > 0, "Sample grid must not be empty");
        assert!(rows.checked_mul(cols).is_some(), "Sample grid is too large");
        self.rows = rows;
        self.cols = cols;
        self
    }

    pub fn runs(&self) -> usize {
        self.runs
    }

    /// Number of cells in the sample grid.
    pub fn sample_cells(&self) -> u64 {
        self.rows * self.cols
    }

    /// Run the predicate over the sample grid and average the observed densities.
    ///
    /// The predicate sees the sample grid dimensions as `nr` and `nc`.
    pub fn estimate<P, R>(&self, predicate: &P, rng: &mut R) -> Result<DensityEstimate, EvalError>
    where
        P: CellPredicate,
        R: Rng + ?Sized,
    {
        let cells = self.sample_cells() as f64;
        let mut runs = Vec::with_capacity(self.runs);

        for i in 0..self.runs {
            let mut bits = 0u64;
            for coordinate in generate(self.rows, self.cols, predicate, &mut *rng) {
                coordinate?;
                bits += 1;
            }
            let density = bits as f64 / cells;
            log::debug!("Sample run {}/{}: {} bits, density {}", i + 1, self.runs, bits, density);
            runs.push(density);
        }

        let density = runs.iter().sum::<f64>() / self.runs as f64;
        Ok(DensityEstimate { density, runs })
    }
}

/// Result of [`Estimator::estimate`].
#[derive(Debug, Clone, PartialEq)]
pub struct DensityEstimate {
    density: f64,
    runs: Vec<f64>,
}

impl DensityEstimate {
    /// Mean density over all sample runs, in `[0, 1]`.
    pub fn density(&self) -> f64 {
        self.density
    }

    /// Density observed in each sample run.
    pub fn runs(&self) -> &[f64] {
        &self.runs
    }

    /// Expected number of set cells in a `rows × cols` grid, truncated.
    pub fn projected_bits(&self, rows: u64, cols: u64) -> u64 {
        (rows as f64 * cols as f64 * self.density) as u64
    }
}

/// Estimate density with the default plan: 5 runs over a 100×100 grid.
pub fn estimate_density<P, R>(predicate: &P, rng: &mut R) -> Result<DensityEstimate, EvalError>
where
    P: CellPredicate,
    R: Rng + ?Sized,
{
    Estimator::default().estimate(predicate, rng)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::predicate::{Cell, Predicate};

    use test_log::test;

    #[test]
    fn test_always_true() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let estimate = estimate_density(&|_: &Cell| true, &mut rng).unwrap();
        assert_eq!(estimate.density(), 1.0);
        assert_eq!(estimate.runs(), &[1.0; SAMPLE_RUNS]);
        assert_eq!(estimate.projected_bits(100, 100), 10_000);
        assert_eq!(estimate.projected_bits(1234, 567), 1234 * 567);
    }

    #[test]
    fn test_always_false() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let estimate = estimate_density(&|_: &Cell| false, &mut rng).unwrap();
        assert_eq!(estimate.density(), 0.0);
        assert_eq!(estimate.projected_bits(1_000_000, 1_000_000), 0);
    }

    #[test]
    fn test_deterministic_predicate_uses_sample_grid() {
        // On the 100x100 sample grid, the first ten rows are a tenth of all cells.
        let predicate = Predicate::compile("r < nr / 10").unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let estimate = estimate_density(&predicate, &mut rng).unwrap();
        assert!((estimate.density() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_stochastic_runs_differ_but_repeat_per_seed() {
        let predicate = Predicate::compile("random() < 0.25").unwrap();
        let run = |seed: u64| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            estimate_density(&predicate, &mut rng).unwrap()
        };
        let estimate = run(99);
        assert_eq!(estimate, run(99));
        assert_eq!(estimate.runs().len(), SAMPLE_RUNS);
        assert!(estimate.runs().windows(2).any(|w| w[0] != w[1]));
        assert!((estimate.density() - 0.25).abs() < 0.02);
    }

    #[test]
    fn test_custom_plan() {
        let estimator = Estimator::default().with_runs(2).with_grid(10, 20);
        assert_eq!(estimator.runs(), 2);
        assert_eq!(estimator.sample_cells(), 200);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let estimate = estimator.estimate(&|cell: &Cell| cell.col < 5, &mut rng).unwrap();
        assert_eq!(estimate.density(), 0.25);
    }

    #[test]
    #[should_panic(expected = "Sample grid is too large")]
    fn test_oversized_grid() {
        Estimator::default().with_grid(u64::MAX, 2);
    }

    #[test]
    fn test_largest_grid_has_exact_cell_count() {
        let estimator = Estimator::default().with_grid(u64::MAX, 1);
        assert_eq!(estimator.sample_cells(), u64::MAX);
    }

    #[test]
    fn test_error_propagates() {
        let predicate = Predicate::compile("1 // (r - 50) > 0").unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(estimate_density(&predicate, &mut rng).is_err());
    }
}
