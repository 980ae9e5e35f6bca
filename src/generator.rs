//! Row-major enumeration of selected cells.

use std::fmt;
use std::iter::FusedIterator;

use rand::Rng;

use crate::eval::EvalError;
use crate::predicate::{Cell, CellPredicate};

/// A selected cell, printed as `ROW,COL`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Coordinate {
    pub row: u64,
    pub col: u64,
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.row, self.col)
    }
}

/// Lazy iterator over the cells of a `rows × cols` grid accepted by a predicate.
///
/// Cells are visited row by row, each row from column 0 upwards. The predicate
/// is evaluated exactly once per visited cell, drawing from the borrowed RNG.
/// The first evaluation error is yielded and ends the iteration.
pub struct Generator<'a, P, R: ?Sized> {
    predicate: &'a P,
    rng: &'a mut R,
    rows: u64,
    cols: u64,
    /// Next cell to visit.
    row: u64,
    col: u64,
    failed: bool,
}

impl<'a, P, R> Generator<'a, P, R>
where
    P: CellPredicate,
    R: Rng + ?Sized,
{
    pub fn new(rows: u64, cols: u64, predicate: &'a P, rng: &'a mut R) -> Self {
        Generator {
            predicate,
            rng,
            rows,
            cols,
            row: 0,
            col: 0,
            failed: false,
        }
    }

    /// Number of cells not yet visited, if it fits in `u64`.
    pub fn remaining(&self) -> Option<u64> {
        if self.failed || self.cols == 0 || self.row >= self.rows {
            return Some(0);
        }
        let total = self.rows.checked_mul(self.cols)?;
        Some(total - (self.row * self.cols + self.col))
    }
}

impl<P, R> Iterator for Generator<'_, P, R>
where
    P: CellPredicate,
    R: Rng + ?Sized,
{
    type Item = Result<Coordinate, EvalError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.cols == 0 {
            return None;
        }

        while self.row < self.rows {
            let cell = Cell {
                row: self.row,
                col: self.col,
                rows: self.rows,
                cols: self.cols,
            };

            self.col += 1;
            if self.col == self.cols {
                self.col = 0;
                self.row += 1;
            }

            match self.predicate.test(&cell, &mut *self.rng) {
                Ok(true) => {
                    return Some(Ok(Coordinate {
                        row: cell.row,
                        col: cell.col,
                    }))
                }
                Ok(false) => {}
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }

        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let upper = self.remaining().and_then(|n| usize::try_from(n).ok());
        (0, upper)
    }
}

impl<P, R> FusedIterator for Generator<'_, P, R>
where
    P: CellPredicate,
    R: Rng + ?Sized,
{
}

/// Enumerate the cells of a `rows × cols` grid selected by `predicate`.
pub fn generate<'a, P, R>(rows: u64, cols: u64, predicate: &'a P, rng: &'a mut R) -> Generator<'a, P, R>
where
    P: CellPredicate,
    R: Rng + ?Sized,
{
    Generator::new(rows, cols, predicate, rng)
}
