//! Cell predicates.
//!
//! A predicate decides whether a cell of the grid is set. Compiled
//! [`Predicate`]s come from expression text; any `Fn(&Cell) -> bool` closure is
//! a deterministic predicate as well.

use std::fmt;
use std::str::FromStr;

use rand::Rng;

use crate::ast::Expr;
use crate::eval::{Eval, EvalError};
use crate::parser::{parse, ParseError};

/// Predicate input: one cell position and the grid dimensions.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Cell {
    pub row: u64,
    pub col: u64,
    pub rows: u64,
    pub cols: u64,
}

pub trait CellPredicate {
    fn test<R>(&self, cell: &Cell, rng: &mut R) -> Result<bool, EvalError>
    where
        R: Rng + ?Sized;
}

impl<F> CellPredicate for F
where
    F: Fn(&Cell) -> bool,
{
    fn test<R>(&self, cell: &Cell, _rng: &mut R) -> Result<bool, EvalError>
    where
        R: Rng + ?Sized,
    {
        Ok(self(cell))
    }
}

/// A predicate compiled from an expression over `r`, `c`, `nr` and `nc`.
#[derive(Debug, Clone)]
pub struct Predicate {
    source: String,
    expr: Expr,
}

impl Predicate {
    /// Parse and resolve `source`.
    ///
    /// Syntax errors, unknown names and bad call arguments are all reported
    /// here, before any cell is evaluated.
    pub fn compile(source: &str) -> Result<Self, ParseError> {
        let expr = parse(source)?;
        log::debug!("Compiled predicate '{}' as {} (size {})", source, expr, expr.size());
        Ok(Predicate {
            source: source.to_string(),
            expr,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Whether evaluating the predicate consumes randomness.
    pub fn is_stochastic(&self) -> bool {
        self.expr.is_stochastic()
    }
}

impl CellPredicate for Predicate {
    fn test<R>(&self, cell: &Cell, rng: &mut R) -> Result<bool, EvalError>
    where
        R: Rng + ?Sized,
    {
        Ok(self.expr.eval(cell, rng)?.is_truthy())
    }
}

impl FromStr for Predicate {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Predicate::compile(s)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expr)
    }
}
