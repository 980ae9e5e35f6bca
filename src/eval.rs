use std::cmp::Ordering;
use std::fmt;

use rand::Rng;

use crate::ast::{BinaryOp, CellVar, CmpOp, Expr, UnaryOp};
use crate::predicate::Cell;

/// Runtime value of a predicate (sub)expression.
///
/// Booleans take part in arithmetic as `0` and `1`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
}

#[derive(Debug, Copy, Clone, PartialEq)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Value {
    fn num(self) -> Num {
        match self {
            Value::Bool(b) => Num::Int(b as i64),
            Value::Int(n) => Num::Int(n),
            Value::Float(x) => Num::Float(x),
        }
    }

    /// Python-style truthiness: zero is false, everything else is true.
    pub fn is_truthy(self) -> bool {
        match self {
            Value::Bool(b) => b,
            Value::Int(n) => n != 0,
            Value::Float(x) => x != 0.0,
        }
    }

    pub fn as_f64(self) -> f64 {
        match self.num() {
            Num::Int(n) => n as f64,
            Num::Float(x) => x,
        }
    }

    /// Integer view; floats are accepted only when they hold an integral value.
    pub fn as_int(self) -> Result<i64, EvalError> {
        match self.num() {
            Num::Int(n) => Ok(n),
            Num::Float(x) if x.fract() == 0.0 && x.abs() < i64::MAX as f64 => Ok(x as i64),
            Num::Float(x) => Err(EvalError::InvalidArgument(format!("expected an integer, got {:?}", x))),
        }
    }

    pub fn abs(self) -> Result<Value, EvalError> {
        match self.num() {
            Num::Int(n) => n.checked_abs().map(Value::Int).ok_or(EvalError::Overflow),
            Num::Float(x) => Ok(Value::Float(x.abs())),
        }
    }

    pub fn compare(self, op: CmpOp, other: Value) -> bool {
        let ordering = match (self.num(), other.num()) {
            (Num::Int(a), Num::Int(b)) => Some(a.cmp(&b)),
            _ => self.as_f64().partial_cmp(&other.as_f64()),
        };
        match ordering {
            Some(ord) => match op {
                CmpOp::Lt => ord == Ordering::Less,
                CmpOp::Le => ord != Ordering::Greater,
                CmpOp::Gt => ord == Ordering::Greater,
                CmpOp::Ge => ord != Ordering::Less,
                CmpOp::Eq => ord == Ordering::Equal,
                CmpOp::Ne => ord != Ordering::Equal,
            },
            // NaN is unordered and unequal to everything.
            None => op == CmpOp::Ne,
        }
    }

    pub fn unary(op: UnaryOp, value: Value) -> Result<Value, EvalError> {
        match (op, value.num()) {
            (UnaryOp::Neg, Num::Int(n)) => n.checked_neg().map(Value::Int).ok_or(EvalError::Overflow),
            (UnaryOp::Neg, Num::Float(x)) => Ok(Value::Float(-x)),
            (UnaryOp::Pos, Num::Int(n)) => Ok(Value::Int(n)),
            (UnaryOp::Pos, Num::Float(x)) => Ok(Value::Float(x)),
        }
    }

    pub fn binary(lhs: Value, op: BinaryOp, rhs: Value) -> Result<Value, EvalError> {
        match (lhs.num(), rhs.num()) {
            (Num::Int(a), Num::Int(b)) => int_binary(a, op, b),
            _ => float_binary(lhs.as_f64(), op, rhs.as_f64()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{:?}", x),
        }
    }
}

fn int_binary(a: i64, op: BinaryOp, b: i64) -> Result<Value, EvalError> {
    let checked = |r: Option<i64>| r.map(Value::Int).ok_or(EvalError::Overflow);
    match op {
        BinaryOp::Add => checked(a.checked_add(b)),
        BinaryOp::Sub => checked(a.checked_sub(b)),
        BinaryOp::Mul => checked(a.checked_mul(b)),
        BinaryOp::Div => float_binary(a as f64, op, b as f64),
        BinaryOp::FloorDiv => {
            if b == 0 {
                return Err(EvalError::DivisionByZero(op));
            }
            let q = a.checked_div(b).ok_or(EvalError::Overflow)?;
            if a % b != 0 && ((a < 0) != (b < 0)) {
                Ok(Value::Int(q - 1))
            } else {
                Ok(Value::Int(q))
            }
        }
        BinaryOp::Mod => {
            if b == 0 {
                return Err(EvalError::DivisionByZero(op));
            }
            let r = a.checked_rem(b).ok_or(EvalError::Overflow)?;
            if r != 0 && ((r < 0) != (b < 0)) {
                Ok(Value::Int(r + b))
            } else {
                Ok(Value::Int(r))
            }
        }
        BinaryOp::Pow => {
            if b < 0 {
                return float_binary(a as f64, op, b as f64);
            }
            let exp = u32::try_from(b).map_err(|_| EvalError::Overflow)?;
            checked(a.checked_pow(exp))
        }
    }
}

fn float_binary(a: f64, op: BinaryOp, b: f64) -> Result<Value, EvalError> {
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div | BinaryOp::FloorDiv | BinaryOp::Mod if b == 0.0 => {
            return Err(EvalError::DivisionByZero(op));
        }
        BinaryOp::Div => a / b,
        BinaryOp::FloorDiv => (a / b).floor(),
        BinaryOp::Mod => {
            let r = a % b;
            if r != 0.0 && ((r < 0.0) != (b < 0.0)) {
                r + b
            } else {
                r
            }
        }
        BinaryOp::Pow => {
            if a == 0.0 && b < 0.0 {
                return Err(EvalError::DivisionByZero(op));
            }
            let p = a.powf(b);
            if p.is_nan() && !a.is_nan() && !b.is_nan() {
                return Err(EvalError::Domain(format!("{:?} ** {:?} is not a real number", a, b)));
            }
            if p.is_infinite() && a.is_finite() && b.is_finite() {
                return Err(EvalError::Overflow);
            }
            p
        }
    };
    Ok(Value::Float(result))
}

/// Evaluation of expressions against a cell.
pub trait Eval {
    fn eval<R>(&self, cell: &Cell, rng: &mut R) -> Result<Value, EvalError>
    where
        R: Rng + ?Sized;
}

impl Eval for Expr {
    fn eval<R>(&self, cell: &Cell, rng: &mut R) -> Result<Value, EvalError>
    where
        R: Rng + ?Sized,
    {
        match self {
            Expr::Int(n) => Ok(Value::Int(*n)),
            Expr::Float(x) => Ok(Value::Float(*x)),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Var(var) => {
                let raw = match var {
                    CellVar::Row => cell.row,
                    CellVar::Col => cell.col,
                    CellVar::RowCount => cell.rows,
                    CellVar::ColCount => cell.cols,
                };
                i64::try_from(raw).map(Value::Int).map_err(|_| EvalError::Overflow)
            }
            Expr::Unary(op, e) => Value::unary(*op, e.eval(cell, rng)?),
            Expr::Binary(l, op, r) => {
                let lhs = l.eval(cell, rng)?;
                let rhs = r.eval(cell, rng)?;
                Value::binary(lhs, *op, rhs)
            }
            Expr::Not(e) => Ok(Value::Bool(!e.eval(cell, rng)?.is_truthy())),
            Expr::And(l, r) => {
                let lhs = l.eval(cell, rng)?;
                if lhs.is_truthy() {
                    r.eval(cell, rng)
                } else {
                    Ok(lhs)
                }
            }
            Expr::Or(l, r) => {
                let lhs = l.eval(cell, rng)?;
                if lhs.is_truthy() {
                    Ok(lhs)
                } else {
                    r.eval(cell, rng)
                }
            }
            Expr::Compare(first, chain) => {
                let mut lhs = first.eval(cell, rng)?;
                for (op, e) in chain {
                    let rhs = e.eval(cell, rng)?;
                    if !lhs.compare(*op, rhs) {
                        return Ok(Value::Bool(false));
                    }
                    lhs = rhs;
                }
                Ok(Value::Bool(true))
            }
            Expr::Call(builtin, args) => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(match arg {
                        Some(e) => Some(e.eval(cell, rng)?),
                        None => None,
                    });
                }
                builtin.apply(&values, rng)
            }
        }
    }
}

/// Error raised while evaluating a predicate for a cell.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    /// Division or modulo by zero, or zero raised to a negative power.
    DivisionByZero(BinaryOp),
    /// Integer result out of range.
    Overflow,
    /// Result is not a real number.
    Domain(String),
    /// Builtin called with unusable arguments.
    InvalidArgument(String),
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::DivisionByZero(op) => write!(f, "division by zero in '{}'", op.symbol()),
            EvalError::Overflow => write!(f, "numeric overflow"),
            EvalError::Domain(msg) => write!(f, "math domain error: {}", msg),
            EvalError::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
        }
    }
}

impl std::error::Error for EvalError {}
