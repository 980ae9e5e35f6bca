//! Predicate expression trees.
//!
//! The parser produces an [`Expr`] with every name already resolved:
//! variables refer to a [`CellVar`], calls refer to a [`Builtin`] with one
//! argument slot per declared parameter.

use std::fmt;

use crate::builtins::Builtin;

/// A cell coordinate visible to expressions.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum CellVar {
    /// Current row index, `r`.
    Row,
    /// Current column index, `c`.
    Col,
    /// Total number of rows, `nr`.
    RowCount,
    /// Total number of columns, `nc`.
    ColCount,
}

impl CellVar {
    pub fn lookup(name: &str) -> Option<Self> {
        match name {
            "r" | "row" => Some(CellVar::Row),
            "c" | "col" => Some(CellVar::Col),
            "nr" | "row_count" => Some(CellVar::RowCount),
            "nc" | "column_count" => Some(CellVar::ColCount),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CellVar::Row => "r",
            CellVar::Col => "c",
            CellVar::RowCount => "nr",
            CellVar::ColCount => "nc",
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum UnaryOp {
    Neg,
    Pos,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::FloorDiv => "//",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "**",
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CmpOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl CmpOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
        }
    }
}

/// A predicate expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Integer literal
    Int(i64),
    /// Float literal
    Float(f64),
    /// `True` / `False`
    Bool(bool),
    /// Cell coordinate
    Var(CellVar),
    /// `-x`, `+x`
    Unary(UnaryOp, Box<Expr>),
    /// Arithmetic
    Binary(Box<Expr>, BinaryOp, Box<Expr>),
    /// Logical negation
    Not(Box<Expr>),
    /// Short-circuit conjunction
    And(Box<Expr>, Box<Expr>),
    /// Short-circuit disjunction
    Or(Box<Expr>, Box<Expr>),
    /// Comparison chain `a < b <= c`, each operand evaluated at most once.
    Compare(Box<Expr>, Vec<(CmpOp, Expr)>),
    /// Builtin call; `None` slots take the parameter default.
    Call(Builtin, Vec<Option<Expr>>),
}

impl Expr {
    pub fn unary(op: UnaryOp, operand: Self) -> Self {
        Expr::Unary(op, Box::new(operand))
    }

    pub fn binary(lhs: Self, op: BinaryOp, rhs: Self) -> Self {
        Expr::Binary(Box::new(lhs), op, Box::new(rhs))
    }

    pub fn not(operand: Self) -> Self {
        Expr::Not(Box::new(operand))
    }

    pub fn and(lhs: Self, rhs: Self) -> Self {
        Expr::And(Box::new(lhs), Box::new(rhs))
    }

    pub fn or(lhs: Self, rhs: Self) -> Self {
        Expr::Or(Box::new(lhs), Box::new(rhs))
    }

    pub fn compare(first: Self, chain: Vec<(CmpOp, Expr)>) -> Self {
        Expr::Compare(Box::new(first), chain)
    }

    /// Depth of the expression tree (0 for leaves).
    pub fn depth(&self) -> usize {
        match self {
            Expr::Int(_) | Expr::Float(_) | Expr::Bool(_) | Expr::Var(_) => 0,
            Expr::Unary(_, e) | Expr::Not(e) => 1 + e.depth(),
            Expr::Binary(l, _, r) | Expr::And(l, r) | Expr::Or(l, r) => 1 + l.depth().max(r.depth()),
            Expr::Compare(first, chain) => 1 + chain.iter().map(|(_, e)| e.depth()).fold(first.depth(), usize::max),
            Expr::Call(_, args) => 1 + args.iter().flatten().map(Expr::depth).max().unwrap_or(0),
        }
    }

    /// Size of the expression tree (number of nodes).
    pub fn size(&self) -> usize {
        match self {
            Expr::Int(_) | Expr::Float(_) | Expr::Bool(_) | Expr::Var(_) => 1,
            Expr::Unary(_, e) | Expr::Not(e) => 1 + e.size(),
            Expr::Binary(l, _, r) | Expr::And(l, r) | Expr::Or(l, r) => 1 + l.size() + r.size(),
            Expr::Compare(first, chain) => 1 + first.size() + chain.iter().map(|(_, e)| e.size()).sum::<usize>(),
            Expr::Call(_, args) => 1 + args.iter().flatten().map(Expr::size).sum::<usize>(),
        }
    }

    /// Whether evaluating this expression draws from the random source.
    pub fn is_stochastic(&self) -> bool {
        match self {
            Expr::Int(_) | Expr::Float(_) | Expr::Bool(_) | Expr::Var(_) => false,
            Expr::Unary(_, e) | Expr::Not(e) => e.is_stochastic(),
            Expr::Binary(l, _, r) | Expr::And(l, r) | Expr::Or(l, r) => l.is_stochastic() || r.is_stochastic(),
            Expr::Compare(first, chain) => first.is_stochastic() || chain.iter().any(|(_, e)| e.is_stochastic()),
            Expr::Call(builtin, args) => builtin.is_random() || args.iter().flatten().any(Expr::is_stochastic),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Int(n) => write!(f, "{}", n),
            Expr::Float(x) => write!(f, "{:?}", x),
            Expr::Bool(true) => write!(f, "True"),
            Expr::Bool(false) => write!(f, "False"),
            Expr::Var(var) => write!(f, "{}", var.name()),
            Expr::Unary(UnaryOp::Neg, e) => write!(f, "-{}", e),
            Expr::Unary(UnaryOp::Pos, e) => write!(f, "+{}", e),
            Expr::Binary(l, op, r) => write!(f, "({} {} {})", l, op.symbol(), r),
            Expr::Not(e) => write!(f, "(not {})", e),
            Expr::And(l, r) => write!(f, "({} and {})", l, r),
            Expr::Or(l, r) => write!(f, "({} or {})", l, r),
            Expr::Compare(first, chain) => {
                write!(f, "({}", first)?;
                for (op, e) in chain {
                    write!(f, " {} {}", op.symbol(), e)?;
                }
                write!(f, ")")
            }
            Expr::Call(builtin, args) => {
                write!(f, "{}(", builtin.name())?;
                let params = builtin.params();
                let mut first = true;
                for (i, arg) in args.iter().enumerate() {
                    let Some(arg) = arg else { continue };
                    if !first {
                        write!(f, ", ")?;
                    }
                    first = false;
                    match params.get(i) {
                        Some(param) if !builtin.is_variadic() => write!(f, "{}={}", param.name, arg)?,
                        _ => write!(f, "{}", arg)?,
                    }
                }
                write!(f, ")")
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn r_lt_c() -> Expr {
        Expr::compare(Expr::Var(CellVar::Row), vec![(CmpOp::Lt, Expr::Var(CellVar::Col))])
    }

    #[test]
    fn test_lookup() {
        assert_eq!(CellVar::lookup("r"), Some(CellVar::Row));
        assert_eq!(CellVar::lookup("column_count"), Some(CellVar::ColCount));
        assert_eq!(CellVar::lookup("x"), None);
    }

    #[test]
    fn test_expr_depth() {
        assert_eq!(Expr::Int(1).depth(), 0);
        assert_eq!(r_lt_c().depth(), 1);
        assert_eq!(Expr::not(r_lt_c()).depth(), 2);
    }

    #[test]
    fn test_expr_size() {
        assert_eq!(Expr::Bool(true).size(), 1);
        assert_eq!(r_lt_c().size(), 3);
        assert_eq!(Expr::and(r_lt_c(), Expr::Bool(false)).size(), 5);
    }

    #[test]
    fn test_display() {
        let e = Expr::or(
            Expr::and(r_lt_c(), Expr::not(Expr::Bool(false))),
            Expr::binary(Expr::Int(2), BinaryOp::FloorDiv, Expr::Float(0.5)),
        );
        assert_eq!(e.to_string(), "(((r < c) and (not False)) or (2 // 0.5))");
    }

    #[test]
    fn test_display_call() {
        let e = Expr::Call(Builtin::Gauss, vec![Some(Expr::Float(0.5)), None]);
        assert_eq!(e.to_string(), "gauss(mu=0.5)");
        let e = Expr::Call(Builtin::Max, vec![Some(Expr::Var(CellVar::Row)), Some(Expr::Int(3))]);
        assert_eq!(e.to_string(), "max(r, 3)");
    }

    #[test]
    fn test_is_stochastic() {
        assert!(!r_lt_c().is_stochastic());
        assert!(Expr::Call(Builtin::Random, vec![]).is_stochastic());
        let abs = Expr::Call(Builtin::Abs, vec![Some(Expr::Call(Builtin::Random, vec![]))]);
        assert!(abs.is_stochastic());
        assert!(!Expr::Call(Builtin::Abs, vec![Some(Expr::Int(-1))]).is_stochastic());
    }
}
