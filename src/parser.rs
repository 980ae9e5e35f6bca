//! Pratt parser for predicate expressions.
//!
//! Precedence levels (higher binds tighter):
//! 1. `or`
//! 2. `and`
//! 3. `not`
//! 4. Comparison chains (`<`, `<=`, `>`, `>=`, `==`, `!=`)
//! 5. Additive (`+`, `-`)
//! 6. Multiplicative (`*`, `/`, `//`, `%`)
//! 7. Unary (`-`, `+`)
//! 8. Power (`**`, right-associative)
//!
//! Names are resolved while parsing: identifiers must be cell variables and
//! calls must target a known [`Builtin`] with matching arguments.

use std::fmt;

use crate::ast::{BinaryOp, CellVar, CmpOp, Expr, UnaryOp};
use crate::builtins::Builtin;
use crate::lexer::{tokenize, LexError, Token};

/// Maximum expression nesting depth, both of parser recursion and of the built tree.
const MAX_DEPTH: usize = 64;

const NOT_BP: u8 = 5;
const CMP_BP: u8 = 7;
const UNARY_BP: u8 = 13;

enum Infix {
    Or,
    And,
    Binary(BinaryOp),
}

fn infix_binding_power(token: &Token) -> Option<(Infix, u8, u8)> {
    let infix = match token {
        Token::Or => (Infix::Or, 1, 2),
        Token::And => (Infix::And, 3, 4),
        Token::Plus => (Infix::Binary(BinaryOp::Add), 9, 10),
        Token::Minus => (Infix::Binary(BinaryOp::Sub), 9, 10),
        Token::Star => (Infix::Binary(BinaryOp::Mul), 11, 12),
        Token::Slash => (Infix::Binary(BinaryOp::Div), 11, 12),
        Token::SlashSlash => (Infix::Binary(BinaryOp::FloorDiv), 11, 12),
        Token::Percent => (Infix::Binary(BinaryOp::Mod), 11, 12),
        Token::StarStar => (Infix::Binary(BinaryOp::Pow), 15, 14),
        _ => return None,
    };
    Some(infix)
}

fn cmp_op(token: &Token) -> Option<CmpOp> {
    match token {
        Token::Lt => Some(CmpOp::Lt),
        Token::Le => Some(CmpOp::Le),
        Token::Gt => Some(CmpOp::Gt),
        Token::Ge => Some(CmpOp::Ge),
        Token::EqEq => Some(CmpOp::Eq),
        Token::NotEq => Some(CmpOp::Ne),
        _ => None,
    }
}

/// Parse a complete predicate expression.
pub fn parse(source: &str) -> Result<Expr, ParseError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        end: source.len(),
    };
    let expr = parser.parse_expr_bp(0)?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(ParseError::new(
            ParseErrorKind::TrailingInput(token.to_string()),
            parser.position(),
        )),
    }
}

struct Parser {
    tokens: Vec<(Token, usize, usize)>,
    pos: usize,
    depth: usize,
    /// Byte length of the source, reported for errors at end of input.
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _, _)| t)
    }

    fn peek_nth(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.pos + n).map(|(t, _, _)| t)
    }

    fn position(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.end, |(_, start, _)| *start)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(t, _, _)| t.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: Token, what: &'static str) -> Result<(), ParseError> {
        match self.peek() {
            Some(token) if *token == expected => {
                self.pos += 1;
                Ok(())
            }
            _ => Err(self.unexpected(what)),
        }
    }

    fn unexpected(&self, expected: &'static str) -> ParseError {
        let kind = match self.peek() {
            Some(token) => ParseErrorKind::UnexpectedToken {
                found: token.to_string(),
                expected,
            },
            None => ParseErrorKind::UnexpectedEnd { expected },
        };
        ParseError::new(kind, self.position())
    }

    fn parse_expr_bp(&mut self, min_bp: u8) -> Result<Expr, ParseError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ParseError::new(ParseErrorKind::TooDeep, self.position()));
        }

        let mut lhs = self.parse_prefix(min_bp)?;

        loop {
            let Some(token) = self.peek() else { break };

            if cmp_op(token).is_some() {
                if CMP_BP < min_bp {
                    break;
                }
                lhs = self.parse_comparison_chain(lhs)?;
                self.check_tree_depth(&lhs)?;
                continue;
            }

            let Some((infix, l_bp, r_bp)) = infix_binding_power(token) else { break };
            if l_bp < min_bp {
                break;
            }

            self.advance();
            let rhs = self.parse_expr_bp(r_bp)?;
            lhs = match infix {
                Infix::Or => Expr::or(lhs, rhs),
                Infix::And => Expr::and(lhs, rhs),
                Infix::Binary(op) => Expr::binary(lhs, op, rhs),
            };
            // Left-associative chains deepen the tree without recursing here.
            self.check_tree_depth(&lhs)?;
        }

        self.check_tree_depth(&lhs)?;
        self.depth -= 1;
        Ok(lhs)
    }

    /// Every subtree was already checked, so `depth` recurses at most `MAX_DEPTH + 1` levels.
    fn check_tree_depth(&self, expr: &Expr) -> Result<(), ParseError> {
        if expr.depth() > MAX_DEPTH {
            return Err(ParseError::new(ParseErrorKind::TooDeep, self.position()));
        }
        Ok(())
    }

    /// Parses `a < b <= c ...` into a single comparison node.
    fn parse_comparison_chain(&mut self, first: Expr) -> Result<Expr, ParseError> {
        let mut chain = Vec::new();
        while let Some(op) = self.peek().and_then(cmp_op) {
            self.advance();
            // Operands bind tighter than comparisons.
            let operand = self.parse_expr_bp(CMP_BP + 2)?;
            chain.push((op, operand));
        }
        Ok(Expr::compare(first, chain))
    }

    /// Parses a prefix expression (literals, names, calls, unary ops, parentheses).
    fn parse_prefix(&mut self, min_bp: u8) -> Result<Expr, ParseError> {
        let start = self.position();
        let Some(token) = self.advance() else {
            return Err(self.unexpected("expression"));
        };

        match token {
            Token::Int(n) => Ok(Expr::Int(n)),
            Token::Float(x) => Ok(Expr::Float(x)),
            Token::True => Ok(Expr::Bool(true)),
            Token::False => Ok(Expr::Bool(false)),
            Token::Minus => Ok(Expr::unary(UnaryOp::Neg, self.parse_expr_bp(UNARY_BP)?)),
            Token::Plus => Ok(Expr::unary(UnaryOp::Pos, self.parse_expr_bp(UNARY_BP)?)),
            Token::Not => {
                if min_bp > NOT_BP {
                    return Err(ParseError::new(
                        ParseErrorKind::UnexpectedToken {
                            found: "not".to_string(),
                            expected: "operand",
                        },
                        start,
                    ));
                }
                Ok(Expr::not(self.parse_expr_bp(NOT_BP)?))
            }
            Token::LParen => {
                let inner = self.parse_expr_bp(0)?;
                self.expect(Token::RParen, "')'")?;
                Ok(inner)
            }
            Token::Ident(name) => self.parse_name(name, start),
            other => Err(ParseError::new(
                ParseErrorKind::UnexpectedToken {
                    found: other.to_string(),
                    expected: "expression",
                },
                start,
            )),
        }
    }

    /// Resolves an identifier: a cell variable, a call, or a `random.` qualified call.
    fn parse_name(&mut self, name: String, start: usize) -> Result<Expr, ParseError> {
        if name == "random" && self.peek() == Some(&Token::Dot) {
            self.advance();
            let start = self.position();
            let function = match self.peek() {
                Some(Token::Ident(function)) => function.clone(),
                _ => return Err(self.unexpected("function name")),
            };
            self.advance();
            if self.peek() != Some(&Token::LParen) {
                return Err(ParseError::new(ParseErrorKind::UnknownName(function), start));
            }
            return self.parse_call(function, start);
        }

        if self.peek() == Some(&Token::LParen) {
            return self.parse_call(name, start);
        }

        match CellVar::lookup(&name) {
            Some(var) => Ok(Expr::Var(var)),
            None => Err(ParseError::new(ParseErrorKind::UnknownName(name), start)),
        }
    }

    fn parse_call(&mut self, name: String, start: usize) -> Result<Expr, ParseError> {
        let Some(builtin) = Builtin::lookup(&name) else {
            return Err(ParseError::new(ParseErrorKind::UnknownFunction(name), start));
        };
        self.expect(Token::LParen, "'('")?;

        let mut positional = Vec::new();
        let mut keywords: Vec<(String, Expr, usize)> = Vec::new();

        if self.peek() != Some(&Token::RParen) {
            loop {
                let arg_start = self.position();
                let keyword = match (self.peek(), self.peek_nth(1)) {
                    (Some(Token::Ident(kw)), Some(Token::Assign)) => Some(kw.clone()),
                    _ => None,
                };
                match keyword {
                    Some(kw) => {
                        self.pos += 2;
                        let value = self.parse_expr_bp(0)?;
                        keywords.push((kw, value, arg_start));
                    }
                    None => {
                        if !keywords.is_empty() {
                            return Err(ParseError::new(ParseErrorKind::PositionalAfterKeyword, arg_start));
                        }
                        positional.push(self.parse_expr_bp(0)?);
                    }
                }
                if self.peek() == Some(&Token::Comma) {
                    self.advance();
                    continue;
                }
                break;
            }
        }
        self.expect(Token::RParen, "')' or ','")?;

        let args = bind_args(builtin, positional, keywords, start)?;
        Ok(Expr::Call(builtin, args))
    }
}

/// Places call arguments into the builtin's parameter slots.
fn bind_args(
    builtin: Builtin,
    positional: Vec<Expr>,
    keywords: Vec<(String, Expr, usize)>,
    start: usize,
) -> Result<Vec<Option<Expr>>, ParseError> {
    let function = builtin.name();

    if builtin.is_variadic() {
        if let Some((keyword, _, pos)) = keywords.into_iter().next() {
            return Err(ParseError::new(ParseErrorKind::UnknownKeyword { function, keyword }, pos));
        }
        if positional.len() < 2 {
            return Err(ParseError::new(
                ParseErrorKind::Arity {
                    function,
                    expected: "at least 2".to_string(),
                    found: positional.len(),
                },
                start,
            ));
        }
        return Ok(positional.into_iter().map(Some).collect());
    }

    let params = builtin.params();
    if positional.len() > params.len() {
        let required = params.iter().filter(|p| p.required).count();
        let expected = if required == params.len() {
            params.len().to_string()
        } else {
            format!("{} to {}", required, params.len())
        };
        return Err(ParseError::new(
            ParseErrorKind::Arity {
                function,
                expected,
                found: positional.len(),
            },
            start,
        ));
    }

    let mut slots: Vec<Option<Expr>> = positional.into_iter().map(Some).collect();
    slots.resize(params.len(), None);

    for (keyword, value, pos) in keywords {
        let Some(index) = params.iter().position(|p| p.name == keyword) else {
            return Err(ParseError::new(ParseErrorKind::UnknownKeyword { function, keyword }, pos));
        };
        if slots[index].is_some() {
            return Err(ParseError::new(
                ParseErrorKind::DuplicateArgument { function, name: keyword },
                pos,
            ));
        }
        slots[index] = Some(value);
    }

    for (param, slot) in params.iter().zip(&slots) {
        if param.required && slot.is_none() {
            return Err(ParseError::new(
                ParseErrorKind::MissingArgument {
                    function,
                    name: param.name,
                },
                start,
            ));
        }
    }

    Ok(slots)
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseErrorKind {
    Lex(String),
    UnexpectedToken { found: String, expected: &'static str },
    UnexpectedEnd { expected: &'static str },
    TrailingInput(String),
    TooDeep,
    UnknownName(String),
    UnknownFunction(String),
    Arity {
        function: &'static str,
        expected: String,
        found: usize,
    },
    UnknownKeyword { function: &'static str, keyword: String },
    DuplicateArgument { function: &'static str, name: String },
    MissingArgument { function: &'static str, name: &'static str },
    PositionalAfterKeyword,
}

/// Error in predicate expression text, with the byte offset where it was found.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub position: usize,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, position: usize) -> Self {
        ParseError { kind, position }
    }
}

impl From<LexError> for ParseError {
    fn from(e: LexError) -> Self {
        ParseError::new(ParseErrorKind::Lex(e.snippet), e.position)
    }
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseErrorKind::Lex(snippet) => write!(f, "unexpected character '{}'", snippet),
            ParseErrorKind::UnexpectedToken { found, expected } => {
                write!(f, "expected {}, found '{}'", expected, found)
            }
            ParseErrorKind::UnexpectedEnd { expected } => write!(f, "expected {}, found end of input", expected),
            ParseErrorKind::TrailingInput(found) => write!(f, "unexpected '{}' after expression", found),
            ParseErrorKind::TooDeep => write!(f, "expression nested deeper than {} levels", MAX_DEPTH),
            ParseErrorKind::UnknownName(name) => write!(f, "name '{}' is not defined (use r, c, nr, nc)", name),
            ParseErrorKind::UnknownFunction(name) => write!(f, "unknown function '{}'", name),
            ParseErrorKind::Arity {
                function,
                expected,
                found,
            } => write!(f, "{}() takes {} positional arguments but {} were given", function, expected, found),
            ParseErrorKind::UnknownKeyword { function, keyword } => {
                write!(f, "{}() got an unexpected keyword argument '{}'", function, keyword)
            }
            ParseErrorKind::DuplicateArgument { function, name } => {
                write!(f, "{}() got multiple values for argument '{}'", function, name)
            }
            ParseErrorKind::MissingArgument { function, name } => {
                write!(f, "{}() missing required argument '{}'", function, name)
            }
            ParseErrorKind::PositionalAfterKeyword => write!(f, "positional argument follows keyword argument"),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at position {}", self.kind, self.position)
    }
}

impl std::error::Error for ParseError {}
