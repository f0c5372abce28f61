//! `#if` / `#elif` expression evaluation
//!
//! Expressions are lexed over a restricted character set, parsed with a small
//! recursive-descent parser and evaluated against the [`DefineRegistry`].
//! Nothing is ever executed; anything outside the grammar is an error, and
//! the caller treats an error as a false branch.
//!
//! Predicates understood in call position:
//! - `ENABLED(A, ...)` / `ALL(A, ...)`: every identifier is defined
//! - `DISABLED(A, ...)`: not `ENABLED`
//! - `defined(A)` or `defined A`: `A` is defined
//! - `ANY(A, ...)` / `EITHER(A, B)`: at least one is defined
//! - `BOTH(A, B)`: both are defined
//! - `NONE(A, ...)`: none is defined
//!
//! Any other bare identifier takes its registry value when that is numeric
//! and `0` otherwise.

use thiserror::Error;

use super::literal::parse_number;
use super::registry::DefineRegistry;

/// Why an expression could not be evaluated
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    /// Nothing after the directive
    #[error("empty expression")]
    Empty,

    /// A character outside the expression grammar
    #[error("disallowed character '{ch}' at offset {offset}")]
    DisallowedCharacter { ch: char, offset: usize },

    /// Malformed numeric literal
    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    /// Token in the wrong place
    #[error("unexpected token {0}")]
    UnexpectedToken(String),

    /// Input ended mid-expression
    #[error("unexpected end of expression")]
    UnexpectedEnd,

    /// A call to something other than a known predicate
    #[error("unknown macro function '{0}'")]
    UnknownFunction(String),

    /// Wrong number of predicate arguments
    #[error("{name}() takes {expected} argument(s), got {got}")]
    Arity {
        /// Predicate name
        name: String,
        /// Accepted count, e.g. `"1"` or `"at least 1"`
        expected: &'static str,
        /// Count supplied
        got: usize,
    },

    /// A predicate argument that is not an identifier
    #[error("{0}() arguments must be identifiers")]
    NonIdentifierArgument(String),

    /// `/` or `%` by zero
    #[error("division by zero")]
    DivisionByZero,

    /// Nesting beyond [`MAX_DEPTH`]
    #[error("expression nested deeper than {0} levels")]
    TooDeep(usize),
}

/// Values produced while evaluating
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    /// Numeric result
    Number(f64),
    /// Result of a comparison or logical operator
    Bool(bool),
}

impl Value {
    /// Numeric view; booleans are 1 and 0
    pub fn as_f64(self) -> f64 {
        match self {
            Value::Number(n) => n,
            Value::Bool(true) => 1.0,
            Value::Bool(false) => 0.0,
        }
    }

    /// Truth view; non-zero is true
    pub fn as_bool(self) -> bool {
        match self {
            Value::Number(n) => n != 0.0,
            Value::Bool(b) => b,
        }
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Mod,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `<=`
    Le,
    /// `>=`
    Ge,
    /// `&&`
    And,
    /// `||`
    Or,
    /// `&`
    BitAnd,
    /// `|`
    BitOr,
    /// `^`
    BitXor,
    /// `<<`
    Shl,
    /// `>>`
    Shr,
}

/// Prefix operators
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOp {
    /// `-`
    Neg,
    /// `!`
    Not,
    /// `~`
    BitNot,
}

/// Parsed expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Number or `true`/`false`
    Literal(Value),
    /// Bare identifier, looked up in the registry
    Identifier(String),
    /// Binary operation
    Binary(Box<Expr>, BinOp, Box<Expr>),
    /// Prefix operation
    Unary(UnaryOp, Box<Expr>),
    /// `cond ? then : otherwise`
    Ternary(Box<Expr>, Box<Expr>, Box<Expr>),
    /// Predicate call such as `ENABLED(A)`
    Call(String, Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    EqEq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    AmpAmp,
    PipePipe,
    Bang,
    Amp,
    Pipe,
    Caret,
    Tilde,
    Shl,
    Shr,
    Question,
    Colon,
    LParen,
    RParen,
    Comma,
}

type CharStream<'a> = std::iter::Peekable<std::str::CharIndices<'a>>;

/// Consume `next` if it is the upcoming character
fn follows(chars: &mut CharStream<'_>, next: char) -> bool {
    if chars.peek().map(|&(_, c)| c) == Some(next) {
        chars.next();
        true
    } else {
        false
    }
}

fn lex(input: &str) -> Result<Vec<Token>, ExpressionError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some((offset, ch)) = chars.next() {
        let token = match ch {
            c if c.is_whitespace() => continue,
            '(' => Token::LParen,
            ')' => Token::RParen,
            ',' => Token::Comma,
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '%' => Token::Percent,
            '~' => Token::Tilde,
            '^' => Token::Caret,
            '?' => Token::Question,
            ':' => Token::Colon,
            '!' if follows(&mut chars, '=') => Token::Ne,
            '!' => Token::Bang,
            '=' if follows(&mut chars, '=') => Token::EqEq,
            '<' if follows(&mut chars, '=') => Token::Le,
            '<' if follows(&mut chars, '<') => Token::Shl,
            '<' => Token::Lt,
            '>' if follows(&mut chars, '=') => Token::Ge,
            '>' if follows(&mut chars, '>') => Token::Shr,
            '>' => Token::Gt,
            '&' if follows(&mut chars, '&') => Token::AmpAmp,
            '&' => Token::Amp,
            '|' if follows(&mut chars, '|') => Token::PipePipe,
            '|' => Token::Pipe,
            c if c.is_ascii_digit() || c == '.' => {
                let mut text = String::from(c);
                while let Some(&(_, next)) = chars.peek() {
                    let exponent_sign = (next == '-' || next == '+')
                        && text.ends_with(['e', 'E'])
                        && !text.starts_with("0x");
                    if next.is_ascii_alphanumeric() || next == '.' || exponent_sign {
                        text.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                match parse_number(&text) {
                    Some(n) => Token::Number(n),
                    None => return Err(ExpressionError::InvalidNumber(text)),
                }
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut name = String::from(c);
                while let Some(&(_, next)) = chars.peek() {
                    if next.is_ascii_alphanumeric() || next == '_' {
                        name.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                Token::Ident(name)
            }
            ch => return Err(ExpressionError::DisallowedCharacter { ch, offset }),
        };
        tokens.push(token);
    }

    Ok(tokens)
}

/// Nesting limit for parentheses, prefix operators and operator chains
pub const MAX_DEPTH: usize = 128;

/// Recursive-descent parser over the lexed tokens
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    /// Lex `input`; fails on characters outside the grammar
    pub fn new(input: &str) -> Result<Self, ExpressionError> {
        let tokens = lex(input)?;
        if tokens.is_empty() {
            return Err(ExpressionError::Empty);
        }
        Ok(Self {
            tokens,
            pos: 0,
            depth: 0,
        })
    }

    /// Parse the whole input as one expression
    pub fn parse(&mut self) -> Result<Expr, ExpressionError> {
        let expr = self.parse_ternary()?;
        match self.tokens.get(self.pos) {
            None => Ok(expr),
            Some(t) => Err(ExpressionError::UnexpectedToken(format!("{:?}", t))),
        }
    }

    fn parse_ternary(&mut self) -> Result<Expr, ExpressionError> {
        self.enter()?;
        let cond = self.parse_logical_or()?;
        if !self.match_token(Token::Question) {
            self.leave(1);
            return Ok(cond);
        }
        let then = self.parse_ternary()?;
        self.expect(Token::Colon)?;
        let otherwise = self.parse_ternary()?;
        self.leave(1);
        Ok(Expr::Ternary(Box::new(cond), Box::new(then), Box::new(otherwise)))
    }

    fn binary_level(
        &mut self,
        ops: &[(Token, BinOp)],
        next: fn(&mut Self) -> Result<Expr, ExpressionError>,
    ) -> Result<Expr, ExpressionError> {
        let mut node = next(self)?;
        // Every chained operator deepens the left-leaning tree by one
        let mut chained = 0;
        'outer: loop {
            for (token, op) in ops {
                if self.match_token(token.clone()) {
                    self.enter()?;
                    chained += 1;
                    let right = next(self)?;
                    node = Expr::Binary(Box::new(node), *op, Box::new(right));
                    continue 'outer;
                }
            }
            self.leave(chained);
            return Ok(node);
        }
    }

    fn parse_logical_or(&mut self) -> Result<Expr, ExpressionError> {
        self.binary_level(&[(Token::PipePipe, BinOp::Or)], Self::parse_logical_and)
    }

    fn parse_logical_and(&mut self) -> Result<Expr, ExpressionError> {
        self.binary_level(&[(Token::AmpAmp, BinOp::And)], Self::parse_bitwise_or)
    }

    fn parse_bitwise_or(&mut self) -> Result<Expr, ExpressionError> {
        self.binary_level(&[(Token::Pipe, BinOp::BitOr)], Self::parse_bitwise_xor)
    }

    fn parse_bitwise_xor(&mut self) -> Result<Expr, ExpressionError> {
        self.binary_level(&[(Token::Caret, BinOp::BitXor)], Self::parse_bitwise_and)
    }

    fn parse_bitwise_and(&mut self) -> Result<Expr, ExpressionError> {
        self.binary_level(&[(Token::Amp, BinOp::BitAnd)], Self::parse_equality)
    }

    fn parse_equality(&mut self) -> Result<Expr, ExpressionError> {
        self.binary_level(
            &[(Token::EqEq, BinOp::Eq), (Token::Ne, BinOp::Ne)],
            Self::parse_comparison,
        )
    }

    fn parse_comparison(&mut self) -> Result<Expr, ExpressionError> {
        self.binary_level(
            &[
                (Token::Le, BinOp::Le),
                (Token::Ge, BinOp::Ge),
                (Token::Lt, BinOp::Lt),
                (Token::Gt, BinOp::Gt),
            ],
            Self::parse_shift,
        )
    }

    fn parse_shift(&mut self) -> Result<Expr, ExpressionError> {
        self.binary_level(
            &[(Token::Shl, BinOp::Shl), (Token::Shr, BinOp::Shr)],
            Self::parse_additive,
        )
    }

    fn parse_additive(&mut self) -> Result<Expr, ExpressionError> {
        self.binary_level(
            &[(Token::Plus, BinOp::Add), (Token::Minus, BinOp::Sub)],
            Self::parse_multiplicative,
        )
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ExpressionError> {
        self.binary_level(
            &[
                (Token::Star, BinOp::Mul),
                (Token::Slash, BinOp::Div),
                (Token::Percent, BinOp::Mod),
            ],
            Self::parse_unary,
        )
    }

    fn parse_unary(&mut self) -> Result<Expr, ExpressionError> {
        let prefixed = [Token::Minus, Token::Plus, Token::Bang, Token::Tilde]
            .iter()
            .any(|t| self.check(t));
        if !prefixed {
            return self.parse_primary();
        }
        self.enter()?;
        let expr = self.parse_prefixed();
        self.leave(1);
        expr
    }

    fn parse_prefixed(&mut self) -> Result<Expr, ExpressionError> {
        if self.match_token(Token::Minus) {
            Ok(Expr::Unary(UnaryOp::Neg, Box::new(self.parse_unary()?)))
        } else if self.match_token(Token::Plus) {
            self.parse_unary()
        } else if self.match_token(Token::Bang) {
            Ok(Expr::Unary(UnaryOp::Not, Box::new(self.parse_unary()?)))
        } else if self.match_token(Token::Tilde) {
            Ok(Expr::Unary(UnaryOp::BitNot, Box::new(self.parse_unary()?)))
        } else {
            self.parse_primary()
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ExpressionError> {
        match self.advance()? {
            Token::Number(n) => Ok(Expr::Literal(Value::Number(n))),
            Token::Ident(name) => self.parse_identifier(name),
            Token::LParen => {
                let expr = self.parse_ternary()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            other => Err(ExpressionError::UnexpectedToken(format!("{:?}", other))),
        }
    }

    fn parse_identifier(&mut self, name: String) -> Result<Expr, ExpressionError> {
        if name == "true" || name == "false" {
            return Ok(Expr::Literal(Value::Bool(name == "true")));
        }

        // `defined NAME` without parentheses
        if name == "defined" && !self.check(&Token::LParen) {
            return match self.advance()? {
                Token::Ident(arg) => Ok(Expr::Call(name, vec![Expr::Identifier(arg)])),
                other => Err(ExpressionError::UnexpectedToken(format!("{:?}", other))),
            };
        }

        if !self.match_token(Token::LParen) {
            return Ok(Expr::Identifier(name));
        }

        let mut args = Vec::new();
        if !self.match_token(Token::RParen) {
            loop {
                args.push(self.parse_ternary()?);
                if self.match_token(Token::RParen) {
                    break;
                }
                self.expect(Token::Comma)?;
            }
        }
        Ok(Expr::Call(name, args))
    }

    fn enter(&mut self) -> Result<(), ExpressionError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ExpressionError::TooDeep(MAX_DEPTH));
        }
        Ok(())
    }

    fn leave(&mut self, levels: usize) {
        self.depth -= levels;
    }

    fn advance(&mut self) -> Result<Token, ExpressionError> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or(ExpressionError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(token)
    }

    fn check(&self, token: &Token) -> bool {
        self.tokens.get(self.pos) == Some(token)
    }

    fn match_token(&mut self, token: Token) -> bool {
        if self.check(&token) {
            self.pos += 1;
            return true;
        }
        false
    }

    fn expect(&mut self, token: Token) -> Result<(), ExpressionError> {
        if self.match_token(token) {
            return Ok(());
        }
        match self.tokens.get(self.pos) {
            Some(t) => Err(ExpressionError::UnexpectedToken(format!("{:?}", t))),
            None => Err(ExpressionError::UnexpectedEnd),
        }
    }
}

/// Evaluates parsed expressions against a registry
pub struct Evaluator<'a> {
    registry: &'a DefineRegistry,
}

impl<'a> Evaluator<'a> {
    /// An evaluator over `registry`
    pub fn new(registry: &'a DefineRegistry) -> Self {
        Self { registry }
    }

    /// Evaluate a parsed tree
    pub fn evaluate(&self, expr: &Expr) -> Result<Value, ExpressionError> {
        match expr {
            Expr::Literal(v) => Ok(*v),
            Expr::Identifier(name) => Ok(Value::Number(self.identifier_value(name))),
            Expr::Call(name, args) => self.call(name, args),
            Expr::Ternary(cond, then, otherwise) => {
                if self.evaluate(cond)?.as_bool() {
                    self.evaluate(then)
                } else {
                    self.evaluate(otherwise)
                }
            }
            Expr::Unary(op, inner) => {
                let val = self.evaluate(inner)?;
                Ok(match op {
                    UnaryOp::Neg => Value::Number(-val.as_f64()),
                    UnaryOp::Not => Value::Bool(!val.as_bool()),
                    UnaryOp::BitNot => Value::Number(!(val.as_f64() as i64) as f64),
                })
            }
            Expr::Binary(left, BinOp::And, right) => Ok(Value::Bool(
                self.evaluate(left)?.as_bool() && self.evaluate(right)?.as_bool(),
            )),
            Expr::Binary(left, BinOp::Or, right) => Ok(Value::Bool(
                self.evaluate(left)?.as_bool() || self.evaluate(right)?.as_bool(),
            )),
            Expr::Binary(left, op, right) => {
                let l = self.evaluate(left)?.as_f64();
                let r = self.evaluate(right)?.as_f64();
                let int = |v: f64| v as i64;
                Ok(match op {
                    BinOp::Add => Value::Number(l + r),
                    BinOp::Sub => Value::Number(l - r),
                    BinOp::Mul => Value::Number(l * r),
                    BinOp::Div | BinOp::Mod if r == 0.0 => {
                        return Err(ExpressionError::DivisionByZero)
                    }
                    BinOp::Div => Value::Number(l / r),
                    BinOp::Mod => Value::Number(l % r),
                    BinOp::Eq => Value::Bool(l == r),
                    BinOp::Ne => Value::Bool(l != r),
                    BinOp::Lt => Value::Bool(l < r),
                    BinOp::Gt => Value::Bool(l > r),
                    BinOp::Le => Value::Bool(l <= r),
                    BinOp::Ge => Value::Bool(l >= r),
                    BinOp::BitAnd => Value::Number((int(l) & int(r)) as f64),
                    BinOp::BitOr => Value::Number((int(l) | int(r)) as f64),
                    BinOp::BitXor => Value::Number((int(l) ^ int(r)) as f64),
                    BinOp::Shl => Value::Number(int(l).wrapping_shl(int(r) as u32) as f64),
                    BinOp::Shr => Value::Number(int(l).wrapping_shr(int(r) as u32) as f64),
                    BinOp::And | BinOp::Or => unreachable!("handled above"),
                })
            }
        }
    }

    /// Numeric registry value of a bare identifier; absent or non-numeric is 0
    fn identifier_value(&self, name: &str) -> f64 {
        match self.registry.value(name) {
            Some(raw) => match raw.trim() {
                "true" => 1.0,
                "false" => 0.0,
                raw => parse_number(raw.trim_start_matches('(').trim_end_matches(')'))
                    .unwrap_or(0.0),
            },
            None => 0.0,
        }
    }

    fn call(&self, name: &str, args: &[Expr]) -> Result<Value, ExpressionError> {
        let names = args
            .iter()
            .map(|arg| match arg {
                Expr::Identifier(id) => Ok(id.as_str()),
                _ => Err(ExpressionError::NonIdentifierArgument(name.to_string())),
            })
            .collect::<Result<Vec<_>, _>>();

        let arity = |expected: &'static str, ok: bool| {
            if ok {
                Ok(())
            } else {
                Err(ExpressionError::Arity {
                    name: name.to_string(),
                    expected,
                    got: args.len(),
                })
            }
        };
        let defined = |id: &&str| self.registry.is_defined(id);

        let result = match name {
            "ENABLED" | "ALL" => {
                arity("at least 1", !args.is_empty())?;
                names?.iter().all(defined)
            }
            "DISABLED" => {
                arity("at least 1", !args.is_empty())?;
                !names?.iter().all(defined)
            }
            "defined" => {
                arity("1", args.len() == 1)?;
                names?.iter().all(defined)
            }
            "ANY" | "EITHER" => {
                arity("at least 1", !args.is_empty())?;
                names?.iter().any(defined)
            }
            "BOTH" => {
                arity("2", args.len() == 2)?;
                names?.iter().all(defined)
            }
            "NONE" => {
                arity("at least 1", !args.is_empty())?;
                !names?.iter().any(defined)
            }
            _ => return Err(ExpressionError::UnknownFunction(name.to_string())),
        };
        Ok(Value::Bool(result))
    }
}

/// Evaluate a `#if`/`#elif` condition
pub fn evaluate_condition(input: &str, registry: &DefineRegistry) -> Result<bool, ExpressionError> {
    let expr = Parser::new(input)?.parse()?;
    Ok(Evaluator::new(registry).evaluate(&expr)?.as_bool())
}
