//! Turns a string expression into a symbolic [`Expr`].
//!
//! The input is split into tokens and read by a precedence-climbing parser:
//!
//! ```text
//! expr    := term   (('+' | '-') term)*
//! term    := unary  (('*' | '/') unary | <juxtaposed factor>)*
//! unary   := ('+' | '-') unary | power
//! power   := primary (('^' | '**') unary)?
//! primary := number | constant | variable | function '(' expr ')' | '(' expr ')' | '{' expr '}'
//! ```
//!
//! `^` is right associative and binds tighter than unary minus, so `-x^2` is `-(x^2)`
//! and `2^3^2` is `2^(3^2)`. A factor directly followed by an identifier or an opening
//! bracket is multiplied implicitly (`2x`, `3(x+1)`, `(x-1)(x+1)`).
//!
//! # Example
//! ```
//! use RustedNumAn::symbolic::parse_expr::parse_expression_with_vars;
//! let expr = parse_expression_with_vars("x^2 - 4", &["x"]).unwrap();
//! assert_eq!(expr.to_string(), "((x ^ 2) - 4)");
//! ```
use crate::symbolic::symbolic_engine::Expr;
use std::f64::consts::{E, PI};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseErrorKind {
    #[error("empty expression")]
    Empty,
    #[error("unexpected character '{0}'")]
    UnexpectedCharacter(char),
    #[error("malformed number '{0}'")]
    MalformedNumber(String),
    #[error("unexpected token '{0}'")]
    UnexpectedToken(String),
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("unbalanced bracket '{0}'")]
    UnbalancedBracket(char),
    #[error("unknown identifier '{0}'")]
    UnknownIdentifier(String),
    #[error("function '{0}' must be followed by a bracketed argument")]
    MissingArgument(String),
    #[error("function '{function}' takes exactly one argument, got {got}")]
    Arity { function: String, got: usize },
    #[error("expression is nested deeper than {0} levels")]
    TooDeep(usize),
}

/// Deepest expression tree accepted by the parser and by compilation
pub const MAX_DEPTH: usize = 256;

/// Syntax error with the character offset where it was detected
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind} at position {position}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub position: usize,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, position: usize) -> Self {
        Self { kind, position }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Open(char),
    Close(char),
    Comma,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Num(v) => v.to_string(),
            Token::Ident(name) => name.clone(),
            Token::Plus => "+".to_string(),
            Token::Minus => "-".to_string(),
            Token::Star => "*".to_string(),
            Token::Slash => "/".to_string(),
            Token::Caret => "^".to_string(),
            Token::Open(c) | Token::Close(c) => c.to_string(),
            Token::Comma => ",".to_string(),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<(Token, usize)>, ParseError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let start = i;
        match c {
            c if c.is_whitespace() => {
                i += 1;
            }
            '0'..='9' | '.' => {
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                // exponent only when a digit follows, so "2e" stays 2*e
                if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                    let mut j = i + 1;
                    if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        i = j;
                        while i < chars.len() && chars[i].is_ascii_digit() {
                            i += 1;
                        }
                    }
                }
                let text: String = chars[start..i].iter().collect();
                let value = text.parse::<f64>().map_err(|_| {
                    ParseError::new(ParseErrorKind::MalformedNumber(text.clone()), start)
                })?;
                tokens.push((Token::Num(value), start));
            }
            c if c.is_alphabetic() || c == '_' || c == '\\' => {
                // LaTeX style "\sin", "\pi"
                if c == '\\' {
                    i += 1;
                }
                let name_start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                if name_start == i {
                    return Err(ParseError::new(
                        ParseErrorKind::UnexpectedCharacter(c),
                        start,
                    ));
                }
                let name: String = chars[name_start..i].iter().collect();
                tokens.push((Token::Ident(name), start));
            }
            '+' => {
                tokens.push((Token::Plus, start));
                i += 1;
            }
            '-' => {
                tokens.push((Token::Minus, start));
                i += 1;
            }
            '*' => {
                if i + 1 < chars.len() && chars[i + 1] == '*' {
                    tokens.push((Token::Caret, start));
                    i += 2;
                } else {
                    tokens.push((Token::Star, start));
                    i += 1;
                }
            }
            '/' => {
                tokens.push((Token::Slash, start));
                i += 1;
            }
            '^' => {
                tokens.push((Token::Caret, start));
                i += 1;
            }
            '(' | '{' => {
                tokens.push((Token::Open(c), start));
                i += 1;
            }
            ')' | '}' => {
                tokens.push((Token::Close(c), start));
                i += 1;
            }
            ',' => {
                tokens.push((Token::Comma, start));
                i += 1;
            }
            other => {
                return Err(ParseError::new(
                    ParseErrorKind::UnexpectedCharacter(other),
                    start,
                ));
            }
        }
    }
    Ok(tokens)
}

fn closing_for(open: char) -> char {
    if open == '{' { '}' } else { ')' }
}

/// Maps every accepted spelling onto an [`Expr`] constructor
fn function_constructor(name: &str) -> Option<fn(Box<Expr>) -> Expr> {
    let ctor: fn(Box<Expr>) -> Expr = match name {
        "sin" => Expr::sin,
        "cos" => Expr::cos,
        "tan" | "tg" => Expr::tg,
        "cot" | "ctg" => Expr::ctg,
        "asin" | "arcsin" => Expr::arcsin,
        "acos" | "arccos" => Expr::arccos,
        "atan" | "arctan" | "arctg" => Expr::arctg,
        "acot" | "arccot" | "arcctg" => Expr::arcctg,
        "ln" | "log" => Expr::Ln,
        "exp" => Expr::Exp,
        "sqrt" => Expr::Sqrt,
        "abs" | "Abs" => Expr::Abs,
        _ => return None,
    };
    Some(ctor)
}

fn named_constant(name: &str) -> Option<f64> {
    match name {
        "pi" => Some(PI),
        "e" => Some(E),
        _ => None,
    }
}

struct Parser<'a> {
    tokens: Vec<(Token, usize)>,
    pos: usize,
    input_len: usize,
    variables: Option<&'a [&'a str]>,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn position(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|(_, p)| *p)
            .unwrap_or(self.input_len)
    }

    fn advance(&mut self) -> Option<(Token, usize)> {
        let next = self.tokens.get(self.pos).cloned();
        if next.is_some() {
            self.pos += 1;
        }
        next
    }

    fn unexpected(&self) -> ParseError {
        match self.peek() {
            Some(Token::Close(c)) => {
                ParseError::new(ParseErrorKind::UnbalancedBracket(*c), self.position())
            }
            Some(token) => ParseError::new(
                ParseErrorKind::UnexpectedToken(token.describe()),
                self.position(),
            ),
            None => ParseError::new(ParseErrorKind::UnexpectedEnd, self.input_len),
        }
    }

    fn descend(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ParseError::new(
                ParseErrorKind::TooDeep(MAX_DEPTH),
                self.position(),
            ));
        }
        Ok(())
    }

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.advance();
                    lhs = lhs + self.parse_term()?;
                }
                Some(Token::Minus) => {
                    self.advance();
                    lhs = lhs - self.parse_term()?;
                }
                _ => return Ok(lhs),
            }
        }
    }

    fn parse_term(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_unary()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.advance();
                    lhs = lhs * self.parse_unary()?;
                }
                Some(Token::Slash) => {
                    self.advance();
                    lhs = lhs / self.parse_unary()?;
                }
                Some(Token::Ident(_)) | Some(Token::Open(_)) => {
                    lhs = lhs * self.parse_power()?;
                }
                _ => return Ok(lhs),
            }
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.advance();
                self.descend()?;
                let operand = self.parse_unary();
                self.depth -= 1;
                Ok(-operand?)
            }
            Some(Token::Plus) => {
                self.advance();
                self.descend()?;
                let operand = self.parse_unary();
                self.depth -= 1;
                operand
            }
            _ => self.parse_power(),
        }
    }

    fn parse_power(&mut self) -> Result<Expr, ParseError> {
        let base = self.parse_primary()?;
        if let Some(Token::Caret) = self.peek() {
            self.advance();
            self.descend()?;
            let exponent = self.parse_unary();
            self.depth -= 1;
            return Ok(base.pow(exponent?));
        }
        Ok(base)
    }

    fn parse_group(&mut self, open: char, open_pos: usize) -> Result<Vec<Expr>, ParseError> {
        self.descend()?;
        let args = self.parse_group_items(open, open_pos);
        self.depth -= 1;
        args
    }

    fn parse_group_items(
        &mut self,
        open: char,
        open_pos: usize,
    ) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();
        if let Some(Token::Close(c)) = self.peek() {
            let c = *c;
            if c != closing_for(open) {
                return Err(ParseError::new(
                    ParseErrorKind::UnbalancedBracket(c),
                    self.position(),
                ));
            }
            self.advance();
            return Ok(args);
        }
        loop {
            args.push(self.parse_expr()?);
            match self.advance() {
                Some((Token::Comma, _)) => continue,
                Some((Token::Close(c), pos)) => {
                    if c != closing_for(open) {
                        return Err(ParseError::new(ParseErrorKind::UnbalancedBracket(c), pos));
                    }
                    return Ok(args);
                }
                Some((token, pos)) => {
                    return Err(ParseError::new(
                        ParseErrorKind::UnexpectedToken(token.describe()),
                        pos,
                    ));
                }
                None => {
                    return Err(ParseError::new(
                        ParseErrorKind::UnbalancedBracket(open),
                        open_pos,
                    ));
                }
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let Some((token, pos)) = self.advance() else {
            return Err(ParseError::new(ParseErrorKind::UnexpectedEnd, self.input_len));
        };
        match token {
            Token::Num(value) => Ok(Expr::Const(value)),
            Token::Open(open) => {
                let mut inner = self.parse_group(open, pos)?;
                match inner.len() {
                    1 => Ok(inner.remove(0)),
                    0 => Err(ParseError::new(ParseErrorKind::UnexpectedEnd, pos + 1)),
                    _ => Err(ParseError::new(
                        ParseErrorKind::UnexpectedToken(",".to_string()),
                        pos,
                    )),
                }
            }
            Token::Ident(name) => {
                if let Some(ctor) = function_constructor(&name) {
                    let Some(Token::Open(open)) = self.peek().cloned() else {
                        return Err(ParseError::new(ParseErrorKind::MissingArgument(name), pos));
                    };
                    let open_pos = self.position();
                    self.advance();
                    let mut args = self.parse_group(open, open_pos)?;
                    if args.len() != 1 {
                        return Err(ParseError::new(
                            ParseErrorKind::Arity {
                                function: name,
                                got: args.len(),
                            },
                            pos,
                        ));
                    }
                    return Ok(ctor(args.remove(0).boxed()));
                }
                let is_declared = self
                    .variables
                    .is_some_and(|vars| vars.iter().any(|v| *v == name));
                if is_declared {
                    return Ok(Expr::Var(name));
                }
                if let Some(value) = named_constant(&name) {
                    return Ok(Expr::Const(value));
                }
                match self.variables {
                    Some(_) => Err(ParseError::new(ParseErrorKind::UnknownIdentifier(name), pos)),
                    None => Ok(Expr::Var(name)),
                }
            }
            Token::Close(c) => Err(ParseError::new(ParseErrorKind::UnbalancedBracket(c), pos)),
            other => Err(ParseError::new(
                ParseErrorKind::UnexpectedToken(other.describe()),
                pos,
            )),
        }
    }
}

fn parse_with(input: &str, variables: Option<&[&str]>) -> Result<Expr, ParseError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(ParseError::new(ParseErrorKind::Empty, 0));
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        input_len: input.chars().count(),
        variables,
        depth: 0,
    };
    let expr = parser.parse_expr()?;
    if parser.peek().is_some() {
        return Err(parser.unexpected());
    }
    // long operator chains build deep trees without nesting
    if expr.depth() > MAX_DEPTH {
        return Err(ParseError::new(ParseErrorKind::TooDeep(MAX_DEPTH), 0));
    }
    Ok(expr)
}

/// Parse an expression, treating every identifier that is neither a function nor
/// a named constant as a variable.
pub fn parse_expression_func(input: &str) -> Result<Expr, ParseError> {
    parse_with(input, None)
}

/// Parse an expression whose free identifiers must belong to `variables`.
/// A declared variable shadows the constants `e` and `pi`.
pub fn parse_expression_with_vars(input: &str, variables: &[&str]) -> Result<Expr, ParseError> {
    parse_with(input, Some(variables))
}

impl Expr {
    pub fn parse_expression(input: &str) -> Result<Expr, ParseError> {
        parse_expression_func(input)
    }
}
