//! License expression parser
//!
//! Parses boolean license expressions like:
//!   `MIT OR Apache-2.0`
//!   `GPL-2.0-only WITH Classpath-exception-2.0`
//!   `X11 AND (GPL-2.0-only WITH Classpath-exception-2.0 OR GPL-3.0-only)`
//!
//! Operators are case-insensitive. Commas are treated as whitespace.
//! `WITH` binds tightest and folds into a single license atom; `AND` binds
//! tighter than `OR`. Runs of the same operator collapse into one N-ary node.

use super::{LicenseId, WITH_SEPARATOR};
use crate::{LicompatError, LicompatResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Boolean combinator of an operator node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operator {
    /// Every operand applies
    And,
    /// Any one operand may be chosen
    Or,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And => write!(f, "AND"),
            Self::Or => write!(f, "OR"),
        }
    }
}

/// A parsed license expression
///
/// An operator node has one operator for all of its direct operands;
/// mixed operators nest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Expression {
    License { name: LicenseId },
    Operator { op: Operator, operands: Vec<Expression> },
}

impl Expression {
    pub fn license(name: impl Into<String>) -> Self {
        Self::License {
            name: LicenseId::new(name),
        }
    }

    pub fn and(operands: Vec<Expression>) -> Self {
        Self::Operator {
            op: Operator::And,
            operands,
        }
    }

    pub fn or(operands: Vec<Expression>) -> Self {
        Self::Operator {
            op: Operator::Or,
            operands,
        }
    }

    /// Parse an expression string
    pub fn parse(input: &str) -> LicompatResult<Self> {
        let tokens = tokenize(input)?;
        if tokens.is_empty() {
            return Err(LicompatError::InvalidExpression(
                "empty license expression".into(),
            ));
        }
        let (expr, rest) = parse_or(&tokens)?;
        if !rest.is_empty() {
            return Err(LicompatError::InvalidExpression(format!(
                "unexpected tokens after expression: {}",
                describe(rest)
            )));
        }
        Ok(expr)
    }

    /// Parse an expression given as separate words, as on a command line
    pub fn parse_list<S: AsRef<str>>(parts: &[S]) -> LicompatResult<Self> {
        if parts.is_empty() {
            return Err(LicompatError::InvalidExpression(
                "no license expression given".into(),
            ));
        }
        if parts.iter().any(|p| p.as_ref().trim().is_empty()) {
            return Err(LicompatError::InvalidExpression(
                "license expression contains an empty element".into(),
            ));
        }
        let joined = parts
            .iter()
            .map(|p| p.as_ref())
            .collect::<Vec<_>>()
            .join(" ");
        Self::parse(&joined)
    }

    /// Parse text that must be exactly one license atom (`X` or `X WITH Y`)
    pub fn parse_atom(input: &str) -> LicompatResult<LicenseId> {
        match Self::parse(input)? {
            Self::License { name } => Ok(name),
            other => Err(LicompatError::InvalidExpression(format!(
                "'{}' is not a single license",
                other
            ))),
        }
    }

    pub fn is_license(&self) -> bool {
        matches!(self, Self::License { .. })
    }

    /// License atoms in order of appearance, duplicates included
    pub fn leaves(&self) -> Vec<&LicenseId> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a LicenseId>) {
        match self {
            Self::License { name } => out.push(name),
            Self::Operator { operands, .. } => {
                for operand in operands {
                    operand.collect_leaves(out);
                }
            }
        }
    }

    /// Rebuild the tree with every license leaf replaced by `f(leaf)`.
    /// The input tree is left untouched.
    pub fn map_leaves<F>(&self, f: &F) -> Self
    where
        F: Fn(&LicenseId) -> Expression,
    {
        match self {
            Self::License { name } => f(name),
            Self::Operator { op, operands } => Self::Operator {
                op: *op,
                operands: operands.iter().map(|o| o.map_leaves(f)).collect(),
            },
        }
    }

    fn fmt_nested(&self, f: &mut fmt::Formatter<'_>, nested: bool) -> fmt::Result {
        match self {
            Self::License { name } => write!(f, "{}", name),
            Self::Operator { operands, .. } if operands.len() == 1 => {
                operands[0].fmt_nested(f, nested)
            }
            Self::Operator { op, operands } => {
                if nested {
                    write!(f, "(")?;
                }
                for (i, operand) in operands.iter().enumerate() {
                    if i > 0 {
                        write!(f, " {} ", op)?;
                    }
                    operand.fmt_nested(f, true)?;
                }
                if nested {
                    write!(f, ")")?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_nested(f, false)
    }
}

impl std::str::FromStr for Expression {
    type Err = LicompatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// ─── Tokenizer ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Identifier(String),
    And,
    Or,
    With,
    LParen,
    RParen,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Identifier(id) => write!(f, "{}", id),
            Token::And => write!(f, "AND"),
            Token::Or => write!(f, "OR"),
            Token::With => write!(f, "WITH"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
        }
    }
}

fn is_separator(c: char) -> bool {
    c.is_whitespace() || c == ','
}

fn tokenize(input: &str) -> LicompatResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if is_separator(c) => {
                chars.next();
            }
            '(' => {
                tokens.push(Token::LParen);
                chars.next();
            }
            ')' => {
                tokens.push(Token::RParen);
                chars.next();
            }
            _ => {
                let mut word = String::new();
                while let Some(&c) = chars.peek() {
                    if is_separator(c) || c == '(' || c == ')' {
                        break;
                    }
                    word.push(c);
                    chars.next();
                }
                match word.to_uppercase().as_str() {
                    "AND" => tokens.push(Token::And),
                    "OR" => tokens.push(Token::Or),
                    "WITH" => tokens.push(Token::With),
                    _ => tokens.push(Token::Identifier(word)),
                }
            }
        }
    }

    Ok(tokens)
}

fn describe(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

// ─── Recursive Descent Parser ──────────────────────────────────────
// Precedence: WITH > AND > OR

type Parsed<'a> = (Expression, &'a [Token]);

fn parse_or(tokens: &[Token]) -> LicompatResult<Parsed<'_>> {
    parse_sequence(tokens, Token::Or, Operator::Or, parse_and)
}

fn parse_and(tokens: &[Token]) -> LicompatResult<Parsed<'_>> {
    parse_sequence(tokens, Token::And, Operator::And, parse_with)
}

/// `operand (sep operand)*`, collapsed into one N-ary node
fn parse_sequence<'a>(
    tokens: &'a [Token],
    separator: Token,
    op: Operator,
    operand: fn(&'a [Token]) -> LicompatResult<Parsed<'a>>,
) -> LicompatResult<Parsed<'a>> {
    let (first, mut rest) = operand(tokens)?;
    let mut operands = vec![first];

    while rest.first() == Some(&separator) {
        let (next, r) = operand(&rest[1..])?;
        operands.push(next);
        rest = r;
    }

    if operands.len() == 1 {
        return Ok((operands.remove(0), rest));
    }
    Ok((Expression::Operator { op, operands }, rest))
}

fn parse_with(tokens: &[Token]) -> LicompatResult<Parsed<'_>> {
    let bare = matches!(tokens.first(), Some(Token::Identifier(_)));
    let (base, rest) = parse_primary(tokens)?;

    if rest.first() != Some(&Token::With) {
        return Ok((base, rest));
    }
    let (true, Expression::License { name }) = (bare, base) else {
        return Err(LicompatError::InvalidExpression(
            "WITH must follow a simple license identifier".into(),
        ));
    };
    match rest.get(1) {
        Some(Token::Identifier(exception)) => Ok((
            Expression::License {
                name: LicenseId::new(format!("{}{}{}", name, WITH_SEPARATOR, exception)),
            },
            &rest[2..],
        )),
        _ => Err(LicompatError::InvalidExpression(format!(
            "expected exception identifier after '{} WITH'",
            name
        ))),
    }
}

fn parse_primary(tokens: &[Token]) -> LicompatResult<Parsed<'_>> {
    match tokens.first() {
        None => Err(LicompatError::InvalidExpression(
            "unexpected end of expression".into(),
        )),
        Some(Token::LParen) => {
            let (expr, rest) = parse_or(&tokens[1..])?;
            if rest.first() != Some(&Token::RParen) {
                return Err(LicompatError::InvalidExpression(
                    "missing closing parenthesis".into(),
                ));
            }
            Ok((expr, &rest[1..]))
        }
        Some(Token::Identifier(id)) => Ok((Expression::license(id.clone()), &tokens[1..])),
        Some(other) => Err(LicompatError::InvalidExpression(format!(
            "unexpected token '{}'",
            other
        ))),
    }
}
