//! Boolean condition expressions over named environment flags.
//!
//! Conditions gate weighted acoustic entries and block effects. The grammar is
//! deliberately small:
//!
//! ```text
//! expr  := and ( "||" and )*
//! and   := unary ( "&&" unary )*
//! unary := "!" unary | "(" expr ")" | "true" | "false" | flag
//! flag  := [a-z0-9_.]+
//! ```
//!
//! An empty expression is always true.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error produced when a condition string does not parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid condition `{input}`: {reason}")]
pub struct ConditionError {
    input: String,
    reason: String,
}

/// Set of flags that are currently true (e.g. `raining`, `night`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionFlags {
    set: BTreeSet<String>,
}

impl ConditionFlags {
    /// No flags set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or clear a flag.
    pub fn set(&mut self, name: &str, value: bool) {
        let name = name.to_ascii_lowercase();
        if value {
            self.set.insert(name);
        } else {
            self.set.remove(&name);
        }
    }

    /// True when `name` is set.
    pub fn is_set(&self, name: &str) -> bool {
        self.set.contains(name)
    }
}

impl<S: AsRef<str>> FromIterator<S> for ConditionFlags {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut flags = Self::new();
        for name in iter {
            flags.set(name.as_ref(), true);
        }
        flags
    }
}

/// Parsed condition expression.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Condition {
    /// Always true (also the empty expression).
    #[default]
    Always,
    /// Always false.
    Never,
    /// True when the flag is set.
    Flag(String),
    /// Negation.
    Not(Box<Condition>),
    /// Conjunction.
    And(Box<Condition>, Box<Condition>),
    /// Disjunction.
    Or(Box<Condition>, Box<Condition>),
}

impl Condition {
    /// Parse a condition string.
    pub fn parse(input: &str) -> Result<Self, ConditionError> {
        let tokens = tokenize(input).map_err(|reason| ConditionError {
            input: input.to_string(),
            reason,
        })?;
        if tokens.is_empty() {
            return Ok(Condition::Always);
        }
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.or().map_err(|reason| ConditionError {
            input: input.to_string(),
            reason,
        })?;
        if parser.pos != parser.tokens.len() {
            return Err(ConditionError {
                input: input.to_string(),
                reason: "trailing input".to_string(),
            });
        }
        Ok(expr)
    }

    /// Evaluate against a flag set.
    pub fn evaluate(&self, flags: &ConditionFlags) -> bool {
        match self {
            Condition::Always => true,
            Condition::Never => false,
            Condition::Flag(name) => flags.is_set(name),
            Condition::Not(inner) => !inner.evaluate(flags),
            Condition::And(a, b) => a.evaluate(flags) && b.evaluate(flags),
            Condition::Or(a, b) => a.evaluate(flags) || b.evaluate(flags),
        }
    }
}

impl FromStr for Condition {
    type Err = ConditionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Always => f.write_str("true"),
            Condition::Never => f.write_str("false"),
            Condition::Flag(name) => f.write_str(name),
            Condition::Not(inner) => write!(f, "!({inner})"),
            Condition::And(a, b) => write!(f, "({a} && {b})"),
            Condition::Or(a, b) => write!(f, "({a} || {b})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Not,
    And,
    Or,
    Open,
    Close,
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' | '\n' | '\r' => {
                chars.next();
            }
            '!' => {
                chars.next();
                tokens.push(Token::Not);
            }
            '(' => {
                chars.next();
                tokens.push(Token::Open);
            }
            ')' => {
                chars.next();
                tokens.push(Token::Close);
            }
            '&' | '|' => {
                chars.next();
                if chars.next() != Some(c) {
                    return Err(format!("expected `{c}{c}`"));
                }
                tokens.push(if c == '&' { Token::And } else { Token::Or });
            }
            c if c.is_ascii_alphanumeric() || c == '_' || c == '.' => {
                let mut ident = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
                        ident.push(c.to_ascii_lowercase());
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(ident));
            }
            other => return Err(format!("unexpected character `{other}`")),
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn or(&mut self) -> Result<Condition, String> {
        let mut left = self.and()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            let right = self.and()?;
            left = Condition::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and(&mut self) -> Result<Condition, String> {
        let mut left = self.unary()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            let right = self.unary()?;
            left = Condition::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Condition, String> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or_else(|| "unexpected end of input".to_string())?;
        self.pos += 1;
        match token {
            Token::Not => Ok(Condition::Not(Box::new(self.unary()?))),
            Token::Open => {
                let inner = self.or()?;
                if self.peek() != Some(&Token::Close) {
                    return Err("missing `)`".to_string());
                }
                self.pos += 1;
                Ok(inner)
            }
            Token::Ident(name) => Ok(match name.as_str() {
                "true" => Condition::Always,
                "false" => Condition::Never,
                _ => Condition::Flag(name),
            }),
            other => Err(format!("unexpected token {other:?}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_is_always_true() {
        assert_eq!(Condition::parse("   ").unwrap(), Condition::Always);
        assert!(Condition::parse("").unwrap().evaluate(&ConditionFlags::new()));
    }

    #[test]
    fn precedence_and_binds_tighter() {
        let cond = Condition::parse("raining || night && !underground").unwrap();
        let rain: ConditionFlags = ["raining"].into_iter().collect();
        let night_under: ConditionFlags = ["night", "underground"].into_iter().collect();
        let night: ConditionFlags = ["night"].into_iter().collect();
        assert!(cond.evaluate(&rain));
        assert!(!cond.evaluate(&night_under));
        assert!(cond.evaluate(&night));
    }

    #[test]
    fn parentheses_and_literals() {
        let cond = Condition::parse("!(Raining && false)").unwrap();
        assert!(cond.evaluate(&ConditionFlags::new()));
    }

    #[test]
    fn rejects_malformed() {
        assert!(Condition::parse("a &").is_err());
        assert!(Condition::parse("(a").is_err());
        assert!(Condition::parse("a b").is_err());
        assert!(Condition::parse("a + b").is_err());
    }
}
