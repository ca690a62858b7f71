/*
 * expr.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Expression evaluation.
//!
//! Tag operands are bare strings. [`evaluate`] decides whether such a string
//! is a literal (number, string, list, tuple, dict, boolean, null) or a dotted
//! name to look up in the context. It never fails: anything that does not
//! parse as a literal is a name.
//!
//! Comparison operators and identity tests also live here.

use crate::error::{TemplateError, TemplateResult};
use crate::value::Value;
use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// A dotted context path such as `user.profile.name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    segments: Vec<String>,
}

impl Path {
    /// Split a dotted path. No validation is done here.
    pub fn parse(dotted: &str) -> Self {
        Self {
            segments: dotted.split('.').map(str::to_string).collect(),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The root name (first segment).
    pub fn root(&self) -> &str {
        self.segments.first().map_or("", String::as_str)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

/// The result of evaluating an operand string.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal, already evaluated.
    Literal(Value),
    /// A context lookup, resolved at render time.
    NameRef(Path),
}

/// Classify an operand as a literal or a name reference.
pub fn evaluate(expr: &str) -> Expr {
    match parse_literal(expr) {
        Some(value) => Expr::Literal(value),
        None => Expr::NameRef(Path::parse(expr.trim())),
    }
}

/// Parse `source` as a complete literal, or `None` if it is not one.
pub fn parse_literal(source: &str) -> Option<Value> {
    let mut parser = LiteralParser { source, pos: 0 };
    parser.skip_whitespace();
    let value = parser.value()?;
    parser.skip_whitespace();
    parser.at_end().then_some(value)
}

/// Recursive-descent parser for the literal grammar.
struct LiteralParser<'a> {
    source: &'a str,
    pos: usize,
}

impl LiteralParser<'_> {
    fn rest(&self) -> &str {
        &self.source[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn value(&mut self) -> Option<Value> {
        match self.peek()? {
            '\'' | '"' => self.string().map(Value::String),
            '[' => {
                self.bump();
                self.sequence(']').map(|(items, _)| Value::List(items))
            }
            '(' => {
                self.bump();
                let (mut items, trailing_comma) = self.sequence(')')?;
                if items.len() == 1 && !trailing_comma {
                    items.pop()
                } else {
                    Some(Value::Tuple(items))
                }
            }
            '{' => {
                self.bump();
                self.dict()
            }
            c if c.is_ascii_digit() || c == '+' || c == '-' || c == '.' => self.number(),
            c if c.is_alphabetic() => self.keyword(),
            _ => None,
        }
    }

    /// Comma-separated literals up to `close`. Returns the items and whether
    /// the last item was followed by a comma.
    fn sequence(&mut self, close: char) -> Option<(Vec<Value>, bool)> {
        let mut items = Vec::new();
        let mut trailing_comma = false;
        loop {
            self.skip_whitespace();
            if self.eat(close) {
                return Some((items, trailing_comma));
            }
            if !items.is_empty() && !trailing_comma {
                return None;
            }
            items.push(self.value()?);
            self.skip_whitespace();
            trailing_comma = self.eat(',');
        }
    }

    fn dict(&mut self) -> Option<Value> {
        let mut map = BTreeMap::new();
        let mut expect_entry = true;
        loop {
            self.skip_whitespace();
            if self.eat('}') {
                return Some(Value::Map(map));
            }
            if !expect_entry {
                return None;
            }
            let key = self.value()?;
            self.skip_whitespace();
            if !self.eat(':') {
                return None;
            }
            self.skip_whitespace();
            let value = self.value()?;
            map.insert(key.to_string(), value);
            self.skip_whitespace();
            expect_entry = self.eat(',');
        }
    }

    fn string(&mut self) -> Option<String> {
        let quote = self.bump()?;
        let mut out = String::new();
        loop {
            match self.bump()? {
                c if c == quote => return Some(out),
                '\n' => return None,
                '\\' => match self.bump()? {
                    'n' => out.push('\n'),
                    't' => out.push('\t'),
                    'r' => out.push('\r'),
                    '0' => out.push('\0'),
                    c @ ('\\' | '\'' | '"') => out.push(c),
                    other => {
                        out.push('\\');
                        out.push(other);
                    }
                },
                c => out.push(c),
            }
        }
    }

    fn digits(&mut self) -> Option<String> {
        let mut digits = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                digits.push(c);
            } else if c == '_' && !digits.is_empty() {
                self.bump();
                if !self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    return None;
                }
                continue;
            } else {
                break;
            }
            self.bump();
        }
        Some(digits)
    }

    fn number(&mut self) -> Option<Value> {
        let mut text = String::new();
        if let Some(sign @ ('+' | '-')) = self.peek() {
            self.bump();
            text.push(sign);
        }

        let int_part = self.digits()?;
        text.push_str(&int_part);

        let mut is_float = false;
        if self.eat('.') {
            is_float = true;
            let frac_part = self.digits()?;
            if int_part.is_empty() && frac_part.is_empty() {
                return None;
            }
            text.push('.');
            text.push_str(&frac_part);
        } else if int_part.is_empty() {
            return None;
        }

        if let Some(e @ ('e' | 'E')) = self.peek() {
            self.bump();
            is_float = true;
            text.push(e);
            if let Some(sign @ ('+' | '-')) = self.peek() {
                self.bump();
                text.push(sign);
            }
            let exponent = self.digits()?;
            if exponent.is_empty() {
                return None;
            }
            text.push_str(&exponent);
        }

        if self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
            return None;
        }

        if !is_float {
            if let Ok(i) = text.parse::<i64>() {
                return Some(Value::Int(i));
            }
        }
        text.parse::<f64>().ok().map(Value::Float)
    }

    fn keyword(&mut self) -> Option<Value> {
        let word: String = self
            .rest()
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_')
            .collect();
        let value = match word.as_str() {
            "True" | "true" => Value::Bool(true),
            "False" | "false" => Value::Bool(false),
            "None" | "null" => Value::Null,
            _ => return None,
        };
        self.pos += word.len();
        Some(value)
    }
}

/// Comparison operators allowed in `{% if left op right %}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
}

impl CompareOp {
    /// Look up an operator by its symbol.
    pub fn parse(symbol: &str) -> Option<Self> {
        let op = match symbol {
            "<" => CompareOp::Lt,
            ">" => CompareOp::Gt,
            "<=" => CompareOp::Le,
            ">=" => CompareOp::Ge,
            "==" => CompareOp::Eq,
            "!=" => CompareOp::Ne,
            _ => return None,
        };
        Some(op)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CompareOp::Lt => "<",
            CompareOp::Gt => ">",
            CompareOp::Le => "<=",
            CompareOp::Ge => ">=",
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
        }
    }

    /// Apply the operator. Ordering incomparable kinds is a type error.
    pub fn apply(self, left: &Value, right: &Value) -> TemplateResult<bool> {
        match self {
            CompareOp::Eq => Ok(left == right),
            CompareOp::Ne => Ok(left != right),
            _ => {
                let ordering = left.try_order(right).map_err(|message| {
                    TemplateError::type_error(format!("'{}' {message}", self.as_str()))
                })?;
                // Unordered values (NaN) fail every ordering test.
                Ok(ordering.is_some_and(|o| self.holds_for(o)))
            }
        }
    }

    fn holds_for(self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Lt => ordering.is_lt(),
            CompareOp::Gt => ordering.is_gt(),
            CompareOp::Le => ordering.is_le(),
            CompareOp::Ge => ordering.is_ge(),
            CompareOp::Eq => ordering.is_eq(),
            CompareOp::Ne => ordering.is_ne(),
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity test (`is`).
///
/// Two operands borrowed from the same context slot are identical. Null and
/// booleans are singletons; objects and functions are identical when they
/// share the same allocation. Other values are distinct objects.
pub fn is_identical(left: &Cow<'_, Value>, right: &Cow<'_, Value>) -> bool {
    if let (Cow::Borrowed(a), Cow::Borrowed(b)) = (left, right) {
        if std::ptr::eq(*a, *b) {
            return true;
        }
    }
    match (left.as_ref(), right.as_ref()) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (a @ Value::Object(_), b @ Value::Object(_))
        | (a @ Value::Function(_), b @ Value::Function(_)) => a == b,
        _ => false,
    }
}
