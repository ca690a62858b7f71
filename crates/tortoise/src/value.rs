/*
 * value.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Values that flow through template contexts.
//!
//! [`Value`] covers plain data (the kinds a literal expression can produce)
//! plus two shared kinds for host data: [`Object`]s that expose attributes and
//! zero-argument [`Function`]s that the resolver invokes during dotted-path
//! lookups.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// A host object whose attributes can be read from templates (`{{ obj.attr }}`).
pub trait Object: fmt::Debug + Send + Sync {
    /// Look up an attribute. Return a [`Value::Function`] to expose a
    /// zero-argument method; the resolver calls it.
    fn get_attr(&self, name: &str) -> Option<Value>;

    /// Text form used when the object itself is rendered.
    fn to_text(&self) -> String {
        format!("{self:?}")
    }
}

/// A shared zero-argument callable.
#[derive(Clone)]
pub struct Function(Arc<dyn Fn() -> Value + Send + Sync>);

impl Function {
    pub fn new(f: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn call(&self) -> Value {
        (self.0)()
    }

    /// Whether both handles point at the same callable.
    pub fn ptr_eq(&self, other: &Function) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.0), Arc::as_ptr(&other.0))
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Function")
    }
}

/// A value that can be bound in a context or written as a literal.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// `None` / `null`, and the value of nothing at all.
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    /// String-keyed map; iteration and display follow key order.
    Map(BTreeMap<String, Value>),
    Object(Arc<dyn Object>),
    Function(Function),
}

impl Value {
    /// Wrap a host object.
    pub fn object(object: impl Object + 'static) -> Self {
        Value::Object(Arc::new(object))
    }

    /// Wrap a zero-argument callable.
    pub fn function(f: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        Value::Function(Function::new(f))
    }

    /// Name of this value's kind, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Map(_) => "map",
            Value::Object(_) => "object",
            Value::Function(_) => "function",
        }
    }

    /// Truthiness for conditionals.
    ///
    /// Null, false, zero, and empty strings/sequences/maps are falsy.
    /// Everything else, including objects and functions, is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::List(items) | Value::Tuple(items) => !items.is_empty(),
            Value::Map(m) => !m.is_empty(),
            Value::Object(_) | Value::Function(_) => true,
        }
    }

    /// Attribute access. Only host objects have attributes.
    pub fn get_attr(&self, name: &str) -> Option<Value> {
        match self {
            Value::Object(object) => object.get_attr(name),
            _ => None,
        }
    }

    /// Key or index access: map keys, sequence indexes (negative counts
    /// from the end), string character indexes.
    pub fn get_item(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(m) => m.get(key),
            Value::List(items) | Value::Tuple(items) => {
                resolve_index(key, items.len()).and_then(|i| items.get(i))
            }
            _ => None,
        }
    }

    /// Character of a string value at `key`, as a new string value.
    pub(crate) fn get_char(&self, key: &str) -> Option<Value> {
        let Value::String(s) = self else {
            return None;
        };
        let len = s.chars().count();
        resolve_index(key, len)
            .and_then(|i| s.chars().nth(i))
            .map(|c| Value::String(c.to_string()))
    }

    /// The elements a `for` loop visits, or `None` if not iterable.
    pub fn iter_items(&self) -> Option<Vec<Value>> {
        match self {
            Value::List(items) | Value::Tuple(items) => Some(items.clone()),
            Value::String(s) => Some(s.chars().map(|c| Value::String(c.to_string())).collect()),
            Value::Map(m) => Some(m.keys().cloned().map(Value::String).collect()),
            _ => None,
        }
    }

    /// Ordering between two values.
    ///
    /// Returns `Err` with a message when the kinds cannot be ordered, and
    /// `Ok(None)` when they can but the particular values are unordered (NaN).
    pub fn try_order(&self, other: &Value) -> Result<Option<Ordering>, String> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Ok(Some(a.cmp(b))),
            (Value::Int(a), Value::Float(b)) => Ok(compare_int_float(*a, *b)),
            (Value::Float(a), Value::Int(b)) => Ok(compare_int_float(*b, *a).map(Ordering::reverse)),
            (Value::Float(a), Value::Float(b)) => Ok(a.partial_cmp(b)),
            (Value::String(a), Value::String(b)) => Ok(Some(a.cmp(b))),
            (Value::Bool(a), Value::Bool(b)) => Ok(Some(a.cmp(b))),
            (Value::List(a), Value::List(b)) | (Value::Tuple(a), Value::Tuple(b)) => {
                for (x, y) in a.iter().zip(b) {
                    if x == y {
                        continue;
                    }
                    return x.try_order(y);
                }
                Ok(Some(a.len().cmp(&b.len())))
            }
            _ => Err(format!(
                "cannot order {} and {}",
                self.type_name(),
                other.type_name()
            )),
        }
    }

    /// Text form of a value nested inside a container: strings are quoted.
    fn fmt_nested(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
            other => fmt::Display::fmt(other, f),
        }
    }
}

/// Exact ordering of an int against a float, without rounding the int.
fn compare_int_float(int: i64, float: f64) -> Option<Ordering> {
    // 2^63, the first float above every i64.
    const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

    if float.is_nan() {
        return None;
    }
    if float >= I64_BOUND {
        return Some(Ordering::Less);
    }
    if float < -I64_BOUND {
        return Some(Ordering::Greater);
    }

    // In range, so the truncated float converts to i64 exactly.
    let whole = float.trunc() as i64;
    match int.cmp(&whole) {
        Ordering::Equal => 0.0_f64.partial_cmp(&float.fract()),
        ordering => Some(ordering),
    }
}

fn resolve_index(key: &str, len: usize) -> Option<usize> {
    let index: i64 = key.parse().ok()?;
    let len = i64::try_from(len).ok()?;
    let index = if index < 0 { len + index } else { index };
    if (0..len).contains(&index) {
        usize::try_from(index).ok()
    } else {
        None
    }
}

fn fmt_float(value: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        write!(f, "{value:.1}")
    } else {
        write!(f, "{value}")
    }
}

fn fmt_sequence(items: &[Value], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        item.fmt_nested(f)?;
    }
    Ok(())
}

/// The text a value renders to in a `{{ }}` tag.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => fmt_float(*x, f),
            Value::String(s) => f.write_str(s),
            Value::List(items) => {
                f.write_str("[")?;
                fmt_sequence(items, f)?;
                f.write_str("]")
            }
            Value::Tuple(items) => {
                f.write_str("(")?;
                fmt_sequence(items, f)?;
                if items.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
            Value::Map(m) => {
                f.write_str("{")?;
                for (i, (key, value)) in m.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    Value::String(key.clone()).fmt_nested(f)?;
                    f.write_str(": ")?;
                    value.fmt_nested(f)?;
                }
                f.write_str("}")
            }
            Value::Object(object) => f.write_str(&object.to_text()),
            Value::Function(_) => f.write_str("<function>"),
        }
    }
}

/// Value equality (`==`). Numbers compare across int and float; objects and
/// functions are equal only to themselves.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
                matches!(self.try_order(other), Ok(Some(Ordering::Equal)))
            }
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) | (Value::Tuple(a), Value::Tuple(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => {
                std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
            }
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        i64::try_from(value).map_or(Value::Float(value as f64), Value::Int)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<Function> for Value {
    fn from(value: Function) -> Self {
        Value::Function(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Value::List(value.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl<V: Into<Value>> From<BTreeMap<String, V>> for Value {
    fn from(value: BTreeMap<String, V>) -> Self {
        Value::Map(value.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl<V: Into<Value>, S: std::hash::BuildHasher> From<HashMap<String, V, S>> for Value {
    fn from(value: HashMap<String, V, S>) -> Self {
        Value::Map(value.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}
