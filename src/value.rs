//! Stored value types
//!
//! Every key holds exactly one [`Value`]. The variant is the type: writing a
//! different variant replaces the old one, and arithmetic only ever touches
//! [`Value::Number`].
//!
//! ## On-disk representation
//! Values are serialized untagged so the snapshot stays hand-editable:
//! ```text
//! {
//!   "afk.Steve": true,
//!   "bal.Steve": 1200,
//!   "bal.Alex": 87.5,
//!   "motd": "welcome",
//!   "mod.words": ["foo", "bar"]
//! }
//! ```
//! Integers and floats are kept apart: `1200` loads as `Number::Int`,
//! `1200.0` as `Number::Float`.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A numeric value: signed 64-bit integer or 64-bit float
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    /// Lossy conversion for comparisons and display
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(self, Number::Int(_))
    }

    pub fn is_finite(self) -> bool {
        match self {
            Number::Int(_) => true,
            Number::Float(f) => f.is_finite(),
        }
    }

    /// Add two numbers.
    ///
    /// Int + Int stays integral and returns `None` on overflow. Any float
    /// operand yields a float; `None` if the result is not finite.
    pub fn checked_add(self, rhs: Number) -> Option<Number> {
        match (self, rhs) {
            (Number::Int(a), Number::Int(b)) => a.checked_add(b).map(Number::Int),
            (a, b) => finite(a.as_f64() + b.as_f64()),
        }
    }

    /// Subtract `rhs` from `self` with the same promotion rules as `checked_add`
    pub fn checked_sub(self, rhs: Number) -> Option<Number> {
        match (self, rhs) {
            (Number::Int(a), Number::Int(b)) => a.checked_sub(b).map(Number::Int),
            (a, b) => finite(a.as_f64() - b.as_f64()),
        }
    }

    /// Numeric order, exact across int/float pairs.
    ///
    /// `Int(5)` and `Float(5.0)` compare `Equal` even though they are not
    /// `==` (the variant is part of the stored value). Mixed pairs are never
    /// rounded through `f64`, so the order stays transitive for any finite
    /// values and is safe to hand to `sort_by`. NaN, which the store never
    /// holds, sorts above everything.
    pub fn total_cmp(&self, other: &Number) -> Ordering {
        match (*self, *other) {
            (Number::Int(a), Number::Int(b)) => a.cmp(&b),
            (Number::Int(a), Number::Float(b)) => cmp_int_float(a, b),
            (Number::Float(a), Number::Int(b)) => cmp_int_float(b, a).reverse(),
            (Number::Float(a), Number::Float(b)) => match a.partial_cmp(&b) {
                Some(ord) => ord,
                None => a.is_nan().cmp(&b.is_nan()),
            },
        }
    }

    pub fn is_negative(self) -> bool {
        match self {
            Number::Int(i) => i < 0,
            Number::Float(f) => f < 0.0,
        }
    }

    pub fn is_positive(self) -> bool {
        match self {
            Number::Int(i) => i > 0,
            Number::Float(f) => f > 0.0,
        }
    }

    /// Zero of the same flavour
    pub fn zero_like(self) -> Number {
        match self {
            Number::Int(_) => Number::Int(0),
            Number::Float(_) => Number::Float(0.0),
        }
    }
}

fn finite(f: f64) -> Option<Number> {
    f.is_finite().then_some(Number::Float(f))
}

/// Exact comparison of an integer with a float
fn cmp_int_float(i: i64, f: f64) -> Ordering {
    // 2^63; every float at or beyond it lies outside i64
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;

    if f.is_nan() || f >= LIMIT {
        return Ordering::Less;
    }
    if f < -LIMIT {
        return Ordering::Greater;
    }

    // In range, so the truncated float converts to i64 exactly
    let whole = f.trunc();
    match i.cmp(&(whole as i64)) {
        Ordering::Equal => whole.partial_cmp(&f).unwrap_or(Ordering::Equal),
        ord => ord,
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{}", i),
            Number::Float(x) => write!(f, "{}", x),
        }
    }
}

impl From<i64> for Number {
    fn from(v: i64) -> Self {
        Number::Int(v)
    }
}

impl From<i32> for Number {
    fn from(v: i32) -> Self {
        Number::Int(v as i64)
    }
}

impl From<u32> for Number {
    fn from(v: u32) -> Self {
        Number::Int(v as i64)
    }
}

impl From<f64> for Number {
    fn from(v: f64) -> Self {
        Number::Float(v)
    }
}

/// Type tag of a [`Value`], used in type-mismatch errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    Number,
    String,
    List,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Bool => "bool",
            ValueKind::Number => "number",
            ValueKind::String => "string",
            ValueKind::List => "list",
        };
        f.write_str(name)
    }
}

/// A stored value
///
/// Variant order matters for untagged deserialization: booleans and numbers
/// must be tried before strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Number(Number),
    Str(String),
    List(Vec<String>),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Bool(_) => ValueKind::Bool,
            Value::Number(_) => ValueKind::Number,
            Value::Str(_) => ValueKind::String,
            Value::List(_) => ValueKind::List,
        }
    }

    pub fn as_number(&self) -> Option<Number> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(Number::Int(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_number().map(Number::as_f64)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Parse an operator-typed literal.
    ///
    /// `true`/`false` → bool, integer, finite float, a JSON array of
    /// strings → list, anything else → string.
    pub fn parse_literal(input: &str) -> Value {
        match input {
            "true" => return Value::Bool(true),
            "false" => return Value::Bool(false),
            _ => {}
        }
        if let Ok(i) = input.parse::<i64>() {
            return Value::Number(Number::Int(i));
        }
        if let Ok(f) = input.parse::<f64>() {
            if f.is_finite() {
                return Value::Number(Number::Float(f));
            }
        }
        if input.trim_start().starts_with('[') {
            if let Ok(items) = serde_json::from_str::<Vec<String>>(input) {
                return Value::List(items);
            }
        }
        Value::Str(input.to_string())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::Str(s) => f.write_str(s),
            Value::List(items) => {
                let json = serde_json::to_string(items).map_err(|_| fmt::Error)?;
                f.write_str(&json)
            }
        }
    }
}

impl From<Number> for Value {
    fn from(v: Number) -> Self {
        Value::Number(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Number(Number::Int(v))
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Number(Number::Int(v as i64))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(Number::Float(v))
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self {
        Value::List(v)
    }
}

impl From<Vec<&str>> for Value {
    fn from(v: Vec<&str>) -> Self {
        Value::List(v.into_iter().map(str::to_string).collect())
    }
}
