//! Literal serializer used to build evaluable expressions.
//!
//! This is deliberately narrow: it covers scalars only. Arrays and objects
//! have no literal form here and are rejected rather than coerced.

use std::fmt;

use serde_json::Value;

use crate::error::BridgeError;

/// A value that can be spliced into a remote expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Double-quoted, with backslashes and quotes escaped.
    Str(String),
    Int(i64),
    /// Always rendered with a decimal point or exponent.
    Float(f64),
    Bool(bool),
    Null,
    /// Inserted verbatim, e.g. an identifier or a nested expression.
    Expr(String),
}

impl Literal {
    /// Raw expression text, inserted without quoting.
    #[must_use]
    pub fn expr(text: impl Into<String>) -> Self {
        Self::Expr(text.into())
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => write!(f, "\"{}\"", escape(s)),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) if x.is_infinite() => {
                f.write_str(if x.is_sign_negative() { "-Infinity" } else { "Infinity" })
            }
            // Debug keeps the fractional part: 3.0 stays "3.0".
            Self::Float(x) => write!(f, "{x:?}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Null => f.write_str("null"),
            Self::Expr(e) => f.write_str(e),
        }
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Render arguments as `a1, a2, ...`.
#[must_use]
pub fn join_args(args: &[Literal]) -> String {
    args.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<&str> for Literal {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Literal {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<bool> for Literal {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Literal {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<f32> for Literal {
    fn from(x: f32) -> Self {
        Self::Float(f64::from(x))
    }
}

macro_rules! int_literal {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Literal {
                fn from(i: $t) -> Self {
                    Self::Int(i64::from(i))
                }
            }
        )*
    };
}

int_literal!(i8, i16, i32, i64, u8, u16, u32);

impl TryFrom<&Value> for Literal {
    type Error = BridgeError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value {
            Value::Null => Ok(Self::Null),
            Value::Bool(b) => Ok(Self::Bool(*b)),
            Value::String(s) => Ok(Self::Str(s.clone())),
            Value::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_f64().map(Self::Float))
                .ok_or(BridgeError::UnsupportedOperation(
                    "integer literal out of range",
                )),
            Value::Array(_) | Value::Object(_) => Err(BridgeError::UnsupportedOperation(
                "nested containers have no literal form",
            )),
        }
    }
}
