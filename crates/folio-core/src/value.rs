//! Literal values bound to data instances, table cells and constants.

use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

use crate::identifier::Id;

/// A validated literal value.
///
/// [`fmt::Display`] writes the value back in document syntax, so a printed
/// value parses to an equal value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<Value>),
    /// Object or map literal; keys keep source order.
    Map(IndexMap<String, Value>),
    EnumMember(EnumValue),
}

/// Reference to an enum member, optionally qualified with the enum name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumValue {
    #[serde(rename = "enum")]
    pub enum_name: Option<Id>,
    pub member: Id,
}

impl Value {
    /// Short name of the value's kind, used in type mismatch messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Map(_) => "map",
            Self::EnumMember(_) => "enum member",
        }
    }

    /// Numeric view of int and float values.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Writes `s` as a double-quoted literal with escapes.
pub fn write_quoted(f: &mut impl fmt::Write, s: &str) -> fmt::Result {
    f.write_char('"')?;
    for ch in s.chars() {
        match ch {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            '\0' => f.write_str("\\0")?,
            c if c.is_control() => write!(f, "\\u{{{:x}}}", c as u32)?,
            c => f.write_char(c)?,
        }
    }
    f.write_char('"')
}

/// Returns true if `s` can be written bare as an identifier.
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            // Debug formatting always keeps a fractional part or exponent.
            Self::Float(x) => write!(f, "{x:?}"),
            Self::String(s) => write_quoted(f, s),
            Self::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Map(entries) => {
                if entries.is_empty() {
                    return f.write_str("{}");
                }
                f.write_str("{ ")?;
                for (key, value) in entries {
                    if is_identifier(key) && !matches!(key.as_str(), "true" | "false" | "null") {
                        f.write_str(key)?;
                    } else {
                        write_quoted(f, key)?;
                    }
                    write!(f, " = {value}; ")?;
                }
                f.write_str("}")
            }
            Self::EnumMember(EnumValue { enum_name, member }) => match enum_name {
                Some(name) => write!(f, "{name}::{member}"),
                None => write!(f, "{member}"),
            },
        }
    }
}
