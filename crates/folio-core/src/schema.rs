//! Schema model: type references and the declarations they name.
//!
//! These are the resolved forms produced by the type registry. Every
//! declaration keeps the [`Span`] it was declared at so later stages can
//! point diagnostics back at the source.

use std::fmt;

use regex::Regex;
use serde::Serialize;

use crate::{identifier::Id, span::Span, value::Value};

/// Built-in scalar kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    Int,
    Float,
    String,
    Bool,
    /// Accepts any value.
    Any,
}

impl PrimitiveKind {
    /// Looks up a primitive by its source spelling, including the accepted synonyms.
    ///
    /// # Examples
    ///
    /// ```
    /// use folio_core::schema::PrimitiveKind;
    ///
    /// assert_eq!(PrimitiveKind::from_name("integer"), Some(PrimitiveKind::Int));
    /// assert_eq!(PrimitiveKind::from_name("Point"), None);
    /// ```
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "int" | "integer" | "long" => Some(Self::Int),
            "float" | "number" | "double" => Some(Self::Float),
            "string" => Some(Self::String),
            "bool" | "boolean" => Some(Self::Bool),
            "any" => Some(Self::Any),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::String => "string",
            Self::Bool => "bool",
            Self::Any => "any",
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to a type, as written in a declaration.
///
/// Named references are kept by name; the registry resolves them on lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "of", rename_all = "lowercase")]
pub enum TypeRef {
    Primitive(PrimitiveKind),
    Array(Box<TypeRef>),
    Map(Box<TypeRef>, Box<TypeRef>),
    Optional(Box<TypeRef>),
    Named(Id),
}

impl TypeRef {
    pub fn array(element: TypeRef) -> Self {
        Self::Array(Box::new(element))
    }

    pub fn map(key: TypeRef, value: TypeRef) -> Self {
        Self::Map(Box::new(key), Box::new(value))
    }

    pub fn optional(inner: TypeRef) -> Self {
        match inner {
            already @ Self::Optional(_) => already,
            other => Self::Optional(Box::new(other)),
        }
    }

    /// Calls `f` for every named reference inside this type, outermost first.
    pub fn for_each_named<'a>(&'a self, f: &mut impl FnMut(&'a Id)) {
        match self {
            Self::Primitive(_) => {}
            Self::Array(inner) | Self::Optional(inner) => inner.for_each_named(f),
            Self::Map(key, value) => {
                key.for_each_named(f);
                value.for_each_named(f);
            }
            Self::Named(id) => f(id),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(kind) => write!(f, "{kind}"),
            Self::Array(inner) => write!(f, "array<{inner}>"),
            Self::Map(key, value) => write!(f, "map<{key}, {value}>"),
            Self::Optional(inner) => write!(f, "{inner}?"),
            Self::Named(id) => write!(f, "{id}"),
        }
    }
}

/// Metadata attribute attached to a field, member or declaration: `@name(args)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribute {
    pub name: Id,
    pub args: Vec<Value>,
    #[serde(skip)]
    pub span: Span,
}

impl Attribute {
    /// First argument as a string, if it is one.
    pub fn string_arg(&self) -> Option<&str> {
        match self.args.first() {
            Some(Value::String(s)) => Some(s),
            _ => None,
        }
    }
}

/// Value constraint derived from `@range`, `@length` and `@pattern`
/// attributes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Constraint {
    Range {
        min: Option<f64>,
        max: Option<f64>,
        exclusive_min: bool,
        exclusive_max: bool,
    },
    Length { min: Option<usize>, max: Option<usize> },
    Pattern { pattern: Pattern },
}

impl Constraint {
    /// An inclusive `@range`.
    pub fn range(min: Option<f64>, max: Option<f64>) -> Self {
        Self::Range {
            min,
            max,
            exclusive_min: false,
            exclusive_max: false,
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn bound<T: fmt::Display>(value: &Option<T>) -> String {
            value.as_ref().map_or_else(|| "_".to_string(), T::to_string)
        }
        match self {
            Self::Range {
                min,
                max,
                exclusive_min: false,
                exclusive_max: false,
            } => write!(f, "@range({}, {})", bound(min), bound(max)),
            Self::Range {
                min,
                max,
                exclusive_min,
                exclusive_max,
            } => write!(
                f,
                "@range({}, {}, {exclusive_min}, {exclusive_max})",
                bound(min),
                bound(max)
            ),
            Self::Length { min, max } => write!(f, "@length({}, {})", bound(min), bound(max)),
            Self::Pattern { pattern } => write!(f, "@pattern({:?})", pattern.as_str()),
        }
    }
}

/// A `@pattern` regular expression. It must match the whole string.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    /// # Errors
    ///
    /// Returns the [`regex::Error`] for an invalid expression.
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(&format!(r"\A(?:{source})\z"))?;
        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_full_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Serialize for Pattern {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDef {
    pub name: Id,
    pub ty: TypeRef,
    pub optional: bool,
    pub default: Option<Value>,
    pub constraints: Vec<Constraint>,
    pub attributes: Vec<Attribute>,
    #[serde(skip)]
    pub span: Span,
}

impl FieldDef {
    /// A field must be present in every instance unless it is optional or has a default.
    pub fn is_mandatory(&self) -> bool {
        !self.optional && self.default.is_none()
    }

    /// Text of the `@desc` attribute, if any.
    pub fn description(&self) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.name == "desc")
            .and_then(Attribute::string_arg)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructDef {
    pub name: Id,
    pub fields: Vec<FieldDef>,
    #[serde(skip)]
    pub span: Span,
}

impl StructDef {
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|field| field.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumMember {
    pub name: Id,
    pub attributes: Vec<Attribute>,
    #[serde(skip)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumDef {
    pub name: Id,
    pub members: Vec<EnumMember>,
    #[serde(skip)]
    pub span: Span,
}

impl EnumDef {
    pub fn has_member(&self, name: &str) -> bool {
        self.members.iter().any(|member| member.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AliasDef {
    pub name: Id,
    pub target: TypeRef,
    #[serde(skip)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstDef {
    pub name: Id,
    pub ty: TypeRef,
    pub value: Value,
    #[serde(skip)]
    pub span: Span,
}

/// Any named schema declaration.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "declaration", rename_all = "lowercase")]
pub enum Definition {
    Alias(AliasDef),
    Struct(StructDef),
    Enum(EnumDef),
    Const(ConstDef),
}

impl Definition {
    pub fn name(&self) -> &Id {
        match self {
            Self::Alias(def) => &def.name,
            Self::Struct(def) => &def.name,
            Self::Enum(def) => &def.name,
            Self::Const(def) => &def.name,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Self::Alias(def) => def.span,
            Self::Struct(def) => def.span,
            Self::Enum(def) => def.span,
            Self::Const(def) => def.span,
        }
    }

    /// Declaration keyword, used in messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Alias(_) => "type alias",
            Self::Struct(_) => "struct",
            Self::Enum(_) => "enum",
            Self::Const(_) => "constant",
        }
    }
}
