//! Syntax tree produced by the block parsers.
//!
//! Nodes borrow identifier text from the source and keep the span of every
//! name and value so the registry, binder and diagram builder can point
//! their diagnostics at the exact construct.

use folio_core::{
    identifier::Id,
    schema::{PrimitiveKind, TypeRef},
    span::{Span, Spanned},
};

/// A type expression as written.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr<'src> {
    /// A primitive spelling or a declared type name.
    Named(Spanned<&'src str>),
    Array(Box<Spanned<TypeExpr<'src>>>),
    Map(Box<Spanned<TypeExpr<'src>>>, Box<Spanned<TypeExpr<'src>>>),
    Optional(Box<Spanned<TypeExpr<'src>>>),
}

impl<'src> TypeExpr<'src> {
    /// Convert to the model form. Primitive spellings become
    /// [`TypeRef::Primitive`]; other names stay unresolved.
    pub fn to_type_ref(&self) -> TypeRef {
        match self {
            TypeExpr::Named(name) => PrimitiveKind::from_name(name.inner())
                .map(TypeRef::Primitive)
                .unwrap_or_else(|| TypeRef::Named(Id::new(*name.inner()))),
            TypeExpr::Array(inner) => TypeRef::array(inner.to_type_ref()),
            TypeExpr::Map(key, value) => TypeRef::map(key.to_type_ref(), value.to_type_ref()),
            TypeExpr::Optional(inner) => TypeRef::optional(inner.to_type_ref()),
        }
    }

    /// Every non-primitive name in the expression, with its span.
    pub fn named_refs(&self) -> Vec<Spanned<&'src str>> {
        let mut refs = Vec::new();
        self.collect_named(&mut refs);
        refs
    }

    fn collect_named(&self, refs: &mut Vec<Spanned<&'src str>>) {
        match self {
            TypeExpr::Named(name) => {
                if PrimitiveKind::from_name(name.inner()).is_none() {
                    refs.push(name.clone());
                }
            }
            TypeExpr::Array(inner) | TypeExpr::Optional(inner) => inner.collect_named(refs),
            TypeExpr::Map(key, value) => {
                key.collect_named(refs);
                value.collect_named(refs);
            }
        }
    }
}

/// A literal value before it is checked against a type.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal<'src> {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<Spanned<Literal<'src>>>),
    /// `{ key = value; ... }`, in source order; duplicates are kept for
    /// the binder to report.
    Map(Vec<MapEntry<'src>>),
    /// Bare `MEMBER` or qualified `Enum::MEMBER`.
    Member {
        enum_name: Option<Spanned<&'src str>>,
        member: Spanned<&'src str>,
    },
}

impl Literal<'_> {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Literal::Null => "null",
            Literal::Bool(_) => "bool",
            Literal::Int(_) => "int",
            Literal::Float(_) => "float",
            Literal::String(_) => "string",
            Literal::Array(_) => "array",
            Literal::Map(_) => "map",
            Literal::Member { .. } => "enum member",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapEntry<'src> {
    pub key: Spanned<String>,
    pub value: Spanned<Literal<'src>>,
}

/// `@name(args)` metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct MetaAttr<'src> {
    pub name: Spanned<&'src str>,
    pub args: Vec<Spanned<Literal<'src>>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl<'src> {
    pub name: Spanned<&'src str>,
    pub ty: Spanned<TypeExpr<'src>>,
    /// Written with a trailing `?` on the field type.
    pub optional: bool,
    pub attrs: Vec<MetaAttr<'src>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructDecl<'src> {
    pub name: Spanned<&'src str>,
    pub fields: Vec<FieldDecl<'src>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemberDecl<'src> {
    pub name: Spanned<&'src str>,
    pub attrs: Vec<MetaAttr<'src>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumDecl<'src> {
    pub name: Spanned<&'src str>,
    pub members: Vec<MemberDecl<'src>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AliasDecl<'src> {
    pub name: Spanned<&'src str>,
    pub target: Spanned<TypeExpr<'src>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstDecl<'src> {
    pub name: Spanned<&'src str>,
    pub ty: Spanned<TypeExpr<'src>>,
    pub value: Spanned<Literal<'src>>,
    pub span: Span,
}

/// Any schema declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum Declaration<'src> {
    Alias(AliasDecl<'src>),
    Struct(StructDecl<'src>),
    Enum(EnumDecl<'src>),
    Const(ConstDecl<'src>),
}

impl<'src> Declaration<'src> {
    pub fn name(&self) -> &Spanned<&'src str> {
        match self {
            Declaration::Alias(decl) => &decl.name,
            Declaration::Struct(decl) => &decl.name,
            Declaration::Enum(decl) => &decl.name,
            Declaration::Const(decl) => &decl.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldAssign<'src> {
    pub name: Spanned<&'src str>,
    pub value: Spanned<Literal<'src>>,
}

/// `data Type name { field = value; ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct DataDecl<'src> {
    pub type_name: Spanned<&'src str>,
    pub name: Spanned<&'src str>,
    pub fields: Vec<FieldAssign<'src>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDecl<'src> {
    pub name: Spanned<&'src str>,
    pub ty: Spanned<TypeExpr<'src>>,
}

/// `table Name { col: Type; ... } = [ [..], ... ];`
#[derive(Debug, Clone, PartialEq)]
pub struct TableDecl<'src> {
    pub name: Spanned<&'src str>,
    pub columns: Vec<ColumnDecl<'src>>,
    pub rows: Vec<Spanned<Vec<Spanned<Literal<'src>>>>>,
    pub span: Span,
}

// Diagram grammar

/// Right-hand side of a diagram attribute, `let` or graph assignment.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrExpr<'src> {
    String(String),
    Number(f64),
    Bool(bool),
    Ident(&'src str),
    Variable(&'src str),
    Map(Vec<AttrEntry<'src>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttrEntry<'src> {
    pub key: Spanned<&'src str>,
    pub value: Spanned<AttrExpr<'src>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EdgeHop {
    /// `->` when true, `--` otherwise.
    pub directed: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement<'src> {
    Node {
        name: Spanned<&'src str>,
        attrs: Vec<AttrEntry<'src>>,
        span: Span,
    },
    /// `A -> B -- C [attrs];`: `hops[i]` joins `chain[i]` and `chain[i + 1]`.
    Edge {
        name: Option<Spanned<&'src str>>,
        chain: Vec<Spanned<&'src str>>,
        hops: Vec<EdgeHop>,
        attrs: Vec<AttrEntry<'src>>,
        span: Span,
    },
    Cluster {
        name: Spanned<&'src str>,
        statements: Vec<Statement<'src>>,
        span: Span,
    },
    Style {
        name: Spanned<&'src str>,
        attrs: Vec<AttrEntry<'src>>,
        span: Span,
    },
    Let {
        name: Spanned<&'src str>,
        value: Spanned<AttrExpr<'src>>,
        span: Span,
    },
    /// `key = value;` at graph or cluster level.
    Assign {
        key: Spanned<&'src str>,
        value: Spanned<AttrExpr<'src>>,
        span: Span,
    },
}

impl Statement<'_> {
    pub fn span(&self) -> Span {
        match self {
            Statement::Node { span, .. }
            | Statement::Edge { span, .. }
            | Statement::Cluster { span, .. }
            | Statement::Style { span, .. }
            | Statement::Let { span, .. }
            | Statement::Assign { span, .. } => *span,
        }
    }
}

/// `graph [kind] { statements }`
#[derive(Debug, Clone, PartialEq)]
pub struct GraphDecl<'src> {
    pub kind: Option<Spanned<&'src str>>,
    pub statements: Vec<Statement<'src>>,
    pub span: Span,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> Spanned<TypeExpr<'_>> {
        Spanned::new(TypeExpr::Named(Spanned::new(name, Span::default())), Span::default())
    }

    #[test]
    fn test_to_type_ref_maps_primitives() {
        let expr = TypeExpr::Map(Box::new(named("string")), Box::new(named("Point")));
        assert_eq!(expr.to_type_ref().to_string(), "map<string, Point>");

        let expr = TypeExpr::Array(Box::new(named("integer")));
        assert_eq!(expr.to_type_ref().to_string(), "array<int>");
    }

    #[test]
    fn test_named_refs_skip_primitives() {
        let expr = TypeExpr::Map(
            Box::new(named("Status")),
            Box::new(Spanned::new(
                TypeExpr::Optional(Box::new(named("float"))),
                Span::default(),
            )),
        );
        let refs: Vec<&str> = expr.named_refs().iter().map(|r| *r.inner()).collect();
        assert_eq!(refs, vec!["Status"]);
    }
}
