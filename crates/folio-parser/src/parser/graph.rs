//! Diagram sub-language: `graph [kind] { statement* }`.
//!
//! Keyword statements (`node`, `cluster`, `style`, `let`) only commit once
//! the name after the keyword has been read, so a node that happens to be
//! called `node` can still appear in an edge (`node -> B;`) or as a graph
//! attribute key.

use winnow::{
    Parser,
    combinator::{alt, opt, repeat},
    token::any,
};

use folio_core::span::{Span, Spanned};

use super::{
    Context, IResult, Input, cut_err, identifier, keyword, punct, run, separated_items,
};
use crate::{
    error::Diagnostic,
    parser_types as types,
    tokens::{PositionedToken, Token},
};

/// Parse an attribute value
///
/// - `"text"` → String
/// - `12`, `1.5` → Number
/// - `true` / `false` → Bool
/// - `box` → Ident
/// - `$accent` → Variable
/// - `{ size: 12 }` → Map
fn attr_value<'i, 'src>(input: &mut Input<'i, 'src>) -> IResult<Spanned<types::AttrExpr<'src>>> {
    alt((attr_map, attr_scalar))
        .context(Context::Label("attribute value"))
        .parse_next(input)
}

fn attr_scalar<'i, 'src>(input: &mut Input<'i, 'src>) -> IResult<Spanned<types::AttrExpr<'src>>> {
    any.verify_map(|token: &'i PositionedToken<'src>| {
        let value = match &token.token {
            Token::StringLiteral(s) => types::AttrExpr::String(s.clone()),
            Token::IntLiteral(n) => types::AttrExpr::Number(*n as f64),
            Token::FloatLiteral(x) => types::AttrExpr::Number(*x),
            Token::Identifier("true") => types::AttrExpr::Bool(true),
            Token::Identifier("false") => types::AttrExpr::Bool(false),
            Token::Identifier(name) => types::AttrExpr::Ident(*name),
            Token::Variable(name) => types::AttrExpr::Variable(*name),
            _ => return None,
        };
        Some(Spanned::new(value, token.span))
    })
    .parse_next(input)
}

/// `{ key: value, ... }` nested inside an attribute
fn attr_map<'i, 'src>(input: &mut Input<'i, 'src>) -> IResult<Spanned<types::AttrExpr<'src>>> {
    let open = punct(Token::LeftBrace, "`{`").parse_next(input)?;
    cut_err(input, |input| {
        let entries = separated_items(input, attr_entry)?;
        let close = punct(Token::RightBrace, "`}`").parse_next(input)?;
        Ok(Spanned::new(types::AttrExpr::Map(entries), open.union(close)))
    })
}

/// `key: value` or `key = value`
fn attr_entry<'i, 'src>(input: &mut Input<'i, 'src>) -> IResult<types::AttrEntry<'src>> {
    let key = identifier
        .context(Context::Label("attribute name"))
        .parse_next(input)?;
    cut_err(input, |input| {
        alt((punct(Token::Colon, "`:`"), punct(Token::Equals, "`=`"))).parse_next(input)?;
        let value = attr_value.parse_next(input)?;
        Ok(types::AttrEntry { key, value })
    })
}

/// `{ entries }` or `[ entries ]`
fn attrs<'i, 'src>(input: &mut Input<'i, 'src>) -> IResult<Spanned<Vec<types::AttrEntry<'src>>>> {
    let closing = alt((
        punct(Token::LeftBrace, "`{`").map(|span| (span, Token::RightBrace, "`}`")),
        punct(Token::LeftBracket, "`[`").map(|span| (span, Token::RightBracket, "`]`")),
    ))
    .context(Context::Label("attributes"))
    .parse_next(input)?;
    let (open, close_token, close_label) = closing;

    cut_err(input, |input| {
        let entries = separated_items(input, attr_entry)?;
        let close = punct(close_token, close_label).parse_next(input)?;
        Ok(Spanned::new(entries, open.union(close)))
    })
}

fn optional_semicolon<'i, 'src>(input: &mut Input<'i, 'src>) -> IResult<Option<Span>> {
    opt(punct(Token::Semicolon, "`;`")).parse_next(input)
}

/// `node Name attrs? ;?`
fn node_stmt<'i, 'src>(input: &mut Input<'i, 'src>) -> IResult<types::Statement<'src>> {
    let start = keyword("node").parse_next(input)?;
    let name = identifier.parse_next(input)?;

    cut_err(input, |input| {
        let attrs = opt(attrs).parse_next(input)?;
        let mut span = start.union(name.span());
        if let Some(attrs) = &attrs {
            span = span.union(attrs.span());
        }
        if let Some(end) = optional_semicolon(input)? {
            span = span.union(end);
        }

        Ok(types::Statement::Node {
            name,
            attrs: attrs.map(Spanned::into_inner).unwrap_or_default(),
            span,
        })
    })
}

/// `cluster Name { statement* } ;?`
fn cluster_stmt<'i, 'src>(input: &mut Input<'i, 'src>) -> IResult<types::Statement<'src>> {
    let start = keyword("cluster").parse_next(input)?;
    let name = identifier.parse_next(input)?;

    cut_err(input, |input| {
        punct(Token::LeftBrace, "`{`").parse_next(input)?;
        let statements = statements.parse_next(input)?;
        let close = punct(Token::RightBrace, "`}`").parse_next(input)?;
        let span = optional_semicolon(input)?
            .map_or(start.union(close), |end| start.union(end));

        Ok(types::Statement::Cluster {
            name,
            statements,
            span,
        })
    })
}

/// `style Name attrs ;?`
fn style_stmt<'i, 'src>(input: &mut Input<'i, 'src>) -> IResult<types::Statement<'src>> {
    let start = keyword("style").parse_next(input)?;
    let name = identifier.parse_next(input)?;

    cut_err(input, |input| {
        let attrs = attrs.parse_next(input)?;
        let span = optional_semicolon(input)?
            .map_or(start.union(attrs.span()), |end| start.union(end));

        Ok(types::Statement::Style {
            name,
            attrs: attrs.into_inner(),
            span,
        })
    })
}

/// `let name = value;`
fn let_stmt<'i, 'src>(input: &mut Input<'i, 'src>) -> IResult<types::Statement<'src>> {
    let start = keyword("let").parse_next(input)?;
    let name = identifier.parse_next(input)?;

    cut_err(input, |input| {
        punct(Token::Equals, "`=`").parse_next(input)?;
        let value = attr_value.parse_next(input)?;
        let end = punct(Token::Semicolon, "`;`").parse_next(input)?;

        Ok(types::Statement::Let {
            name,
            value,
            span: start.union(end),
        })
    })
}

/// `key = value;`
fn assign_stmt<'i, 'src>(input: &mut Input<'i, 'src>) -> IResult<types::Statement<'src>> {
    let key = identifier.parse_next(input)?;
    punct(Token::Equals, "`=`").parse_next(input)?;

    cut_err(input, |input| {
        let value = attr_value.parse_next(input)?;
        let end = punct(Token::Semicolon, "`;`").parse_next(input)?;
        let span = key.span().union(end);

        Ok(types::Statement::Assign { key, value, span })
    })
}

fn edge_op<'i, 'src>(input: &mut Input<'i, 'src>) -> IResult<types::EdgeHop> {
    any.verify_map(|token: &'i PositionedToken<'src>| match token.token {
        Token::Arrow => Some(types::EdgeHop {
            directed: true,
            span: token.span,
        }),
        Token::Line => Some(types::EdgeHop {
            directed: false,
            span: token.span,
        }),
        _ => None,
    })
    .context(Context::Label("`->` or `--`"))
    .parse_next(input)
}

/// `(name:)? A -> B -- C attrs? ;`
fn edge_stmt<'i, 'src>(input: &mut Input<'i, 'src>) -> IResult<types::Statement<'src>> {
    let name = opt((identifier, punct(Token::Colon, "`:`")).map(|(name, _)| name))
        .parse_next(input)?;
    let first = identifier.parse_next(input)?;
    let first_hop = edge_op.parse_next(input)?;

    cut_err(input, |input| {
        let mut chain = vec![first];
        let mut hops = vec![first_hop];
        chain.push(
            identifier
                .context(Context::Label("edge target"))
                .parse_next(input)?,
        );

        while let Some(hop) = opt(edge_op).parse_next(input)? {
            hops.push(hop);
            chain.push(
                identifier
                    .context(Context::Label("edge target"))
                    .parse_next(input)?,
            );
        }

        let attrs = opt(attrs).parse_next(input)?;
        let end = punct(Token::Semicolon, "`;`").parse_next(input)?;
        let start = name.as_ref().map_or(chain[0].span(), |name| name.span());

        Ok(types::Statement::Edge {
            name,
            chain,
            hops,
            attrs: attrs.map(Spanned::into_inner).unwrap_or_default(),
            span: start.union(end),
        })
    })
}

fn statement<'i, 'src>(input: &mut Input<'i, 'src>) -> IResult<types::Statement<'src>> {
    alt((
        node_stmt,
        cluster_stmt,
        style_stmt,
        let_stmt,
        assign_stmt,
        edge_stmt,
    ))
    .context(Context::Label("statement"))
    .parse_next(input)
}

fn statements<'i, 'src>(input: &mut Input<'i, 'src>) -> IResult<Vec<types::Statement<'src>>> {
    repeat(0.., statement).parse_next(input)
}

/// `graph kind? { statement* } ;?`
fn graph_decl<'i, 'src>(input: &mut Input<'i, 'src>) -> IResult<types::GraphDecl<'src>> {
    let start = keyword("graph").parse_next(input)?;
    cut_err(input, |input| {
        let kind = opt(identifier).parse_next(input)?;
        punct(Token::LeftBrace, "`{`").parse_next(input)?;
        let statements = statements.parse_next(input)?;
        let close = punct(Token::RightBrace, "`}`").parse_next(input)?;
        opt(punct(Token::Semicolon, "`;`")).parse_next(input)?;

        Ok(types::GraphDecl {
            kind,
            statements,
            span: start.union(close),
        })
    })
}

/// Parse a `graph` block into its statement tree.
pub fn parse_graph<'i, 'src>(
    tokens: &'i [PositionedToken<'src>],
) -> Result<types::GraphDecl<'src>, Diagnostic> {
    run(tokens, graph_decl)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::ErrorCode, lexer::tokenize, parser::significant};

    fn parse(input: &str) -> Result<types::GraphDecl<'_>, Diagnostic> {
        let tokens = significant(tokenize(input, 0).expect("Failed to tokenize input"));
        parse_graph(&tokens)
    }

    #[test]
    fn test_minimal_graph() {
        let graph = parse("graph { }").unwrap();
        assert!(graph.kind.is_none());
        assert!(graph.statements.is_empty());

        let graph = parse("graph flowchart {}").unwrap();
        assert_eq!(graph.kind.map(|k| *k.inner()), Some("flowchart"));
    }

    #[test]
    fn test_statements() {
        let graph = parse(
            r#"graph {
                rankdir = LR;
                let accent = "red";
                style Warn { color: $accent, style: dashed }
                node A { label: "Start", font: { size: 12; weight: bold } };
                node B [shape: box]
                cluster Core {
                    label = "core";
                    node C;
                }
                e1: A -> B -- C [style: Warn];
            }"#,
        )
        .unwrap();

        let kinds: Vec<&str> = graph
            .statements
            .iter()
            .map(|stmt| match stmt {
                types::Statement::Node { .. } => "node",
                types::Statement::Edge { .. } => "edge",
                types::Statement::Cluster { .. } => "cluster",
                types::Statement::Style { .. } => "style",
                types::Statement::Let { .. } => "let",
                types::Statement::Assign { .. } => "assign",
            })
            .collect();
        assert_eq!(
            kinds,
            vec!["assign", "let", "style", "node", "node", "cluster", "edge"]
        );

        let types::Statement::Edge {
            name, chain, hops, attrs, ..
        } = &graph.statements[6]
        else {
            panic!("expected edge");
        };
        assert_eq!(name.as_ref().map(|n| *n.inner()), Some("e1"));
        assert_eq!(chain.len(), 3);
        assert!(hops[0].directed);
        assert!(!hops[1].directed);
        assert_eq!(attrs.len(), 1);

        let types::Statement::Node { attrs, .. } = &graph.statements[3] else {
            panic!("expected node");
        };
        assert!(matches!(attrs[1].value.inner(), types::AttrExpr::Map(entries) if entries.len() == 2));
    }

    #[test]
    fn test_keywords_as_node_names() {
        let graph = parse("graph { node node; node -> style; }").unwrap();
        assert_eq!(graph.statements.len(), 2);
        assert!(matches!(
            &graph.statements[1],
            types::Statement::Edge { chain, .. } if *chain[1].inner() == "style"
        ));
    }

    #[test]
    fn test_edge_missing_target() {
        let err = parse("graph { A -> ; }").unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::E100));
        assert!(err.message().contains("`;`"), "{}", err.message());
    }

    #[test]
    fn test_unclosed_graph() {
        let err = parse("graph { node A;").unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::E101));
    }

    #[test]
    fn test_numbers_and_variables() {
        let graph = parse("graph { A -> B { penwidth: 2, color: $c }; }").unwrap();
        let types::Statement::Edge { attrs, .. } = &graph.statements[0] else {
            panic!("expected edge");
        };
        assert_eq!(*attrs[0].value.inner(), types::AttrExpr::Number(2.0));
        assert_eq!(*attrs[1].value.inner(), types::AttrExpr::Variable("c"));
    }
}
