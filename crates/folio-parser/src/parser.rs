//! Parsers for block bodies.
//!
//! Each block is tokenized on its own and parsed from a token slice with
//! trivia already removed, so the grammars below never deal with
//! whitespace or comments. The public entry points are
//! [`parse_declaration`], [`parse_data`], [`parse_table`] and
//! [`parse_graph`]; each one requires the whole block to be consumed.

mod graph;

pub use graph::parse_graph;

use winnow::{
    Parser,
    combinator::{alt, opt, repeat, separated},
    error::{ContextError, ErrMode},
    stream::{Stream, TokenSlice},
    token::any,
};

use folio_core::span::{Span, Spanned};

use crate::{
    error::{Diagnostic, ErrorCode},
    parser_types as types,
    tokens::{PositionedToken, Token},
};

/// Context type for parser errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Context {
    /// Description of what is currently being parsed
    Label(&'static str),
    /// Remaining token count (`eof_offset()`) where a committed construct began
    StartOffset(usize),
}

type Input<'i, 'src> = TokenSlice<'i, PositionedToken<'src>>;
type IResult<O> = std::result::Result<O, ErrMode<ContextError<Context>>>;

/// Drop whitespace and comments; block grammars are insensitive to them.
pub fn significant(tokens: Vec<PositionedToken<'_>>) -> Vec<PositionedToken<'_>> {
    tokens.into_iter().filter(|t| !t.is_trivia()).collect()
}

/// Commit to the construct parsed by `f`: any failure becomes a cut error
/// that remembers where the construct started.
fn cut_err<'i, 'src, O, F>(input: &mut Input<'i, 'src>, f: F) -> IResult<O>
where
    F: FnOnce(&mut Input<'i, 'src>) -> IResult<O>,
{
    let start_remaining = input.eof_offset();

    match f(input) {
        Ok(o) => Ok(o),
        Err(ErrMode::Backtrack(mut e)) | Err(ErrMode::Cut(mut e)) => {
            e.push(Context::StartOffset(start_remaining));
            Err(ErrMode::Cut(e))
        }
        Err(e) => Err(e),
    }
}

fn cut_error_with_offset(input: &Input<'_, '_>) -> ErrMode<ContextError<Context>> {
    let mut e = ContextError::new();
    e.push(Context::StartOffset(input.eof_offset()));
    ErrMode::Cut(e)
}

/// Parse one exact punctuation token and return its span.
fn punct<'i, 'src: 'i>(
    expected: Token<'static>,
    label: &'static str,
) -> impl FnMut(&mut Input<'i, 'src>) -> IResult<Span> {
    move |input: &mut Input<'i, 'src>| {
        any.verify_map(|token: &'i PositionedToken<'src>| {
            (token.token == expected).then_some(token.span)
        })
        .context(Context::Label(label))
        .parse_next(input)
    }
}

/// Parse an identifier spelled `word`.
fn keyword<'i, 'src: 'i>(word: &'static str) -> impl FnMut(&mut Input<'i, 'src>) -> IResult<Span> {
    move |input: &mut Input<'i, 'src>| {
        any.verify_map(|token: &'i PositionedToken<'src>| {
            token.is_word(word).then_some(token.span)
        })
        .context(Context::Label(word))
        .parse_next(input)
    }
}

/// True if the next token is `expected`, without consuming it.
fn peek_is(input: &Input<'_, '_>, expected: &Token<'_>) -> bool {
    input
        .peek_token()
        .is_some_and(|token| token.token == *expected)
}

/// Parse `;` or `,`
fn separator<'i, 'src>(input: &mut Input<'i, 'src>) -> IResult<Span> {
    any.verify_map(|token: &'i PositionedToken<'src>| {
        matches!(token.token, Token::Semicolon | Token::Comma).then_some(token.span)
    })
    .context(Context::Label("`;` or `,`"))
    .parse_next(input)
}

/// Items separated by `;` or `,`, with an optional trailing separator.
fn separated_items<'i, 'src, O, P>(input: &mut Input<'i, 'src>, item: P) -> IResult<Vec<O>>
where
    P: Parser<Input<'i, 'src>, O, ErrMode<ContextError<Context>>>,
{
    let items: Vec<O> = separated(0.., item, separator).parse_next(input)?;
    opt(separator).parse_next(input)?;
    Ok(items)
}

fn identifier<'i, 'src>(input: &mut Input<'i, 'src>) -> IResult<Spanned<&'src str>> {
    any.verify_map(|token: &'i PositionedToken<'src>| match token.token {
        Token::Identifier(name) => Some(Spanned::new(name, token.span)),
        _ => None,
    })
    .context(Context::Label("identifier"))
    .parse_next(input)
}

fn string_literal<'i, 'src>(input: &mut Input<'i, 'src>) -> IResult<Spanned<String>> {
    any.verify_map(|token: &'i PositionedToken<'src>| match &token.token {
        Token::StringLiteral(s) => Some(Spanned::new(s.clone(), token.span)),
        _ => None,
    })
    .context(Context::Label("string literal"))
    .parse_next(input)
}

// Values

fn scalar_literal<'i, 'src>(input: &mut Input<'i, 'src>) -> IResult<Spanned<types::Literal<'src>>> {
    any.verify_map(|token: &'i PositionedToken<'src>| {
        let literal = match &token.token {
            Token::StringLiteral(s) => types::Literal::String(s.clone()),
            Token::IntLiteral(n) => types::Literal::Int(*n),
            Token::FloatLiteral(x) => types::Literal::Float(*x),
            _ => return None,
        };
        Some(Spanned::new(literal, token.span))
    })
    .parse_next(input)
}

/// `true`, `false`, `null`, `MEMBER` or `Enum::MEMBER`
fn word_literal<'i, 'src>(input: &mut Input<'i, 'src>) -> IResult<Spanned<types::Literal<'src>>> {
    let first = identifier.parse_next(input)?;
    let span = first.span();

    match *first.inner() {
        "true" => return Ok(Spanned::new(types::Literal::Bool(true), span)),
        "false" => return Ok(Spanned::new(types::Literal::Bool(false), span)),
        "null" => return Ok(Spanned::new(types::Literal::Null, span)),
        _ => {}
    }

    if opt(punct(Token::DoubleColon, "`::`"))
        .parse_next(input)?
        .is_some()
    {
        let member = cut_err(input, |input| {
            identifier
                .context(Context::Label("enum member"))
                .parse_next(input)
        })?;
        let span = span.union(member.span());
        return Ok(Spanned::new(
            types::Literal::Member {
                enum_name: Some(first),
                member,
            },
            span,
        ));
    }

    Ok(Spanned::new(
        types::Literal::Member {
            enum_name: None,
            member: first,
        },
        span,
    ))
}

/// `[a, b, c]`, trailing comma allowed
fn array_literal<'i, 'src>(input: &mut Input<'i, 'src>) -> IResult<Spanned<types::Literal<'src>>> {
    let open = punct(Token::LeftBracket, "`[`").parse_next(input)?;
    cut_err(input, |input| {
        let items: Vec<Spanned<types::Literal<'src>>> =
            separated(0.., literal, punct(Token::Comma, "`,`")).parse_next(input)?;
        opt(punct(Token::Comma, "`,`")).parse_next(input)?;
        let close = punct(Token::RightBracket, "`]`").parse_next(input)?;
        Ok(Spanned::new(types::Literal::Array(items), open.union(close)))
    })
}

fn map_key<'i, 'src>(input: &mut Input<'i, 'src>) -> IResult<Spanned<String>> {
    alt((
        identifier.map(|key: Spanned<&'src str>| key.map(String::from)),
        string_literal,
    ))
    .context(Context::Label("key"))
    .parse_next(input)
}

fn map_entry<'i, 'src>(input: &mut Input<'i, 'src>) -> IResult<types::MapEntry<'src>> {
    let key = map_key.parse_next(input)?;
    cut_err(input, |input| {
        alt((
            punct(Token::Equals, "`=`"),
            punct(Token::Colon, "`:`"),
        ))
        .parse_next(input)?;
        let value = literal.parse_next(input)?;
        Ok(types::MapEntry { key, value })
    })
}

/// `{ key = value; ... }`
fn map_literal<'i, 'src>(input: &mut Input<'i, 'src>) -> IResult<Spanned<types::Literal<'src>>> {
    let open = punct(Token::LeftBrace, "`{`").parse_next(input)?;
    cut_err(input, |input| {
        let entries = separated_items(input, map_entry)?;
        let close = punct(Token::RightBrace, "`}`").parse_next(input)?;
        Ok(Spanned::new(types::Literal::Map(entries), open.union(close)))
    })
}

/// Parse any literal value
fn literal<'i, 'src>(input: &mut Input<'i, 'src>) -> IResult<Spanned<types::Literal<'src>>> {
    alt((array_literal, map_literal, word_literal, scalar_literal))
        .context(Context::Label("value"))
        .parse_next(input)
}

// Types

/// `[T]`
fn bracket_array_type<'i, 'src>(
    input: &mut Input<'i, 'src>,
) -> IResult<Spanned<types::TypeExpr<'src>>> {
    let open = punct(Token::LeftBracket, "`[`").parse_next(input)?;
    cut_err(input, |input| {
        let element = type_expr.parse_next(input)?;
        let close = punct(Token::RightBracket, "`]`").parse_next(input)?;
        Ok(Spanned::new(
            types::TypeExpr::Array(Box::new(element)),
            open.union(close),
        ))
    })
}

/// `Name`, `array<T>`, `map<K, V>` or `map[K, V]`
fn named_or_generic_type<'i, 'src>(
    input: &mut Input<'i, 'src>,
) -> IResult<Spanned<types::TypeExpr<'src>>> {
    let name = identifier.parse_next(input)?;
    let start = name.span();

    match *name.inner() {
        "array" if peek_is(input, &Token::LeftAngle) => cut_err(input, |input| {
            punct(Token::LeftAngle, "`<`").parse_next(input)?;
            let element = type_expr.parse_next(input)?;
            let close = punct(Token::RightAngle, "`>`").parse_next(input)?;
            Ok(Spanned::new(
                types::TypeExpr::Array(Box::new(element)),
                start.union(close),
            ))
        }),
        "map" if peek_is(input, &Token::LeftAngle) || peek_is(input, &Token::LeftBracket) => {
            cut_err(input, |input| {
                let closing = alt((
                    punct(Token::LeftAngle, "`<`").value(Token::RightAngle),
                    punct(Token::LeftBracket, "`[`").value(Token::RightBracket),
                ))
                .parse_next(input)?;
                let key = type_expr.parse_next(input)?;
                punct(Token::Comma, "`,`").parse_next(input)?;
                let value = type_expr.parse_next(input)?;
                let label = if closing == Token::RightAngle { "`>`" } else { "`]`" };
                let close = punct(closing, label).parse_next(input)?;
                Ok(Spanned::new(
                    types::TypeExpr::Map(Box::new(key), Box::new(value)),
                    start.union(close),
                ))
            })
        }
        _ => Ok(Spanned::new(types::TypeExpr::Named(name), start)),
    }
}

/// Parse a type expression with any number of `?` suffixes
fn type_expr<'i, 'src>(input: &mut Input<'i, 'src>) -> IResult<Spanned<types::TypeExpr<'src>>> {
    let mut ty = alt((bracket_array_type, named_or_generic_type))
        .context(Context::Label("type"))
        .parse_next(input)?;

    while let Some(question) = opt(punct(Token::Question, "`?`")).parse_next(input)? {
        let span = ty.span().union(question);
        ty = Spanned::new(types::TypeExpr::Optional(Box::new(ty)), span);
    }
    Ok(ty)
}

// Metadata attributes

/// `@name` or `@name(arg, ...)`
fn meta_attr<'i, 'src>(input: &mut Input<'i, 'src>) -> IResult<types::MetaAttr<'src>> {
    let at = punct(Token::At, "`@`").parse_next(input)?;
    cut_err(input, |input| {
        let name = identifier
            .context(Context::Label("attribute name"))
            .parse_next(input)?;
        let mut span = at.union(name.span());

        let mut args = Vec::new();
        if opt(punct(Token::LeftParen, "`(`"))
            .parse_next(input)?
            .is_some()
        {
            args = separated(0.., literal, punct(Token::Comma, "`,`")).parse_next(input)?;
            let close = punct(Token::RightParen, "`)`").parse_next(input)?;
            span = span.union(close);
        }

        Ok(types::MetaAttr { name, args, span })
    })
}

fn meta_attrs<'i, 'src>(input: &mut Input<'i, 'src>) -> IResult<Vec<types::MetaAttr<'src>>> {
    repeat(0.., meta_attr).parse_next(input)
}

// Declarations

/// `[@attr...] name: Type [@attr...]`
fn field_decl<'i, 'src>(input: &mut Input<'i, 'src>) -> IResult<types::FieldDecl<'src>> {
    let mut attrs = meta_attrs.parse_next(input)?;
    let name = identifier.parse_next(input)?;

    cut_err(input, |input| {
        punct(Token::Colon, "`:`").parse_next(input)?;
        let mut ty = type_expr
            .context(Context::Label("field type"))
            .parse_next(input)?;
        attrs.extend(meta_attrs.parse_next(input)?);

        let mut span = name.span().union(ty.span());
        if let Some(last) = attrs.last() {
            span = span.union(last.span);
        }

        // A `?` on the field itself marks it optional rather than wrapping its type.
        let mut optional = false;
        while let types::TypeExpr::Optional(inner) = ty.inner() {
            let inner = (**inner).clone();
            ty = inner;
            optional = true;
        }

        Ok(types::FieldDecl {
            name,
            ty,
            optional,
            attrs,
            span,
        })
    })
}

/// `struct Name { field; ... }`
fn struct_decl<'i, 'src>(input: &mut Input<'i, 'src>) -> IResult<types::StructDecl<'src>> {
    let start = keyword("struct").parse_next(input)?;
    cut_err(input, |input| {
        let name = identifier
            .context(Context::Label("struct name"))
            .parse_next(input)?;
        punct(Token::LeftBrace, "`{`").parse_next(input)?;
        let fields = separated_items(input, field_decl)?;
        let close = punct(Token::RightBrace, "`}`").parse_next(input)?;
        opt(punct(Token::Semicolon, "`;`")).parse_next(input)?;

        Ok(types::StructDecl {
            name,
            fields,
            span: start.union(close),
        })
    })
}

fn enum_member<'i, 'src>(input: &mut Input<'i, 'src>) -> IResult<types::MemberDecl<'src>> {
    let name = identifier.parse_next(input)?;
    let attrs = meta_attrs.parse_next(input)?;
    let span = attrs
        .last()
        .map_or(name.span(), |last| name.span().union(last.span));
    Ok(types::MemberDecl { name, attrs, span })
}

/// `enum Name { A; B @desc("..."); }`
fn enum_decl<'i, 'src>(input: &mut Input<'i, 'src>) -> IResult<types::EnumDecl<'src>> {
    let start = keyword("enum").parse_next(input)?;
    cut_err(input, |input| {
        let name = identifier
            .context(Context::Label("enum name"))
            .parse_next(input)?;
        punct(Token::LeftBrace, "`{`").parse_next(input)?;
        let members = separated_items(input, enum_member)?;
        let close = punct(Token::RightBrace, "`}`").parse_next(input)?;
        opt(punct(Token::Semicolon, "`;`")).parse_next(input)?;

        Ok(types::EnumDecl {
            name,
            members,
            span: start.union(close),
        })
    })
}

/// `type Name = Type;`
fn alias_decl<'i, 'src>(input: &mut Input<'i, 'src>) -> IResult<types::AliasDecl<'src>> {
    let start = keyword("type").parse_next(input)?;
    cut_err(input, |input| {
        let name = identifier
            .context(Context::Label("type name"))
            .parse_next(input)?;
        punct(Token::Equals, "`=`").parse_next(input)?;
        let target = type_expr.parse_next(input)?;
        let end = punct(Token::Semicolon, "`;`").parse_next(input)?;

        Ok(types::AliasDecl {
            name,
            target,
            span: start.union(end),
        })
    })
}

/// `const NAME: Type = value;`
fn const_decl<'i, 'src>(input: &mut Input<'i, 'src>) -> IResult<types::ConstDecl<'src>> {
    let start = keyword("const").parse_next(input)?;
    cut_err(input, |input| {
        let name = identifier
            .context(Context::Label("constant name"))
            .parse_next(input)?;
        punct(Token::Colon, "`:`").parse_next(input)?;
        let ty = type_expr.parse_next(input)?;
        punct(Token::Equals, "`=`").parse_next(input)?;
        let value = literal.parse_next(input)?;
        let end = punct(Token::Semicolon, "`;`").parse_next(input)?;

        Ok(types::ConstDecl {
            name,
            ty,
            value,
            span: start.union(end),
        })
    })
}

fn declaration<'i, 'src>(input: &mut Input<'i, 'src>) -> IResult<types::Declaration<'src>> {
    alt((
        alias_decl.map(types::Declaration::Alias),
        struct_decl.map(types::Declaration::Struct),
        enum_decl.map(types::Declaration::Enum),
        const_decl.map(types::Declaration::Const),
    ))
    .context(Context::Label("declaration"))
    .parse_next(input)
}

fn field_assign<'i, 'src>(input: &mut Input<'i, 'src>) -> IResult<types::FieldAssign<'src>> {
    let name = identifier.parse_next(input)?;
    cut_err(input, |input| {
        alt((
            punct(Token::Equals, "`=`"),
            punct(Token::Colon, "`:`"),
        ))
        .parse_next(input)?;
        let value = literal.parse_next(input)?;
        Ok(types::FieldAssign { name, value })
    })
}

/// `data Type name { field = value; ... }`
fn data_decl<'i, 'src>(input: &mut Input<'i, 'src>) -> IResult<types::DataDecl<'src>> {
    let start = keyword("data").parse_next(input)?;
    cut_err(input, |input| {
        let type_name = identifier
            .context(Context::Label("struct name"))
            .parse_next(input)?;
        let name = identifier
            .context(Context::Label("instance name"))
            .parse_next(input)?;
        punct(Token::LeftBrace, "`{`").parse_next(input)?;
        let fields = separated_items(input, field_assign)?;
        let close = punct(Token::RightBrace, "`}`").parse_next(input)?;
        opt(punct(Token::Semicolon, "`;`")).parse_next(input)?;

        Ok(types::DataDecl {
            type_name,
            name,
            fields,
            span: start.union(close),
        })
    })
}

fn column_decl<'i, 'src>(input: &mut Input<'i, 'src>) -> IResult<types::ColumnDecl<'src>> {
    let name = identifier.parse_next(input)?;
    cut_err(input, |input| {
        punct(Token::Colon, "`:`").parse_next(input)?;
        let ty = type_expr
            .context(Context::Label("column type"))
            .parse_next(input)?;
        Ok(types::ColumnDecl { name, ty })
    })
}

/// `[v, ...]`
fn table_row<'i, 'src>(
    input: &mut Input<'i, 'src>,
) -> IResult<Spanned<Vec<Spanned<types::Literal<'src>>>>> {
    array_literal
        .verify_map(|row: Spanned<types::Literal<'src>>| {
            let span = row.span();
            match row.into_inner() {
                types::Literal::Array(cells) => Some(Spanned::new(cells, span)),
                _ => None,
            }
        })
        .context(Context::Label("table row"))
        .parse_next(input)
}

/// `table Name { col: Type; ... } = [ [...], ... ];`
fn table_decl<'i, 'src>(input: &mut Input<'i, 'src>) -> IResult<types::TableDecl<'src>> {
    let start = keyword("table").parse_next(input)?;
    cut_err(input, |input| {
        let name = identifier
            .context(Context::Label("table name"))
            .parse_next(input)?;
        punct(Token::LeftBrace, "`{`").parse_next(input)?;
        let columns = separated_items(input, column_decl)?;
        punct(Token::RightBrace, "`}`").parse_next(input)?;
        punct(Token::Equals, "`=`").parse_next(input)?;
        punct(Token::LeftBracket, "`[`").parse_next(input)?;
        let rows: Vec<Spanned<Vec<Spanned<types::Literal<'src>>>>> =
            separated(0.., table_row, punct(Token::Comma, "`,`")).parse_next(input)?;
        opt(punct(Token::Comma, "`,`")).parse_next(input)?;
        punct(Token::RightBracket, "`]`").parse_next(input)?;
        let end = punct(Token::Semicolon, "`;`").parse_next(input)?;

        Ok(types::TableDecl {
            name,
            columns,
            rows,
            span: start.union(end),
        })
    })
}

/// Convert winnow errors to a [`Diagnostic`].
///
/// The failing token gets the primary label. When the error happened inside
/// a committed construct, the construct's tokens up to the failure get a
/// secondary label.
fn convert_error(
    error: ErrMode<ContextError<Context>>,
    tokens: &[PositionedToken<'_>],
    current_remaining: usize,
) -> Diagnostic {
    let context = match error {
        ErrMode::Backtrack(e) | ErrMode::Cut(e) => e,
        ErrMode::Incomplete(_) => ContextError::new(),
    };

    let start_remaining = context.context().find_map(|ctx| match ctx {
        Context::StartOffset(n) => Some(*n),
        Context::Label(_) => None,
    });
    let labels: Vec<&str> = context
        .context()
        .filter_map(|ctx| match ctx {
            Context::Label(label) => Some(*label),
            Context::StartOffset(_) => None,
        })
        .collect();
    let expected = if labels.is_empty() {
        String::new()
    } else {
        format!(": expected {}", labels.join(" → "))
    };

    let end_offset = tokens.len().saturating_sub(current_remaining);
    let start_offset = start_remaining.map(|r| tokens.len().saturating_sub(r));

    let Some(found) = tokens.get(end_offset) else {
        let span = tokens.last().map(|t| t.span).unwrap_or_default();
        return Diagnostic::error(format!("unexpected end of block{expected}"))
            .with_code(ErrorCode::E101)
            .with_label(span, "block ends here")
            .with_help("the block is missing its closing tokens");
    };

    let mut diag = Diagnostic::error(format!("unexpected `{}`{expected}", found.token))
        .with_code(ErrorCode::E100)
        .with_label(found.span, "unexpected token");
    if let Some(start) = start_offset.filter(|&start| start < end_offset) {
        let construct = tokens[start].span.union(tokens[end_offset - 1].span);
        diag = diag.with_secondary_label(construct, "while parsing this");
    }
    diag
}

/// Run `parser` over `tokens`, requiring every token to be consumed.
fn run<'i, 'src, O, P>(tokens: &'i [PositionedToken<'src>], mut parser: P) -> Result<O, Diagnostic>
where
    P: Parser<Input<'i, 'src>, O, ErrMode<ContextError<Context>>>,
{
    let mut input = TokenSlice::new(tokens);
    let result = parser.parse_next(&mut input).and_then(|output| {
        if input.eof_offset() == 0 {
            Ok(output)
        } else {
            Err(cut_error_with_offset(&input))
        }
    });
    result.map_err(|e| convert_error(e, tokens, input.eof_offset()))
}

/// Parse a `type`, `struct`, `enum` or `const` block.
pub fn parse_declaration<'i, 'src>(
    tokens: &'i [PositionedToken<'src>],
) -> Result<types::Declaration<'src>, Diagnostic> {
    run(tokens, declaration)
}

/// Parse a `data` block.
pub fn parse_data<'i, 'src>(
    tokens: &'i [PositionedToken<'src>],
) -> Result<types::DataDecl<'src>, Diagnostic> {
    run(tokens, data_decl)
}

/// Parse a `table` block.
pub fn parse_table<'i, 'src>(
    tokens: &'i [PositionedToken<'src>],
) -> Result<types::TableDecl<'src>, Diagnostic> {
    run(tokens, table_decl)
}
