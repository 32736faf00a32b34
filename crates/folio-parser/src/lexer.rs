//! Lexical analyzer for Folio block text.
//!
//! The lexer turns the text of one block into [`Token`]s with absolute byte
//! spans: every span is shifted by the block's offset in the document, so
//! diagnostics raised by later phases point straight into the source.
//!
//! The public entry point is [`tokenize`]. It recovers from bad input by
//! skipping one character, so a single pass reports every lexical problem.

use winnow::{
    Parser as _,
    ascii::digit1,
    combinator::{alt, cut_err, delimited, not, opt, peek, preceded, repeat, terminated},
    error::{AddContext, ContextError, ErrMode, ModalResult},
    stream::{LocatingSlice, Location, Stream},
    token::{literal, none_of, one_of, take_until, take_while},
};

use folio_core::span::Span;

use crate::{
    error::{Diagnostic, DiagnosticCollector, ErrorCode, ParseError},
    tokens::{PositionedToken, Token},
};

/// Rich diagnostic information for lexer errors.
///
/// Attached to winnow errors via `.context()`. `start` is relative to the
/// block text; the error span runs from `start` to the failure position.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LexerDiagnostic {
    code: ErrorCode,
    message: &'static str,
    help: Option<&'static str>,
    start: usize,
}

type Input<'a> = LocatingSlice<&'a str>;
type IResult<'a, O> = ModalResult<O, ContextError<LexerDiagnostic>>;

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Parse `\u{XXXX}` after the backslash, validating the codepoint.
fn string_escape_unicode<'a>(input: &mut Input<'a>, escape_start: usize) -> IResult<'a, char> {
    preceded(
        'u',
        cut_err(
            delimited(
                '{',
                take_while(1..=6, |c: char| c.is_ascii_hexdigit()).context(LexerDiagnostic {
                    code: ErrorCode::E006,
                    message: "empty unicode escape",
                    help: Some("provide 1-6 hex digits: `\\u{2192}`"),
                    start: escape_start,
                }),
                '}',
            )
            .context(LexerDiagnostic {
                code: ErrorCode::E004,
                message: "invalid unicode escape",
                help: Some("use format `\\u{XXXX}` with 1-6 hex digits"),
                start: escape_start,
            })
            .verify_map(|hex: &str| u32::from_str_radix(hex, 16).ok().and_then(char::from_u32))
            .context(LexerDiagnostic {
                code: ErrorCode::E005,
                message: "invalid unicode codepoint",
                help: Some("valid range: `0x0000`-`0xD7FF` or `0xE000`-`0x10FFFF`"),
                start: escape_start,
            }),
        ),
    )
    .parse_next(input)
}

fn string_escape_char<'a>(input: &mut Input<'a>) -> IResult<'a, char> {
    one_of(['n', 'r', 't', '\\', '\'', '"', '0'])
        .map(|c| match c {
            'n' => '\n',
            'r' => '\r',
            't' => '\t',
            '0' => '\0',
            other => other,
        })
        .parse_next(input)
}

/// Parse an escape sequence starting with a backslash.
fn string_escape<'a>(input: &mut Input<'a>) -> IResult<'a, char> {
    let escape_start = input.current_token_start();

    '\\'.parse_next(input)?;

    match string_escape_unicode(input, escape_start) {
        Ok(ch) => return Ok(ch),
        Err(ErrMode::Backtrack(_)) => {}
        Err(e) => return Err(e),
    }

    if let Ok(ch) = string_escape_char(input) {
        return Ok(ch);
    }

    Err(ErrMode::Cut(ContextError::new().add_context(
        input,
        &input.checkpoint(),
        LexerDiagnostic {
            code: ErrorCode::E003,
            message: "invalid escape sequence",
            help: Some("valid escapes: `\\n`, `\\r`, `\\t`, `\\\\`, `\\'`, `\\\"`, `\\0`, `\\u{}`"),
            start: escape_start,
        },
    )))
}

/// Parse a double-quoted string literal. Strings may not span lines.
fn string_literal<'a>(input: &mut Input<'a>) -> IResult<'a, Token<'a>> {
    let string_char = none_of(['"', '\\', '\n', '\r']);
    let string_content = repeat(0.., alt((string_escape, string_char)))
        .fold(String::new, |mut acc, ch| {
            acc.push(ch);
            acc
        });

    let start_pos = input.current_token_start();

    '"'.parse_next(input)
        .map_err(|_: ErrMode<ContextError<LexerDiagnostic>>| {
            ErrMode::Backtrack(ContextError::new())
        })?;

    cut_err(terminated(string_content, '"'))
        .context(LexerDiagnostic {
            code: ErrorCode::E001,
            message: "unterminated string literal",
            help: Some("add closing `\"` before the end of the line"),
            start: start_pos,
        })
        .parse_next(input)
        .map(Token::StringLiteral)
}

/// Recognize a number and report whether it has a fraction or exponent.
fn number_text<'a>(input: &mut Input<'a>) -> IResult<'a, (&'a str, bool)> {
    terminated(
        (
            opt('-'),
            digit1,
            opt(('.', digit1)),
            opt((one_of(['e', 'E']), opt(one_of(['+', '-'])), digit1)),
        )
            .with_taken(),
        peek(not(one_of(is_ident_char))),
    )
    .map(|((_, _, fraction, exponent), text)| (text, fraction.is_some() || exponent.is_some()))
    .parse_next(input)
}

/// Parse an integer or float literal.
///
/// Only plain decimal syntax is accepted, so words like `inf` or `nan` stay
/// identifiers.
fn number_literal<'a>(input: &mut Input<'a>) -> IResult<'a, Token<'a>> {
    let start = input.current_token_start();
    let (text, is_float) = number_text.parse_next(input)?;

    if is_float {
        return text
            .parse::<f64>()
            .map(Token::FloatLiteral)
            .map_err(|_| ErrMode::Backtrack(ContextError::new()));
    }

    match text.parse::<i64>() {
        Ok(value) => Ok(Token::IntLiteral(value)),
        Err(_) => Err(ErrMode::Cut(ContextError::new().add_context(
            input,
            &input.checkpoint(),
            LexerDiagnostic {
                code: ErrorCode::E008,
                message: "integer literal does not fit in 64 bits",
                help: Some("write it as a float, e.g. `1e20`"),
                start,
            },
        ))),
    }
}

fn line_comment<'a>(input: &mut Input<'a>) -> IResult<'a, Token<'a>> {
    preceded("//", take_while(0.., |c| c != '\n'))
        .map(Token::LineComment)
        .parse_next(input)
}

fn block_comment<'a>(input: &mut Input<'a>) -> IResult<'a, Token<'a>> {
    let start = input.current_token_start();
    preceded(
        "/*",
        cut_err(terminated(take_until(0.., "*/"), "*/")).context(LexerDiagnostic {
            code: ErrorCode::E007,
            message: "unterminated block comment",
            help: Some("close the comment with `*/`"),
            start,
        }),
    )
    .map(Token::BlockComment)
    .parse_next(input)
}

fn identifier<'a>(input: &mut Input<'a>) -> IResult<'a, Token<'a>> {
    take_while(1.., is_ident_char)
        .verify(|s: &str| {
            s.chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        })
        .map(Token::Identifier)
        .parse_next(input)
}

/// Parse a `$name` variable reference.
fn variable<'a>(input: &mut Input<'a>) -> IResult<'a, Token<'a>> {
    preceded('$', identifier)
        .map(|token| match token {
            Token::Identifier(name) => Token::Variable(name),
            other => other,
        })
        .parse_next(input)
}

/// Parse multi-character operators (order matters - longest first)
fn multi_char_operator<'a>(input: &mut Input<'a>) -> IResult<'a, Token<'a>> {
    alt((
        literal("->").value(Token::Arrow),
        literal("--").value(Token::Line),
        literal("::").value(Token::DoubleColon),
    ))
    .parse_next(input)
}

fn single_char_token<'a>(input: &mut Input<'a>) -> IResult<'a, Token<'a>> {
    alt((
        '='.value(Token::Equals),
        ':'.value(Token::Colon),
        '@'.value(Token::At),
        '?'.value(Token::Question),
        '.'.value(Token::Dot),
        '{'.value(Token::LeftBrace),
        '}'.value(Token::RightBrace),
        '['.value(Token::LeftBracket),
        ']'.value(Token::RightBracket),
        '('.value(Token::LeftParen),
        ')'.value(Token::RightParen),
        '<'.value(Token::LeftAngle),
        '>'.value(Token::RightAngle),
        ';'.value(Token::Semicolon),
        ','.value(Token::Comma),
    ))
    .parse_next(input)
}

/// Whitespace other than newlines.
fn whitespace<'a>(input: &mut Input<'a>) -> IResult<'a, Token<'a>> {
    take_while(1.., |c: char| c.is_whitespace() && c != '\n')
        .value(Token::Whitespace)
        .parse_next(input)
}

fn newline<'a>(input: &mut Input<'a>) -> IResult<'a, Token<'a>> {
    '\n'.value(Token::Newline).parse_next(input)
}

/// Parse a single token. The span is relative to the block text.
fn positioned_token<'a>(input: &mut Input<'a>) -> IResult<'a, PositionedToken<'a>> {
    let start_pos = input.current_token_start();

    let token = alt((
        line_comment,        // Must come before single char tokens
        block_comment,       // Must come before single char tokens
        string_literal,      // Must come before any single char
        multi_char_operator, // `--` must win over a negative number
        number_literal,      // Must come before identifier
        variable,
        identifier,
        single_char_token,
        newline, // Must come before whitespace
        whitespace,
    ))
    .parse_next(input)?;

    let end_pos = input.current_token_start();
    Ok(PositionedToken::new(token, Span::new(start_pos..end_pos)))
}

/// Lexer that accumulates tokens and diagnostics during tokenization.
struct Lexer<'a> {
    /// Offset of the block text in the document.
    base: usize,
    tokens: Vec<PositionedToken<'a>>,
    diagnostics: DiagnosticCollector,
}

impl<'a> Lexer<'a> {
    fn new(base: usize) -> Self {
        Self {
            base,
            tokens: Vec::new(),
            diagnostics: DiagnosticCollector::new(),
        }
    }

    fn tokenize(&mut self, mut input: Input<'a>) {
        while !input.is_empty() {
            match positioned_token(&mut input) {
                Ok(mut token) => {
                    token.span = token.span.offset_by(self.base);
                    self.tokens.push(token);
                }
                Err(e) => {
                    let error_pos = input.current_token_start();
                    let diagnostic = self.convert_err_mode(e, error_pos);
                    self.diagnostics.emit(diagnostic);

                    if !input.is_empty() {
                        input.next_token();
                    }
                }
            }
        }
    }

    fn finish(self) -> Result<Vec<PositionedToken<'a>>, ParseError> {
        self.diagnostics.finish().map(|()| self.tokens)
    }

    /// Convert an ErrMode and error position to a Diagnostic.
    ///
    /// Falls back to E002 (unexpected character) if no diagnostic context
    /// is attached.
    fn convert_err_mode(
        &self,
        err: ErrMode<ContextError<LexerDiagnostic>>,
        error_pos: usize,
    ) -> Diagnostic {
        let context_error = match err {
            ErrMode::Backtrack(ctx) | ErrMode::Cut(ctx) => ctx,
            ErrMode::Incomplete(_) => ContextError::new(),
        };

        if let Some(LexerDiagnostic {
            code,
            message,
            help,
            start,
        }) = context_error.context().next()
        {
            let span = Span::new(*start..error_pos).offset_by(self.base);

            let mut diag = Diagnostic::error(*message)
                .with_code(*code)
                .with_label(span, code.description());
            if let Some(h) = help {
                diag = diag.with_help(*h);
            }
            return diag;
        }

        let span = Span::new(error_pos..error_pos.saturating_add(1)).offset_by(self.base);
        Diagnostic::error("unexpected character")
            .with_code(ErrorCode::E002)
            .with_label(span, ErrorCode::E002.description())
    }
}

/// Tokenize one block's text, collecting every lexical error.
///
/// `base` is the byte offset of `input` in its document; token spans and
/// diagnostic labels are shifted by it.
///
/// # Returns
///
/// - `Ok(tokens)` - All tokens successfully lexed
/// - `Err(ParseError)` - One or more errors occurred; contains all diagnostics
pub fn tokenize(input: &str, base: usize) -> Result<Vec<PositionedToken<'_>>, ParseError> {
    let mut lexer = Lexer::new(base);
    lexer.tokenize(LocatingSlice::new(input));
    lexer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_single_token(input: &str, expected: Token<'_>) {
        let mut located_input = LocatingSlice::new(input);
        let result = positioned_token(&mut located_input);
        assert!(result.is_ok(), "Failed to parse: {}", input);
        let positioned = result.unwrap();
        assert_eq!(positioned.token, expected);
    }

    fn meaningful(input: &str) -> Vec<Token<'_>> {
        tokenize(input, 0)
            .expect("should tokenize")
            .into_iter()
            .map(|t| t.token)
            .filter(|t| !t.is_trivia())
            .collect()
    }

    #[test]
    fn test_keywords_are_identifiers() {
        test_single_token("graph", Token::Identifier("graph"));
        test_single_token("struct", Token::Identifier("struct"));
        test_single_token("node_count", Token::Identifier("node_count"));
        test_single_token("_private", Token::Identifier("_private"));
    }

    #[test]
    fn test_variable() {
        test_single_token("$accent", Token::Variable("accent"));
        assert!(tokenize("$", 0).is_err());
    }

    #[test]
    fn test_operators() {
        test_single_token("->", Token::Arrow);
        test_single_token("--", Token::Line);
        test_single_token("::", Token::DoubleColon);
        test_single_token(":", Token::Colon);
        test_single_token("?", Token::Question);
        test_single_token("@", Token::At);
    }

    #[test]
    fn test_punctuation() {
        test_single_token("{", Token::LeftBrace);
        test_single_token("]", Token::RightBracket);
        test_single_token("(", Token::LeftParen);
        test_single_token("<", Token::LeftAngle);
        test_single_token(">", Token::RightAngle);
        test_single_token(";", Token::Semicolon);
    }

    #[test]
    fn test_numbers() {
        test_single_token("42", Token::IntLiteral(42));
        test_single_token("-7", Token::IntLiteral(-7));
        test_single_token("0.25", Token::FloatLiteral(0.25));
        test_single_token("1e3", Token::FloatLiteral(1000.0));
        test_single_token("-2.5E-1", Token::FloatLiteral(-0.25));
    }

    #[test]
    fn test_special_float_words_stay_identifiers() {
        test_single_token("inf", Token::Identifier("inf"));
        test_single_token("NaN", Token::Identifier("NaN"));
    }

    #[test]
    fn test_integer_overflow() {
        let err = tokenize("x = 99999999999999999999;", 0).unwrap_err();
        assert_eq!(err.diagnostics()[0].code(), Some(ErrorCode::E008));
    }

    #[test]
    fn test_number_dot_field() {
        assert_eq!(
            meaningful("1.x"),
            vec![Token::IntLiteral(1), Token::Dot, Token::Identifier("x")]
        );
    }

    #[test]
    fn test_edge_operators_without_spaces() {
        assert_eq!(
            meaningful("A->B--C"),
            vec![
                Token::Identifier("A"),
                Token::Arrow,
                Token::Identifier("B"),
                Token::Line,
                Token::Identifier("C"),
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        test_single_token(
            r#""say \"hi\"\n""#,
            Token::StringLiteral("say \"hi\"\n".to_string()),
        );
        test_single_token(r#""\u{2192}""#, Token::StringLiteral("→".to_string()));
        test_single_token(r#""""#, Token::StringLiteral(String::new()));
    }

    #[test]
    fn test_string_errors() {
        let cases = [
            (r#""open"#, ErrorCode::E001),
            (r#""\q""#, ErrorCode::E003),
            (r#""\u{}""#, ErrorCode::E006),
            (r#""\u{D800}""#, ErrorCode::E005),
        ];
        for (input, code) in cases {
            let err = tokenize(input, 0).unwrap_err();
            assert_eq!(err.diagnostics()[0].code(), Some(code), "input: {input}");
        }
    }

    #[test]
    fn test_comments() {
        test_single_token("// note", Token::LineComment(" note"));
        test_single_token("/* a\nb */", Token::BlockComment(" a\nb "));

        let err = tokenize("/* open", 0).unwrap_err();
        assert_eq!(err.diagnostics()[0].code(), Some(ErrorCode::E007));
    }

    #[test]
    fn test_spans_are_absolute() {
        let tokens = tokenize("a = 1;", 100).unwrap();
        assert_eq!(tokens[0].span, Span::new(100..101));
        let one = tokens
            .iter()
            .find(|t| t.token == Token::IntLiteral(1))
            .unwrap();
        assert_eq!(one.span, Span::new(104..105));
    }

    #[test]
    fn test_recovery_reports_every_error() {
        let err = tokenize("a # b ~ c", 10).unwrap_err();
        let diagnostics = err.diagnostics();
        assert_eq!(diagnostics.len(), 2);
        assert!(
            diagnostics
                .iter()
                .all(|d| d.code() == Some(ErrorCode::E002))
        );
        assert_eq!(diagnostics[0].primary_span(), Some(Span::new(12..13)));
    }
}
