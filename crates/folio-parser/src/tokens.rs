//! Token definitions shared by the lexer and the block parsers.

use std::fmt;

use winnow::stream::Location;

use folio_core::span::Span;

/// Token types for Folio block text.
///
/// Keywords are not separate tokens: every word lexes as an
/// [`Identifier`](Token::Identifier) and parsers match on its text, so
/// `node` or `type` stay usable as field and node names.
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'src> {
    // Literals
    Identifier(&'src str),
    /// `$name` reference; holds the name without the sigil.
    Variable(&'src str),
    StringLiteral(String),
    IntLiteral(i64),
    FloatLiteral(f64),

    // Operators
    Arrow,       // ->
    Line,        // --
    DoubleColon, // ::
    Equals,      // =
    Colon,       // :
    At,          // @
    Question,    // ?
    Dot,         // .

    // Punctuation
    LeftBrace,    // {
    RightBrace,   // }
    LeftBracket,  // [
    RightBracket, // ]
    LeftParen,    // (
    RightParen,   // )
    LeftAngle,    // <
    RightAngle,   // >
    Semicolon,    // ;
    Comma,        // ,

    // Comments
    LineComment(&'src str),
    BlockComment(&'src str),

    // Whitespace
    Whitespace,
    Newline,
}

impl Token<'_> {
    /// Whitespace, newlines and comments.
    pub fn is_trivia(&self) -> bool {
        matches!(
            self,
            Token::Whitespace | Token::Newline | Token::LineComment(_) | Token::BlockComment(_)
        )
    }

    /// True for an identifier spelled exactly `word`.
    pub fn is_word(&self, word: &str) -> bool {
        matches!(self, Token::Identifier(name) if *name == word)
    }
}

/// A token with position information for winnow integration
#[derive(Debug, Clone, PartialEq)]
pub struct PositionedToken<'src> {
    pub token: Token<'src>,
    pub span: Span,
}

impl<'src> PositionedToken<'src> {
    pub fn new(token: Token<'src>, span: Span) -> Self {
        Self { token, span }
    }
}

impl<'src> std::ops::Deref for PositionedToken<'src> {
    type Target = Token<'src>;

    fn deref(&self) -> &Self::Target {
        &self.token
    }
}

impl fmt::Display for PositionedToken<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.token.fmt(f)
    }
}

impl Location for PositionedToken<'_> {
    fn previous_token_end(&self) -> usize {
        self.span.start()
    }

    fn current_token_start(&self) -> usize {
        self.span.start()
    }
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Identifier(name) => write!(f, "{name}"),
            Token::Variable(name) => write!(f, "${name}"),
            Token::StringLiteral(s) => write!(f, "\"{s}\""),
            Token::IntLiteral(n) => write!(f, "{n}"),
            Token::FloatLiteral(n) => write!(f, "{n:?}"),

            Token::Arrow => write!(f, "->"),
            Token::Line => write!(f, "--"),
            Token::DoubleColon => write!(f, "::"),
            Token::Equals => write!(f, "="),
            Token::Colon => write!(f, ":"),
            Token::At => write!(f, "@"),
            Token::Question => write!(f, "?"),
            Token::Dot => write!(f, "."),

            Token::LeftBrace => write!(f, "{{"),
            Token::RightBrace => write!(f, "}}"),
            Token::LeftBracket => write!(f, "["),
            Token::RightBracket => write!(f, "]"),
            Token::LeftParen => write!(f, "("),
            Token::RightParen => write!(f, ")"),
            Token::LeftAngle => write!(f, "<"),
            Token::RightAngle => write!(f, ">"),
            Token::Semicolon => write!(f, ";"),
            Token::Comma => write!(f, ","),

            Token::LineComment(comment) => write!(f, "//{comment}"),
            Token::BlockComment(comment) => write!(f, "/*{comment}*/"),
            Token::Whitespace => write!(f, " "),
            Token::Newline => write!(f, "\\n"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trivia() {
        assert!(Token::Whitespace.is_trivia());
        assert!(Token::BlockComment(" x ").is_trivia());
        assert!(!Token::Semicolon.is_trivia());
    }

    #[test]
    fn test_is_word() {
        assert!(Token::Identifier("node").is_word("node"));
        assert!(!Token::Identifier("nodes").is_word("node"));
        assert!(!Token::StringLiteral("node".to_string()).is_word("node"));
    }

    #[test]
    fn test_display() {
        assert_eq!(Token::Variable("accent").to_string(), "$accent");
        assert_eq!(Token::FloatLiteral(2.0).to_string(), "2.0");
        assert_eq!(Token::LeftBrace.to_string(), "{");
    }
}
