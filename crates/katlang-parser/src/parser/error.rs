//! Parse error types.

use katlang_ast::Span;
use katlang_lexer::Token;
use std::fmt;

/// Parse error with source location.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    /// Kind of parse error
    pub kind: ParseErrorKind,
    /// Source location where error occurred
    pub span: Span,
    /// Human-readable error message
    pub message: String,
}

/// Category of parse error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Character sequence that forms no token.
    ///
    /// Raised when the parser advances onto text the lexer rejects: an unknown
    /// character, or a `!` that is not part of `!=`.
    Lexical,

    /// Unexpected token encountered where a specific token was expected.
    ///
    /// Example: `(2+3` reaches end of input where `)` was expected.
    UnexpectedToken,

    /// Unexpected end of input while a construct was still open.
    UnexpectedEof,

    /// Tokens are present but violate a grammar rule.
    ///
    /// Examples: a selector that is neither a constant nor a parameter, a call
    /// applied to an ignored parameter, a grace marker on a property name.
    InvalidSyntax,

    /// Conflicting property declaration.
    ///
    /// Raised while properties of one algorithm are merged: a name declared
    /// twice, or conditional branches that clash (same condition, second
    /// default branch, different number of condition values).
    Declaration,
}

impl ParseError {
    /// Create an "expected token" error.
    pub fn expected_token(expected: Token, found: Option<Token>, span: Span) -> Self {
        let message = match &found {
            Some(token) => format!("expected '{}', found '{}'", expected, token),
            None => format!("expected '{}', found end of input", expected),
        };
        Self {
            kind: if found.is_none() {
                ParseErrorKind::UnexpectedEof
            } else {
                ParseErrorKind::UnexpectedToken
            },
            span,
            message,
        }
    }

    /// Create an "unexpected token" error.
    pub fn unexpected_token(found: Option<&Token>, context: &str, span: Span) -> Self {
        let message = match found {
            Some(token) => format!("unexpected '{}' {}", token, context),
            None => format!("unexpected end of input {}", context),
        };
        Self {
            kind: if found.is_none() {
                ParseErrorKind::UnexpectedEof
            } else {
                ParseErrorKind::UnexpectedToken
            },
            span,
            message,
        }
    }

    /// Create an "invalid syntax" error.
    pub fn invalid_syntax(message: impl Into<String>, span: Span) -> Self {
        Self {
            kind: ParseErrorKind::InvalidSyntax,
            span,
            message: message.into(),
        }
    }

    pub fn lexical(message: impl Into<String>, span: Span) -> Self {
        Self {
            kind: ParseErrorKind::Lexical,
            span,
            message: message.into(),
        }
    }

    pub fn declaration(message: impl Into<String>, span: Span) -> Self {
        Self {
            kind: ParseErrorKind::Declaration,
            span,
            message: message.into(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}..{}", self.message, self.span.start, self.span.end)
    }
}

impl std::error::Error for ParseError {}
