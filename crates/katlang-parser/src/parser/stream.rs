//! Lazy token stream for the hand-written parser.

use katlang_ast::Span;
use katlang_lexer::{LexError, Token};
use logos::Logos;

use super::ParseError;

/// Token stream with one token of lookahead.
///
/// Tokens are pulled from the lexer on demand, so a lexing error is reported
/// only when the parser advances onto it. Lexing can start anywhere in the
/// source; all spans handed out are absolute offsets into the full text.
///
/// The end of input is represented by `peek() == None` with a zero-length
/// span at the end of the source.
pub struct TokenStream<'src> {
    lexer: logos::Lexer<'src, Token>,
    /// Offset of the lexed slice within the full source
    base: usize,
    source_len: usize,
    current: Option<(Token, Span)>,
}

impl<'src> TokenStream<'src> {
    /// Prepare to lex `source` from byte `offset`. No token is loaded until
    /// [`TokenStream::start`] is called.
    pub fn new(source: &'src str, offset: usize) -> Self {
        let mut offset = offset.min(source.len());
        while !source.is_char_boundary(offset) {
            offset += 1;
        }
        Self {
            lexer: Token::lexer(&source[offset..]),
            base: offset,
            source_len: source.len(),
            current: None,
        }
    }

    /// Load the first token.
    pub fn start(&mut self) -> Result<(), ParseError> {
        self.pull()
    }

    /// Peek at the current token without consuming it.
    pub fn peek(&self) -> Option<&Token> {
        self.current.as_ref().map(|(token, _)| token)
    }

    /// Consume the current token and load the next one.
    pub fn advance(&mut self) -> Result<(), ParseError> {
        if self.current.is_some() {
            self.pull()?;
        }
        Ok(())
    }

    /// Check if the current token has the same kind as `expected`.
    pub fn check(&self, expected: &Token) -> bool {
        matches!(self.peek(), Some(t) if std::mem::discriminant(t) == std::mem::discriminant(expected))
    }

    /// Expect a specific token and advance if it matches.
    pub fn expect(&mut self, expected: Token) -> Result<Span, ParseError> {
        if self.check(&expected) {
            let span = self.current_span();
            self.advance()?;
            Ok(span)
        } else {
            Err(ParseError::expected_token(
                expected,
                self.peek().cloned(),
                self.current_span(),
            ))
        }
    }

    /// Check if we've reached the end of input.
    pub fn at_end(&self) -> bool {
        self.current.is_none()
    }

    /// Span of the current token, or the end of the source at end of input.
    pub fn current_span(&self) -> Span {
        match &self.current {
            Some((_, span)) => *span,
            None => Span::point(self.source_len),
        }
    }

    /// Start offset of the current token.
    pub fn current_offset(&self) -> u32 {
        self.current_span().start
    }

    /// Span from `start` up to the beginning of the current token.
    pub fn span_from(&self, start: u32) -> Span {
        Span::new(start, self.current_offset().max(start))
    }

    /// Skip separators, operators, and closing delimiters after an error so
    /// that parsing can resume at something that may start an expression.
    pub fn synchronize(&mut self) -> Result<(), ParseError> {
        while self.peek().is_some_and(Token::is_resync_skippable) {
            self.advance()?;
        }
        Ok(())
    }

    /// Newline offsets skipped so far, absolute within the full source.
    pub fn line_breaks(&self) -> Vec<usize> {
        self.lexer
            .extras
            .iter()
            .map(|offset| offset + self.base)
            .collect()
    }

    fn pull(&mut self) -> Result<(), ParseError> {
        self.current = match self.lexer.next() {
            None => None,
            Some(result) => {
                let range = self.lexer.span();
                let span = Span::from_range(range.start + self.base..range.end + self.base);
                match result {
                    Ok(token) => Some((token, span)),
                    Err(error) => return Err(self.lex_error(error, span)),
                }
            }
        };
        Ok(())
    }

    fn lex_error(&self, error: LexError, span: Span) -> ParseError {
        let span = match error {
            LexError::IncompleteInequality => Span::new(span.start, span.start + 2),
            LexError::UnexpectedCharacter => {
                let width = self
                    .lexer
                    .slice()
                    .chars()
                    .next()
                    .map(char::len_utf8)
                    .unwrap_or(1);
                Span::new(span.start, span.start + width as u32)
            }
        };
        let message = match error {
            LexError::UnexpectedCharacter => {
                format!("unexpected character '{}'", self.lexer.slice().chars().next().unwrap_or('?'))
            }
            LexError::IncompleteInequality => error.to_string(),
        };
        ParseError::lexical(message, span)
    }
}
