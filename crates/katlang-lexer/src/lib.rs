// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Lexical analysis for KatLang.
//!
//! Tokenization is derived with logos. The lexer is lazy: callers pull tokens
//! one at a time, so a failure in the middle of the source surfaces exactly
//! when the parser reaches it.
//!
//! # Design
//!
//! - `Token` covers literals, identifiers, operators, and the ignore family
//!   (`#name`, `#1`, `#`)
//! - Language keywords are folded into dedicated tokens: operator words
//!   (`and`, `mod`, ...) get their own variants, built-in property names become
//!   [`Token::Property`] and `pi`/`exp` become [`Token::Constant`]
//! - `//` comments are real tokens; the parser skips them where a statement or
//!   atom may start
//! - Newline offsets are pushed into the lexer extras as they are skipped, so
//!   diagnostics can be mapped back to line/column later
//!
//! # Examples
//!
//! ```
//! # use katlang_lexer::Token;
//! # use logos::Logos;
//! let tokens: Vec<_> = Token::lexer("f = a + 1").collect();
//! assert_eq!(tokens.len(), 5);
//! ```

use logos::{Logos, Skip};
use std::fmt;
use std::rc::Rc;

/// Newline byte offsets discovered while lexing, relative to the lexed slice.
pub type LineBreaks = Vec<usize>;

/// Failure to recognise a character sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LexError {
    /// Character that starts no token.
    #[default]
    UnexpectedCharacter,
    /// `!` not followed by `=`.
    IncompleteInequality,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexError::UnexpectedCharacter => write!(f, "unexpected character"),
            LexError::IncompleteInequality => write!(f, "expected '=' as part of '!='"),
        }
    }
}

impl std::error::Error for LexError {}

/// KatLang token.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(error = LexError)]
#[logos(extras = LineBreaks)]
#[logos(skip r"[ \t\r\f\x0B]+")]
pub enum Token {
    /// Line break, recorded in the extras and never emitted.
    #[token("\n", record_newline)]
    Newline,

    // === Literals ===
    /// Decimal number, fraction optional (`6`, `1.234`)
    #[regex(r"[0-9]+(\.[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    Number(f64),

    /// Single-quoted text without escapes; an unterminated literal runs to
    /// the end of input.
    #[regex(r"'[^']*'?", |lex| text_body(lex.slice()))]
    Text(Rc<str>),

    /// Free identifier
    #[regex(r"\p{L}[\p{L}\p{Nd}_]*", |lex| Rc::from(lex.slice()))]
    Identifier(Rc<str>),

    /// Inline comment `// ...`, text excludes the leading slashes
    #[regex(r"//[^\r\n]*", |lex| Rc::from(&lex.slice()[2..]))]
    Comment(Rc<str>),

    // === Ignore family ===
    /// Ignored named parameter `#name`
    #[regex(r"#[\p{L}_][\p{L}\p{Nd}_]*", |lex| Rc::from(&lex.slice()[1..]))]
    IgnoreParameter(Rc<str>),

    /// Literal condition value `#1`
    #[regex(r"#[0-9]+(\.[0-9]+)?", |lex| lex.slice()[1..].parse::<f64>().ok())]
    IgnoreValue(f64),

    /// Ignored positional slot `#`
    #[token("#")]
    Ignore,

    // === Built-in names ===
    /// Built-in property keyword (`if`, `repeat`, `loop`, `open`, `load`,
    /// `join`, `combine`, `length`, `String`, `Reverse`)
    #[token("if", keyword)]
    #[token("repeat", keyword)]
    #[token("loop", keyword)]
    #[token("open", keyword)]
    #[token("load", keyword)]
    #[token("join", keyword)]
    #[token("combine", keyword)]
    #[token("length", keyword)]
    #[token("String", keyword)]
    #[token("Reverse", keyword)]
    Property(Rc<str>),

    /// Named constant (`pi`, `exp`)
    #[token("pi", keyword)]
    #[token("exp", keyword)]
    Constant(Rc<str>),

    // === Operator words ===
    /// Keyword `or`
    #[token("or")]
    Or,
    /// Keyword `xor`
    #[token("xor")]
    Xor,
    /// Keyword `and`
    #[token("and")]
    And,
    /// Keyword `not`
    #[token("not")]
    Not,
    /// Keyword `mod`
    #[token("mod")]
    Mod,
    /// Keyword `div`
    #[token("div")]
    Div,

    // === Comparison ===
    /// Operator `<`
    #[token("<")]
    Less,
    /// Operator `<=`
    #[token("<=")]
    LessEqual,
    /// Operator `>`
    #[token(">")]
    Greater,
    /// Operator `>=`
    #[token(">=")]
    GreaterEqual,
    /// Operator `==`
    #[token("==")]
    Equal,
    /// Operator `!=`
    #[token("!=")]
    NotEqual,
    /// A lone `!`, always rejected
    #[token("!", incomplete_inequality)]
    Bang,

    // === Arithmetic ===
    /// Operator `+`
    #[token("+")]
    Plus,
    /// Operator `-`
    #[token("-")]
    Minus,
    /// Operator `*`
    #[token("*")]
    Star,
    /// Operator `/`
    #[token("/")]
    Slash,
    /// Operator `^`
    #[token("^")]
    Caret,

    // === Punctuation ===
    /// Grace marker `~`
    #[token("~")]
    Tilde,
    /// Assignment `=`
    #[token("=")]
    Assign,
    /// Delimiter `(`
    #[token("(")]
    LParen,
    /// Delimiter `)`
    #[token(")")]
    RParen,
    /// Delimiter `{`
    #[token("{")]
    LBrace,
    /// Delimiter `}`
    #[token("}")]
    RBrace,
    /// Content selection `:`
    #[token(":")]
    Colon,
    /// Element separator `,`
    #[token(",")]
    Comma,
    /// Combining separator `;`
    #[token(";")]
    Semicolon,
    /// Property access `.`
    #[token(".")]
    Dot,
}

fn record_newline(lex: &mut logos::Lexer<Token>) -> Skip {
    let offset = lex.span().start;
    lex.extras.push(offset);
    Skip
}

fn incomplete_inequality(_: &mut logos::Lexer<Token>) -> Result<(), LexError> {
    Err(LexError::IncompleteInequality)
}

fn keyword(lex: &mut logos::Lexer<Token>) -> Rc<str> {
    Rc::from(lex.slice())
}

fn text_body(slice: &str) -> Rc<str> {
    let inner = &slice[1..];
    Rc::from(inner.strip_suffix('\'').unwrap_or(inner))
}

impl Token {
    /// Whether this token is one of the separators, operators, or closing
    /// delimiters skipped while resynchronising after an error.
    pub fn is_resync_skippable(&self) -> bool {
        matches!(
            self,
            Token::Comma
                | Token::Semicolon
                | Token::RParen
                | Token::RBrace
                | Token::Assign
                | Token::Colon
                | Token::Dot
                | Token::And
                | Token::Or
                | Token::Xor
                | Token::Less
                | Token::LessEqual
                | Token::Greater
                | Token::GreaterEqual
                | Token::Equal
                | Token::NotEqual
                | Token::Plus
                | Token::Minus
                | Token::Star
                | Token::Slash
                | Token::Caret
                | Token::Mod
                | Token::Div
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Token::Number(n) => return write!(f, "{}", n),
            Token::Text(s) => return write!(f, "'{}'", s),
            Token::Identifier(s) | Token::Property(s) | Token::Constant(s) => {
                return write!(f, "{}", s)
            }
            Token::Comment(s) => return write!(f, "//{}", s),
            Token::IgnoreParameter(s) => return write!(f, "#{}", s),
            Token::IgnoreValue(n) => return write!(f, "#{}", n),
            Token::Newline => "newline",
            Token::Ignore => "#",
            Token::Or => "or",
            Token::Xor => "xor",
            Token::And => "and",
            Token::Not => "not",
            Token::Mod => "mod",
            Token::Div => "div",
            Token::Less => "<",
            Token::LessEqual => "<=",
            Token::Greater => ">",
            Token::GreaterEqual => ">=",
            Token::Equal => "==",
            Token::NotEqual => "!=",
            Token::Bang => "!",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Caret => "^",
            Token::Tilde => "~",
            Token::Assign => "=",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::LBrace => "{",
            Token::RBrace => "}",
            Token::Colon => ":",
            Token::Comma => ",",
            Token::Semicolon => ";",
            Token::Dot => ".",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test helper: lex source and drop errors.
    fn lex(source: &str) -> Vec<Token> {
        Token::lexer(source).filter_map(|result| result.ok()).collect()
    }

    fn ident(s: &str) -> Token {
        Token::Identifier(Rc::from(s))
    }

    fn property(s: &str) -> Token {
        Token::Property(Rc::from(s))
    }

    #[test]
    fn test_operator_words() {
        assert_eq!(
            lex("a and b or not c xor d mod e div f"),
            vec![
                ident("a"),
                Token::And,
                ident("b"),
                Token::Or,
                Token::Not,
                ident("c"),
                Token::Xor,
                ident("d"),
                Token::Mod,
                ident("e"),
                Token::Div,
                ident("f"),
            ]
        );
    }

    #[test]
    fn test_property_keywords() {
        assert_eq!(
            lex("if repeat loop combine length String Reverse"),
            vec![
                property("if"),
                property("repeat"),
                property("loop"),
                property("combine"),
                property("length"),
                property("String"),
                property("Reverse"),
            ]
        );
        assert_eq!(lex("pi exp"), vec![
            Token::Constant(Rc::from("pi")),
            Token::Constant(Rc::from("exp")),
        ]);
    }

    #[test]
    fn test_keyword_prefix_is_identifier() {
        assert_eq!(lex("iffy loops piano"), vec![
            ident("iffy"),
            ident("loops"),
            ident("piano"),
        ]);
    }

    #[test]
    fn test_numbers() {
        assert_eq!(lex("6 1.234"), vec![Token::Number(6.0), Token::Number(1.234)]);
        // a trailing dot belongs to the next token
        assert_eq!(lex("6.Add1"), vec![Token::Number(6.0), Token::Dot, ident("Add1")]);
        assert_eq!(
            lex("6.5.Add1"),
            vec![Token::Number(6.5), Token::Dot, ident("Add1")]
        );
    }

    #[test]
    fn test_ignore_family() {
        assert_eq!(
            lex("#a #_b #1 #0.5 #"),
            vec![
                Token::IgnoreParameter(Rc::from("a")),
                Token::IgnoreParameter(Rc::from("_b")),
                Token::IgnoreValue(1.0),
                Token::IgnoreValue(0.5),
                Token::Ignore,
            ]
        );
    }

    #[test]
    fn test_text_literals() {
        assert_eq!(lex("'abc'"), vec![Token::Text(Rc::from("abc"))]);
        assert_eq!(lex("'open"), vec![Token::Text(Rc::from("open"))]);
        assert_eq!(lex("'a.kat' x"), vec![Token::Text(Rc::from("a.kat")), ident("x")]);
    }

    #[test]
    fn test_comments_are_tokens() {
        assert_eq!(
            lex("1 // one\n2"),
            vec![Token::Number(1.0), Token::Comment(Rc::from(" one")), Token::Number(2.0)]
        );
        assert_eq!(lex("4/2"), vec![Token::Number(4.0), Token::Slash, Token::Number(2.0)]);
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(
            lex("< <= > >= == != ="),
            vec![
                Token::Less,
                Token::LessEqual,
                Token::Greater,
                Token::GreaterEqual,
                Token::Equal,
                Token::NotEqual,
                Token::Assign,
            ]
        );
    }

    #[test]
    fn test_punctuation() {
        assert_eq!(
            lex("~a( ){ }:,;."),
            vec![
                Token::Tilde,
                ident("a"),
                Token::LParen,
                Token::RParen,
                Token::LBrace,
                Token::RBrace,
                Token::Colon,
                Token::Comma,
                Token::Semicolon,
                Token::Dot,
            ]
        );
    }

    #[test]
    fn test_newlines_recorded_in_extras() {
        let mut lexer = Token::lexer("a\nb\r\n c");
        while lexer.next().is_some() {}
        assert_eq!(lexer.extras, vec![1, 4]);
    }

    #[test]
    fn test_lexer_error_detection() {
        let results: Vec<_> = Token::lexer("a @ b").collect();
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert_eq!(results[1], Err(LexError::UnexpectedCharacter));
        assert!(results[2].is_ok());
    }

    #[test]
    fn test_lone_bang_is_rejected() {
        let results: Vec<_> = Token::lexer("a ! b").collect();
        assert_eq!(results[1], Err(LexError::IncompleteInequality));
        assert_eq!(lex("a != b"), vec![ident("a"), Token::NotEqual, ident("b")]);
    }

    #[test]
    fn test_display() {
        assert_eq!(Token::Star.to_string(), "*");
        assert_eq!(Token::NotEqual.to_string(), "!=");
        assert_eq!(property("loop").to_string(), "loop");
        assert_eq!(Token::IgnoreParameter(Rc::from("a")).to_string(), "#a");
    }
}
