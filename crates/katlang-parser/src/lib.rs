// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Hand-written recursive descent parser for KatLang
//!
//! Tokens are pulled lazily from the lexer, so parsing can restart at any
//! byte offset of the source after an error.

pub mod parser;

pub use parser::{ParseError, ParseErrorKind, TokenStream, parse_program};

// Re-export lexer
pub use katlang_lexer::Token;

use katlang_ast::{Algorithm, LineIndex};

/// Parse a complete source text without recovery.
pub fn parse(source: &str) -> Result<Algorithm, ParseError> {
    parse_program(source, 0, false, &mut LineIndex::new())
}
