//! Hand-written recursive descent parser for KatLang.
//!
//! ## Architecture
//!
//! - `stream`: lazy token stream with one token of lookahead
//! - `error`: ParseError and its categories
//! - `expr`: precedence climbing for operators, calls, member access and
//!   content selection
//! - `algorithm`: tuples, property declarations and conditional branches
//!
//! ## Tree shape
//!
//! Every element of a parsed algorithm is itself an algorithm (a "first
//! order" tuple). `f(2+3)` therefore reads as a call whose input is the
//! one-element tuple `(2+3)`, and a top-level program `3, 4\n5` has two
//! elements, the tuples `(3, 4)` and `(5)`.
//!
//! ## Recovery
//!
//! The parser stops at the first error. Callers that want more than one
//! diagnostic restart it just past the failure with `recover` set, which
//! first skips tokens that cannot begin an expression.

mod algorithm;
mod error;
mod expr;
mod stream;

pub use error::{ParseError, ParseErrorKind};
pub use stream::TokenStream;

use katlang_ast::{Algorithm, LineIndex};

/// Parse `source` from byte `offset` into the root algorithm.
///
/// Line breaks skipped while lexing are added to `lines` whether or not
/// parsing succeeds, so error positions can be mapped to lines.
pub fn parse_program(
    source: &str,
    offset: usize,
    recover: bool,
    lines: &mut LineIndex,
) -> Result<Algorithm, ParseError> {
    let mut stream = TokenStream::new(source, offset);
    let result = parse_stream(&mut stream, recover);
    lines.extend(stream.line_breaks());
    result
}

fn parse_stream(stream: &mut TokenStream, recover: bool) -> Result<Algorithm, ParseError> {
    stream.start()?;
    if recover {
        stream.synchronize()?;
    }

    let program = algorithm::parse_second_order(stream, true)?;
    if !stream.at_end() {
        return Err(ParseError::unexpected_token(
            stream.peek(),
            "where end of input was expected",
            stream.current_span(),
        ));
    }

    tracing::trace!(elements = program.expressions.len(), "parsed program");
    Ok(program)
}
