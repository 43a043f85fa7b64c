//! Evaluation errors and diagnostics.
//!
//! # Design
//!
//! - `EvalError`: a failure raised while binding a parsed program
//! - `Diagnostic`: what callers receive, a message with its category and severity plus
//!   both the byte span and its 1-based line/column range
//! - `ErrorKind`: categorizes diagnostics by the stage and rule that failed
//! - `DiagnosticFormatter`: renders a diagnostic with its source line
//!
//! Parse failures arrive as [`ParseError`] and are converted into the same
//! `Diagnostic` shape, so one list can mix both stages.

use std::fmt;

use katlang_ast::{LineIndex, Span};
use katlang_parser::{ParseError, ParseErrorKind};
use serde::{Serialize, Serializer};
use thiserror::Error;

/// Failure while binding a program.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("unknown property '{name}'")]
    UnknownProperty { name: String, span: Span },

    #[error("'{name}' expects at least {expected} arguments, but received {found}")]
    Arity {
        name: String,
        expected: usize,
        found: usize,
        span: Span,
    },

    #[error("index {index} is out of range for {len} elements")]
    IndexOutOfRange { index: f64, len: usize, span: Span },

    #[error("infinite recursion detected: the call lacks an argument for the parameter '{parameter}'")]
    InfiniteRecursion { parameter: String, span: Span },

    #[error("non-existent conditional branch for condition {condition}")]
    MissingBranch { condition: String, span: Span },

    #[error("invalid KatLang code at '{address}'")]
    InvalidProgram { address: String, span: Span },

    #[error("cannot retrieve '{address}': {reason}")]
    LoadFailed {
        address: String,
        reason: String,
        span: Span,
    },

    #[error("the iteration count of 'repeat' must reduce to a non-negative number")]
    InvalidLoopCount { span: Span },

    #[error("the continuation of the loop body '{body}' cannot be evaluated; the body lacks arguments")]
    LoopContinuation { body: String, span: Span },

    #[error("{message}")]
    InvalidArgument { message: String, span: Span },
}

impl EvalError {
    pub fn invalid_argument(message: impl Into<String>, span: Span) -> Self {
        EvalError::InvalidArgument {
            message: message.into(),
            span,
        }
    }

    /// Source location the error is reported at.
    pub fn span(&self) -> Span {
        match self {
            EvalError::UnknownProperty { span, .. }
            | EvalError::Arity { span, .. }
            | EvalError::IndexOutOfRange { span, .. }
            | EvalError::InfiniteRecursion { span, .. }
            | EvalError::MissingBranch { span, .. }
            | EvalError::InvalidProgram { span, .. }
            | EvalError::LoadFailed { span, .. }
            | EvalError::InvalidLoopCount { span }
            | EvalError::LoopContinuation { span, .. }
            | EvalError::InvalidArgument { span, .. } => *span,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            EvalError::UnknownProperty { .. } => ErrorKind::UnknownProperty,
            EvalError::Arity { .. } => ErrorKind::Arity,
            EvalError::IndexOutOfRange { .. } => ErrorKind::IndexOutOfRange,
            EvalError::InfiniteRecursion { .. } => ErrorKind::InfiniteRecursion,
            EvalError::MissingBranch { .. } => ErrorKind::MissingBranch,
            EvalError::InvalidProgram { .. } => ErrorKind::InvalidProgram,
            EvalError::LoadFailed { .. } => ErrorKind::LoadFailed,
            EvalError::InvalidLoopCount { .. } | EvalError::LoopContinuation { .. } => {
                ErrorKind::InvalidLoop
            }
            EvalError::InvalidArgument { .. } => ErrorKind::InvalidArgument,
        }
    }
}

/// Category of a diagnostic.
///
/// # Invariant
///
/// The discriminant values must match the ERROR_KIND_NAMES array indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorKind {
    // Parse stage
    /// Text that forms no token
    Lexical = 0,
    /// Unexpected token, unclosed bracket, malformed selector
    Syntax = 1,
    /// Redefined property or clashing conditional branches
    Declaration = 2,

    // Binding stage
    UnknownProperty = 3,
    /// Too few arguments for a built-in, `if`, a loop or a conditional
    Arity = 4,
    IndexOutOfRange = 5,
    /// A parameter bound to an argument that mentions it
    InfiniteRecursion = 6,
    /// No branch matches and no default branch exists
    MissingBranch = 7,
    /// Retrieved source text did not parse cleanly
    InvalidProgram = 8,
    /// Source text could not be retrieved
    LoadFailed = 9,
    /// Bad iteration count or undecidable continuation
    InvalidLoop = 10,
    InvalidArgument = 11,
}

/// Human-readable names for error kinds.
///
/// Index matches ErrorKind discriminant.
const ERROR_KIND_NAMES: &[&str] = &[
    "lexical error",        // 0: Lexical
    "syntax error",         // 1: Syntax
    "invalid declaration",  // 2: Declaration
    "unknown property",     // 3: UnknownProperty
    "too few arguments",    // 4: Arity
    "index out of range",   // 5: IndexOutOfRange
    "infinite recursion",   // 6: InfiniteRecursion
    "missing branch",       // 7: MissingBranch
    "invalid program",      // 8: InvalidProgram
    "load failed",          // 9: LoadFailed
    "invalid loop",         // 10: InvalidLoop
    "invalid argument",     // 11: InvalidArgument
];

impl ErrorKind {
    pub fn name(self) -> &'static str {
        ERROR_KIND_NAMES[self as usize]
    }
}

impl From<ParseErrorKind> for ErrorKind {
    fn from(kind: ParseErrorKind) -> Self {
        match kind {
            ParseErrorKind::Lexical => ErrorKind::Lexical,
            ParseErrorKind::UnexpectedToken
            | ParseErrorKind::UnexpectedEof
            | ParseErrorKind::InvalidSyntax => ErrorKind::Syntax,
            ParseErrorKind::Declaration => ErrorKind::Declaration,
        }
    }
}

impl Serialize for ErrorKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// Diagnostic severity. Values match editor marker severities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Severity {
    Hint = 1,
    Info = 2,
    Warning = 4,
    Error = 8,
}

impl Serialize for Severity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Hint => write!(f, "hint"),
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// One reported problem with its source range.
///
/// Lines are 1-based. On the first line the column is the character offset
/// plus one; on later lines it counts characters from the preceding line
/// break, which itself counts as the first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub kind: ErrorKind,
    pub severity: Severity,
    pub message: String,
    pub span: Span,
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl Diagnostic {
    /// Error diagnostic positioned against `source`.
    pub fn error(
        kind: ErrorKind,
        message: impl Into<String>,
        span: Span,
        source: &str,
        lines: &LineIndex,
    ) -> Self {
        let start = lines.position(source, span.start as usize);
        let end = lines.position(source, span.end as usize);
        Self {
            kind,
            severity: Severity::Error,
            message: message.into(),
            span,
            start_line: start.line,
            start_column: start.column,
            end_line: end.line,
            end_column: end.column,
        }
    }

    pub fn from_parse_error(error: &ParseError, source: &str, lines: &LineIndex) -> Self {
        Self::error(error.kind.into(), error.message.clone(), error.span, source, lines)
    }

    pub fn from_eval_error(error: &EvalError, source: &str, lines: &LineIndex) -> Self {
        Self::error(error.kind(), error.to_string(), error.span(), source, lines)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}: {} ({}:{})",
            self.severity,
            self.kind.name(),
            self.message,
            self.start_line,
            self.start_column
        )
    }
}

/// Formats diagnostics with source code context.
///
/// ```text
/// error: syntax error: expected ')', found end of input
///   --> program.kat:1:5
///    |
///  1 | (2+3
///    |     ^
/// ```
pub struct DiagnosticFormatter<'a> {
    source: &'a str,
    name: &'a str,
    lines: LineIndex,
}

impl<'a> DiagnosticFormatter<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            name: "<input>",
            lines: LineIndex::from_source(source),
        }
    }

    /// Name shown in the location line, usually the file path.
    pub fn with_name(mut self, name: &'a str) -> Self {
        self.name = name;
        self
    }

    pub fn format(&self, diagnostic: &Diagnostic) -> String {
        let mut output = format!(
            "{}: {}: {}\n",
            diagnostic.severity,
            diagnostic.kind.name(),
            diagnostic.message
        );

        output.push_str(&format!(
            "  --> {}:{}:{}\n",
            self.name, diagnostic.start_line, diagnostic.start_column
        ));

        // The marker is placed from the byte span; the reported column
        // counts the line break on lines after the first.
        let line = self.lines.position(self.source, diagnostic.span.start as usize).line;

        if let Some(text) = self.lines.line_text(self.source, line) {
            let (line_start, _) = self
                .lines
                .line_range(self.source, line)
                .unwrap_or((0, self.source.len()));
            let offset = (diagnostic.span.start as usize).saturating_sub(line_start);
            let lead = text.get(..offset.min(text.len())).map_or(0, |s| s.chars().count());
            let width = (diagnostic.span.len() as usize).max(1);
            let width = width.min(text.len().saturating_sub(offset).max(1));

            output.push_str("   |\n");
            output.push_str(&format!("{:3} | {}\n", line, text));
            output.push_str(&format!("   | {}{}\n", " ".repeat(lead), "^".repeat(width)));
        }

        output
    }
}
