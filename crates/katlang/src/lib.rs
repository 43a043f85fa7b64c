// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! KatLang engine.
//!
//! KatLang programs are tuples of expressions with named properties. Names
//! that resolve to nothing in scope become positional parameters, so any
//! algorithm can be called and any unbound remainder is kept as a partial
//! application.
//!
//! ```
//! let outcome = katlang::parse("Func = sign(x)\nFunc(-4)");
//! assert!(outcome.is_ok());
//! assert_eq!(outcome.render(), "-1");
//! ```
//!
//! # Modules
//!
//! - [`pipeline`]: the entry points, with error recovery
//! - [`eval`]: parameter detection, scoping and reduction
//! - [`loader`]: where `load`, `join` and `open` get program text
//! - [`error`]: evaluation errors and positioned diagnostics

pub mod error;
pub mod eval;
pub mod loader;
pub mod pipeline;

pub use error::{Diagnostic, DiagnosticFormatter, ErrorKind, EvalError, Severity};
pub use loader::{FileLoader, LoadError, SourceLoader};
pub use pipeline::{parse, parse_with, EngineOptions, ParseOutcome};

// Re-export the syntax tree
pub use katlang_ast::{Algorithm, Expr, ExprKind, Span};
