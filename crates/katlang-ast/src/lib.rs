// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Expression tree for KatLang.
//!
//! # Architecture
//!
//! - [`span`]: byte ranges and line/column mapping
//! - [`language`]: operator tags, built-in algorithms, reserved words
//! - [`expr`]: the closed expression enum and its composite values
//!   (algorithms, conditional algorithms, dispatch conditions)
//! - [`display`]: canonical rendering back to source text

pub mod display;
pub mod expr;
pub mod language;
pub mod span;

pub use display::{format_number, render};
pub use expr::{
    Algorithm, AlgorithmExecution, BranchError, Condition, Conditional, Expr, ExprKind, Parameter,
    Properties, PropertyExecution,
};
pub use language::{BinaryOp, UnaryOp};
pub use span::{LineIndex, Span, TextPosition};
