//! Evaluation of parsed programs.
//!
//! # Architecture
//!
//! - [`detector`]: infers the ordered positional parameters of an algorithm
//! - [`environment`]: the chain of frames opened by active calls
//! - `binder`: reduces the tree, leaving residual calls where names are
//!   still unbound
//! - `builtins`: the numeric folds behind the built-in math algorithms

mod binder;
mod builtins;
pub mod detector;
pub mod environment;

pub use binder::Binder;
