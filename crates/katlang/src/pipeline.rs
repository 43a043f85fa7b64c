//! Parse and evaluate a program, collecting every diagnostic.
//!
//! A parse error does not end the run. The error is recorded, the lexer
//! restarts right after it in recovery mode (skipping to the next token that
//! can begin an element) and parsing starts over on the remaining text. Once
//! a parse succeeds the program is bound; a binding error is recorded the
//! same way and the run restarts after the failing expression. Each restart
//! must move past the previous failure, otherwise the run stops.
//!
//! The value is only kept when no diagnostic was produced. Otherwise it is
//! the empty algorithm.

use std::path::PathBuf;
use std::sync::Arc;

use katlang_ast::{Algorithm, Expr, LineIndex, Span};
use katlang_parser::parse_program;
use tracing::debug;

use crate::error::{Diagnostic, DiagnosticFormatter};
use crate::eval::Binder;
use crate::loader::SourceLoader;

/// Host-provided collaborators.
#[derive(Clone, Default)]
pub struct EngineOptions {
    /// Serves `load` and `join` addresses. Without one both fail.
    pub loader: Option<Arc<dyn SourceLoader>>,
    /// Directory `open` paths are resolved against; the working directory
    /// when unset.
    pub open_root: Option<PathBuf>,
}

impl EngineOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_loader(mut self, loader: impl SourceLoader + 'static) -> Self {
        self.loader = Some(Arc::new(loader));
        self
    }

    pub fn with_open_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.open_root = Some(root.into());
        self
    }
}

impl std::fmt::Debug for EngineOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineOptions")
            .field("loader", &self.loader.as_ref().map(|_| "<loader>"))
            .field("open_root", &self.open_root)
            .finish()
    }
}

/// Result of one run.
#[derive(Debug, Clone)]
pub struct ParseOutcome {
    /// Reduced program; the empty algorithm whenever diagnostics exist
    pub value: Expr,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseOutcome {
    pub fn is_ok(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Canonical text of the value.
    pub fn render(&self) -> String {
        self.value.to_string()
    }

    /// All diagnostics rendered against `source`.
    pub fn report(&self, source: &str, name: &str) -> String {
        let formatter = DiagnosticFormatter::new(source).with_name(name);
        self.diagnostics
            .iter()
            .map(|diagnostic| formatter.format(diagnostic))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Parse and evaluate `source` with default options.
pub fn parse(source: &str) -> ParseOutcome {
    parse_with(source, &EngineOptions::default())
}

/// Parse and evaluate `source`.
pub fn parse_with(source: &str, options: &EngineOptions) -> ParseOutcome {
    let mut lines = LineIndex::new();
    let mut diagnostics = Vec::new();
    let mut value = None;
    let mut resume = 0;

    loop {
        let recover = !diagnostics.is_empty();
        match parse_program(source, resume, recover, &mut lines) {
            Ok(program) => {
                let span = Span::from_range(0..source.len());
                match Binder::new(options).bind(program, span) {
                    Ok(bound) => {
                        value = bound;
                        break;
                    }
                    Err(error) => {
                        diagnostics.push(Diagnostic::from_eval_error(&error, source, &lines));
                        let end = error.span().end as usize;
                        if end <= resume {
                            debug!(%error, resume, "binding error without progress, giving up");
                            break;
                        }
                        debug!(%error, resume = end, "restarting after binding error");
                        resume = end;
                    }
                }
            }
            Err(error) => {
                diagnostics.push(Diagnostic::from_parse_error(&error, source, &lines));
                let end = error.span.end as usize;
                if end <= resume {
                    debug!(%error, resume, "parse error without progress, giving up");
                    break;
                }
                debug!(%error, resume = end, "restarting after parse error");
                resume = end;
            }
        }
    }

    let value = match value {
        Some(value) if diagnostics.is_empty() => value,
        _ => Algorithm::default().into_expr(Span::default()),
    };
    ParseOutcome { value, diagnostics }
}
