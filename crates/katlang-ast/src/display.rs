//! Canonical source rendering.
//!
//! A rendered expression reads back as the same program fragment:
//!
//! | Node | Rendering |
//! |------|-----------|
//! | number | shortest round-trip decimal (`1.234`, `-1`) |
//! | text | `'abc'` |
//! | binary | operands joined by the operator, no spaces (`a+b`) |
//! | call | `name(args)` |
//! | tuple | comma separated; parenthesised once something precedes it |
//!
//! Displaying a top-level algorithm puts each tuple element on its own line.

use std::fmt;

use crate::expr::{Algorithm, Conditional, Expr, ExprKind};
use crate::language::UnaryOp;

/// Render a number the way results are printed.
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else {
        format!("{}", value)
    }
}

/// Render one expression as a single line.
pub fn render(expr: &Expr) -> String {
    let mut out = String::new();
    write_expr(&mut out, expr);
    out
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Algorithm(algorithm) => {
                let mut out = String::new();
                for element in &algorithm.expressions {
                    let line = render(element);
                    if !out.is_empty() {
                        out.push('\n');
                    }
                    out.push_str(&line);
                }
                f.write_str(&out)
            }
            _ => f.write_str(&render(self)),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        write_algorithm(&mut out, self);
        f.write_str(&out)
    }
}

fn write_expr(out: &mut String, expr: &Expr) {
    match &expr.kind {
        ExprKind::Constant(value) => out.push_str(&format_number(*value)),
        ExprKind::Text(text) => {
            out.push('\'');
            out.push_str(text);
            out.push('\'');
        }
        ExprKind::Parameter(parameter) => {
            if parameter.ignored {
                out.push('#');
            }
            out.push_str(&parameter.name);
        }
        ExprKind::IgnoreArgument => out.push('#'),
        ExprKind::Unary { op, operand } => {
            out.push_str(match op {
                UnaryOp::Negate => "-",
                UnaryOp::Not => "not ",
            });
            write_expr(out, operand);
        }
        ExprKind::Binary { op, lhs, rhs } => {
            if let Some(lhs) = lhs {
                write_expr(out, lhs);
            }
            out.push_str(op.symbol());
            if let Some(rhs) = rhs {
                write_expr(out, rhs);
            }
        }
        ExprKind::ContentSelection { content, selector } => {
            write_expr(out, content);
            out.push(':');
            write_expr(out, selector);
        }
        ExprKind::PropertyAccess { base, property } => {
            write_expr(out, base);
            out.push('.');
            out.push_str(&property.name);
        }
        ExprKind::PropertyExecution(execution) => {
            if let Some(parent) = &execution.parent {
                write_expr(out, parent);
                out.push('.');
            }
            out.push_str(&execution.identity.name);
            if let Some(input) = &execution.input {
                write_algorithm(out, input);
            }
        }
        ExprKind::AlgorithmExecution(execution) => {
            write_algorithm(out, &execution.algorithm);
            if let Some(input) = &execution.input {
                write_algorithm(out, input);
            }
        }
        ExprKind::Algorithm(algorithm) => write_algorithm(out, algorithm),
        ExprKind::Conditional(conditional) => write_conditional(out, conditional),
    }
}

fn write_algorithm(out: &mut String, algorithm: &Algorithm) {
    let nested = !out.is_empty();
    if nested {
        out.push('(');
    }
    for (i, element) in algorithm.expressions.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_expr(out, element);
    }
    if nested {
        out.push(')');
    }
}

fn write_conditional(out: &mut String, conditional: &Conditional) {
    out.push('(');
    let branches = conditional
        .branches
        .iter()
        .map(|(condition, body)| (Some(condition), body))
        .chain(conditional.default_branch.iter().map(|body| (None, body)));
    for (i, (condition, body)) in branches.enumerate() {
        if i > 0 {
            out.push(';');
        }
        match condition {
            Some(condition) => out.push_str(&condition.to_string()),
            None => out.push('#'),
        }
        for element in &body.expressions {
            out.push(',');
            write_expr(out, element);
        }
    }
    out.push(')');
}
