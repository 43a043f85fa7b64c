//! Algorithm bodies: element lists, property declarations and conditional
//! branches.
//!
//! Grammar (informal):
//!
//! ```text
//! second_order := (comment | declaration | first_order)*
//! declaration  := IDENT '=' condition* first_order
//! condition    := '#' NUMBER (',' | ';')?
//! first_order  := expr ((',' | ';') expr)*
//! ```
//!
//! Whitespace between two expressions with no separator ends the current
//! element, so `1 2` is a program of two elements while `1, 2` is one
//! element holding a pair. A `;` separator joins its neighbours through
//! `combine`.

use indexmap::IndexMap;
use katlang_ast::language::COMBINE;
use katlang_ast::{
    Algorithm, BranchError, Condition, Conditional, Expr, ExprKind, Parameter, PropertyExecution,
    Span,
};
use katlang_lexer::Token;

use super::expr::{parse_expression, parse_parameter};
use super::{ParseError, TokenStream};

fn at_body_end(stream: &TokenStream) -> bool {
    matches!(stream.peek(), None | Some(Token::RParen | Token::RBrace))
}

/// Parse elements and property declarations up to the closing bracket or
/// end of input.
pub(super) fn parse_second_order(
    stream: &mut TokenStream,
    parametrized: bool,
) -> Result<Algorithm, ParseError> {
    let mut expressions = Vec::new();
    let mut properties: IndexMap<String, Expr> = IndexMap::new();

    while !at_body_end(stream) {
        if matches!(stream.peek(), Some(Token::Comment(_))) {
            stream.advance()?;
            continue;
        }

        let start = stream.current_offset();
        if !matches!(stream.peek(), Some(Token::Identifier(_))) {
            let element = parse_first_order(stream, None)?;
            expressions.push(element.into_expr(stream.span_from(start)));
            continue;
        }

        let name = parse_parameter(stream, false)?;
        if stream.check(&Token::Assign) {
            if name.grace != 0 {
                return Err(ParseError::invalid_syntax(
                    "grace operator '~' cannot be applied to a property name",
                    name.span,
                ));
            }
            stream.advance()?;
            let condition = parse_condition(stream)?;
            let body = parse_first_order(stream, None)?;
            let span = stream.span_from(start);
            declare(&mut properties, name, condition, body, span)?;
        } else {
            let first = parse_expression(stream, 0, Some(Expr::parameter(name)))?;
            let element = parse_first_order(stream, Some(first))?;
            expressions.push(element.into_expr(stream.span_from(start)));
        }
    }

    Ok(Algorithm::with_properties(expressions, properties).parametrized(parametrized))
}

/// Merge one declaration into the properties of the enclosing algorithm.
///
/// Declarations with a condition accumulate into a conditional property;
/// any other repeated name is rejected.
fn declare(
    properties: &mut IndexMap<String, Expr>,
    name: Parameter,
    condition: Option<Condition>,
    body: Algorithm,
    span: Span,
) -> Result<(), ParseError> {
    match properties.get_mut(&name.name) {
        Some(Expr {
            kind: ExprKind::Conditional(conditional),
            ..
        }) => conditional
            .add_branch(condition, body)
            .map_err(|error| branch_error(&name.name, error, span)),
        Some(_) => Err(ParseError::declaration(
            format!(
                "the property '{}' is already defined; branches can only be added to conditional properties",
                name.name
            ),
            span,
        )),
        None => {
            let value = match condition {
                None => body.into_expr(span),
                Some(condition) => {
                    let mut conditional = Conditional::new();
                    conditional
                        .add_branch(Some(condition), body)
                        .map_err(|error| branch_error(&name.name, error, span))?;
                    Expr::new(ExprKind::Conditional(conditional), span)
                }
            };
            properties.insert(name.name, value);
            Ok(())
        }
    }
}

fn branch_error(name: &str, error: BranchError, span: Span) -> ParseError {
    let message = match error {
        BranchError::DuplicateDefault => format!(
            "the default branch of the conditional property '{}' is already defined",
            name
        ),
        BranchError::DuplicateCondition(condition) => format!(
            "the conditional property '{}' already contains a branch with condition '{}'",
            name, condition
        ),
        BranchError::ArityMismatch { expected, found } => format!(
            "branches of the conditional property '{}' take {} condition values, found {}",
            name, expected, found
        ),
    };
    ParseError::declaration(message, span)
}

/// Leading `#value` markers of a property declaration.
fn parse_condition(stream: &mut TokenStream) -> Result<Option<Condition>, ParseError> {
    let mut values = Vec::new();
    while let Some(Token::IgnoreValue(value)) = stream.peek() {
        values.push(*value);
        stream.advance()?;
        if matches!(stream.peek(), Some(Token::Comma | Token::Semicolon)) {
            stream.advance()?;
        }
    }
    Ok((!values.is_empty()).then(|| Condition::new(values)))
}

/// Parse one element: expressions joined by `,` or `;`.
///
/// A lone algorithm is returned as-is instead of being wrapped again.
pub(super) fn parse_first_order(
    stream: &mut TokenStream,
    first: Option<Expr>,
) -> Result<Algorithm, ParseError> {
    let mut expressions: Vec<Expr> = first.into_iter().collect();

    while !at_body_end(stream) {
        let join = stream.check(&Token::Semicolon);
        if matches!(stream.peek(), Some(Token::Comma | Token::Semicolon)) {
            stream.advance()?;
        } else if !expressions.is_empty() {
            break;
        }

        let next = parse_expression(stream, 0, None)?;
        match expressions.pop() {
            Some(previous) if join => {
                let span = previous.span.merge(&next.span);
                let combine = PropertyExecution::new(
                    Parameter::new(COMBINE, span),
                    Some(Algorithm::new(vec![previous, next])),
                );
                expressions.push(Expr::property_execution(combine, span));
            }
            Some(previous) => {
                expressions.push(previous);
                expressions.push(next);
            }
            None => expressions.push(next),
        }
    }

    if expressions.len() == 1 && matches!(expressions[0].kind, ExprKind::Algorithm(_)) {
        if let Some(Expr {
            kind: ExprKind::Algorithm(algorithm),
            ..
        }) = expressions.pop()
        {
            return Ok(algorithm);
        }
    }
    Ok(Algorithm::new(expressions))
}
