//! Expression parser - precedence climbing over binary operators, calls,
//! member access and content selection.

use katlang_ast::language::{self, UNARY_PRECEDENCE};
use katlang_ast::{Algorithm, BinaryOp, Expr, ExprKind, Parameter, PropertyExecution, Span, UnaryOp};
use katlang_lexer::Token;

use super::algorithm;
use super::{ParseError, TokenStream};

/// Operator associativity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Assoc {
    Left,
    Right,
}

/// What an infix-position token does to the expression on its left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    /// `(` or `{` directly after a name
    Call,
    /// `.`
    Member,
    /// `:`
    Select,
    Binary(BinaryOp),
}

/// Get infix operator metadata (precedence, associativity, operator).
///
/// Higher precedence binds tighter. Prefix `-` and `not` sit between the
/// postfix forms (10) and `^` (8).
fn operator_info(token: &Token) -> Option<(u8, Assoc, Operator)> {
    let info = match token {
        Token::Dot => (10, Assoc::Left, Operator::Member),
        Token::LParen | Token::LBrace => (10, Assoc::Left, Operator::Call),
        Token::Colon => (10, Assoc::Left, Operator::Select),
        Token::Caret => (8, Assoc::Right, Operator::Binary(BinaryOp::Pow)),
        Token::Mod => (7, Assoc::Left, Operator::Binary(BinaryOp::Mod)),
        Token::Div => (7, Assoc::Left, Operator::Binary(BinaryOp::Div)),
        Token::Slash => (7, Assoc::Left, Operator::Binary(BinaryOp::Divide)),
        Token::Star => (7, Assoc::Left, Operator::Binary(BinaryOp::Multiply)),
        Token::Plus => (6, Assoc::Left, Operator::Binary(BinaryOp::Plus)),
        Token::Minus => (6, Assoc::Left, Operator::Binary(BinaryOp::Minus)),
        Token::Greater => (5, Assoc::Left, Operator::Binary(BinaryOp::Greater)),
        Token::GreaterEqual => (5, Assoc::Left, Operator::Binary(BinaryOp::GreaterEqual)),
        Token::Less => (5, Assoc::Left, Operator::Binary(BinaryOp::Less)),
        Token::LessEqual => (5, Assoc::Left, Operator::Binary(BinaryOp::LessEqual)),
        Token::Equal => (5, Assoc::Left, Operator::Binary(BinaryOp::Equal)),
        Token::NotEqual => (5, Assoc::Left, Operator::Binary(BinaryOp::NotEqual)),
        Token::Xor => (4, Assoc::Left, Operator::Binary(BinaryOp::Xor)),
        Token::And => (3, Assoc::Left, Operator::Binary(BinaryOp::And)),
        Token::Or => (2, Assoc::Left, Operator::Binary(BinaryOp::Or)),
        _ => return None,
    };
    Some(info)
}

fn is_call_opener(token: Option<&Token>) -> bool {
    matches!(token, Some(Token::LParen | Token::LBrace))
}

/// Parse an expression whose operators bind at least as tight as `min_prec`.
///
/// `leading` is an operand the caller already consumed (a parameter read
/// while looking for a property declaration); parsing continues with the
/// operators that follow it.
pub(super) fn parse_expression(
    stream: &mut TokenStream,
    min_prec: u8,
    leading: Option<Expr>,
) -> Result<Expr, ParseError> {
    let start = match &leading {
        Some(expr) => expr.span.start,
        None => stream.current_offset(),
    };

    let mut lhs = match leading {
        Some(expr) => expr,
        None => match stream.peek() {
            Some(Token::Minus | Token::Not) => parse_unary(stream)?,
            Some(Token::LParen) => parse_group(stream)?,
            Some(Token::LBrace) => {
                stream.advance()?;
                let mut body = algorithm::parse_second_order(stream, true)?;
                stream.expect(Token::RBrace)?;
                // `{a, b}` is the tuple itself, captured as a parametrized algorithm
                if body.properties.is_empty() && body.expressions.len() == 1 {
                    match body.expressions.pop() {
                        Some(Expr {
                            kind: ExprKind::Algorithm(inner),
                            span,
                        }) => return Ok(inner.parametrized(true).into_expr(span)),
                        Some(other) => body.expressions.push(other),
                        None => {}
                    }
                }
                body.into_expr(stream.span_from(start))
            }
            _ => parse_atom(stream)?,
        },
    };

    while let Some(token) = stream.peek() {
        let Some((prec, assoc, operator)) = operator_info(token) else {
            break;
        };
        if prec < min_prec {
            break;
        }
        let next_prec = if assoc == Assoc::Left { prec + 1 } else { prec };
        let operator_span = stream.current_span();

        lhs = match operator {
            Operator::Call => {
                // Brackets after anything but a name start the next element
                let identity = match lhs {
                    Expr {
                        kind: ExprKind::Parameter(parameter),
                        ..
                    } => parameter,
                    other => return Ok(other),
                };
                if identity.ignored {
                    return Err(ParseError::invalid_syntax(
                        "operator '#' cannot be applied to property calls",
                        operator_span,
                    ));
                }
                let input = parse_expression(stream, next_prec, None)?;
                call(identity, input, stream.span_from(start))
            }
            Operator::Member => {
                stream.advance()?;
                if !matches!(
                    stream.peek(),
                    Some(Token::Identifier(_) | Token::Property(_) | Token::Tilde)
                ) {
                    return Err(ParseError::invalid_syntax(
                        format!(
                            "'.' must be followed by a property name, found {}",
                            describe(stream.peek())
                        ),
                        operator_span,
                    ));
                }
                let property = parse_parameter(stream, false)?;
                if is_call_opener(stream.peek()) {
                    let input = parse_expression(stream, next_prec, None)?.into_algorithm();
                    let execution = PropertyExecution::new(property, Some(input)).with_parent(lhs);
                    Expr::property_execution(execution, stream.span_from(start))
                } else {
                    Expr::property_access(lhs, property, stream.span_from(start))
                }
            }
            Operator::Select => {
                stream.advance()?;
                if !matches!(
                    lhs.kind,
                    ExprKind::Parameter(_)
                        | ExprKind::Algorithm(_)
                        | ExprKind::PropertyExecution(_)
                        | ExprKind::PropertyAccess { .. }
                ) {
                    return Err(ParseError::invalid_syntax(
                        "selected content must be an algorithm or a parameter",
                        operator_span,
                    ));
                }
                if stream.at_end() {
                    return Err(ParseError::invalid_syntax(
                        "selector not provided",
                        operator_span,
                    ));
                }
                let selector = parse_expression(stream, next_prec, None)?;
                if !matches!(
                    selector.kind,
                    ExprKind::Parameter(_) | ExprKind::Constant(_)
                ) {
                    return Err(ParseError::invalid_syntax(
                        "selector must be a constant or a parameter",
                        operator_span,
                    ));
                }
                Expr::content_selection(lhs, selector, stream.span_from(start))
            }
            Operator::Binary(op) => {
                stream.advance()?;
                let rhs = parse_expression(stream, next_prec, None)?;
                Expr::binary(op, Some(lhs), Some(rhs), stream.span_from(start))
            }
        };
    }

    lhs.span = stream.span_from(start);
    Ok(lhs)
}

/// Build the call `identity(input)`.
///
/// A member call or access on the right-hand side is re-associated so the
/// call applies to its base: `f(x).g(y)` style chains keep `f(x)` as the
/// parent of `g`.
fn call(identity: Parameter, input: Expr, span: Span) -> Expr {
    match input.kind {
        ExprKind::PropertyExecution(mut execution) if execution.parent.is_some() => {
            let parent_input = execution.parent.take().and_then(|parent| match parent.kind {
                ExprKind::Algorithm(algorithm) => Some(algorithm),
                _ => None,
            });
            let parent = PropertyExecution::new(identity, parent_input);
            execution.parent = Some(Box::new(Expr::property_execution(parent, span)));
            Expr::property_execution(execution, span)
        }
        ExprKind::PropertyAccess { base, property } => {
            let body = PropertyExecution::new(identity, Some((*base).into_algorithm()));
            let body = Expr::property_execution(body, span);
            Expr::property_execution(
                PropertyExecution::new(property, Some(Algorithm::new(vec![body]))),
                span,
            )
        }
        kind => {
            let input = Expr::new(kind, input.span).into_algorithm();
            Expr::property_execution(PropertyExecution::new(identity, Some(input)), span)
        }
    }
}

fn parse_unary(stream: &mut TokenStream) -> Result<Expr, ParseError> {
    let start = stream.current_offset();
    let span = stream.current_span();
    let op = match stream.peek() {
        Some(Token::Minus) => UnaryOp::Negate,
        Some(Token::Not) => UnaryOp::Not,
        other => return Err(ParseError::unexpected_token(other, "as unary operator", span)),
    };
    stream.advance()?;

    let operand = parse_expression(stream, UNARY_PRECEDENCE + 1, None)?;
    Ok(Expr::unary(op, operand, stream.span_from(start)))
}

/// `( ... )`: a single element without properties stands for itself.
fn parse_group(stream: &mut TokenStream) -> Result<Expr, ParseError> {
    let start = stream.current_offset();
    stream.expect(Token::LParen)?;
    let mut body = algorithm::parse_second_order(stream, false)?;
    stream.expect(Token::RParen)?;

    if body.expressions.len() == 1 && body.properties.is_empty() {
        if let Some(only) = body.expressions.pop() {
            return Ok(only);
        }
    }
    Ok(body.into_expr(stream.span_from(start)))
}

fn parse_atom(stream: &mut TokenStream) -> Result<Expr, ParseError> {
    let span = stream.current_span();
    match stream.peek() {
        Some(Token::Number(value)) => {
            let value = *value;
            stream.advance()?;
            Ok(Expr::constant(value, span))
        }
        Some(Token::Text(text)) => {
            let text = text.to_string();
            stream.advance()?;
            Ok(Expr::text(text, span))
        }
        Some(Token::Comment(_)) => {
            stream.advance()?;
            parse_atom(stream)
        }
        Some(Token::Constant(name)) => {
            let value = match name.as_ref() {
                language::PI => std::f64::consts::PI,
                language::EXP => std::f64::consts::E,
                _ => {
                    return Err(ParseError::unexpected_token(
                        stream.peek(),
                        "as constant",
                        span,
                    ))
                }
            };
            stream.advance()?;
            Ok(Expr::constant(value, span))
        }
        Some(Token::Tilde | Token::Identifier(_) | Token::Property(_)) => {
            parse_parameter(stream, false).map(Expr::parameter)
        }
        Some(Token::IgnoreParameter(_)) => parse_parameter(stream, true).map(Expr::parameter),
        Some(Token::Ignore) => {
            stream.advance()?;
            Ok(Expr::new(ExprKind::IgnoreArgument, span))
        }
        Some(Token::IgnoreValue(_)) => Err(ParseError::invalid_syntax(
            "condition values like '#1' can only open a property declaration",
            span,
        )),
        other => Err(ParseError::unexpected_token(
            other,
            "where an expression was expected",
            span,
        )),
    }
}

/// Parse a name with its `~` markers.
///
/// Built-in property keywords are read as plain names and take no markers.
pub(super) fn parse_parameter(
    stream: &mut TokenStream,
    ignored: bool,
) -> Result<Parameter, ParseError> {
    let start = stream.current_offset();

    if let Some(Token::Property(name)) = stream.peek() {
        let name = name.to_string();
        stream.advance()?;
        return Ok(Parameter::new(name, stream.span_from(start)));
    }

    let mut grace = 0;
    while stream.check(&Token::Tilde) {
        stream.advance()?;
        grace -= 1;
    }

    let name = match (stream.peek(), ignored) {
        (Some(Token::Identifier(name)), false) | (Some(Token::IgnoreParameter(name)), true) => {
            name.to_string()
        }
        (found, _) => {
            let context = if ignored {
                "where an ignored parameter was expected"
            } else {
                "where an identifier was expected"
            };
            return Err(ParseError::unexpected_token(
                found,
                context,
                stream.current_span(),
            ));
        }
    };
    stream.advance()?;

    while stream.check(&Token::Tilde) {
        stream.advance()?;
        grace += 1;
    }

    let parameter = Parameter::new(name, stream.span_from(start)).with_grace(grace);
    Ok(if ignored { parameter.ignored() } else { parameter })
}

fn describe(token: Option<&Token>) -> String {
    match token {
        Some(token) => format!("'{}'", token),
        None => "end of input".to_string(),
    }
}
