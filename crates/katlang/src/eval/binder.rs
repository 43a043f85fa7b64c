//! Reduction of a parsed program to its value.
//!
//! The binder rewrites the tree bottom-up. Every visit either reduces a node
//! to something simpler or hands back a residual node that still mentions
//! unbound names, so a program with free parameters evaluates to a partial
//! application instead of failing. `None` stands for "nothing": an ignored
//! slot, a branch that produced no value, a `join`.
//!
//! Calls push a frame onto the [`Environment`] and pop it on return. The
//! frame chain follows active calls, so a callee sees the bindings of
//! whoever invoked it.

use std::f64::consts;

use katlang_ast::language::{
    builtin_arity, COMBINE, EXP, IF, JOIN, LENGTH, LOAD, LOOP, OPEN, PI, REPEAT, REVERSE, STRING,
};
use katlang_ast::{
    format_number, Algorithm, AlgorithmExecution, BinaryOp, Condition, Conditional, Expr,
    ExprKind, Parameter, Properties, PropertyExecution, Span, UnaryOp,
};
use tracing::trace;

use super::builtins;
use super::detector;
use super::environment::Environment;
use crate::error::EvalError;
use crate::loader::{FileLoader, SourceLoader};
use crate::pipeline::{self, EngineOptions};

type Reduced = Result<Option<Expr>, EvalError>;

pub struct Binder<'a> {
    env: Environment,
    options: &'a EngineOptions,
}

impl<'a> Binder<'a> {
    pub fn new(options: &'a EngineOptions) -> Self {
        Self {
            env: Environment::new(),
            options,
        }
    }

    /// Reduce a whole program.
    ///
    /// The root's own parameters are detected before its properties are in
    /// scope, so a property the root refers to also occupies an (unbound)
    /// root parameter slot.
    pub fn bind(&mut self, program: Algorithm, span: Span) -> Reduced {
        let parameters = self.parameters_of(&program);
        self.invoke(program, parameters, Vec::new(), None, span)
    }

    fn parameters_of(&self, algorithm: &Algorithm) -> Vec<String> {
        let env = &self.env;
        detector::ordered_parameters(algorithm, &|name| env.contains_algorithm(name))
    }

    fn mentions(&self, name: &str, expr: &Expr) -> bool {
        let env = &self.env;
        detector::contains_parameter(name, expr, &|candidate| env.contains_algorithm(candidate))
    }

    /// Run `algorithm` in a fresh frame.
    fn invoke(
        &mut self,
        algorithm: Algorithm,
        parameters: Vec<String>,
        arguments: Vec<Expr>,
        identity: Option<&Parameter>,
        span: Span,
    ) -> Reduced {
        trace!(
            callee = identity.map_or("<anonymous>", |identity| identity.name.as_str()),
            depth = self.env.depth(),
            ?parameters,
            "invoke"
        );
        self.env
            .push(&algorithm.properties, parameters, arguments, identity)?;
        let result = self.visit_algorithm(algorithm, span);
        self.env.pop();
        result
    }

    fn visit(&mut self, expr: Expr) -> Reduced {
        let span = expr.span;
        match expr.kind {
            ExprKind::Constant(value) => Ok(Some(Expr::constant(value, span))),
            ExprKind::Text(text) => Ok(Some(Expr::text(text, span))),
            ExprKind::Parameter(parameter) => self.visit_parameter(parameter),
            ExprKind::IgnoreArgument => Ok(None),
            ExprKind::Unary { op, operand } => self.visit_unary(op, *operand, span),
            ExprKind::Binary { op, lhs, rhs } => self.visit_binary(op, lhs, rhs, span),
            ExprKind::ContentSelection { content, selector } => {
                self.visit_selection(*content, *selector, span)
            }
            ExprKind::PropertyAccess { base, property } => {
                self.visit_property_access(*base, property, span)
            }
            ExprKind::PropertyExecution(execution) => {
                self.visit_property_execution(execution, span)
            }
            ExprKind::AlgorithmExecution(execution) => {
                self.visit_algorithm_execution(execution, span)
            }
            ExprKind::Algorithm(algorithm) => self.visit_algorithm(algorithm, span),
            ExprKind::Conditional(conditional) => self.visit_conditional(conditional, span),
        }
    }

    /// Visit each expression, dropping those that reduce to nothing.
    fn visit_all(&mut self, expressions: Vec<Expr>) -> Result<Vec<Expr>, EvalError> {
        let mut visited = Vec::with_capacity(expressions.len());
        for expr in expressions {
            if let Some(expr) = self.visit(expr)? {
                visited.push(expr);
            }
        }
        Ok(visited)
    }

    fn visit_algorithm(&mut self, algorithm: Algorithm, span: Span) -> Reduced {
        let Algorithm {
            expressions,
            properties,
            parametrized,
        } = algorithm;
        let expressions = self.visit_all(expressions)?;
        let algorithm = Algorithm {
            expressions,
            properties,
            parametrized,
        };
        Ok(self.normalize(algorithm.into_expr(span)))
    }

    /// Collapse trivial tuples.
    ///
    /// Only algorithms without properties are touched. An empty tuple is
    /// nothing; a single element stands for itself unless the tuple is a
    /// parametrized block that still has parameters; longer tuples normalize
    /// each element and drop the ones left empty.
    fn normalize(&self, expr: Expr) -> Option<Expr> {
        let span = expr.span;
        let mut algorithm = match expr.kind {
            ExprKind::Algorithm(algorithm) if algorithm.properties.is_empty() => algorithm,
            kind => return Some(Expr::new(kind, span)),
        };

        match algorithm.expressions.len() {
            0 => None,
            1 => {
                if algorithm.parametrized && !self.parameters_of(&algorithm).is_empty() {
                    return Some(algorithm.into_expr(span));
                }
                let only = algorithm.expressions.pop()?;
                self.normalize(only)
            }
            _ => {
                let expressions = std::mem::take(&mut algorithm.expressions);
                algorithm.expressions = expressions
                    .into_iter()
                    .map(|element| {
                        self.normalize(element)
                            .unwrap_or_else(|| Algorithm::default().into_expr(span))
                    })
                    .filter(|element| {
                        !matches!(&element.kind, ExprKind::Algorithm(inner) if inner.expressions.is_empty())
                    })
                    .collect();
                Some(algorithm.into_expr(span))
            }
        }
    }

    fn visit_parameter(&mut self, parameter: Parameter) -> Reduced {
        if parameter.ignored {
            return Ok(None);
        }
        if let Some(value) = self.env.parameter(&parameter.name).cloned() {
            // a value mentioning its own name would expand forever
            if self.mentions(&parameter.name, &value) {
                return Ok(Some(value));
            }
            return self.visit(value);
        }
        if let Some(body) = self.env.algorithm(&parameter.name) {
            return self.visit(body);
        }
        let span = parameter.span;
        Ok(Some(match parameter.name.as_str() {
            PI => Expr::constant(consts::PI, span),
            EXP => Expr::constant(consts::E, span),
            _ => Expr::parameter(parameter),
        }))
    }

    fn visit_unary(&mut self, op: UnaryOp, operand: Expr, span: Span) -> Reduced {
        let original = operand.clone();
        Ok(Some(match self.visit(operand)? {
            Some(Expr {
                kind: ExprKind::Constant(value),
                ..
            }) => Expr::constant(op.apply(value), span),
            Some(operand) => Expr::unary(op, operand, span),
            None => Expr::unary(op, original, span),
        }))
    }

    fn visit_binary(
        &mut self,
        op: BinaryOp,
        lhs: Option<Box<Expr>>,
        rhs: Option<Box<Expr>>,
        span: Span,
    ) -> Reduced {
        let lhs = match lhs {
            Some(lhs) => self.visit(*lhs)?.map(leading_element),
            None => None,
        };
        let rhs = match rhs {
            Some(rhs) => self.visit(*rhs)?.map(leading_element),
            None => None,
        };

        match (lhs, rhs) {
            (
                Some(Expr {
                    kind: ExprKind::Constant(a),
                    ..
                }),
                Some(Expr {
                    kind: ExprKind::Constant(b),
                    ..
                }),
            ) => Ok(Some(Expr::constant(op.apply(a, b), span))),
            (
                Some(Expr {
                    kind: ExprKind::Text(a),
                    ..
                }),
                Some(Expr {
                    kind: ExprKind::Text(b),
                    ..
                }),
            ) if matches!(op, BinaryOp::Equal | BinaryOp::NotEqual) => {
                let same = a == b;
                let holds = if op == BinaryOp::Equal { same } else { !same };
                Ok(Some(Expr::constant(if holds { 1.0 } else { 0.0 }, span)))
            }
            (None, None) => Ok(None),
            // a missing right operand is absorbed by every operator
            (Some(lhs), None) => Ok(Some(lhs)),
            (None, Some(rhs)) if op.is_symmetric() => Ok(Some(rhs)),
            (lhs, rhs) => Ok(Some(Expr::binary(op, lhs, rhs, span))),
        }
    }

    fn visit_selection(&mut self, content: Expr, selector: Expr, span: Span) -> Reduced {
        let content = self.visit(content)?.ok_or_else(|| {
            EvalError::invalid_argument(
                "content selection cannot be applied to empty content",
                span,
            )
        })?;
        let Some(selector) = self.visit(selector)? else {
            return Ok(Some(content));
        };
        let Some(index) = selector.as_constant() else {
            return Ok(Some(Expr::content_selection(content, selector, span)));
        };

        let content_span = content.span;
        match content.kind {
            ExprKind::Algorithm(algorithm) => {
                let len = algorithm.expressions.len();
                usize::try_from(index as i64)
                    .ok()
                    .and_then(|position| algorithm.expressions.into_iter().nth(position))
                    .map(Some)
                    .ok_or(EvalError::IndexOutOfRange { index, len, span })
            }
            // a number is a one-element tuple
            ExprKind::Constant(value) => {
                if index != 0.0 {
                    return Err(EvalError::IndexOutOfRange { index, len: 1, span });
                }
                Ok(Some(Expr::constant(value, content_span)))
            }
            kind => Ok(Some(Expr::content_selection(
                Expr::new(kind, content_span),
                selector,
                span,
            ))),
        }
    }

    fn visit_property_access(&mut self, base: Expr, property: Parameter, span: Span) -> Reduced {
        let base_is_name = matches!(base.kind, ExprKind::Parameter(_));
        let original = base.clone();

        let visited = match self.visit(base)? {
            Some(Expr {
                kind: ExprKind::Algorithm(mut algorithm),
                ..
            }) => {
                if let Some(body) = algorithm.properties.shift_remove(&property.name) {
                    return Ok(Some(body));
                }
                if property.name == LENGTH {
                    let len = algorithm.expressions.len() as f64;
                    return Ok(Some(Expr::constant(len, span)));
                }
                let execution = PropertyExecution::new(property, Some(algorithm));
                return self.visit_property_execution(execution, span);
            }
            visited => visited,
        };

        // extension call: the receiver becomes the first argument
        if let Some(Expr {
            kind: ExprKind::Algorithm(extension),
            ..
        }) = self.env.algorithm(&property.name)
        {
            let input = visited.map(Expr::into_algorithm).unwrap_or_default();
            let execution = AlgorithmExecution {
                algorithm: extension,
                input: Some(input),
                identity: Some(property),
            };
            return self.visit_algorithm_execution(execution, span);
        }

        match visited {
            Some(Expr {
                kind: ExprKind::Constant(value),
                span: base_span,
            }) => {
                if property.name == STRING {
                    return Ok(Some(Expr::text(format_number(value), span)));
                }
                let execution = AlgorithmExecution {
                    algorithm: Algorithm::new(vec![Expr::parameter(property)]),
                    input: Some(Algorithm::new(vec![Expr::constant(value, base_span)])),
                    identity: None,
                };
                self.visit_algorithm_execution(execution, span)
            }
            Some(Expr {
                kind: ExprKind::Text(text),
                ..
            }) => {
                if property.name == REVERSE {
                    return Ok(Some(Expr::text(reversed(&text), span)));
                }
                Err(EvalError::UnknownProperty {
                    name: property.name,
                    span,
                })
            }
            Some(
                receiver @ Expr {
                    kind: ExprKind::PropertyExecution(_),
                    ..
                },
            ) => {
                if base_is_name {
                    return Err(EvalError::UnknownProperty {
                        name: property.name,
                        span,
                    });
                }
                let execution = PropertyExecution::new(property, Some(receiver.into_algorithm()));
                self.visit_property_execution(execution, span)
            }
            visited => Ok(Some(Expr::property_access(
                visited.unwrap_or(original),
                property,
                span,
            ))),
        }
    }

    fn visit_algorithm_execution(&mut self, execution: AlgorithmExecution, span: Span) -> Reduced {
        let AlgorithmExecution {
            algorithm,
            input,
            identity,
        } = execution;

        // a body that only reads a member: `K = a.t` or `Add1.Add1.Check`
        if let [Expr {
            kind: ExprKind::PropertyAccess { base, property },
            ..
        }] = algorithm.expressions.as_slice()
        {
            let free_base = matches!(
                &base.kind,
                ExprKind::Parameter(name) if !self.env.contains_algorithm(&name.name)
            );
            if free_base {
                let parameters = self.parameters_of(&algorithm);
                let arguments = input.map(|input| input.expressions).unwrap_or_default();
                return self.invoke(algorithm, parameters, arguments, identity.as_ref(), span);
            }

            let base = (**base).clone();
            let property = property.clone();
            let base_span = base.span;
            let receiver = AlgorithmExecution {
                algorithm: base.into_algorithm(),
                input,
                identity: None,
            };
            let receiver = self.visit_algorithm_execution(receiver, span)?.ok_or_else(|| {
                EvalError::invalid_argument(
                    format!(
                        "attempt to access the property '{}' of an invalid object",
                        property.name
                    ),
                    base_span,
                )
            })?;
            return self.visit_property_access(receiver, property, span);
        }

        // a body that is a bare name takes the parameters of what it names
        let mut resolved = None;
        if let [Expr {
            kind: ExprKind::Parameter(name),
            ..
        }] = algorithm.expressions.as_slice()
        {
            resolved = self.visit_parameter(name.clone())?;
        }
        let parameters = match resolved {
            Some(value) => self.parameters_of(&value.into_algorithm()),
            None => self.parameters_of(&algorithm),
        };
        let arguments = input.map(|input| input.expressions).unwrap_or_default();
        self.invoke(algorithm, parameters, arguments, identity.as_ref(), span)
    }

    fn visit_property_execution(&mut self, execution: PropertyExecution, span: Span) -> Reduced {
        let PropertyExecution {
            identity,
            input,
            parent,
        } = execution;

        if let Some(parent) = parent {
            return self.visit_member_call(identity, input, *parent, span);
        }

        match identity.name.as_str() {
            REPEAT => return self.repeat(identity, input, span),
            LOOP => return self.run_loop(identity, input, span),
            LOAD => return self.load(identity, input, span),
            OPEN => return self.open(identity, input, span),
            JOIN => return self.join(identity, input, span),
            COMBINE => return self.combine(identity, input, span),
            _ => {}
        }

        let visited_input = match &input {
            Some(input) => self.visit_algorithm(input.clone(), span)?,
            None => None,
        };
        let input_algorithm = input.as_ref().map(|_| match &visited_input {
            Some(Expr {
                kind: ExprKind::Algorithm(algorithm),
                ..
            }) => algorithm.clone(),
            Some(value) => Algorithm::new(vec![value.clone()]),
            None => Algorithm::default(),
        });

        match (identity.name.as_str(), &visited_input) {
            (
                STRING,
                Some(Expr {
                    kind: ExprKind::Constant(value),
                    ..
                }),
            ) => return Ok(Some(Expr::text(format_number(*value), span))),
            (
                REVERSE,
                Some(Expr {
                    kind: ExprKind::Text(text),
                    ..
                }),
            ) => return Ok(Some(Expr::text(reversed(text), span))),
            // constants ignore their input
            (PI, _) => return Ok(Some(Expr::constant(consts::PI, span))),
            (EXP, _) => return Ok(Some(Expr::constant(consts::E, span))),
            _ => {}
        }

        if let Some(arity) = builtin_arity(&identity.name) {
            return self.call_builtin(identity, arity, arguments_of(visited_input.as_ref()), span);
        }

        if let Some(property) = self.env.algorithm(&identity.name) {
            return match property.kind {
                ExprKind::Conditional(conditional) => {
                    self.dispatch(conditional, identity, input, visited_input.as_ref(), span)
                }
                ExprKind::Algorithm(algorithm) => {
                    if let Some(input) = &input_algorithm {
                        if !input.parametrized && self.has_unbound_parameters(input) {
                            return Ok(Some(residual(identity, input_algorithm, span)));
                        }
                    }
                    let execution = AlgorithmExecution {
                        algorithm,
                        input: input_algorithm,
                        identity: Some(identity),
                    };
                    self.visit_algorithm_execution(execution, span)
                }
                _ => Ok(Some(property)),
            };
        }

        if identity.name == IF {
            return self.conditional_value(identity, input, visited_input.as_ref(), span);
        }

        // a parameter bound to an algorithm value
        if let Some(value) = self.env.parameter(&identity.name).cloned() {
            let execution = AlgorithmExecution {
                algorithm: value.into_algorithm(),
                input: input_algorithm,
                identity: Some(identity),
            };
            return self.visit_algorithm_execution(execution, span);
        }

        Ok(Some(residual(identity, input_algorithm, span)))
    }

    /// `parent.identity(input)`
    fn visit_member_call(
        &mut self,
        identity: Parameter,
        input: Option<Algorithm>,
        parent: Expr,
        span: Span,
    ) -> Reduced {
        if let ExprKind::Parameter(name) = &parent.kind {
            if let Some(Expr {
                kind: ExprKind::Algorithm(mut receiver),
                ..
            }) = self.visit_parameter(name.clone())?
            {
                if let Some(body) = receiver.properties.shift_remove(&identity.name) {
                    let execution = AlgorithmExecution {
                        algorithm: body.into_algorithm(),
                        input,
                        identity: None,
                    };
                    return self.visit_algorithm_execution(execution, span);
                }
            }
        }

        let mut expressions = vec![parent];
        if let Some(input) = input {
            expressions.extend(input.expressions);
        }
        let execution = PropertyExecution::new(identity, Some(Algorithm::new(expressions)));
        self.visit_property_execution(execution, span)
    }

    fn has_unbound_parameters(&self, input: &Algorithm) -> bool {
        self.parameters_of(input)
            .iter()
            .any(|name| self.env.parameter(name).is_none())
    }

    fn call_builtin(
        &mut self,
        identity: Parameter,
        arity: usize,
        arguments: Vec<Expr>,
        span: Span,
    ) -> Reduced {
        if arity > arguments.len() {
            return Err(EvalError::Arity {
                name: identity.name,
                expected: arity,
                found: arguments.len(),
                span,
            });
        }
        let values: Option<Vec<f64>> = arguments[..arity].iter().map(Expr::as_constant).collect();
        if let Some(value) = values.and_then(|values| builtins::fold(&identity.name, &values)) {
            return Ok(Some(Expr::constant(value, span)));
        }
        Ok(Some(residual(identity, Some(Algorithm::new(arguments)), span)))
    }

    /// Select and run the branch of a conditional property.
    ///
    /// The leading `parameter_count` arguments form the condition; they
    /// must all reduce to numbers, otherwise the call stays unresolved. An
    /// exact match consumes those arguments, the default branch receives
    /// all of them.
    fn dispatch(
        &mut self,
        conditional: Conditional,
        identity: Parameter,
        input: Option<Algorithm>,
        visited_input: Option<&Expr>,
        span: Span,
    ) -> Reduced {
        let arguments = arguments_of(visited_input);
        let count = conditional.parameter_count;
        if count > arguments.len() {
            return Err(EvalError::Arity {
                name: identity.name,
                expected: count,
                found: arguments.len(),
                span,
            });
        }

        let mut values = Vec::with_capacity(count);
        for argument in &arguments[..count] {
            match self.visit(argument.clone())?.and_then(|value| value.as_constant()) {
                Some(value) => values.push(value),
                None => return Ok(Some(residual(identity, input, span))),
            }
        }

        let condition = Condition::new(values);
        let Conditional {
            properties,
            mut branches,
            default_branch,
            ..
        } = conditional;
        let (branch, start) = match branches.shift_remove(&condition) {
            Some(branch) => (Some(branch), count),
            None => (default_branch, 0),
        };

        let remaining = self.visit_all(arguments.into_iter().skip(start).collect())?;
        let Some(branch) = branch else {
            return Err(EvalError::MissingBranch {
                condition: condition.to_string(),
                span: identity.span,
            });
        };

        trace!(callee = %identity.name, %condition, "dispatch");
        let parameters = self.parameters_of(&branch);
        self.env
            .push(&properties, parameters, remaining, Some(&identity))?;
        let results = self.visit_all(branch.expressions);
        self.env.pop();

        let mut results = results?;
        Ok(match results.len() {
            0 => None,
            1 => results.pop(),
            _ => Some(Algorithm::new(results).into_expr(span)),
        })
    }

    /// `if(condition, then)` and `if(condition, then, else)`
    fn conditional_value(
        &mut self,
        identity: Parameter,
        input: Option<Algorithm>,
        visited_input: Option<&Expr>,
        span: Span,
    ) -> Reduced {
        let arguments = arguments_of(visited_input);
        if arguments.len() < 2 {
            return Err(EvalError::Arity {
                name: identity.name,
                expected: 2,
                found: arguments.len(),
                span,
            });
        }
        let Some(condition) = arguments[0].as_constant() else {
            return Ok(Some(residual(identity, input, span)));
        };

        let mut branches = arguments.into_iter().skip(1);
        let then = branches.next();
        let otherwise = branches.next();
        Ok(if condition != 0.0 { then } else { otherwise })
    }

    /// `repeat(body, n, state...)`: apply `body` to the state `n` times.
    fn repeat(&mut self, identity: Parameter, input: Option<Algorithm>, span: Span) -> Reduced {
        let expressions = input.map(|input| input.expressions).unwrap_or_default();
        if expressions.len() < 2 {
            return Err(EvalError::Arity {
                name: identity.name,
                expected: 2,
                found: expressions.len(),
                span: identity.span,
            });
        }

        let mut expressions = expressions.into_iter();
        let (Some(body), Some(count)) = (expressions.next(), expressions.next()) else {
            return Ok(None);
        };
        let iterations = match self.visit(count)?.and_then(|count| count.as_constant()) {
            Some(iterations) if iterations >= 0.0 => iterations,
            _ => return Err(EvalError::InvalidLoopCount { span: identity.span }),
        };

        let body = body.into_algorithm();
        let mut state = self
            .visit_algorithm(Algorithm::new(expressions.collect()), span)?
            .map(Expr::into_algorithm);

        let mut iteration = 0u64;
        while (iteration as f64) < iterations {
            trace!(iteration, "repeat");
            let execution = AlgorithmExecution {
                algorithm: body.clone(),
                input: state.take(),
                identity: None,
            };
            state = self
                .visit_algorithm_execution(execution, span)?
                .map(Expr::into_algorithm);
            iteration += 1;
        }
        Ok(state.map(|state| state.into_expr(span)))
    }

    /// `loop(body, state...)`: apply `body` while its last element is 1.
    fn run_loop(&mut self, identity: Parameter, input: Option<Algorithm>, span: Span) -> Reduced {
        let mut expressions = input
            .map(|input| input.expressions)
            .unwrap_or_default()
            .into_iter();
        let Some(first) = expressions.next() else {
            return Err(EvalError::Arity {
                name: identity.name,
                expected: 1,
                found: 0,
                span: identity.span,
            });
        };

        let body = self
            .visit(first)?
            .ok_or_else(|| {
                EvalError::invalid_argument(
                    "the first argument of 'loop' must be a recursive algorithm",
                    identity.span,
                )
            })?
            .into_algorithm();
        let Some(test) = body.expressions.last().cloned() else {
            return Err(EvalError::invalid_argument(
                "the body of 'loop' must end with a continuation condition",
                identity.span,
            ));
        };
        let mut state = self
            .visit_algorithm(Algorithm::new(expressions.collect()), span)?
            .map(Expr::into_algorithm);
        let parameters = self.parameters_of(&body);

        let mut iteration = 0u64;
        loop {
            let arguments = state
                .as_ref()
                .map(|state| state.expressions.clone())
                .unwrap_or_default();
            self.env
                .push(&Properties::new(), parameters.clone(), arguments, Some(&identity))?;
            let continuation = self.visit(test.clone());
            self.env.pop();

            match continuation?.map(trailing_element).and_then(|flag| flag.as_constant()) {
                Some(flag) if flag == 1.0 => {
                    trace!(iteration, "loop");
                    let execution = AlgorithmExecution {
                        algorithm: body.clone(),
                        input: state.take(),
                        identity: None,
                    };
                    state = self
                        .visit_algorithm_execution(execution, span)?
                        .map(Expr::into_algorithm);
                    iteration += 1;
                }
                Some(_) => return Ok(state.map(|state| state.into_expr(span))),
                None => {
                    return Err(EvalError::LoopContinuation {
                        body: body.to_string(),
                        span: identity.span,
                    })
                }
            }
        }
    }

    /// `load(address)`: evaluate a program fetched through the loader.
    fn load(&mut self, identity: Parameter, input: Option<Algorithm>, span: Span) -> Reduced {
        let address = single_text(input.as_ref()).ok_or_else(|| {
            EvalError::invalid_argument(
                format!("'{}' expects one argument: the address of KatLang code", identity.name),
                span,
            )
        })?;
        let source = self.fetch(&address, span)?;
        match self.parse_fetched(&source, address, span)? {
            Some(program) => self.visit(program),
            None => Ok(None),
        }
    }

    /// `open(path)`: evaluate a program read from disk.
    fn open(&mut self, identity: Parameter, input: Option<Algorithm>, span: Span) -> Reduced {
        let path = single_text(input.as_ref()).ok_or_else(|| {
            EvalError::invalid_argument(
                format!("'{}' expects one argument: the path of a KatLang file", identity.name),
                span,
            )
        })?;
        let root = self.options.open_root.clone().unwrap_or_default();
        let source = FileLoader::new(root)
            .fetch(&path)
            .map_err(|error| EvalError::LoadFailed {
                address: path.clone(),
                reason: error.to_string(),
                span,
            })?;
        match self.parse_fetched(&source, path, span)? {
            Some(program) => self.visit(program),
            None => Ok(None),
        }
    }

    /// `join(address)` or `join(Name)`: bring the properties of another
    /// algorithm into the current frame.
    fn join(&mut self, identity: Parameter, input: Option<Algorithm>, span: Span) -> Reduced {
        let argument = match input.map(|input| input.expressions) {
            Some(mut expressions) if expressions.len() == 1 => expressions.pop(),
            _ => None,
        };
        let Some(argument) = argument else {
            return Err(EvalError::invalid_argument(
                format!("'{}' expects one argument", identity.name),
                span,
            ));
        };

        let joined = match argument.kind {
            ExprKind::Text(address) => {
                let source = self.fetch(&address, span)?;
                match self.parse_fetched(&source, address, span)? {
                    Some(program) => self.visit(program)?,
                    None => None,
                }
            }
            ExprKind::Parameter(name) => match self.env.algorithm(&name.name) {
                Some(
                    body @ Expr {
                        kind: ExprKind::Algorithm(_),
                        ..
                    },
                ) => self.visit(body)?,
                _ => {
                    return Err(EvalError::UnknownProperty {
                        name: name.name,
                        span,
                    })
                }
            },
            _ => {
                return Err(EvalError::invalid_argument(
                    "the argument of 'join' must be the address of KatLang code or a property name",
                    span,
                ))
            }
        };

        if let Some(Expr {
            kind: ExprKind::Algorithm(algorithm),
            ..
        }) = joined
        {
            trace!(properties = algorithm.properties.len(), "join");
            self.env.join(&algorithm.properties);
        }
        Ok(None)
    }

    /// `combine(a, b, ...)`: splice algorithms into one.
    fn combine(&mut self, identity: Parameter, input: Option<Algorithm>, span: Span) -> Reduced {
        let parts = input.map(|input| input.expressions).unwrap_or_default();
        if parts.is_empty() {
            return Err(EvalError::invalid_argument(
                "'combine' expects at least one algorithm",
                span,
            ));
        }

        let parts = self.visit_all(parts)?;
        // a pending call could still change shape
        if parts
            .iter()
            .any(|part| matches!(part.kind, ExprKind::PropertyExecution(_)))
        {
            return Ok(Some(residual(identity, Some(Algorithm::new(parts)), span)));
        }

        let mut expressions = Vec::new();
        let mut properties = Properties::new();
        for part in parts {
            match part.kind {
                ExprKind::Algorithm(algorithm) if !algorithm.parametrized => {
                    expressions.extend(algorithm.expressions);
                    properties.extend(algorithm.properties);
                }
                kind => expressions.push(Expr::new(kind, part.span)),
            }
        }
        Ok(Some(
            Algorithm::with_properties(expressions, properties).into_expr(span),
        ))
    }

    fn fetch(&self, address: &str, span: Span) -> Result<String, EvalError> {
        let Some(loader) = &self.options.loader else {
            return Err(EvalError::LoadFailed {
                address: address.to_string(),
                reason: "no source loader is configured".to_string(),
                span,
            });
        };
        loader.fetch(address).map_err(|error| EvalError::LoadFailed {
            address: address.to_string(),
            reason: error.to_string(),
            span,
        })
    }

    /// Evaluate fetched source on its own; any diagnostic rejects it.
    fn parse_fetched(&self, source: &str, address: String, span: Span) -> Reduced {
        let outcome = pipeline::parse_with(source, self.options);
        if !outcome.diagnostics.is_empty() {
            return Err(EvalError::InvalidProgram { address, span });
        }
        Ok(Some(outcome.value))
    }

    /// Branch bodies are reduced in place; the conditional stays a value.
    fn visit_conditional(&mut self, conditional: Conditional, span: Span) -> Reduced {
        let Conditional {
            properties,
            parameter_count,
            branches,
            default_branch,
        } = conditional;

        let mut visited = Conditional {
            properties,
            parameter_count,
            ..Conditional::default()
        };
        for (condition, branch) in branches {
            let expressions = self.visit_all(branch.expressions)?;
            visited.branches.insert(
                condition,
                Algorithm::with_properties(expressions, branch.properties),
            );
        }
        if let Some(branch) = default_branch {
            let expressions = self.visit_all(branch.expressions)?;
            visited.default_branch = Some(Algorithm::with_properties(expressions, branch.properties));
        }
        Ok(Some(Expr::new(ExprKind::Conditional(visited), span)))
    }
}

/// Unresolved call kept for later binding.
fn residual(identity: Parameter, input: Option<Algorithm>, span: Span) -> Expr {
    Expr::property_execution(PropertyExecution::new(identity, input), span)
}

/// Arguments carried by a reduced input.
fn arguments_of(input: Option<&Expr>) -> Vec<Expr> {
    match input {
        Some(Expr {
            kind: ExprKind::Algorithm(algorithm),
            ..
        }) => algorithm.expressions.clone(),
        Some(value) => vec![value.clone()],
        None => Vec::new(),
    }
}

fn single_text(input: Option<&Algorithm>) -> Option<String> {
    match input.map(|input| input.expressions.as_slice()) {
        Some(
            [Expr {
                kind: ExprKind::Text(text),
                ..
            }],
        ) => Some(text.clone()),
        _ => None,
    }
}

/// Operands of arithmetic read the first element of a tuple.
fn leading_element(expr: Expr) -> Expr {
    match expr.kind {
        ExprKind::Algorithm(algorithm) if !algorithm.expressions.is_empty() => {
            let span = expr.span;
            algorithm
                .expressions
                .into_iter()
                .next()
                .unwrap_or_else(|| Algorithm::default().into_expr(span))
        }
        kind => Expr::new(kind, expr.span),
    }
}

/// Loop conditions read the last element of a tuple.
fn trailing_element(expr: Expr) -> Expr {
    match expr.kind {
        ExprKind::Algorithm(algorithm) if !algorithm.expressions.is_empty() => {
            let span = expr.span;
            algorithm
                .expressions
                .into_iter()
                .last()
                .unwrap_or_else(|| Algorithm::default().into_expr(span))
        }
        kind => Expr::new(kind, expr.span),
    }
}

fn reversed(text: &str) -> String {
    text.chars().rev().collect()
}
