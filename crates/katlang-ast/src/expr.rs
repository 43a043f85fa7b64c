//! Expression tree.
//!
//! The variant set is closed. Every pass (parameter detection, binding,
//! rendering) is a function matching exhaustively on [`ExprKind`], so adding
//! a variant fails to compile until each pass handles it.
//!
//! Trees own their children. `Clone` is a full structural copy: a cloned body
//! shares no node with its template, which is what repeated invocations
//! (loop bodies, recursive extension chains) rely on.

use indexmap::IndexMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::language::{BinaryOp, UnaryOp};
use crate::span::Span;

/// Named sub-expressions of an algorithm, in declaration order.
///
/// Values are either [`ExprKind::Algorithm`] or [`ExprKind::Conditional`].
pub type Properties = IndexMap<String, Expr>;

/// Expression with its source location.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Number
    Constant(f64),
    /// Immutable text
    Text(String),
    /// Name reference
    Parameter(Parameter),
    /// Bare `#`: consumes one positional slot without binding a name
    IgnoreArgument,
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    /// Operands may be absent in intermediate partial-evaluation states.
    Binary {
        op: BinaryOp,
        lhs: Option<Box<Expr>>,
        rhs: Option<Box<Expr>>,
    },
    /// `content:selector`
    ContentSelection {
        content: Box<Expr>,
        selector: Box<Expr>,
    },
    /// `base.property`
    PropertyAccess {
        base: Box<Expr>,
        property: Parameter,
    },
    /// Call by name
    PropertyExecution(PropertyExecution),
    /// Resolved call: body plus bound input
    AlgorithmExecution(AlgorithmExecution),
    Algorithm(Algorithm),
    Conditional(Conditional),
}

/// Name reference with ordering metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    /// Signed `~` count: prefix markers subtract, suffix markers add.
    pub grace: i32,
    /// `#name`: occupies a slot but is never read.
    pub ignored: bool,
    pub span: Span,
}

impl Parameter {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            grace: 0,
            ignored: false,
            span,
        }
    }

    pub fn with_grace(mut self, grace: i32) -> Self {
        self.grace = grace;
        self
    }

    pub fn ignored(mut self) -> Self {
        self.ignored = true;
        self
    }
}

/// `identity(input)` or, with a parent, `parent.identity(input)`.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyExecution {
    pub identity: Parameter,
    pub input: Option<Algorithm>,
    pub parent: Option<Box<Expr>>,
}

impl PropertyExecution {
    pub fn new(identity: Parameter, input: Option<Algorithm>) -> Self {
        Self {
            identity,
            input,
            parent: None,
        }
    }

    pub fn with_parent(mut self, parent: Expr) -> Self {
        self.parent = Some(Box::new(parent));
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlgorithmExecution {
    pub algorithm: Algorithm,
    pub input: Option<Algorithm>,
    /// Name the call was made through, reported on binding failures
    pub identity: Option<Parameter>,
}

/// Ordered tuple plus named properties.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Algorithm {
    pub expressions: Vec<Expr>,
    pub properties: Properties,
    /// Free parameters are captured by the algorithm's own invocation rather
    /// than resolved from the enclosing scope.
    pub parametrized: bool,
}

impl Algorithm {
    pub fn new(expressions: Vec<Expr>) -> Self {
        Self {
            expressions,
            ..Self::default()
        }
    }

    pub fn with_properties(expressions: Vec<Expr>, properties: Properties) -> Self {
        Self {
            expressions,
            properties,
            parametrized: false,
        }
    }

    pub fn parametrized(mut self, parametrized: bool) -> Self {
        self.parametrized = parametrized;
        self
    }

    /// No expressions and no properties.
    pub fn is_empty(&self) -> bool {
        self.expressions.is_empty() && self.properties.is_empty()
    }

    pub fn into_expr(self, span: Span) -> Expr {
        Expr::new(ExprKind::Algorithm(self), span)
    }
}

/// Property with branches selected by literal argument values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conditional {
    pub properties: Properties,
    /// Number of leading arguments that form the dispatch key
    pub parameter_count: usize,
    pub branches: IndexMap<Condition, Algorithm>,
    pub default_branch: Option<Algorithm>,
}

/// Rejected branch declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum BranchError {
    DuplicateDefault,
    DuplicateCondition(Condition),
    /// Existing branches dispatch on `expected` values.
    ArityMismatch { expected: usize, found: usize },
}

impl Conditional {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a branch; `None` declares the default branch.
    pub fn add_branch(
        &mut self,
        condition: Option<Condition>,
        body: Algorithm,
    ) -> Result<(), BranchError> {
        match condition {
            None => {
                if self.default_branch.is_some() {
                    return Err(BranchError::DuplicateDefault);
                }
                self.default_branch = Some(body);
            }
            Some(condition) => {
                if self.branches.contains_key(&condition) {
                    return Err(BranchError::DuplicateCondition(condition));
                }
                if !self.branches.is_empty() && condition.len() != self.parameter_count {
                    return Err(BranchError::ArityMismatch {
                        expected: self.parameter_count,
                        found: condition.len(),
                    });
                }
                self.parameter_count = condition.len();
                self.branches.insert(condition, body);
            }
        }
        Ok(())
    }
}

/// Literal dispatch key. Compared elementwise by value.
#[derive(Debug, Clone)]
pub struct Condition {
    values: Vec<f64>,
}

impl Condition {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl PartialEq for Condition {
    fn eq(&self, other: &Self) -> bool {
        self.values.len() == other.values.len()
            && self.values.iter().zip(&other.values).all(|(a, b)| a == b)
    }
}

impl Eq for Condition {}

impl Hash for Condition {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.values.len().hash(state);
        for value in &self.values {
            // 0.0 and -0.0 compare equal and must hash equal
            let bits = if *value == 0.0 { 0 } else { value.to_bits() };
            bits.hash(state);
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "#{}", crate::display::format_number(*value))?;
        }
        Ok(())
    }
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn constant(value: f64, span: Span) -> Self {
        Self::new(ExprKind::Constant(value), span)
    }

    pub fn text(value: impl Into<String>, span: Span) -> Self {
        Self::new(ExprKind::Text(value.into()), span)
    }

    pub fn parameter(parameter: Parameter) -> Self {
        let span = parameter.span;
        Self::new(ExprKind::Parameter(parameter), span)
    }

    pub fn binary(op: BinaryOp, lhs: Option<Expr>, rhs: Option<Expr>, span: Span) -> Self {
        Self::new(
            ExprKind::Binary {
                op,
                lhs: lhs.map(Box::new),
                rhs: rhs.map(Box::new),
            },
            span,
        )
    }

    pub fn unary(op: UnaryOp, operand: Expr, span: Span) -> Self {
        Self::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        )
    }

    pub fn content_selection(content: Expr, selector: Expr, span: Span) -> Self {
        Self::new(
            ExprKind::ContentSelection {
                content: Box::new(content),
                selector: Box::new(selector),
            },
            span,
        )
    }

    pub fn property_access(base: Expr, property: Parameter, span: Span) -> Self {
        Self::new(
            ExprKind::PropertyAccess {
                base: Box::new(base),
                property,
            },
            span,
        )
    }

    pub fn property_execution(execution: PropertyExecution, span: Span) -> Self {
        Self::new(ExprKind::PropertyExecution(execution), span)
    }

    pub fn algorithm_execution(
        algorithm: Algorithm,
        input: Option<Algorithm>,
        identity: Option<Parameter>,
        span: Span,
    ) -> Self {
        Self::new(
            ExprKind::AlgorithmExecution(AlgorithmExecution {
                algorithm,
                input,
                identity,
            }),
            span,
        )
    }

    pub fn as_constant(&self) -> Option<f64> {
        match self.kind {
            ExprKind::Constant(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_algorithm(&self) -> Option<&Algorithm> {
        match &self.kind {
            ExprKind::Algorithm(algorithm) => Some(algorithm),
            _ => None,
        }
    }

    pub fn as_parameter(&self) -> Option<&Parameter> {
        match &self.kind {
            ExprKind::Parameter(parameter) => Some(parameter),
            _ => None,
        }
    }

    /// View as an algorithm: algorithms are returned as-is, anything else is
    /// wrapped as the single element of a fresh tuple.
    pub fn into_algorithm(self) -> Algorithm {
        match self.kind {
            ExprKind::Algorithm(algorithm) => algorithm,
            _ => Algorithm::new(vec![self]),
        }
    }
}
