//! Scope chain of active invocations.
//!
//! Each call pushes one frame holding the callee's properties and its
//! positional parameter bindings, and pops it on return. Lookups search from
//! the innermost frame outwards, so scope follows the chain of active calls
//! rather than where an algorithm was declared.

use std::collections::HashMap;

use katlang_ast::{Expr, Parameter, Properties};

use super::detector;
use crate::error::EvalError;

#[derive(Debug, Default)]
struct Frame {
    algorithms: HashMap<String, Expr>,
    /// `None` marks a declared parameter that received no argument; it
    /// shadows outer bindings of the same name.
    parameters: HashMap<String, Option<Expr>>,
}

#[derive(Debug, Default)]
pub struct Environment {
    frames: Vec<Frame>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Open a frame for one invocation.
    ///
    /// Parameters and arguments are paired positionally; extra parameters
    /// stay unbound and extra arguments are dropped. Binding a parameter to
    /// an argument that mentions the parameter itself is rejected, as the
    /// argument could never be resolved. The error is reported at
    /// `identity` when the call has a name, at the argument otherwise.
    pub fn push(
        &mut self,
        properties: &Properties,
        parameters: Vec<String>,
        arguments: Vec<Expr>,
        identity: Option<&Parameter>,
    ) -> Result<(), EvalError> {
        let mut frame = Frame::default();
        for (name, body) in properties {
            frame.algorithms.insert(name.clone(), body.clone());
        }

        let mut arguments = arguments.into_iter();
        for name in parameters {
            let argument = arguments.next();
            if let Some(argument) = &argument {
                let is_property = |candidate: &str| self.contains_algorithm(candidate);
                if detector::contains_parameter(&name, argument, &is_property) {
                    let span = identity.map_or(argument.span, |identity| identity.span);
                    return Err(EvalError::InfiniteRecursion {
                        parameter: name,
                        span,
                    });
                }
            }
            frame.parameters.insert(name, argument);
        }

        self.frames.push(frame);
        Ok(())
    }

    pub fn pop(&mut self) {
        self.frames.pop();
    }

    /// Install `properties` into the innermost frame, replacing same-named
    /// entries.
    pub fn join(&mut self, properties: &Properties) {
        if let Some(frame) = self.frames.last_mut() {
            for (name, body) in properties {
                frame.algorithms.insert(name.clone(), body.clone());
            }
        }
    }

    /// Value bound to `name` in the nearest frame that declares it.
    pub fn parameter(&self, name: &str) -> Option<&Expr> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.parameters.get(name))
            .and_then(Option::as_ref)
    }

    /// Fresh copy of the nearest property named `name`.
    pub fn algorithm(&self, name: &str) -> Option<Expr> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.algorithms.get(name))
            .cloned()
    }

    pub fn contains_algorithm(&self, name: &str) -> bool {
        self.frames
            .iter()
            .any(|frame| frame.algorithms.contains_key(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use katlang_ast::{Algorithm, Span};

    fn num(value: f64) -> Expr {
        Expr::constant(value, Span::default())
    }

    fn param(name: &str) -> Expr {
        Expr::parameter(Parameter::new(name, Span::new(3, 4)))
    }

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn test_positional_binding() {
        let mut env = Environment::new();
        env.push(&Properties::new(), names(&["a", "b"]), vec![num(1.0), num(2.0)], None)
            .unwrap();
        assert_eq!(env.parameter("a"), Some(&num(1.0)));
        assert_eq!(env.parameter("b"), Some(&num(2.0)));
        assert_eq!(env.parameter("c"), None);
    }

    #[test]
    fn test_unbound_parameter_shadows_outer_binding() {
        let mut env = Environment::new();
        env.push(&Properties::new(), names(&["x"]), vec![num(5.0)], None)
            .unwrap();
        env.push(&Properties::new(), names(&["x"]), vec![], None).unwrap();
        assert_eq!(env.parameter("x"), None);
        env.pop();
        assert_eq!(env.parameter("x"), Some(&num(5.0)));
    }

    #[test]
    fn test_inner_properties_shadow_outer() {
        let mut outer = Properties::new();
        outer.insert("f".to_string(), num(1.0));
        let mut inner = Properties::new();
        inner.insert("f".to_string(), num(2.0));

        let mut env = Environment::new();
        env.push(&outer, vec![], vec![], None).unwrap();
        env.push(&inner, vec![], vec![], None).unwrap();
        assert_eq!(env.algorithm("f"), Some(num(2.0)));
        assert_eq!(env.depth(), 2);
        env.pop();
        assert_eq!(env.algorithm("f"), Some(num(1.0)));
    }

    #[test]
    fn test_self_reference_is_infinite_recursion() {
        let mut env = Environment::new();
        let identity = Parameter::new("f", Span::new(10, 11));
        let err = env
            .push(&Properties::new(), names(&["x"]), vec![param("x")], Some(&identity))
            .unwrap_err();
        assert!(matches!(
            err,
            EvalError::InfiniteRecursion { ref parameter, span } if parameter == "x" && span == Span::new(10, 11)
        ));
        assert_eq!(env.depth(), 0);
    }

    #[test]
    fn test_infinite_recursion_without_identity_points_at_argument() {
        let mut env = Environment::new();
        let err = env
            .push(&Properties::new(), names(&["x"]), vec![param("x")], None)
            .unwrap_err();
        assert_eq!(err.span(), Span::new(3, 4));
    }

    #[test]
    fn test_join_extends_innermost_frame() {
        let mut env = Environment::new();
        env.push(&Properties::new(), vec![], vec![], None).unwrap();
        let mut joined = Properties::new();
        joined.insert("g".to_string(), Algorithm::new(vec![num(3.0)]).into_expr(Span::default()));
        env.join(&joined);
        assert!(env.contains_algorithm("g"));
        env.pop();
        assert!(!env.contains_algorithm("g"));
    }
}
