//! Free parameter inference.
//!
//! An algorithm's positional parameters are the names it mentions that are
//! not resolvable otherwise: anything that is not a property in scope, a
//! built-in algorithm or a reserved word. Order follows first occurrence,
//! then `~` grace markers move entries:
//!
//! ```text
//! x - y       -> [x, y]
//! x - ~y      -> [y, x]
//! x~ - y - z  -> [y, x, z]
//! ```
//!
//! A bare `#` takes a slot of its own each time it appears. Nested
//! parametrized algorithms (`{...}`) are opaque: their names are captured by
//! their own invocation.

use katlang_ast::language::{builtin_arity, is_keyword};
use katlang_ast::{Algorithm, Expr, ExprKind, Parameter};

/// Name recorded for a bare `#` slot.
pub const IGNORED_SLOT: &str = "#";

struct Candidate {
    name: String,
    weight: i32,
}

/// Collects candidates in occurrence order.
struct Collector<'a> {
    is_property: &'a dyn Fn(&str) -> bool,
    candidates: Vec<Candidate>,
}

impl Collector<'_> {
    fn is_known(&self, name: &str) -> bool {
        (self.is_property)(name) || builtin_arity(name).is_some() || is_keyword(name)
    }

    fn record(&mut self, parameter: &Parameter) {
        if self.is_known(&parameter.name) {
            return;
        }
        match self
            .candidates
            .iter_mut()
            .find(|candidate| candidate.name == parameter.name)
        {
            Some(existing) => existing.weight += parameter.grace,
            None => self.candidates.push(Candidate {
                name: parameter.name.clone(),
                weight: parameter.grace,
            }),
        }
    }

    fn visit_algorithm(&mut self, algorithm: &Algorithm, root: bool) {
        if root || !algorithm.parametrized {
            for expr in &algorithm.expressions {
                self.visit(expr);
            }
        }
    }

    fn visit(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Constant(_) | ExprKind::Text(_) => {}
            ExprKind::Parameter(parameter) => self.record(parameter),
            ExprKind::IgnoreArgument => self.candidates.push(Candidate {
                name: IGNORED_SLOT.to_string(),
                weight: 0,
            }),
            ExprKind::Unary { operand, .. } => self.visit(operand),
            ExprKind::Binary { lhs, rhs, .. } => {
                if let Some(lhs) = lhs {
                    self.visit(lhs);
                }
                if let Some(rhs) = rhs {
                    self.visit(rhs);
                }
            }
            ExprKind::ContentSelection { content, selector } => {
                self.visit(content);
                self.visit(selector);
            }
            ExprKind::PropertyAccess { base, property } => {
                self.visit(base);
                self.record(property);
            }
            // The parent of a member call is not part of the call's own inputs
            ExprKind::PropertyExecution(execution) => {
                self.record(&execution.identity);
                if let Some(input) = &execution.input {
                    self.visit_algorithm(input, false);
                }
            }
            ExprKind::AlgorithmExecution(execution) => {
                self.visit_algorithm(&execution.algorithm, false);
                if let Some(input) = &execution.input {
                    self.visit_algorithm(input, false);
                }
            }
            ExprKind::Algorithm(algorithm) => self.visit_algorithm(algorithm, false),
            ExprKind::Conditional(conditional) => {
                let bodies = conditional
                    .branches
                    .values()
                    .chain(conditional.default_branch.as_ref());
                for body in bodies {
                    for expr in &body.expressions {
                        self.visit(expr);
                    }
                }
            }
        }
    }
}

/// Ordered positional parameters of `algorithm`.
///
/// `is_property` tells whether a name resolves to a property in scope.
pub fn ordered_parameters(algorithm: &Algorithm, is_property: &dyn Fn(&str) -> bool) -> Vec<String> {
    let mut collector = Collector {
        is_property,
        candidates: Vec::new(),
    };
    collector.visit_algorithm(algorithm, true);

    let mut candidates = collector.candidates;
    apply_grace(&mut candidates);
    candidates.into_iter().map(|candidate| candidate.name).collect()
}

/// Whether `name` occurs free anywhere in `expr`.
pub fn contains_parameter(name: &str, expr: &Expr, is_property: &dyn Fn(&str) -> bool) -> bool {
    let mut collector = Collector {
        is_property,
        candidates: Vec::new(),
    };
    collector.visit(expr);
    collector.candidates.iter().any(|candidate| candidate.name == name)
}

/// Move every weighted entry past neighbours of smaller (or, leftwards,
/// larger) weight, spending one unit of weight per step.
fn apply_grace(candidates: &mut [Candidate]) {
    for start in 0..candidates.len() {
        let mut index = start;
        loop {
            let weight = candidates[index].weight;
            if weight > 0 && index + 1 < candidates.len() && candidates[index + 1].weight < weight {
                candidates[index].weight -= 1;
                candidates.swap(index, index + 1);
                index += 1;
            } else if weight < 0 && index > 0 && candidates[index - 1].weight > weight {
                candidates[index].weight += 1;
                candidates.swap(index, index - 1);
                index -= 1;
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use katlang_parser::parse;

    fn no_properties(_: &str) -> bool {
        false
    }

    /// Parameters of the first element of a parsed program.
    fn params_of(source: &str) -> Vec<String> {
        let program = parse(source).unwrap();
        let element = program.expressions[0].as_algorithm().unwrap();
        ordered_parameters(element, &no_properties)
    }

    #[test]
    fn test_occurrence_order() {
        assert_eq!(params_of("a + b * c"), vec!["a", "b", "c"]);
        assert_eq!(params_of("b + a + b"), vec!["b", "a"]);
    }

    #[test]
    fn test_prefix_grace_moves_left() {
        assert_eq!(params_of("x - ~y"), vec!["y", "x"]);
        assert_eq!(params_of("a + b + ~~c"), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_suffix_grace_moves_right() {
        assert_eq!(params_of("x~ - y - z"), vec!["y", "x", "z"]);
        assert_eq!(params_of("x~~ - y - z"), vec!["y", "z", "x"]);
    }

    #[test]
    fn test_grace_accumulates_over_occurrences() {
        assert_eq!(params_of("x~ + y + x~"), vec!["y", "x"]);
    }

    #[test]
    fn test_known_names_are_not_parameters() {
        assert_eq!(params_of("sqrt(x) + pi"), vec!["x"]);
        let is_property = |name: &str| name == "f";
        let program = parse("f(a) + b").unwrap();
        let element = program.expressions[0].as_algorithm().unwrap();
        assert_eq!(ordered_parameters(element, &is_property), vec!["a", "b"]);
    }

    #[test]
    fn test_unknown_call_names_are_parameters() {
        assert_eq!(params_of("g(a)"), vec!["g", "a"]);
    }

    #[test]
    fn test_ignored_slots() {
        assert_eq!(params_of("#, b, #"), vec!["#", "b", "#"]);
        assert_eq!(params_of("#a, b"), vec!["a", "b"]);
    }

    #[test]
    fn test_member_names_are_recorded() {
        assert_eq!(params_of("a.t"), vec!["a", "t"]);
    }

    #[test]
    fn test_parametrized_blocks_are_opaque() {
        assert_eq!(params_of("a, {b + 1}"), vec!["a"]);
        assert_eq!(params_of("a, (b + 1)"), vec!["a", "b"]);
    }

    #[test]
    fn test_root_block_is_visited() {
        let program = parse("{b + 1}").unwrap();
        let block = program.expressions[0].as_algorithm().unwrap();
        assert!(block.parametrized);
        assert_eq!(ordered_parameters(block, &no_properties), vec!["b"]);
    }

    #[test]
    fn test_contains_parameter() {
        let program = parse("f(x) + 1").unwrap();
        let element = &program.expressions[0];
        assert!(contains_parameter("x", element, &no_properties));
        assert!(!contains_parameter("y", element, &no_properties));
    }
}
