//! Fixed vocabulary of the language: operators, built-in algorithms, and
//! reserved words.

use std::fmt;

/// Binary operator tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Pow,
    Divide,
    Multiply,
    Div,
    Mod,
    Plus,
    Minus,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    Equal,
    NotEqual,
    And,
    Or,
    Xor,
}

impl BinaryOp {
    /// Source spelling, used by the canonical renderer.
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Pow => "^",
            BinaryOp::Divide => "/",
            BinaryOp::Multiply => "*",
            BinaryOp::Div => "div",
            BinaryOp::Mod => "mod",
            BinaryOp::Plus => "+",
            BinaryOp::Minus => "-",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Xor => "xor",
        }
    }

    /// Symmetric operators absorb a missing operand on either side.
    pub fn is_symmetric(self) -> bool {
        matches!(self, BinaryOp::Multiply | BinaryOp::Plus | BinaryOp::Or)
    }

    /// Fold two numbers. Comparisons and logic yield 1 or 0; logic operators
    /// only treat exactly 1 as true and exactly 0 as false.
    pub fn apply(self, a: f64, b: f64) -> f64 {
        let truth = |flag: bool| if flag { 1.0 } else { 0.0 };
        match self {
            BinaryOp::Pow => a.powf(b),
            BinaryOp::Divide => a / b,
            BinaryOp::Multiply => a * b,
            BinaryOp::Div => (a / b).floor(),
            BinaryOp::Mod => a % b,
            BinaryOp::Plus => a + b,
            BinaryOp::Minus => a - b,
            BinaryOp::Greater => truth(a > b),
            BinaryOp::GreaterEqual => truth(a >= b),
            BinaryOp::Less => truth(a < b),
            BinaryOp::LessEqual => truth(a <= b),
            BinaryOp::Equal => truth(a == b),
            BinaryOp::NotEqual => truth(a != b),
            BinaryOp::And => truth(a == 1.0 && b == 1.0),
            BinaryOp::Or => truth(a == 1.0 || b == 1.0),
            BinaryOp::Xor => truth((a == 1.0 && b == 0.0) || (a == 0.0 && b == 1.0)),
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Unary operator tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Negate,
    Not,
}

impl UnaryOp {
    pub fn apply(self, value: f64) -> f64 {
        match self {
            UnaryOp::Negate => -value,
            UnaryOp::Not => {
                if value != 0.0 {
                    0.0
                } else {
                    1.0
                }
            }
        }
    }
}

/// Binding strength of prefix `-` and `not`.
pub const UNARY_PRECEDENCE: u8 = 9;

pub const REPEAT: &str = "repeat";
pub const LOOP: &str = "loop";
pub const IF: &str = "if";
pub const OPEN: &str = "open";
pub const LOAD: &str = "load";
pub const JOIN: &str = "join";
pub const COMBINE: &str = "combine";
pub const LENGTH: &str = "length";
pub const STRING: &str = "String";
pub const REVERSE: &str = "Reverse";
pub const PI: &str = "pi";
pub const EXP: &str = "exp";

/// Built-in math algorithms and the number of arguments each requires.
pub const BUILTINS: &[(&str, usize)] = &[
    ("abs", 1),
    ("ceil", 1),
    ("floor", 1),
    ("round", 2),
    ("sign", 1),
    ("div", 2),
    ("mod", 2),
    ("pow", 2),
    ("sqrt", 1),
    ("ln", 1),
    ("lg", 1),
    ("log", 2),
    ("sin", 1),
    ("asin", 1),
    ("cos", 1),
    ("acos", 1),
    ("tan", 1),
    ("atan", 1),
];

/// Words the lexer never returns as plain identifiers.
pub const KEYWORDS: &[&str] = &[
    "or", "xor", "and", "not", "mod", "div", IF, REPEAT, LOOP, OPEN, LOAD, JOIN, COMBINE, LENGTH,
    STRING, REVERSE, PI, EXP,
];

/// Arity of a built-in math algorithm.
pub fn builtin_arity(name: &str) -> Option<usize> {
    BUILTINS
        .iter()
        .find(|(builtin, _)| *builtin == name)
        .map(|(_, arity)| *arity)
}

pub fn is_keyword(name: &str) -> bool {
    KEYWORDS.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folding_formulas() {
        assert_eq!(BinaryOp::Div.apply(7.0, 2.0), 3.0);
        assert_eq!(BinaryOp::Div.apply(-7.0, 2.0), -4.0);
        assert_eq!(BinaryOp::Mod.apply(-7.0, 3.0), -1.0);
        assert_eq!(BinaryOp::Pow.apply(2.0, 0.5), 2f64.sqrt());
        assert_eq!(BinaryOp::Divide.apply(1.0, 4.0), 0.25);
        assert_eq!(BinaryOp::GreaterEqual.apply(2.0, 2.0), 1.0);
        assert_eq!(BinaryOp::NotEqual.apply(2.0, 2.0), 0.0);
    }

    #[test]
    fn test_logic_uses_exact_truth_values() {
        assert_eq!(BinaryOp::Or.apply(2.0, 0.0), 0.0);
        assert_eq!(BinaryOp::And.apply(1.0, 1.0), 1.0);
        assert_eq!(BinaryOp::Xor.apply(1.0, 0.0), 1.0);
        assert_eq!(BinaryOp::Xor.apply(1.0, 1.0), 0.0);
        assert_eq!(BinaryOp::Xor.apply(2.0, 0.0), 0.0);
    }

    #[test]
    fn test_unary() {
        assert_eq!(UnaryOp::Negate.apply(5.0), -5.0);
        assert_eq!(UnaryOp::Not.apply(0.0), 1.0);
        assert_eq!(UnaryOp::Not.apply(3.0), 0.0);
    }

    #[test]
    fn test_builtin_lookup() {
        assert_eq!(builtin_arity("round"), Some(2));
        assert_eq!(builtin_arity("sign"), Some(1));
        assert_eq!(builtin_arity("Func"), None);
        assert!(is_keyword("combine"));
        assert!(!is_keyword("sqrt"));
    }
}
