//! End-to-end evaluation through the public pipeline.
//!
//! Every case parses a whole program, binds it and compares the rendered
//! value.

use katlang::parse;

fn eval(source: &str) -> String {
    let outcome = parse(source);
    assert!(
        outcome.is_ok(),
        "unexpected diagnostics for {:?}: {:?}",
        source,
        outcome.diagnostics
    );
    outcome.render()
}

// ============================================================================
// Arithmetic
// ============================================================================

#[test]
fn test_numbers_and_negation() {
    assert_eq!(eval("6"), "6");
    assert_eq!(eval("-5"), "-5");
    assert_eq!(eval("--5"), "5");
    assert_eq!(eval("6--1"), "7");
    assert_eq!(eval("not(not(1))"), "1");
}

#[test]
fn test_operator_precedence() {
    assert_eq!(eval("200 / 4 / 2"), "25");
    assert_eq!(eval("2 + 3 ^ 2 * 3 + 4"), "33");
    assert_eq!(eval("(2 + 3) * 4"), "20");
}

#[test]
fn test_juxtaposed_elements_print_on_separate_lines() {
    assert_eq!(eval("1+2 3+4"), "3\n7");
}

#[test]
fn test_builtins() {
    assert_eq!(eval("sign(-5)"), "-1");
    assert_eq!(eval("Func = sign(x)\nFunc(-4)"), "-1");
    assert_eq!(eval("Func = round(1.23456, 2 * x)\nFunc(2)"), "1.2346");
    assert_eq!(eval("Func = round(1 + x, 2)*y\nFunc (0.123456, 2)"), "2.24");
}

#[test]
fn test_constants() {
    let pi = std::f64::consts::PI.to_string();
    let e = std::f64::consts::E.to_string();
    assert_eq!(eval("pi"), pi);
    assert_eq!(eval("pi()"), pi);
    assert_eq!(eval("exp"), e);
    assert_eq!(eval("exp()"), e);
}

// ============================================================================
// Properties and parameters
// ============================================================================

#[test]
fn test_property_call() {
    assert_eq!(eval("f=a+1\n3+f(2)"), "6");
    assert_eq!(eval("f=a\nf(1), f(2)"), "1,2");
    assert_eq!(eval("f = (a + b) + (b + c)\n\nf(2,3,4)"), "12");
}

#[test]
fn test_constant_property_ignores_input() {
    assert_eq!(eval("Value = 1.234\nValue(0)"), "1.234");
}

#[test]
fn test_free_parameters_stay_symbolic() {
    assert_eq!(eval("a+b, 1, 2"), "a+b,1,2");
    assert_eq!(eval("a(3)"), "a(3)");
}

#[test]
fn test_unused_property_does_not_affect_value() {
    assert_eq!(eval("Test=0<1\n(5)"), "5");
}

#[test]
fn test_empty_declaration() {
    assert_eq!(eval("x="), "");
}

// ============================================================================
// Ignore operator
// ============================================================================

#[test]
fn test_ignored_values_are_dropped() {
    assert_eq!(eval("f = #a\nf(2)"), "");
    assert_eq!(eval("f = #a, #a, a\nf(2)"), "2");
    assert_eq!(eval("f = #a, a, a\nf(2)"), "2,2");
    assert_eq!(eval("(#a, a), 6"), "a,6");
    assert_eq!(eval("(#a, #a), 6"), "6");
}

#[test]
fn test_ignored_argument_slots() {
    assert_eq!(eval("f = 6, #\nf(0, 7, 6)"), "6");
    assert_eq!(eval("g = 2, #\nf = g, 1\nf(0)"), "2,1");
    assert_eq!(eval("g = 2, #, 3\nf = g, 1\nf(0)"), "2,3,1");
    assert_eq!(eval("g = 2, #, 3\nf = g(5), 1\nf(0)"), "2,3,1");
}

// ============================================================================
// Conditional properties
// ============================================================================

const IF_PROGRAM: &str = "If = #1, a\nIf = #0, #a\n\n";
const ELSE_PROGRAM: &str = "else = #0, #a, b\nelse = #, a, #b\n\n";

#[test]
fn test_branch_selected_by_leading_argument() {
    assert_eq!(eval(&format!("{IF_PROGRAM}If(1, 2)")), "2");
    assert_eq!(eval(&format!("{IF_PROGRAM}If(1, 2, 3)")), "2");
    assert_eq!(eval(&format!("{IF_PROGRAM}If(0, 2)")), "");
}

#[test]
fn test_default_branch_receives_all_arguments() {
    assert_eq!(eval(&format!("{ELSE_PROGRAM}else(0, 2, 3)")), "3");
    assert_eq!(eval(&format!("{ELSE_PROGRAM}else(1, 2, 3)")), "2");
    assert_eq!(eval(&format!("{ELSE_PROGRAM}else(0, 2)")), "b");
}

#[test]
fn test_conditional_called_from_property() {
    let program = ELSE_PROGRAM;
    assert_eq!(eval(&format!("{program}f = else(a>7, b, c)\nf(8, 3, 4)")), "3");
    assert_eq!(eval(&format!("{program}f = else(a>7, b, c)\nf(6, 3, 4)")), "4");
    assert_eq!(eval(&format!("{program}f = else(a>7, b)\nf(8)")), "b");
    assert_eq!(eval(&format!("{program}f = else(a>7)\nf(8)")), "a");
    assert_eq!(eval(&format!("{program}f = else(a>7, c, 6)\nf(8)")), "c");
}

#[test]
fn test_recursive_conditional() {
    let source = "Fib = #0, 0\nFib = #1, 1\nFib = Fib(n - 1) + Fib(n - 2)\nFib(10)";
    assert_eq!(eval(source), "55");
}

// ============================================================================
// Higher-order algorithms
// ============================================================================

#[test]
fn test_algorithm_arguments() {
    assert_eq!(eval("f=k(6)\nf{a+1}"), "7");
    assert_eq!(eval("f=k(6)+k(7)\nf{a+1}"), "15");
    assert_eq!(eval("g = a(5)\nf = g{b+10} + c\nf(3)"), "18");
}

#[test]
fn test_unbound_arguments_keep_the_call() {
    assert_eq!(eval("f=k(6)\nf(a+1)"), "f(a+1)");
    assert_eq!(eval("f=x+1\nf(f)"), "f(x+1)");
    assert_eq!(eval("g = a(5)\nf = g((b+10) + c)\nf(3)"), "g(13+c)");
    assert_eq!(eval("g = a(5)\nf = g(b+10) + c\nf(3)"), "13+c");
}

#[test]
fn test_closure_bound_by_position_and_grace() {
    assert_eq!(eval("K=a.t\nK(2, {x+1})"), "3");
    assert_eq!(eval("K=a.~t\nK({x+1}, 2)"), "3");
}

// ============================================================================
// Selection
// ============================================================================

#[test]
fn test_selection() {
    assert_eq!(eval("f=a:b\nf((1,2,3,4),1)"), "2");
    assert_eq!(eval("A=3\nA:x"), "3:x");
}

// ============================================================================
// Iteration
// ============================================================================

#[test]
fn test_repeat() {
    assert_eq!(eval("f=n+1\nrepeat(f, 0, 10)"), "10");
    assert_eq!(
        eval("Data=5,4,3,2,1\nZ=a+1, Data:a\nrepeat(Z, 2, 0)"),
        "2,4"
    );
    assert_eq!(
        eval("Data=5,4,3,2,1\nSumData=a+1, sum+Data:a\nrepeat(SumData, Data.length, 0, 0):1"),
        "15"
    );
}

#[test]
fn test_loop_sum_of_multiples() {
    let source = "Algo = n - 1, result + if(n mod 3==0 or n mod 5==0, n), n > 2\n\
                  Sum = loop(Algo, x, 0) : 1\n\
                  Sum(999)";
    assert_eq!(eval(source), "233168");
}

#[test]
fn test_loop_even_fibonacci_sum() {
    let source = "Algo = b, ~a + b, sum + if(b mod 2 == 0, b), b <= 4000000\n\
                  Sum = loop(Algo, 1, 2, 0) : 2\n\
                  Sum";
    assert_eq!(eval(source), "4613732");
}

// ============================================================================
// Extension properties
// ============================================================================

#[test]
fn test_value_as_receiver() {
    assert_eq!(eval("Add1=x+1 6.Add1"), "7");
    assert_eq!(eval("Add1=x+1 6.5.Add1"), "7.5");
    assert_eq!(eval("Numbers={A=x B=3}\nNumbers.A(6)"), "6");
}

#[test]
fn test_chained_receivers() {
    assert_eq!(
        eval("Numbers=(First=1 Second=2) Add=a+1 Numbers.First.Add"),
        "2"
    );
    assert_eq!(
        eval("Numbers=(First=1 Second=2) Add=a+b Numbers.First.Add(3)"),
        "4"
    );
}

#[test]
fn test_iteration_through_member_call() {
    let source = "Numbers = 3, 5, 9, 1, 0, 6\n\
                  Add = a + 1, sum + Numbers:a\n\
                  Sum = Add.repeat(Numbers.length, 0, 0):1\n\
                  Sum";
    assert_eq!(eval(source), "24");

    let source = "Add1 = a + 1, b\n\
                  Check = if(a < b, a, 0), b\n\
                  Add1.Add1.Check.repeat(6, 0, 30)";
    assert_eq!(eval(source), "12,30");
}

#[test]
fn test_pipeline_of_combined_receivers() {
    let source = "Add = a+1, b, c\n\
                  Check1 = if(a<b, (a, b), (b, a)); c\n\
                  Check2 = a; if(b<c, (b, c), (c, b))\n\
                  Algo = Add(a,b,c).Check1.Check2\n\
                  Algo(1,2,3)";
    assert_eq!(eval(source), "2,2,3");
}

// ============================================================================
// Combining
// ============================================================================

#[test]
fn test_combined_loop_body() {
    let check = "Check = if(x > 0, (x-1 y), (y-1 y-1))\n";
    assert_eq!(
        eval(&format!("{check}Algo = Check(x, y); y > 0\nAlgo.loop(6, 6)")),
        "0,0,1"
    );
    assert_eq!(
        eval(&format!(
            "{check}Algo = combine(Check(x, y), y > 0)\nAlgo.loop(6, 6)"
        )),
        "0,0,1"
    );
}
