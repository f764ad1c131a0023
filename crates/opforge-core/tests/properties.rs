//! End-to-end lowering tests
//!
//! Functions are lowered through the builder and run on the reference
//! evaluator, with a tally builtin counting how often operands are evaluated.

use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

use num_bigint::BigInt;
use opforge_core::ast::{Accessor, ArithmeticOp, CompareOp, Expr, Function, Stmt};
use opforge_core::vm::MAX_CALL_DEPTH;
use opforge_core::{
    BuildError, Builder, Interpreter, LanguageOps, OperationSet, Program, RuntimeError, Value,
    lower_module,
};

fn ops() -> LanguageOps {
    LanguageOps::new().expect("intrinsics should be unique")
}

/// Interpreter with a `tally(x)` builtin that returns `x` and counts calls.
fn tallied(ops: &LanguageOps, programs: Vec<Program>) -> (Interpreter, Rc<Cell<usize>>) {
    let mut interpreter = Interpreter::new(ops);
    for program in programs {
        interpreter.register_program(program).unwrap();
    }
    let count = Rc::new(Cell::new(0));
    let counter = Rc::clone(&count);
    interpreter.register_builtin("tally", move |args| {
        counter.set(counter.get() + 1);
        Ok(args.first().cloned().unwrap_or(Value::Null))
    });
    (interpreter, count)
}

fn run(functions: Vec<Function>) -> (Value, usize) {
    let ops = ops();
    let programs = lower_module(&ops, &functions).expect("lowering should succeed");
    let (mut interpreter, count) = tallied(&ops, programs);
    let value = interpreter.call("main", vec![]).expect("main should run");
    (value, count.get())
}

fn main_returning(expr: Expr) -> Vec<Function> {
    vec![Function::new("main", &[], vec![Stmt::ret(expr)])]
}

fn tally(expr: Expr) -> Expr {
    Expr::call("tally", vec![expr])
}

fn num(n: i64) -> Expr {
    Expr::number(n.to_string())
}

fn name(n: &str) -> Expr {
    Expr::name(n)
}

fn add(lhs: Expr, rhs: Expr) -> Expr {
    Expr::arithmetic(ArithmeticOp::Add, lhs, rhs)
}

fn mul(lhs: Expr, rhs: Expr) -> Expr {
    Expr::arithmetic(ArithmeticOp::Mul, lhs, rhs)
}

fn lt(lhs: Expr, rhs: Expr) -> Expr {
    Expr::compare(CompareOp::Less, lhs, rhs)
}

fn eq(lhs: Expr, rhs: Expr) -> Expr {
    Expr::compare(CompareOp::Equal, lhs, rhs)
}

fn assign(target: &str, value: Expr) -> Stmt {
    Stmt::Expr(Expr::assign(target, value))
}

fn false_value() -> Expr {
    Expr::compare(CompareOp::Greater, num(1), num(2))
}

// ============================================================================
// Short-circuit chains
// ============================================================================

#[test]
fn test_or_falls_through_to_last_term() {
    let (value, calls) = run(main_returning(Expr::or(vec![
        tally(num(0)),
        tally(num(0)),
        tally(num(7)),
    ])));
    assert_eq!(value, Value::Long(7));
    assert_eq!(calls, 3);
}

#[test]
fn test_or_stops_at_first_truthy_term() {
    let (value, calls) = run(main_returning(Expr::or(vec![
        tally(num(5)),
        tally(num(0)),
        tally(num(0)),
    ])));
    assert_eq!(value, Value::Long(5));
    assert_eq!(calls, 1);
}

#[test]
fn test_and_yields_last_term_when_all_truthy() {
    let (value, calls) = run(main_returning(Expr::and(vec![
        tally(num(1)),
        tally(num(1)),
        tally(num(9)),
    ])));
    assert_eq!(value, Value::Long(9));
    assert_eq!(calls, 3);
}

#[test]
fn test_and_stops_at_first_falsy_term() {
    let (value, calls) = run(main_returning(Expr::and(vec![
        tally(false_value()),
        tally(num(1)),
        tally(num(1)),
    ])));
    assert_eq!(value, Value::Bool(false));
    assert_eq!(calls, 1);
}

#[test]
fn test_mixed_chains_nest() {
    // (0 && x) || (2 && 3)
    let (value, calls) = run(main_returning(Expr::or(vec![
        Expr::and(vec![tally(num(0)), tally(num(1))]),
        Expr::and(vec![tally(num(2)), tally(num(3))]),
    ])));
    assert_eq!(value, Value::Long(3));
    assert_eq!(calls, 3);
}

// ============================================================================
// Assignments as expressions
// ============================================================================

#[test]
fn test_local_assignment_yields_value() {
    // x = 0; y = (x = 5) + 1; return y * 10 + x;
    let (value, _) = run(vec![Function::new(
        "main",
        &[],
        vec![
            assign("x", num(0)),
            assign("y", add(Expr::assign("x", num(5)), num(1))),
            Stmt::ret(add(mul(name("y"), num(10)), name("x"))),
        ],
    )]);
    assert_eq!(value, Value::Long(65));
}

#[test]
fn test_field_assignment_yields_value() {
    // o = new(); y = (o.b = 7) + 1; return y * 10 + o.b;
    let field_write = Expr::member("o", vec![Accessor::field("b"), Accessor::assign(num(7))]);
    let field_read = Expr::member("o", vec![Accessor::field("b")]);
    let (value, _) = run(vec![Function::new(
        "main",
        &[],
        vec![
            assign("o", Expr::call("new", vec![])),
            assign("y", add(field_write, num(1))),
            Stmt::ret(add(mul(name("y"), num(10)), field_read)),
        ],
    )]);
    assert_eq!(value, Value::Long(87));
}

#[test]
fn test_index_assignment_writes_property() {
    // o = new(); o["k"] = tally(3); return o["k"];
    let write = Expr::member(
        "o",
        vec![
            Accessor::index(Expr::string("k")),
            Accessor::assign(tally(num(3))),
        ],
    );
    let read = Expr::member("o", vec![Accessor::index(Expr::string("k"))]);
    let (value, calls) = run(vec![Function::new(
        "main",
        &[],
        vec![
            assign("o", Expr::call("new", vec![])),
            Stmt::Expr(write),
            Stmt::ret(read),
        ],
    )]);
    assert_eq!(value, Value::Long(3));
    assert_eq!(calls, 1);
}

// ============================================================================
// Loops
// ============================================================================

#[test]
fn test_nested_loop_continue_and_break_are_local() {
    // i = 0; inner = 0; tail = 0;
    // while (i < 3) {
    //   i = i + 1;
    //   j = 0;
    //   while (j < 4) {
    //     j = j + 1;
    //     if (j == 2) { continue; }
    //     if (j == 4) { break; }
    //     inner = inner + 1;
    //   }
    //   if (i == 2) { continue; }
    //   tail = tail + 1;
    // }
    // return inner * 100 + tail * 10 + i;
    let inner_loop = Stmt::while_loop(
        lt(name("j"), num(4)),
        vec![
            assign("j", add(name("j"), num(1))),
            Stmt::if_then(eq(name("j"), num(2)), vec![Stmt::Continue(Default::default())]),
            Stmt::if_then(eq(name("j"), num(4)), vec![Stmt::Break(Default::default())]),
            assign("inner", add(name("inner"), num(1))),
        ],
    );
    let outer_loop = Stmt::while_loop(
        lt(name("i"), num(3)),
        vec![
            assign("i", add(name("i"), num(1))),
            assign("j", num(0)),
            inner_loop,
            Stmt::if_then(eq(name("i"), num(2)), vec![Stmt::Continue(Default::default())]),
            assign("tail", add(name("tail"), num(1))),
        ],
    );
    let (value, _) = run(vec![Function::new(
        "main",
        &[],
        vec![
            assign("i", num(0)),
            assign("inner", num(0)),
            assign("tail", num(0)),
            outer_loop,
            Stmt::ret(add(
                add(mul(name("inner"), num(100)), mul(name("tail"), num(10))),
                name("i"),
            )),
        ],
    )]);
    assert_eq!(value, Value::Long(623));
}

#[test]
fn test_return_from_inside_loop() {
    // n = 0; while (1) { n = n + 1; if (n == 5) { return n; } }
    let (value, _) = run(vec![Function::new(
        "main",
        &[],
        vec![
            assign("n", num(0)),
            Stmt::while_loop(
                num(1),
                vec![
                    assign("n", add(name("n"), num(1))),
                    Stmt::if_then(eq(name("n"), num(5)), vec![Stmt::ret(name("n"))]),
                ],
            ),
        ],
    )]);
    assert_eq!(value, Value::Long(5));
}

// ============================================================================
// Calls and values
// ============================================================================

#[test]
fn test_calls_between_programs() {
    let functions = vec![
        Function::new("add", &["a", "b"], vec![Stmt::ret(add(name("a"), name("b")))]),
        Function::new(
            "main",
            &[],
            vec![Stmt::ret(Expr::call("add", vec![num(40), num(2)]))],
        ),
    ];
    let (value, _) = run(functions);
    assert_eq!(value, Value::Long(42));
}

#[test]
fn test_missing_return_yields_null() {
    let (value, _) = run(vec![Function::new("main", &[], vec![Stmt::Debugger(Default::default())])]);
    assert_eq!(value, Value::Null);
}

#[test]
fn test_overflow_promotes_to_big_number() {
    let (value, _) = run(main_returning(add(
        Expr::number(i64::MAX.to_string()),
        num(1),
    )));
    assert_eq!(value, Value::BigNumber(BigInt::from(i64::MAX) + 1));
}

#[test]
fn test_if_else_selects_branch() {
    let (value, _) = run(vec![Function::new(
        "main",
        &[],
        vec![
            assign("r", num(0)),
            Stmt::if_else(
                lt(num(2), num(1)),
                vec![assign("r", num(1))],
                vec![assign("r", num(2))],
            ),
            Stmt::ret(name("r")),
        ],
    )]);
    assert_eq!(value, Value::Long(2));
}

// ============================================================================
// Call depth
// ============================================================================

/// `down(n)` recurses `n` times before returning 0.
fn countdown(n: i64) -> Vec<Function> {
    vec![
        Function::new(
            "down",
            &["n"],
            vec![
                Stmt::if_then(
                    lt(num(0), name("n")),
                    vec![Stmt::ret(Expr::call(
                        "down",
                        vec![Expr::arithmetic(ArithmeticOp::Sub, name("n"), num(1))],
                    ))],
                ),
                Stmt::ret(name("n")),
            ],
        ),
        Function::new("main", &[], vec![Stmt::ret(Expr::call("down", vec![num(n)]))]),
    ]
}

#[test]
fn test_deep_recursion_within_limit() {
    let (value, _) = run(countdown(400));
    assert_eq!(value, Value::Long(0));
}

#[test]
fn test_recursion_past_limit_reports_overflow() {
    let ops = ops();
    let programs = lower_module(&ops, &countdown(MAX_CALL_DEPTH as i64 + 10)).unwrap();
    let (mut interpreter, _) = tallied(&ops, programs);
    assert_eq!(
        interpreter.call("main", vec![]),
        Err(RuntimeError::StackOverflow(MAX_CALL_DEPTH))
    );

    // the depth counter unwinds with the error
    let programs = lower_module(&ops, &countdown(3)).unwrap();
    for program in programs {
        interpreter.register_program(program).unwrap();
    }
    assert_eq!(interpreter.call("main", vec![]), Ok(Value::Long(0)));
}

// ============================================================================
// Operation sets
// ============================================================================

#[test]
fn test_program_from_another_operation_set_is_rejected() {
    let lowered_with = ops();
    let running_with = ops();
    let mut programs = lower_module(&lowered_with, &main_returning(num(1))).unwrap();
    let program = programs.remove(0);

    let mut interpreter = Interpreter::new(&running_with);
    assert_eq!(
        interpreter.execute(&program, vec![]),
        Err(RuntimeError::ForeignOperations("main".to_string()))
    );
    assert_eq!(
        interpreter.register_program(program),
        Err(RuntimeError::ForeignOperations("main".to_string()))
    );
    assert_eq!(
        interpreter.call("main", vec![]),
        Err(RuntimeError::UndefinedFunction("main".to_string()))
    );
}

// ============================================================================
// Labels
// ============================================================================

#[test]
fn test_second_emit_of_label_fails() {
    let mut b = Builder::new(Arc::new(OperationSet::new()));
    let label = b.create_label().unwrap();
    b.emit_label(label).unwrap();
    assert_eq!(
        b.emit_label(label),
        Err(BuildError::LabelAlreadyBound { label })
    );
}
