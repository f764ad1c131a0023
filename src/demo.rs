//! The `demo` command: lower a sample module, dump it and run it.

use std::process::ExitCode;

use owo_colors::OwoColorize;
use tracing::debug;

use opforge_core::ast::{Accessor, ArithmeticOp, CompareOp, Expr, Function, Stmt};
use opforge_core::{Interpreter, LanguageOps, Program, Value, lower_module};

use crate::cli::Cli;

/// Builds:
///
/// ```text
/// function sum(limit) {
///     i = 0; total = 0;
///     while (i < limit) { total = total + i; i = i + 1; }
///     return total;
/// }
/// function main() {
///     box = new();
///     box.value = sum(10);
///     return box.value > 100 || box.value && "small";
/// }
/// ```
fn sample() -> Vec<Function> {
    let add = |lhs, rhs| Expr::arithmetic(ArithmeticOp::Add, lhs, rhs);
    let sum = Function::new(
        "sum",
        &["limit"],
        vec![
            Stmt::Expr(Expr::assign("i", Expr::number("0"))),
            Stmt::Expr(Expr::assign("total", Expr::number("0"))),
            Stmt::while_loop(
                Expr::compare(CompareOp::Less, Expr::name("i"), Expr::name("limit")),
                vec![
                    Stmt::Expr(Expr::assign(
                        "total",
                        add(Expr::name("total"), Expr::name("i")),
                    )),
                    Stmt::Expr(Expr::assign("i", add(Expr::name("i"), Expr::number("1")))),
                ],
            ),
            Stmt::ret(Expr::name("total")),
        ],
    );

    let value = || Expr::member("box", vec![Accessor::field("value")]);
    let main = Function::new(
        "main",
        &[],
        vec![
            Stmt::Expr(Expr::assign("box", Expr::call("new", vec![]))),
            Stmt::Expr(Expr::member(
                "box",
                vec![
                    Accessor::field("value"),
                    Accessor::assign(Expr::call("sum", vec![Expr::number("10")])),
                ],
            )),
            Stmt::ret(Expr::or(vec![
                Expr::compare(CompareOp::Greater, value(), Expr::number("100")),
                Expr::and(vec![value(), Expr::string("small")]),
            ])),
        ],
    );

    vec![sum, main]
}

pub fn run(cli: &Cli) -> ExitCode {
    let ops = match LanguageOps::new() {
        Ok(ops) => ops,
        Err(e) => {
            eprintln!("{}: {}", "Error".red().bold(), e);
            return ExitCode::FAILURE;
        }
    };

    let programs: Vec<Program> = match lower_module(&ops, &sample()) {
        Ok(programs) => programs,
        Err(e) => {
            eprintln!("{}: {}", "Lowering Error".red().bold(), e);
            return ExitCode::FAILURE;
        }
    };
    debug!(programs = programs.len(), "Lowered sample module");

    let mut interpreter = Interpreter::new(&ops);
    for program in programs {
        if cli.verbose {
            println!("{program}");
        } else if let Some(name) = program.name() {
            println!(
                "{} {} ({} locals, {} labels)",
                "Lowered".green(),
                name.cyan(),
                program.local_count(),
                program.labels().len()
            );
        }
        if let Err(e) = interpreter.register_program(program) {
            eprintln!("{}: {}", "Error".red().bold(), e);
            return ExitCode::FAILURE;
        }
    }

    match interpreter.call("main", Vec::new()) {
        Ok(Value::Null) => ExitCode::SUCCESS,
        Ok(value) => {
            println!("{} {}", "Result:".bold(), value);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}: {}", "Runtime Error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
