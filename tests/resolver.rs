use std::rc::Rc;

use rlox::ast::{Expr, ExprId, NodeIds, Stmt};
use rlox::error::LoxError;
use rlox::host::{CaptureOutput, FixedClock};
use rlox::interpreter::Interpreter;
use rlox::parser::Parser;
use rlox::resolver::Resolver;
use rlox::scanner::scan_tokens;

fn parse(source: &str) -> Vec<Stmt> {
    let mut ids = NodeIds::new();
    let output = Parser::new(scan_tokens(source).0, &mut ids).parse();
    assert!(!output.has_errors(), "parse errors: {:?}", output.errors);
    output.statements
}

fn interpreter() -> Interpreter {
    Interpreter::with_host(Box::new(CaptureOutput::new()), Rc::new(FixedClock(0.0)))
}

fn resolve(source: &str) -> (Interpreter, Vec<Stmt>, Result<(), LoxError>) {
    let statements = parse(source);
    let mut interpreter = interpreter();
    let result = Resolver::new(&mut interpreter).resolve(&statements);
    (interpreter, statements, result)
}

/// Ids of every `Variable` read of `name`, in source order.
fn reads_of(statements: &[Stmt], name: &str) -> Vec<ExprId> {
    fn walk_expr(expr: &Expr, name: &str, out: &mut Vec<ExprId>) {
        match expr {
            Expr::Variable { id, name: n } if n.lexeme == name => out.push(*id),
            Expr::Variable { .. } | Expr::Literal(_) => {}
            Expr::Assign { value, .. } => walk_expr(value, name, out),
            Expr::Grouping(inner) | Expr::Unary { right: inner, .. } => walk_expr(inner, name, out),
            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                walk_expr(left, name, out);
                walk_expr(right, name, out);
            }
            Expr::Call {
                callee, arguments, ..
            } => {
                walk_expr(callee, name, out);
                for a in arguments {
                    walk_expr(a, name, out);
                }
            }
        }
    }

    fn walk_stmt(stmt: &Stmt, name: &str, out: &mut Vec<ExprId>) {
        match stmt {
            Stmt::Expression(e) | Stmt::Print(e) => walk_expr(e, name, out),
            Stmt::Var { initializer, .. } => {
                if let Some(e) = initializer {
                    walk_expr(e, name, out);
                }
            }
            Stmt::Block(stmts) => stmts.iter().for_each(|s| walk_stmt(s, name, out)),
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                walk_expr(condition, name, out);
                walk_stmt(then_branch, name, out);
                if let Some(e) = else_branch {
                    walk_stmt(e, name, out);
                }
            }
            Stmt::While { condition, body } => {
                walk_expr(condition, name, out);
                walk_stmt(body, name, out);
            }
            Stmt::Function(decl) => decl.body.iter().for_each(|s| walk_stmt(s, name, out)),
            Stmt::Return { value, .. } => {
                if let Some(e) = value {
                    walk_expr(e, name, out);
                }
            }
        }
    }

    let mut out = Vec::new();
    statements.iter().for_each(|s| walk_stmt(s, name, &mut out));
    out
}

#[test]
fn globals_are_left_unresolved() {
    let (interp, stmts, result) = resolve("var a = 1; print a;");

    assert!(result.is_ok());
    assert_eq!(interp.local_depth(reads_of(&stmts, "a")[0]), None);
}

#[test]
fn block_locals_record_hop_distance() {
    let (interp, stmts, result) = resolve("{ var a = 1; print a; { print a; { print a; } } }");

    assert!(result.is_ok());

    let depths: Vec<Option<usize>> = reads_of(&stmts, "a")
        .into_iter()
        .map(|id| interp.local_depth(id))
        .collect();

    assert_eq!(depths, vec![Some(0), Some(1), Some(2)]);
}

#[test]
fn parameters_and_captured_locals() {
    let source = "fun outer(x) { var y = 1; fun inner() { return x + y; } return inner; }";
    let (interp, stmts, result) = resolve(source);

    assert!(result.is_ok());
    assert_eq!(interp.local_depth(reads_of(&stmts, "x")[0]), Some(1));
    assert_eq!(interp.local_depth(reads_of(&stmts, "y")[0]), Some(1));
    assert_eq!(interp.local_depth(reads_of(&stmts, "inner")[0]), Some(0));
}

#[test]
fn reference_before_local_declaration_binds_outward() {
    let source = "var a = 1; { fun show() { print a; } var a = 2; }";
    let (interp, stmts, result) = resolve(source);

    assert!(result.is_ok());
    assert_eq!(interp.local_depth(reads_of(&stmts, "a")[0]), None);
}

#[test]
fn reading_local_in_own_initializer_is_an_error() {
    let (_, _, result) = resolve("{ var a = a; }");

    assert_eq!(
        result.unwrap_err().to_string(),
        "[line 1] Error at 'a': Can't read local variable in its own initializer."
    );
}

#[test]
fn global_self_reference_is_accepted() {
    let (_, _, result) = resolve("var a = a;");

    assert!(result.is_ok());
}

#[test]
fn duplicate_local_declaration_is_an_error() {
    let (_, _, result) = resolve("{ var a = 1;\n var a = 2; }");

    assert_eq!(
        result.unwrap_err().to_string(),
        "[line 2] Error at 'a': Already a variable with this name in this scope."
    );
}

#[test]
fn duplicate_parameter_is_an_error() {
    let (_, _, result) = resolve("fun f(a, a) {}");

    assert!(result.is_err());
}

#[test]
fn duplicate_global_declaration_is_accepted() {
    let (_, _, result) = resolve("var a = 1; var a = 2;");

    assert!(result.is_ok());
}

#[test]
fn top_level_return_is_an_error() {
    let (_, _, result) = resolve("return 1;");

    assert_eq!(
        result.unwrap_err().to_string(),
        "[line 1] Error at 'return': Can't return from top-level code."
    );
}

#[test]
fn return_inside_nested_function_is_fine_and_context_restores() {
    let (_, _, ok) = resolve("fun a() { fun b() { return 1; } return b; }");
    assert!(ok.is_ok());

    let (_, _, err) = resolve("fun a() { fun b() {} } return 1;");
    assert!(err.is_err());
}

#[test]
fn resolution_stops_at_first_error() {
    let statements = parse("{ var a = a; var b = b; }");
    let mut interpreter = interpreter();

    let err = Resolver::new(&mut interpreter)
        .resolve(&statements)
        .unwrap_err();

    assert_eq!(err.line(), Some(1));
    assert!(err.to_string().contains("at 'a'"));
}
