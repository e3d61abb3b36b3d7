use std::rc::Rc;

use rlox::host::{CaptureErrors, CaptureOutput, FixedClock};
use rlox::{Lox, RunStatus};

struct Session {
    lox: Lox,
    output: CaptureOutput,
    errors: CaptureErrors,
}

impl Session {
    fn new() -> Self {
        let output = CaptureOutput::new();
        let errors = CaptureErrors::new();
        let lox = Lox::with_host(
            Box::new(output.clone()),
            Box::new(errors.clone()),
            Rc::new(FixedClock(1_234.0)),
        );

        Self {
            lox,
            output,
            errors,
        }
    }

    fn run(&mut self, source: &str) -> RunStatus {
        self.lox.run(source)
    }
}

/// Run `source` in a fresh session; return printed lines and error messages.
fn run(source: &str) -> (Vec<String>, Vec<String>) {
    let mut session = Session::new();
    session.run(source);
    (session.output.lines(), session.errors.messages())
}

fn output_of(source: &str) -> Vec<String> {
    let (out, errors) = run(source);
    assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
    out
}

#[test]
fn arithmetic_matches_host() {
    assert_eq!(
        output_of("print 1 + 2; print 10 - 4.5; print 2 * 3; print 7 / 2; print -3;"),
        vec!["3", "5.5", "6", "3.5", "-3"]
    );
}

#[test]
fn equality_without_coercion() {
    assert_eq!(
        output_of(
            "print nil == nil; print nil == false; print 1 == 1; print \"1\" == 1; \
             print \"a\" != \"b\"; print 0.1 + 0.2 == 0.3;"
        ),
        vec!["true", "false", "true", "false", "true", "false"]
    );
}

#[test]
fn comparison_and_concatenation() {
    assert_eq!(
        output_of("print 1 < 2; print 2 <= 2; print 3 > 4; print 4 >= 5; print \"foo\" + \"bar\";"),
        vec!["true", "true", "false", "false", "foobar"]
    );
}

#[test]
fn truthiness() {
    assert_eq!(
        output_of("print !nil; print !false; print !0; print !\"\"; if (0) print \"zero is true\";"),
        vec!["true", "true", "false", "false", "zero is true"]
    );
}

#[test]
fn logical_operators_return_operand_values() {
    assert_eq!(
        output_of("print nil or \"fallback\"; print 1 and 2; print false and 1; print \"x\" or 2;"),
        vec!["fallback", "2", "false", "x"]
    );
}

#[test]
fn logical_operators_short_circuit() {
    assert_eq!(
        output_of("print false and (1 / 0); print true or (1 / 0);"),
        vec!["false", "true"]
    );
}

#[test]
fn print_formatting() {
    assert_eq!(
        output_of("print 3; print 2.5; print \"hi\"; print nil; print true; print clock; fun f() {} print f;"),
        vec!["3", "2.5", "hi", "nil", "true", "<native fn clock>", "<fn f>"]
    );
}

#[test]
fn native_clock_reads_the_clock_source() {
    assert_eq!(output_of("print clock();"), vec!["1234"]);
}

#[test]
fn closures_keep_independent_state() {
    let source = "
        fun makeCounter() { var i = 0; fun inc() { i = i + 1; return i; } return inc; }
        var c1 = makeCounter(); var c2 = makeCounter();
        print c1(); print c1();
        print c2();
    ";

    assert_eq!(output_of(source), vec!["1", "2", "1"]);
}

#[test]
fn scoping_is_lexical_not_dynamic() {
    let source = "
        var x = \"outer\";
        fun show() { print x; }
        fun caller() { var x = \"inner\"; show(); }
        caller();
    ";

    assert_eq!(output_of(source), vec!["outer"]);
}

#[test]
fn closure_binding_is_fixed_at_definition() {
    let source = "
        var a = \"global\";
        {
          fun showA() { print a; }
          showA();
          var a = \"block\";
          showA();
        }
    ";

    assert_eq!(output_of(source), vec!["global", "global"]);
}

#[test]
fn block_shadowing_leaves_outer_untouched() {
    assert_eq!(
        output_of("var x = 1; { var x = 2; print x; } print x;"),
        vec!["2", "1"]
    );
}

#[test]
fn assignment_reaches_enclosing_scope() {
    assert_eq!(
        output_of("var x = 1; { x = 2; { x = x + 1; } } print x; print x = 7;"),
        vec!["3", "7"]
    );
}

#[test]
fn global_redeclaration_overwrites() {
    assert_eq!(output_of("var a = 1; var a = a + 1; print a;"), vec!["2"]);
}

#[test]
fn uninitialized_variable_is_nil() {
    assert_eq!(output_of("var a; print a;"), vec!["nil"]);
}

#[test]
fn control_flow() {
    let source = "
        if (1 > 2) print \"no\"; else print \"else\";
        var i = 0;
        while (i < 3) { print i; i = i + 1; }
        for (var j = 0; j < 2; j = j + 1) print j * 10;
    ";

    assert_eq!(output_of(source), vec!["else", "0", "1", "2", "0", "10"]);
}

#[test]
fn return_unwinds_loops_and_blocks() {
    let source = "
        fun first_over(limit) {
          for (var i = 0; ; i = i + 1) {
            { if (i * i > limit) return i; }
          }
        }
        print first_over(10);
        fun nothing() { return; }
        print nothing();
        fun implicit() {}
        print implicit();
    ";

    assert_eq!(output_of(source), vec!["4", "nil", "nil"]);
}

#[test]
fn recursion() {
    let source = "
        fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); }
        print fib(15);
    ";

    assert_eq!(output_of(source), vec!["610"]);
}

#[test]
fn functions_are_values() {
    let source = "
        fun twice(f, x) { return f(f(x)); }
        fun inc(n) { return n + 1; }
        var g = inc;
        print twice(g, 5);
        print g == inc;
    ";

    assert_eq!(output_of(source), vec!["7", "true"]);
}

#[test]
fn arity_mismatch_names_both_counts() {
    let (out, errors) = run("fun f(a) {}\nf(1, 2);");

    assert!(out.is_empty());
    assert_eq!(errors, vec!["Expected 1 arguments but got 2.\n[line 2]"]);
}

#[test]
fn operand_type_errors() {
    let (_, errors) = run("\"a\" - 1;");
    assert_eq!(errors, vec!["Operands must be numbers.\n[line 1]"]);

    let (_, errors) = run("1 + \"a\";");
    assert_eq!(errors, vec!["Operands must be two numbers or two strings.\n[line 1]"]);

    let (_, errors) = run("-\"a\";");
    assert_eq!(errors, vec!["Operand must be a number.\n[line 1]"]);

    let (_, errors) = run("1 < nil;");
    assert_eq!(errors, vec!["Operands must be numbers.\n[line 1]"]);
}

#[test]
fn calling_a_non_callable() {
    let (_, errors) = run("\"not a function\"();");

    assert_eq!(errors, vec!["Can only call functions and classes.\n[line 1]"]);
}

#[test]
fn division_by_zero_follows_float_arithmetic() {
    assert_eq!(
        output_of("print 1 / 0; print -1 / 0; print 0 / 0; print 2;"),
        vec!["Infinity", "-Infinity", "NaN", "2"]
    );
}

#[test]
fn deep_recursion_within_the_limit() {
    let source = "
        fun depth(n) { if (n == 0) return 0; return 1 + depth(n - 1); }
        print depth(1000);
    ";

    assert_eq!(output_of(source), vec!["1000"]);
}

#[test]
fn runaway_recursion_is_a_runtime_error() {
    let mut session = Session::new();

    let status = session.run("fun forever(n) { return forever(n + 1); }\nforever(0);");

    assert_eq!(status, RunStatus::RuntimeError);
    assert_eq!(session.errors.messages(), vec!["Stack overflow.\n[line 1]"]);

    // The session survives and call depth starts from zero again.
    session.lox.reset_errors();
    assert_eq!(session.run("fun two() { return 2; } print two();"), RunStatus::Ok);
    assert_eq!(session.output.lines(), vec!["2"]);
}

#[test]
fn runtime_error_keeps_prior_output_and_stops() {
    let mut session = Session::new();
    let status = session.run("print 1;\nprint missing;\nprint 2;");

    assert_eq!(status, RunStatus::RuntimeError);
    assert!(session.lox.had_runtime_error());
    assert!(!session.lox.had_error());
    assert_eq!(session.output.lines(), vec!["1"]);
    assert_eq!(
        session.errors.messages(),
        vec!["Undefined variable 'missing'.\n[line 2]"]
    );
}

#[test]
fn syntax_errors_gate_execution() {
    let mut session = Session::new();
    let status = session.run("print 1;\nprint (2;\nvar = 3;");

    assert_eq!(status, RunStatus::CompileError);
    assert!(session.lox.had_error());
    assert!(session.output.lines().is_empty());
    assert_eq!(session.errors.messages().len(), 2);
}

#[test]
fn lexical_errors_gate_execution() {
    let (out, errors) = run("print 1; @");

    assert!(out.is_empty());
    assert_eq!(errors, vec!["[line 1] Error: Unexpected character @."]);
}

#[test]
fn resolution_errors_gate_execution() {
    let (out, errors) = run("print 1; { var a = a; }");

    assert!(out.is_empty());
    assert_eq!(
        errors,
        vec!["[line 1] Error at 'a': Can't read local variable in its own initializer."]
    );
}

#[test]
fn global_self_reference_is_resolved_dynamically() {
    assert_eq!(output_of("var a = 1; var a = a; print a;"), vec!["1"]);

    // Accepted statically; fails only because `a` has no value yet.
    let (_, errors) = run("var a = a;");
    assert_eq!(errors, vec!["Undefined variable 'a'.\n[line 1]"]);
}

#[test]
fn state_persists_across_runs() {
    let mut session = Session::new();

    session.run("fun make() { var n = 0; fun inc() { n = n + 1; return n; } return inc; }");
    session.run("var c = make();");
    session.run("print c();");
    session.run("print c();");

    assert_eq!(session.output.lines(), vec!["1", "2"]);
    assert!(session.errors.messages().is_empty());
}

#[test]
fn scope_is_restored_after_runtime_error_in_block() {
    let mut session = Session::new();

    assert_eq!(
        session.run("var a = \"outer\"; { var a = \"inner\"; print nope; }"),
        RunStatus::RuntimeError
    );

    session.lox.reset_errors();
    assert!(!session.lox.had_runtime_error());

    // `b` must land in the global scope, not the abandoned block scope.
    assert_eq!(session.run("var b = a; print b;"), RunStatus::Ok);
    assert_eq!(session.run("print b;"), RunStatus::Ok);
    assert_eq!(session.output.lines(), vec!["outer", "outer"]);
}

#[test]
fn scope_is_restored_after_error_inside_call() {
    let mut session = Session::new();

    session.run("var v = \"global\"; fun boom(v) { return v - 1; }");
    assert_eq!(session.run("boom(\"x\");"), RunStatus::RuntimeError);
    assert_eq!(session.run("var w = v; print w;"), RunStatus::Ok);

    assert_eq!(session.output.lines(), vec!["global"]);
}
