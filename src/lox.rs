//! The interpreter **session**: one scanner → parser → resolver →
//! interpreter pipeline plus the state that outlives a single run (globals,
//! node ids, error flags).
//!
//! A file run is one call to [`Lox::run`]; a REPL calls it once per line and
//! clears the flags in between with [`Lox::reset_errors`].

use std::rc::Rc;

use log::{debug, info};

use crate::ast::NodeIds;
use crate::error::LoxError;
use crate::host::{Clock, ErrorSink, OutputSink, StderrSink, StdoutSink, SystemClock};
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::scan_tokens;

/// What a single [`Lox::run`] call ended with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Ok,
    /// Lexical, parse or resolve errors; nothing was executed.
    CompileError,
    /// Execution started and was aborted by a runtime error.
    RuntimeError,
}

pub struct Lox {
    interpreter: Interpreter,
    ids: NodeIds,
    errors: Box<dyn ErrorSink>,
    had_error: bool,
    had_runtime_error: bool,
}

impl Default for Lox {
    fn default() -> Self {
        Self::new()
    }
}

impl Lox {
    /// Session wired to stdout, stderr and the system clock.
    pub fn new() -> Self {
        Self::with_host(
            Box::new(StdoutSink),
            Box::new(StderrSink),
            Rc::new(SystemClock),
        )
    }

    pub fn with_host(
        output: Box<dyn OutputSink>,
        errors: Box<dyn ErrorSink>,
        clock: Rc<dyn Clock>,
    ) -> Self {
        info!("Lox session created");

        Self {
            interpreter: Interpreter::with_host(output, clock),
            ids: NodeIds::new(),
            errors,
            had_error: false,
            had_runtime_error: false,
        }
    }

    /// Scan, parse, resolve and execute `source`.
    ///
    /// Any lexical or parse error keeps the program from running at all.
    /// Resolution stops at its first error.  A runtime error ends the run but
    /// keeps whatever output was already produced.
    pub fn run(&mut self, source: &str) -> RunStatus {
        let (tokens, lex_errors) = scan_tokens(source);
        for e in &lex_errors {
            self.report(e);
        }

        let parsed = Parser::new(tokens, &mut self.ids).parse();
        for e in &parsed.errors {
            self.report(e);
        }

        if !lex_errors.is_empty() || parsed.has_errors() {
            debug!("Skipping execution after syntax errors");
            return RunStatus::CompileError;
        }

        let resolved = Resolver::new(&mut self.interpreter).resolve(&parsed.statements);

        if let Err(e) = resolved {
            self.report(&e);
            return RunStatus::CompileError;
        }

        match self.interpreter.interpret(&parsed.statements) {
            Ok(()) => RunStatus::Ok,
            Err(e) => {
                self.report(&e);
                RunStatus::RuntimeError
            }
        }
    }

    fn report(&mut self, error: &LoxError) {
        if error.is_runtime() {
            self.had_runtime_error = true;
        } else {
            self.had_error = true;
        }

        self.errors.report(error);
    }

    pub fn had_error(&self) -> bool {
        self.had_error
    }

    pub fn had_runtime_error(&self) -> bool {
        self.had_runtime_error
    }

    pub fn reset_errors(&mut self) {
        self.had_error = false;
        self.had_runtime_error = false;
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }
}
