//! Boundary collaborators the core talks to: where `print` output goes,
//! where diagnostics go, and where `clock()` gets the time from.
//!
//! The std implementations write to the process streams; the `Capture*`
//! and `FixedClock` implementations record everything in memory so tests
//! (and embedders) can inspect what a program did.

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use chrono::Utc;
use log::warn;

use crate::error::LoxError;

/// Receives the text produced by `print`, one line per statement.
pub trait OutputSink {
    fn print_line(&mut self, text: &str);
}

/// Receives every lexical, parse, resolve and runtime error.
pub trait ErrorSink {
    fn report(&mut self, error: &LoxError);
}

/// Time source for the native `clock` function.
pub trait Clock {
    /// Milliseconds since the Unix epoch.
    fn now_millis(&self) -> f64;
}

// ───────────────────────────── std implementations ─────────────────────────

#[derive(Debug, Default)]
pub struct StdoutSink;

impl OutputSink for StdoutSink {
    fn print_line(&mut self, text: &str) {
        let mut out = io::stdout().lock();

        if let Err(e) = writeln!(out, "{}", text).and_then(|_| out.flush()) {
            warn!("Failed to write program output: {}", e);
        }
    }
}

#[derive(Debug, Default)]
pub struct StderrSink;

impl ErrorSink for StderrSink {
    fn report(&mut self, error: &LoxError) {
        eprintln!("{}", error);
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> f64 {
        Utc::now().timestamp_millis() as f64
    }
}

// ─────────────────────────── capturing implementations ─────────────────────

/// Collects printed lines into a shared buffer.  Clones share the buffer.
#[derive(Debug, Default, Clone)]
pub struct CaptureOutput(Rc<RefCell<Vec<String>>>);

impl CaptureOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.0.borrow().clone()
    }
}

impl OutputSink for CaptureOutput {
    fn print_line(&mut self, text: &str) {
        self.0.borrow_mut().push(text.to_owned());
    }
}

/// Collects reported errors into a shared buffer.  Clones share the buffer.
#[derive(Debug, Default, Clone)]
pub struct CaptureErrors(Rc<RefCell<Vec<LoxError>>>);

impl CaptureErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors(&self) -> Vec<LoxError> {
        self.0.borrow().clone()
    }

    /// Rendered messages, in report order.
    pub fn messages(&self) -> Vec<String> {
        self.0.borrow().iter().map(LoxError::to_string).collect()
    }
}

impl ErrorSink for CaptureErrors {
    fn report(&mut self, error: &LoxError) {
        self.0.borrow_mut().push(error.clone());
    }
}

/// A clock that always reads the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub f64);

impl Clock for FixedClock {
    fn now_millis(&self) -> f64 {
        self.0
    }
}
