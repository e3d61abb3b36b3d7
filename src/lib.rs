pub mod ast;
pub mod callable;
pub mod environment;
pub mod error;
pub mod host;
pub mod interpreter;
pub mod lox;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod token;
pub mod value;

pub use lox::{Lox, RunStatus};
