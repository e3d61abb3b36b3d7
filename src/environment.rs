use crate::error::{LoxError, Result};
use crate::token::Token;
use crate::value::Value;
use log::debug;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Shared handle to a scope.  Closures hold one of these, which is what
/// keeps a scope alive after the block that created it has finished.
pub type EnvRef = Rc<RefCell<Environment>>;

/// One lexical scope: its bindings plus a link to the enclosing scope.
/// Following `enclosing` always ends at the global scope.
#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<EnvRef>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enclosing(enclosing: EnvRef) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    pub fn into_ref(self) -> EnvRef {
        Rc::new(RefCell::new(self))
    }

    pub fn enclosing(&self) -> Option<&EnvRef> {
        self.enclosing.as_ref()
    }

    /// Bind `name` in this scope.  Re‑defining an existing name overwrites it.
    pub fn define(&mut self, name: &str, value: Value) {
        debug!("define '{}' = {}", name, value);

        self.values.insert(name.to_string(), value);
    }

    /// Look `name` up here, then in each enclosing scope.
    pub fn get(&self, name: &Token) -> Result<Value> {
        if let Some(value) = self.values.get(&name.lexeme) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            Err(undefined(name))
        }
    }

    /// Overwrite the nearest existing binding of `name`.
    pub fn assign(&mut self, name: &Token, value: Value) -> Result<()> {
        if let Some(slot) = self.values.get_mut(&name.lexeme) {
            *slot = value;
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            Err(undefined(name))
        }
    }

    /// The scope exactly `distance` enclosing‑links away from `env`.
    pub fn ancestor(env: &EnvRef, distance: usize) -> Option<EnvRef> {
        let mut current: EnvRef = Rc::clone(env);

        for _ in 0..distance {
            let next: EnvRef = current.borrow().enclosing.clone()?;
            current = next;
        }

        Some(current)
    }

    /// Read `name` from the scope `distance` hops out, without searching.
    pub fn get_at(env: &EnvRef, distance: usize, name: &Token) -> Result<Value> {
        let scope: EnvRef = Self::ancestor(env, distance).ok_or_else(|| undefined(name))?;
        let value = scope.borrow().values.get(&name.lexeme).cloned();

        value.ok_or_else(|| undefined(name))
    }

    /// Write `name` in the scope `distance` hops out, without searching.
    pub fn assign_at(env: &EnvRef, distance: usize, name: &Token, value: Value) -> Result<()> {
        let scope: EnvRef = Self::ancestor(env, distance).ok_or_else(|| undefined(name))?;

        scope.borrow_mut().define(&name.lexeme, value);

        Ok(())
    }
}

fn undefined(name: &Token) -> LoxError {
    LoxError::runtime(name, format!("Undefined variable '{}'.", name.lexeme))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenType;

    fn ident(name: &str) -> Token {
        Token::new(TokenType::IDENTIFIER, name, None, 1)
    }

    #[test]
    fn get_walks_the_chain() {
        let global = Environment::new().into_ref();
        global.borrow_mut().define("a", Value::Number(1.0));

        let inner = Environment::with_enclosing(Rc::clone(&global)).into_ref();

        assert_eq!(inner.borrow().get(&ident("a")).unwrap(), Value::Number(1.0));
    }

    #[test]
    fn assign_updates_defining_scope() {
        let global = Environment::new().into_ref();
        global.borrow_mut().define("a", Value::Number(1.0));

        let inner = Environment::with_enclosing(Rc::clone(&global)).into_ref();
        inner
            .borrow_mut()
            .assign(&ident("a"), Value::Number(2.0))
            .unwrap();

        assert_eq!(global.borrow().get(&ident("a")).unwrap(), Value::Number(2.0));
    }

    #[test]
    fn undefined_variable_names_identifier() {
        let env = Environment::new();
        let err = env.get(&ident("missing")).unwrap_err();

        assert_eq!(err.message(), "Undefined variable 'missing'.");

        let mut env = env;
        assert!(env.assign(&ident("missing"), Value::Nil).is_err());
    }

    #[test]
    fn define_may_redefine_in_same_scope() {
        let mut env = Environment::new();
        env.define("a", Value::Number(1.0));
        env.define("a", Value::from("two"));

        assert_eq!(env.get(&ident("a")).unwrap(), Value::from("two"));
    }

    #[test]
    fn get_at_jumps_without_searching() {
        let global = Environment::new().into_ref();
        global.borrow_mut().define("x", Value::from("global"));

        let middle = Environment::with_enclosing(Rc::clone(&global)).into_ref();
        middle.borrow_mut().define("x", Value::from("middle"));

        let inner = Environment::with_enclosing(Rc::clone(&middle)).into_ref();

        assert_eq!(
            Environment::get_at(&inner, 1, &ident("x")).unwrap(),
            Value::from("middle")
        );
        assert_eq!(
            Environment::get_at(&inner, 2, &ident("x")).unwrap(),
            Value::from("global")
        );
        assert!(Environment::get_at(&inner, 0, &ident("x")).is_err());

        Environment::assign_at(&inner, 2, &ident("x"), Value::Nil).unwrap();
        assert_eq!(global.borrow().get(&ident("x")).unwrap(), Value::Nil);
        assert_eq!(middle.borrow().get(&ident("x")).unwrap(), Value::from("middle"));
    }
}
