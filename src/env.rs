// ABOUTME: Environment module for managing variable bindings and scopes

use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// One lexical scope. Environments are shared: a closure holds its
/// defining environment alive after the block that created it exits.
#[derive(Debug)]
pub struct Environment {
    bindings: RefCell<HashMap<String, Value>>,
    enclosing: Option<Rc<Environment>>,
}

impl Environment {
    /// Creates the global environment with no enclosing scope
    pub fn new() -> Rc<Self> {
        Rc::new(Environment {
            bindings: RefCell::new(HashMap::new()),
            enclosing: None,
        })
    }

    /// Creates a child environment chained to an enclosing one
    pub fn with_enclosing(enclosing: Rc<Environment>) -> Rc<Self> {
        Rc::new(Environment {
            bindings: RefCell::new(HashMap::new()),
            enclosing: Some(enclosing),
        })
    }

    /// Defines a binding in THIS scope (doesn't walk the chain)
    pub fn define(&self, name: String, value: Value) {
        self.bindings.borrow_mut().insert(name, value);
    }

    /// Looks up a name in this scope and enclosing scopes
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.bindings.borrow().get(name) {
            return Some(value.clone());
        }

        if let Some(ref enclosing) = self.enclosing {
            return enclosing.get(name);
        }

        None
    }

    /// Updates an existing binding in this scope or an enclosing one.
    /// Returns false when the name is bound nowhere on the chain.
    pub fn assign(&self, name: &str, value: Value) -> bool {
        if self.bindings.borrow().contains_key(name) {
            self.bindings.borrow_mut().insert(name.to_string(), value);
            return true;
        }

        if let Some(ref enclosing) = self.enclosing {
            return enclosing.assign(name, value);
        }

        false
    }

    /// Reads a binding exactly `distance` scopes up the chain. The scope
    /// at that distance is guaranteed by the resolver to hold the name.
    pub fn get_at(&self, distance: usize, name: &str) -> Option<Value> {
        if distance == 0 {
            return self.bindings.borrow().get(name).cloned();
        }

        self.enclosing
            .as_ref()
            .and_then(|enclosing| enclosing.get_at(distance - 1, name))
    }

    /// Writes a binding exactly `distance` scopes up the chain
    pub fn assign_at(&self, distance: usize, name: &str, value: Value) -> bool {
        if distance == 0 {
            if self.bindings.borrow().contains_key(name) {
                self.bindings.borrow_mut().insert(name.to_string(), value);
                return true;
            }
            return false;
        }

        match self.enclosing {
            Some(ref enclosing) => enclosing.assign_at(distance - 1, name, value),
            None => false,
        }
    }
}
