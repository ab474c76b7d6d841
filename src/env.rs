// ABOUTME: Environment module for managing variable bindings and scopes

use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// A frame of name → value bindings plus an optional enclosing frame.
///
/// Frames are shared: blocks and calls create children, and closures keep
/// their defining chain alive through the `Rc` links.
#[derive(Debug)]
pub struct Environment {
    bindings: RefCell<HashMap<String, Value>>,
    enclosing: Option<Rc<Environment>>,
}

impl Environment {
    /// Creates the root (globals) environment.
    pub fn new() -> Rc<Self> {
        Rc::new(Environment {
            bindings: RefCell::new(HashMap::new()),
            enclosing: None,
        })
    }

    /// Creates a child environment enclosed by `enclosing`.
    pub fn with_enclosing(enclosing: Rc<Environment>) -> Rc<Self> {
        Rc::new(Environment {
            bindings: RefCell::new(HashMap::new()),
            enclosing: Some(enclosing),
        })
    }

    /// Defines a binding in THIS frame. Redefinition overwrites.
    pub fn define(&self, name: String, value: Value) {
        self.bindings.borrow_mut().insert(name, value);
    }

    /// Looks a name up in this frame and then the enclosing chain.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.bindings.borrow().get(name) {
            return Some(value.clone());
        }

        if let Some(ref enclosing) = self.enclosing {
            return enclosing.get(name);
        }

        None
    }

    /// Mutates an existing binding in the frame that defines it. Returns
    /// false if no frame in the chain defines `name`.
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

    /// Follows enclosing links exactly `distance` times.
    ///
    /// The resolver guarantees the chain is at least that deep for every
    /// distance it hands out.
    pub fn ancestor(self: &Rc<Self>, distance: usize) -> Rc<Environment> {
        let mut environment = Rc::clone(self);
        for _ in 0..distance {
            let enclosing = environment
                .enclosing
                .as_ref()
                .map(Rc::clone)
                .unwrap_or_else(|| Rc::clone(&environment));
            environment = enclosing;
        }
        environment
    }

    /// Local-only lookup at the ancestor `distance` hops away. Never falls
    /// back to the chain.
    pub fn get_at(self: &Rc<Self>, distance: usize, name: &str) -> Option<Value> {
        self.ancestor(distance).bindings.borrow().get(name).cloned()
    }

    /// Local-only assignment at the ancestor `distance` hops away.
    pub fn assign_at(self: &Rc<Self>, distance: usize, name: &str, value: Value) {
        self.ancestor(distance)
            .bindings
            .borrow_mut()
            .insert(name.to_string(), value);
    }
}
