use crate::error::{LoxError, Result};
use crate::value::Value;
use log::debug;
use std::cell::RefCell;
use std::collections::HashMap;
use std::mem;
use std::rc::Rc;

/// One scope frame.  Frames are shared (`Rc<RefCell<_>>`) because a closure
/// may keep its defining frame alive after the block that created it exits.
#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    /// A root frame with no parent (the global scope).
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: Rc<RefCell<Environment>>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Convenience: a fresh frame already wrapped for sharing.
    pub fn nested(enclosing: &Rc<RefCell<Environment>>) -> Rc<RefCell<Environment>> {
        Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(
            enclosing,
        ))))
    }

    /// Bind `name` in this frame, silently replacing an existing binding.
    pub fn define(&mut self, name: &str, value: Value) {
        debug!("define '{}' = {}", name, value);

        self.values.insert(name.to_string(), value);
    }

    /// Look `name` up, innermost frame first.
    pub fn get(&self, name: &str, line: usize) -> Result<Value> {
        if let Some(value) = self.values.get(name) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name, line)
        } else {
            Err(undefined(name, line))
        }
    }

    /// Overwrite the nearest existing binding of `name`.  Never declares.
    pub fn assign(&mut self, name: &str, value: Value, line: usize) -> Result<()> {
        if let Some(slot) = self.values.get_mut(name) {
            *slot = value;
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value, line)
        } else {
            Err(undefined(name, line))
        }
    }

    /// Called with the last outside handle to a frame that just went out of
    /// scope.  A function declared in a frame is stored in that same frame,
    /// so the pair keeps itself alive.  When every other strong reference to
    /// `frame` comes from such functions, and nothing else holds those
    /// functions, the frame is unreachable and its bindings are dropped to
    /// break the cycle.  Returns whether that happened.
    pub fn release(frame: Rc<RefCell<Environment>>) -> bool {
        let self_captured: usize = frame
            .borrow()
            .values
            .values()
            .filter(|value| match value {
                Value::Callable(callable) => {
                    Rc::strong_count(callable) == 1
                        && callable
                            .closure()
                            .is_some_and(|closure| Rc::ptr_eq(closure, &frame))
                }
                _ => false,
            })
            .count();

        if self_captured == 0 || Rc::strong_count(&frame) != 1 + self_captured {
            return false;
        }

        debug!("Releasing frame held only by {} own function(s)", self_captured);

        // Dropped after the borrow ends: each function drops a handle to `frame`.
        let values = mem::take(&mut frame.borrow_mut().values);
        drop(values);
        true
    }

    /// Whether this frame alone binds `name`.
    pub fn contains_local(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }
}

fn undefined(name: &str, line: usize) -> LoxError {
    LoxError::runtime(line, format!("Undefined variable '{}'.", name))
}
