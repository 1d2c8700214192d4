//! Runtime values and the callable capability shared by user functions and
//! host‑provided natives.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::ast::{FunctionDecl, LiteralValue};
use crate::environment::Environment;
use crate::error::{LoxError, Result};
use crate::interpreter::{Flow, Interpreter};
use crate::token::Token;

/// Anything that can appear in callee position.
pub trait Callable: fmt::Debug {
    fn name(&self) -> &str;

    fn arity(&self) -> usize;

    /// Invoke with already evaluated arguments (`arguments.len() == arity()`
    /// is checked by the caller).  `paren` locates the call for errors.
    fn call(&self, interpreter: &mut Interpreter, arguments: Vec<Value>, paren: &Token)
        -> Result<Value>;

    /// The frame this callable captured, if any.
    fn closure(&self) -> Option<&Rc<RefCell<Environment>>> {
        None
    }
}

#[derive(Debug, Clone)]
pub enum Value {
    Number(f64),
    String(String),
    Bool(bool),
    Null,
    Callable(Rc<dyn Callable>),
}

impl PartialEq for Value {
    /// Native equality per runtime type; values of different types are never
    /// equal.  Callables compare by identity.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Null, Value::Null) => true,
            (Value::Callable(a), Value::Callable(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<&LiteralValue> for Value {
    fn from(literal: &LiteralValue) -> Self {
        match literal {
            LiteralValue::Number(n) => Value::Number(*n),
            LiteralValue::Str(s) => Value::String(s.clone()),
            LiteralValue::True => Value::Bool(true),
            LiteralValue::False => Value::Bool(false),
            LiteralValue::Null => Value::Null,
        }
    }
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Bool(_) => "boolean",
            Value::Null => "null",
            Value::Callable(_) => "function",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => format_number(*n, f),

            Value::String(s) => write!(f, "{}", s),

            Value::Bool(b) => write!(f, "{}", b),

            Value::Null => write!(f, "null"),

            Value::Callable(c) => write!(f, "{:?}", c),
        }
    }
}

/// Integral numbers print without a fractional part: `3.0` → `3`.
fn format_number(n: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        let mut buf: itoa::Buffer = itoa::Buffer::new();
        f.write_str(buf.format(n as i64))
    } else {
        write!(f, "{}", n)
    }
}

// ─────────────────────────── user functions ───────────────────────────

/// A function value: the shared declaration plus the frame that was current
/// when the declaration executed.
#[derive(Clone)]
pub struct Function {
    declaration: Rc<FunctionDecl>,
    closure: Rc<RefCell<Environment>>,
}

impl Function {
    pub fn new(declaration: Rc<FunctionDecl>, closure: Rc<RefCell<Environment>>) -> Self {
        Self {
            declaration,
            closure,
        }
    }
}

impl fmt::Debug for Function {
    // The closure may (indirectly) contain this very function.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {}>", self.declaration.name.lexeme)
    }
}

impl Callable for Function {
    fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
        _paren: &Token,
    ) -> Result<Value> {
        debug!("Calling user-defined function '{}'", self.name());

        // Parent is the closure, not the caller: scoping is lexical.
        let environment = Environment::nested(&self.closure);

        for (param, argument) in self.declaration.params.iter().zip(arguments) {
            environment.borrow_mut().define(&param.lexeme, argument);
        }

        match interpreter.execute_block(&self.declaration.body, environment)? {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Value::Null),
        }
    }

    fn closure(&self) -> Option<&Rc<RefCell<Environment>>> {
        Some(&self.closure)
    }
}

// ─────────────────────────── host natives ───────────────────────────

/// Signature of a host function exposed to scripts.
pub type NativeFn = fn(&[Value]) -> std::result::Result<Value, String>;

/// A function implemented by the embedding host.
#[derive(Clone)]
pub struct NativeFunction {
    name: String,
    arity: usize,
    func: NativeFn,
}

impl NativeFunction {
    pub fn new<S: Into<String>>(name: S, arity: usize, func: NativeFn) -> Self {
        Self {
            name: name.into(),
            arity,
            func,
        }
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn {}>", self.name)
    }
}

impl Callable for NativeFunction {
    fn name(&self) -> &str {
        &self.name
    }

    fn arity(&self) -> usize {
        self.arity
    }

    fn call(
        &self,
        _interpreter: &mut Interpreter,
        arguments: Vec<Value>,
        paren: &Token,
    ) -> Result<Value> {
        debug!("Calling native function '{}'", self.name);

        (self.func)(&arguments).map_err(|message| LoxError::runtime(paren.line, message))
    }
}
