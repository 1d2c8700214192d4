use std::cell::RefCell;
use std::rc::Rc;

use jslox::ast::FunctionDecl;
use jslox::environment::Environment;
use jslox::token::{Token, TokenType};
use jslox::value::{Function, Value};

/// Declares an empty function `name` in `frame`, closing over `frame`.
fn declare_in(frame: &Rc<RefCell<Environment>>, name: &str) -> Value {
    let declaration = Rc::new(FunctionDecl {
        name: Token::new(TokenType::IDENTIFIER, name, 1),
        params: Vec::new(),
        body: Vec::new(),
    });
    let function = Value::Callable(Rc::new(Function::new(declaration, Rc::clone(frame))));

    frame.borrow_mut().define(name, function.clone());
    function
}

#[test]
fn define_then_get() {
    let mut env = Environment::new();
    env.define("a", Value::Number(1.0));

    assert_eq!(env.get("a", 1).unwrap(), Value::Number(1.0));
}

#[test]
fn redefine_in_same_frame_rebinds() {
    let mut env = Environment::new();
    env.define("a", Value::Number(1.0));
    env.define("a", Value::String("two".into()));

    assert_eq!(env.get("a", 1).unwrap(), Value::String("two".into()));
}

#[test]
fn get_walks_outward_and_inner_shadows() {
    let global = Rc::new(RefCell::new(Environment::new()));
    global.borrow_mut().define("a", Value::Number(1.0));
    global.borrow_mut().define("b", Value::Bool(true));

    let inner = Environment::nested(&global);
    inner.borrow_mut().define("a", Value::Number(2.0));

    assert_eq!(inner.borrow().get("a", 1).unwrap(), Value::Number(2.0));
    assert_eq!(inner.borrow().get("b", 1).unwrap(), Value::Bool(true));
    assert_eq!(global.borrow().get("a", 1).unwrap(), Value::Number(1.0));
}

#[test]
fn assign_mutates_nearest_defining_frame() {
    let global = Rc::new(RefCell::new(Environment::new()));
    global.borrow_mut().define("a", Value::Number(1.0));

    let inner = Environment::nested(&global);
    inner
        .borrow_mut()
        .assign("a", Value::Number(5.0), 1)
        .unwrap();

    assert!(!inner.borrow().contains_local("a"));
    assert_eq!(global.borrow().get("a", 1).unwrap(), Value::Number(5.0));
}

#[test]
fn assign_never_declares() {
    let global = Rc::new(RefCell::new(Environment::new()));
    let inner = Environment::nested(&global);

    let err = inner
        .borrow_mut()
        .assign("c", Value::Number(1.0), 7)
        .unwrap_err();

    assert_eq!(err.to_string(), "Undefined variable 'c'.");
    assert_eq!(err.line(), Some(7));
    assert!(!global.borrow().contains_local("c"));
}

#[test]
fn get_undefined_is_an_error() {
    let env = Environment::new();

    let err = env.get("missing", 3).unwrap_err();

    assert_eq!(err.to_string(), "Undefined variable 'missing'.");
    assert_eq!(err.line(), Some(3));
}

#[test]
fn release_breaks_self_capturing_frame() {
    let global = Rc::new(RefCell::new(Environment::new()));
    let frame = Environment::nested(&global);
    frame.borrow_mut().define("n", Value::Number(1.0));
    drop(declare_in(&frame, "inner"));

    let weak = Rc::downgrade(&frame);
    assert!(Environment::release(frame));
    assert!(weak.upgrade().is_none());
}

#[test]
fn release_keeps_frame_whose_function_escaped() {
    let global = Rc::new(RefCell::new(Environment::new()));
    let frame = Environment::nested(&global);
    let escaped = declare_in(&frame, "inner");

    let weak = Rc::downgrade(&frame);
    assert!(!Environment::release(frame));

    let frame = weak.upgrade().expect("frame is still reachable");
    assert!(frame.borrow().contains_local("inner"));
    drop(escaped);
}

#[test]
fn release_keeps_frame_referenced_from_outside() {
    let global = Rc::new(RefCell::new(Environment::new()));
    let frame = Environment::nested(&global);
    drop(declare_in(&frame, "inner"));
    let child = Environment::nested(&frame);

    assert!(!Environment::release(Rc::clone(&frame)));
    assert!(frame.borrow().contains_local("inner"));
    drop(child);
}

#[test]
fn release_ignores_frames_without_functions() {
    let frame = Rc::new(RefCell::new(Environment::new()));
    frame.borrow_mut().define("a", Value::Number(1.0));

    assert!(!Environment::release(frame));
}
