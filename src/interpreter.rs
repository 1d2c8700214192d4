//! Tree‑walking evaluator.
//!
//! Statements execute to a [`Flow`]: either they complete normally or they
//! carry a `return` value outward.  Errors travel separately on the `Err`
//! side of [`Result`], so a `return` can never be mistaken for a failure and
//! a failure can never be swallowed by a function boundary.
//!
//! The interpreter owns a *current environment* register.  Every place that
//! swaps it (blocks and function bodies) goes through
//! [`Interpreter::scoped`], which restores the previous frame on all exit
//! paths.  A `for` loop runs in the frame it appears in, so its initializer's
//! variable is still visible after the loop.
//!
//! Calls nest at most [`MAX_CALL_DEPTH`] deep; one more is a runtime error,
//! not a native stack overflow.

use std::cell::RefCell;
use std::io::{self, Write};
use std::mem;
use std::rc::Rc;

use log::{debug, info, warn};

use crate::ast::{Expr, Stmt};
use crate::environment::Environment;
use crate::error::{LoxError, Result};
use crate::parser::Parser;
use crate::scanner;
use crate::stack::ensure_sufficient_stack;
use crate::token::{Token, TokenType};
use crate::value::{Function, NativeFn, NativeFunction, Value};

/// Deepest chain of active calls before `Stack overflow.` is raised.
pub const MAX_CALL_DEPTH: usize = 1024;

/// Completion of a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Normal,
    Return(Value),
}

/// Everything a host learns from one [`Interpreter::run_report`] call.
#[derive(Debug)]
pub struct RunReport {
    /// The last non‑null value any expression produced during the run.
    pub value: Value,

    /// Every reported error, in the order reported.
    pub errors: Vec<LoxError>,
}

impl RunReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

pub struct Interpreter {
    globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,
    out: Box<dyn Write>,
    last_value: Value,
    call_depth: usize,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// An interpreter writing its output to stdout.
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    /// An interpreter writing `print` output and reported errors to `out`.
    pub fn with_output(out: Box<dyn Write>) -> Self {
        info!("Initializing Interpreter");

        let globals = Rc::new(RefCell::new(Environment::new()));

        Self {
            environment: Rc::clone(&globals),
            globals,
            out,
            last_value: Value::Null,
            call_depth: 0,
        }
    }

    pub fn globals(&self) -> &Rc<RefCell<Environment>> {
        &self.globals
    }

    /// Expose a host function to scripts as a global.
    pub fn define_native(&mut self, name: &str, arity: usize, func: NativeFn) {
        debug!("Defining native function '{}'", name);

        let native = NativeFunction::new(name, arity, func);
        self.globals
            .borrow_mut()
            .define(name, Value::Callable(Rc::new(native)));
    }

    // ───────────────────────── embedding entry points ─────────────────────────

    /// Lex, parse and execute `source` against this interpreter's globals,
    /// reporting any error to the output sink.  Returns the last evaluated
    /// value.
    pub fn run(&mut self, source: &str) -> Value {
        self.run_report(source).value
    }

    /// Like [`run`](Self::run), but also hands back every reported error.
    ///
    /// A lexical error stops the run before parsing.  Parse errors are
    /// reported and the statements that did parse still execute.  The first
    /// runtime error stops execution.
    pub fn run_report(&mut self, source: &str) -> RunReport {
        info!("Running {} bytes of source", source.len());

        self.last_value = Value::Null;
        let mut errors: Vec<LoxError> = Vec::new();

        let tokens: Vec<Token> = match scanner::scan(source) {
            Ok(tokens) => tokens,
            Err(e) => {
                self.report(&e);
                errors.push(e);

                return RunReport {
                    value: Value::Null,
                    errors,
                };
            }
        };

        let program = Parser::new(tokens).parse();

        for e in &program.errors {
            self.report(e);
        }
        errors.extend(program.errors);

        if let Err(e) = self.interpret(&program.statements) {
            self.report(&e);
            errors.push(e);
        }

        RunReport {
            value: mem::replace(&mut self.last_value, Value::Null),
            errors,
        }
    }

    /// Executes a list of statements in global scope.  The first error stops
    /// execution and is returned; a top‑level `return` ends the program.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<()> {
        debug!("Interpreting {} statements", statements.len());

        for stmt in statements {
            if let Flow::Return(value) = self.execute(stmt)? {
                info!("Top-level return with {}, stopping", value);
                break;
            }
        }

        info!("Interpretation completed successfully");
        Ok(())
    }

    fn report(&mut self, error: &LoxError) {
        debug!("Reporting error: {}", error);

        if let Err(io) = writeln!(self.out, "{}", error) {
            warn!("Could not write error report: {}", io);
        }
    }

    // ───────────────────────── statements ─────────────────────────

    /// Executes a single statement.
    pub fn execute(&mut self, stmt: &Stmt) -> Result<Flow> {
        ensure_sufficient_stack(|| self.execute_stmt(stmt))
    }

    fn execute_stmt(&mut self, stmt: &Stmt) -> Result<Flow> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(Flow::Normal)
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                writeln!(self.out, "{}", value)?;
                debug!("Printed value: {}", value);
                Ok(Flow::Normal)
            }

            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Null,
                };
                self.environment.borrow_mut().define(&name.lexeme, value);
                Ok(Flow::Normal)
            }

            Stmt::Function(declaration) => {
                debug!("Defining function '{}'", declaration.name.lexeme);

                let function = Function::new(Rc::clone(declaration), Rc::clone(&self.environment));
                self.environment
                    .borrow_mut()
                    .define(&declaration.name.lexeme, Value::Callable(Rc::new(function)));
                Ok(Flow::Normal)
            }

            Stmt::Block(statements) => {
                let environment = Environment::nested(&self.environment);
                self.execute_block(statements, environment)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if is_truthy(&self.evaluate(condition)?) {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(Flow::Normal)
                }
            }

            Stmt::While { condition, body } => {
                while is_truthy(&self.evaluate(condition)?) {
                    if let flow @ Flow::Return(_) = self.execute(body)? {
                        return Ok(flow);
                    }
                }
                Ok(Flow::Normal)
            }

            Stmt::For {
                initializer,
                condition,
                increment,
                body,
            } => {
                if let Some(initializer) = initializer {
                    self.execute(initializer)?;
                }

                loop {
                    if let Some(condition) = condition {
                        if !is_truthy(&self.evaluate(condition)?) {
                            break;
                        }
                    }

                    if let flow @ Flow::Return(_) = self.execute(body)? {
                        return Ok(flow);
                    }

                    if let Some(increment) = increment {
                        self.evaluate(increment)?;
                    }
                }

                Ok(Flow::Normal)
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Null,
                };
                debug!("Returning value: {}", value);
                Ok(Flow::Return(value))
            }
        }
    }

    /// Run `statements` in `environment`, stopping at the first `return`.
    /// Afterwards the frame is released if nothing outside it can reach it.
    pub fn execute_block(
        &mut self,
        statements: &[Stmt],
        environment: Rc<RefCell<Environment>>,
    ) -> Result<Flow> {
        let frame = Rc::clone(&environment);

        let result = self.scoped(environment, |this| {
            for stmt in statements {
                if let flow @ Flow::Return(_) = this.execute(stmt)? {
                    return Ok(flow);
                }
            }
            Ok(Flow::Normal)
        });

        Environment::release(frame);
        result
    }

    /// Make `environment` current for the duration of `body`.
    fn scoped<T>(
        &mut self,
        environment: Rc<RefCell<Environment>>,
        body: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let previous = mem::replace(&mut self.environment, environment);
        let result = body(self);
        self.environment = previous;
        result
    }

    // ───────────────────────── expressions ─────────────────────────

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value> {
        ensure_sufficient_stack(|| self.evaluate_expr(expr))
    }

    fn evaluate_expr(&mut self, expr: &Expr) -> Result<Value> {
        let value = match expr {
            Expr::Literal(literal) => Value::from(literal),

            Expr::Grouping(inner) => self.evaluate(inner)?,

            Expr::Variable(name) => self.environment.borrow().get(&name.lexeme, name.line)?,

            Expr::Assign { name, value } => {
                let value = self.evaluate(value)?;
                self.environment
                    .borrow_mut()
                    .assign(&name.lexeme, value.clone(), name.line)?;
                value
            }

            Expr::Unary { operator, right } => self.evaluate_unary(operator, right)?,

            Expr::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right)?,

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;

                let short_circuits = if operator.token_type == TokenType::OR {
                    is_truthy(&left)
                } else {
                    !is_truthy(&left)
                };

                if short_circuits {
                    left
                } else {
                    self.evaluate(right)?
                }
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => self.evaluate_call(callee, paren, arguments)?,
        };

        if value != Value::Null {
            self.last_value = value.clone();
        }

        Ok(value)
    }

    fn evaluate_unary(&mut self, operator: &Token, right: &Expr) -> Result<Value> {
        let right = self.evaluate(right)?;

        match operator.token_type {
            TokenType::MINUS => match right {
                Value::Number(n) => Ok(Value::Number(-n)),
                _ => Err(LoxError::runtime(
                    operator.line,
                    format!("Operand of '{}' must be a number.", operator.lexeme),
                )),
            },

            TokenType::BANG => Ok(Value::Bool(!is_truthy(&right))),

            _ => Err(LoxError::runtime(
                operator.line,
                format!("Invalid unary operator '{}'.", operator.lexeme),
            )),
        }
    }

    fn evaluate_binary(&mut self, left: &Expr, operator: &Token, right: &Expr) -> Result<Value> {
        let left = self.evaluate(left)?;
        let right = self.evaluate(right)?;

        debug!(
            "Binary '{}' on {} and {}",
            operator.lexeme,
            left.type_name(),
            right.type_name()
        );

        match operator.token_type {
            TokenType::PLUS => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
                (Value::String(a), b @ Value::Number(_)) => Ok(Value::String(format!("{a}{b}"))),
                (a @ Value::Number(_), Value::String(b)) => Ok(Value::String(format!("{a}{b}"))),
                _ => Err(LoxError::runtime(
                    operator.line,
                    "Operands must be two numbers or two strings.",
                )),
            },

            TokenType::MINUS => {
                let (a, b) = number_operands(operator, &left, &right)?;
                Ok(Value::Number(a - b))
            }

            TokenType::STAR => {
                let (a, b) = number_operands(operator, &left, &right)?;
                Ok(Value::Number(a * b))
            }

            TokenType::SLASH => {
                let (a, b) = number_operands(operator, &left, &right)?;
                Ok(Value::Number(a / b))
            }

            TokenType::GREATER => {
                let (a, b) = number_operands(operator, &left, &right)?;
                Ok(Value::Bool(a > b))
            }

            TokenType::GREATER_EQUAL => {
                let (a, b) = number_operands(operator, &left, &right)?;
                Ok(Value::Bool(a >= b))
            }

            TokenType::LESS => {
                let (a, b) = number_operands(operator, &left, &right)?;
                Ok(Value::Bool(a < b))
            }

            TokenType::LESS_EQUAL => {
                let (a, b) = number_operands(operator, &left, &right)?;
                Ok(Value::Bool(a <= b))
            }

            TokenType::EQUAL_EQUAL => Ok(Value::Bool(left == right)),

            TokenType::BANG_EQUAL => Ok(Value::Bool(left != right)),

            _ => Err(LoxError::runtime(
                operator.line,
                format!("Invalid binary operator '{}'.", operator.lexeme),
            )),
        }
    }

    fn evaluate_call(&mut self, callee: &Expr, paren: &Token, arguments: &[Expr]) -> Result<Value> {
        let callee = self.evaluate(callee)?;

        let mut values: Vec<Value> = Vec::with_capacity(arguments.len());
        for argument in arguments {
            values.push(self.evaluate(argument)?);
        }

        let callable = match callee {
            Value::Callable(callable) => callable,
            other => {
                debug!("Attempt to call a {}", other.type_name());
                return Err(LoxError::runtime(paren.line, "Can only call functions."));
            }
        };

        if values.len() != callable.arity() {
            return Err(LoxError::runtime(
                paren.line,
                format!(
                    "Expected {} arguments but got {}.",
                    callable.arity(),
                    values.len()
                ),
            ));
        }

        if self.call_depth >= MAX_CALL_DEPTH {
            debug!("Call depth {} exceeded calling '{}'", MAX_CALL_DEPTH, callable.name());
            return Err(LoxError::runtime(paren.line, "Stack overflow."));
        }

        self.call_depth += 1;
        let result = callable.call(self, values, paren);
        self.call_depth -= 1;

        let result = result?;
        debug!("'{}' returned {}", callable.name(), result);

        Ok(result)
    }
}

/// `null` and `false` are falsy; everything else is truthy.
pub fn is_truthy(value: &Value) -> bool {
    !matches!(value, Value::Null | Value::Bool(false))
}

fn number_operands(operator: &Token, left: &Value, right: &Value) -> Result<(f64, f64)> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        _ => Err(LoxError::runtime(
            operator.line,
            format!("Operands of '{}' must be numbers.", operator.lexeme),
        )),
    }
}
